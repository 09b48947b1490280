#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use ulm_emulator::config::Config;
use ulm_emulator::console::{ConsoleIo, TraceObserver};
use ulm_emulator::emulator::image::{read_image, ImageFormat};
use ulm_emulator::emulator::{Machine, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "ulm")]
#[command(about = "Runs a ULM program image on the console", long_about = None)]
struct Args {
    /// Program image, hexadecimal words unless --binary is given
    image: PathBuf,

    /// Read the image as raw big-endian words
    #[arg(long)]
    binary: bool,

    /// RON config file
    #[arg(long, default_value = "ulm.ron")]
    config: PathBuf,

    /// Log every register, memory and instruction event
    #[arg(long)]
    trace: bool,

    /// Stop after this many steps
    #[arg(long)]
    max_steps: Option<u64>,
}

fn init_tracing(config: &Config) {
    let mut directives = config.log_filter.clone();
    let channels = [
        (config.trace.registers, "ulm::registers=trace"),
        (config.trace.memory, "ulm::memory=trace"),
        (config.trace.instructions, "ulm::instructions=debug"),
    ];
    for (enabled, directive) in channels {
        if enabled {
            directives.push(',');
            directives.push_str(directive);
        }
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.trace {
        config.trace = ulm_emulator::config::TraceConfig::all();
    }
    if args.max_steps.is_some() {
        config.max_steps = args.max_steps;
    }
    init_tracing(&config);

    let format = if args.binary {
        ImageFormat::Binary
    } else {
        ImageFormat::Text
    };
    let program = read_image(&args.image, format)
        .with_context(|| format!("loading {}", args.image.display()))?;

    let mut machine = Machine::new(Box::new(ConsoleIo::new()));
    if config.trace.registers {
        machine.add_register_observer(Box::new(TraceObserver));
    }
    if config.trace.memory {
        machine.add_memory_observer(Box::new(TraceObserver));
    }
    if config.trace.instructions {
        machine.add_machine_observer(Box::new(TraceObserver));
    }
    machine.load_program(&program);

    match machine.run_for(config.max_steps)? {
        RunOutcome::Halted(code) => Ok(ExitCode::from(code)),
        // the console reads stdin until a line arrives, so blocking means stdin is closed
        RunOutcome::Blocked => bail!(
            "program is waiting for input at 0x{:X} but stdin is closed",
            machine.core.ip
        ),
        RunOutcome::StepLimit => bail!(
            "stopped after {} steps without halting",
            machine.steps()
        ),
    }
}
