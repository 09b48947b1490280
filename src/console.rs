//! Terminal front end: stdin/stdout as the machine's I/O device and observers
//! that turn machine events into `tracing` events.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::emulator::{IoDevice, MachineObserver, MemoryObserver, RegisterObserver};

/// Reads its input a line at a time and writes its output byte by byte. On the
/// console that is stdin and stdout. Once the input is closed the device never
/// has another character, so a `getc` blocks for good.
pub struct ConsoleIo {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    pending: VecDeque<u8>,
    eof: bool,
}

impl std::fmt::Debug for ConsoleIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleIo")
            .field("pending", &self.pending)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

impl Default for ConsoleIo {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleIo {
    pub fn new() -> Self {
        Self::with_streams(Box::new(std::io::stdin().lock()), Box::new(std::io::stdout()))
    }

    pub fn with_streams(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            input,
            output,
            pending: VecDeque::new(),
            eof: false,
        }
    }

    fn fill(&mut self) {
        // a prompt without a newline is still sitting in the output buffer
        if let Err(err) = self.output.flush() {
            tracing::warn!("flushing output failed: {}", err);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => self.eof = true,
            Ok(_) => self.pending.extend(line.bytes()),
            Err(err) => {
                tracing::warn!("reading input failed: {}", err);
                self.eof = true;
            }
        }
    }
}

impl IoDevice for ConsoleIo {
    fn putc(&mut self, c: u8) {
        let written = self.output.write_all(&[c]).and_then(|_| {
            if c == b'\n' {
                self.output.flush()
            } else {
                Ok(())
            }
        });
        if let Err(err) = written {
            tracing::warn!("writing output failed: {}", err);
        }
    }

    fn getc(&mut self) -> u8 {
        self.pending.pop_front().unwrap_or(0)
    }

    fn has_next_char(&mut self) -> bool {
        if self.pending.is_empty() && !self.eof {
            self.fill();
        }
        !self.pending.is_empty()
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Logs every event of the channel it is attached to. One instance per
/// channel; it carries no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceObserver;

impl RegisterObserver for TraceObserver {
    fn on_read(&mut self, register: usize, value: i64) {
        tracing::trace!(target: "ulm::registers", "%0x{:X} -> {:#018X}", register, value);
    }

    fn on_write(&mut self, register: usize, value: i64) {
        tracing::debug!(target: "ulm::registers", "%0x{:X} <- {:#018X}", register, value);
    }
}

impl MemoryObserver for TraceObserver {
    fn on_read(&mut self, address: u64, width: usize, value: u64) {
        tracing::trace!(target: "ulm::memory", "M[{:#X}; {}] -> {:#X}", address, width, value);
    }

    fn on_write(&mut self, address: u64, width: usize, value: u64) {
        tracing::debug!(target: "ulm::memory", "M[{:#X}; {}] <- {:#X}", address, width, value);
    }

    fn on_load_program(&mut self, program: &[u32]) {
        tracing::debug!(target: "ulm::memory", words = program.len(), "program loaded");
    }
}

impl MachineObserver for TraceObserver {
    fn next_instruction(&mut self, field: u32, disassembly: &str) {
        tracing::debug!(target: "ulm::instructions", "{:06X}  {}", field, disassembly);
    }

    fn on_halt(&mut self, exit_code: u8, error: Option<&str>) {
        match error {
            Some(error) => tracing::warn!(target: "ulm::instructions", exit_code, "halted: {}", error),
            None => tracing::debug!(target: "ulm::instructions", exit_code, "halted"),
        }
    }

    fn on_block(&mut self) {
        tracing::trace!(target: "ulm::instructions", "waiting for input");
    }
}
