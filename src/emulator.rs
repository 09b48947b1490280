pub mod alu;
pub mod core;
pub mod disassembler;
pub mod error;
pub mod field;
pub mod image;
pub mod io;
pub mod memory;
pub mod observer;
pub mod ops;
#[cfg(test)]
mod tests;

pub use self::core::{Condition, Core};
pub use alu::{Alu, Flags};
pub use error::{MachineError, Result};
pub use field::OperationField;
pub use io::{BufferedIo, IoDevice};
pub use memory::VirtualMemory;
pub use observer::{MachineObserver, MemoryObserver, RegisterObserver};
pub use ops::{disassemble, Op, OpCode};

/// What a single [`Machine::step`] left the machine in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineStatus {
    Running,
    /// `getc` found no input; the same instruction runs again on the next step
    Blocked,
    Halted,
}

/// Why [`Machine::run_for`] handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted(u8),
    Blocked,
    StepLimit,
}

/// The whole machine: the core, the I/O device, the dispatch loop and the
/// machine level observers.
pub struct Machine {
    pub core: Core,
    pub io: Box<dyn IoDevice>,

    pub halted: bool,
    pub blocked: bool,
    pub exit_code: u8,
    pub error_message: Option<String>,

    fault: Option<MachineError>,
    steps: u64,
    observers: Vec<Box<dyn MachineObserver>>,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("core", &self.core)
            .field("halted", &self.halted)
            .field("blocked", &self.blocked)
            .field("exit_code", &self.exit_code)
            .field("error_message", &self.error_message)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(Box::new(BufferedIo::new()))
    }
}

impl Machine {
    pub fn new(io: Box<dyn IoDevice>) -> Machine {
        Self {
            core: Core::new(),
            io,
            halted: false,
            blocked: false,
            exit_code: 0,
            error_message: None,
            fault: None,
            steps: 0,
            observers: Vec::new(),
        }
    }

    pub fn add_register_observer(&mut self, observer: Box<dyn RegisterObserver>) {
        self.core.alu.add_observer(observer);
    }

    pub fn add_memory_observer(&mut self, observer: Box<dyn MemoryObserver>) {
        self.core.memory.add_observer(observer);
    }

    pub fn add_machine_observer(&mut self, observer: Box<dyn MachineObserver>) {
        self.observers.push(observer);
    }

    pub fn status(&self) -> MachineStatus {
        if self.halted {
            MachineStatus::Halted
        } else if self.blocked {
            MachineStatus::Blocked
        } else {
            MachineStatus::Running
        }
    }

    /// The error that halted the machine, if it did not halt through a `halt`
    /// instruction.
    pub fn fault(&self) -> Option<&MachineError> {
        self.fault.as_ref()
    }

    /// Number of instructions that completed and advanced the machine.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn load_program(&mut self, program: &[u32]) {
        self.core.memory.load_program(program);
    }

    /// Put everything back to power-on state. The program has to be loaded again.
    pub fn reset(&mut self) {
        let span = tracing::info_span!("reset");
        let _guard = span.enter();

        self.core.reset();
        self.io.reset();
        self.halted = false;
        self.blocked = false;
        self.exit_code = 0;
        self.error_message = None;
        self.fault = None;
        self.steps = 0;
        for observer in &mut self.observers {
            observer.reset();
        }
        tracing::debug!("machine reset");
    }

    fn halt_with(&mut self, error: MachineError) {
        tracing::warn!(ip = format!("0x{:016X}", self.core.ip), "halting: {}", error);
        self.error_message = Some(error.to_string());
        self.fault = Some(error);
        self.blocked = false;
        self.halted = true;
    }

    fn execute_current(&mut self) -> Result<()> {
        self.core.load_instruction()?;

        let (opcode, field) = OperationField::split(self.core.ir);
        let op = OpCode::from_value(opcode).ok_or(MachineError::IllegalInstruction { opcode })?;
        tracing::trace!("Decoded opcode {:02X} as {:?}", opcode, op);

        op.execute(&field, self)
    }

    /// Tell the observers which instruction comes next. Reading it is not a bus
    /// access, so memory observers don't see it.
    fn preview_next(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let (field, text) = match self.core.memory.peek(self.core.ip, 4) {
            Ok(word) => (word as u32 & 0x00FF_FFFF, disassemble(word as u32)),
            Err(_) => (0, "illegal instruction".to_string()),
        };
        for observer in &mut self.observers {
            observer.next_instruction(field, &text);
        }
    }

    /// One fetch-decode-execute cycle.
    pub fn step(&mut self) -> MachineStatus {
        if self.halted {
            return MachineStatus::Halted;
        }

        let span = tracing::debug_span!("step", ip = format!("0x{:016X}", self.core.ip));
        let _guard = span.enter();

        if let Err(error) = self.execute_current() {
            self.halt_with(error);
        }

        if self.halted {
            let message = self.error_message.clone();
            for observer in &mut self.observers {
                observer.on_halt(self.exit_code, message.as_deref());
            }
            tracing::debug!(exit_code = self.exit_code, "machine halted");
            return MachineStatus::Halted;
        }

        if self.blocked {
            for observer in &mut self.observers {
                observer.on_block();
            }
            return MachineStatus::Blocked;
        }

        self.core.increment_ip();
        self.steps += 1;
        self.preview_next();
        MachineStatus::Running
    }

    fn outcome(&self) -> Result<u8> {
        match &self.fault {
            Some(error) => Err(error.clone()),
            None => Ok(self.exit_code),
        }
    }

    /// Step until the machine halts. A blocked machine keeps retrying its
    /// `getc`, so the I/O device must eventually produce input.
    pub fn run(&mut self) -> Result<u8> {
        let span = tracing::info_span!("run");
        let _guard = span.enter();

        while !self.halted {
            self.step();
        }
        self.outcome()
    }

    /// Step until the machine halts, blocks, or `max_steps` steps were taken.
    pub fn run_for(&mut self, max_steps: Option<u64>) -> Result<RunOutcome> {
        let span = tracing::info_span!("run_for", max_steps = ?max_steps);
        let _guard = span.enter();

        let mut taken = 0;
        loop {
            if let Some(max) = max_steps {
                if taken >= max {
                    tracing::info!("Reached maximum steps ({}), stopping execution", max);
                    return Ok(RunOutcome::StepLimit);
                }
            }
            taken += 1;

            match self.step() {
                MachineStatus::Running => {}
                MachineStatus::Blocked => return Ok(RunOutcome::Blocked),
                MachineStatus::Halted => return self.outcome().map(RunOutcome::Halted),
            }
        }
    }
}
