//! Observer channels. Observers only ever watch: nothing they do can feed back
//! into execution, so a machine runs the same whether zero or ten are attached.

/// Notified on every register access made by the ALU, including the implicit
/// reads an instruction performs on its source registers.
pub trait RegisterObserver {
    fn on_read(&mut self, register: usize, value: i64);
    fn on_write(&mut self, register: usize, value: i64);
    fn reset(&mut self) {}
}

/// Notified on every bus access and once when a program image is loaded.
pub trait MemoryObserver {
    fn on_read(&mut self, address: u64, width: usize, value: u64);
    fn on_write(&mut self, address: u64, width: usize, value: u64);
    fn on_load_program(&mut self, _program: &[u32]) {}
    fn reset(&mut self) {}
}

/// Machine level events.
pub trait MachineObserver {
    /// The instruction that will execute on the next step, before it runs.
    fn next_instruction(&mut self, field: u32, disassembly: &str);
    fn on_halt(&mut self, exit_code: u8, error: Option<&str>);
    fn on_block(&mut self) {}
    fn reset(&mut self) {}
}
