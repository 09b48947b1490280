use thiserror::Error;

/// Everything that can stop a run. All of these are terminal: the machine halts
/// and the message is handed to the halt observers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("illegal instruction: 0x{opcode:02X}")]
    IllegalInstruction { opcode: u8 },

    #[error("misaligned {width} byte access at address 0x{address:016X}")]
    MemoryMisaligned { address: u64, width: usize },

    #[error("{width} byte access at address 0x{address:016X} crosses a page boundary")]
    MemoryOutOfBounds { address: u64, width: usize },

    #[error("invalid access width {width}, expected 1 to 8 bytes")]
    InvalidWidth { width: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("operation field 0x{value:X} does not fit into 24 bits")]
    InvalidField { value: u32 },

    #[error("register index {index} is out of range")]
    RegisterOutOfRange { index: usize },
}

pub type Result<T> = std::result::Result<T, MachineError>;
