use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// signed byte displacement plus a base register
    Displacement,
    /// base register plus an index register shifted left by `8 * scale`
    Scaled(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Load `width` bytes from memory into `%Z`, zero or sign extended.
pub struct FetchOp {
    pub width: usize,
    pub addressing: Addressing,
    pub signed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Store the low `width` bytes of `%X` to memory.
pub struct StoreOp {
    pub width: usize,
    pub addressing: Addressing,
}

impl Op for FetchOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        match self.addressing {
            Addressing::Displacement => {
                machine.core.fetch_displaced(field, self.width, self.signed)
            }
            Addressing::Scaled(scale) => {
                machine.core.fetch_scaled(field, self.width, scale, self.signed)
            }
        }
    }
}

impl Op for StoreOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        match self.addressing {
            Addressing::Displacement => machine.core.store_displaced(field, self.width),
            Addressing::Scaled(scale) => machine.core.store_scaled(field, self.width, scale),
        }
    }
}
