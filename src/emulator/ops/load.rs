use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Load a 16 bit immediate into `%Z`, setting the zero flag.
pub enum LoadOp {
    /// `%Z <- uXY`
    Unsigned,
    /// `%Z <- sXY`
    Signed,
    /// `%Z <- (%Z << 16) + uXY`, for building wide constants 16 bits at a time
    ShiftLeft,
}

impl Op for LoadOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        match self {
            LoadOp::Unsigned => alu.load_unsigned(field),
            LoadOp::Signed => alu.load_signed(field),
            LoadOp::ShiftLeft => alu.shift_left_load(field),
        }
        Ok(())
    }
}
