use crate::emulator::core::Condition;
use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JmpOp {
    /// Jump to the address in `%X`, saving the return address in `%Y`
    Absolute,
    /// Jump `sXYZ` instructions away if the condition holds
    Relative(Condition),
}

impl Op for JmpOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        match *self {
            JmpOp::Absolute => machine.core.abs_jump(field),
            JmpOp::Relative(condition) => machine.core.conditional_jump(field, condition),
        }
        Ok(())
    }
}
