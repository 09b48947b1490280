use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bitwise operations. These only touch the zero flag.
pub enum LogicOp {
    /// `%Z <- %X | %Y`
    Or,
    /// `%Z <- %X & %Y`
    And,
    /// `%Y <- !%X`
    Not,
}

impl Op for LogicOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        match self {
            LogicOp::Or => alu.or(field),
            LogicOp::And => alu.and(field),
            LogicOp::Not => alu.not(field),
        }
        Ok(())
    }
}
