use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::{Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// `%Z <- %Y shifted by X`. The operand says whether X is `%X` or `uX`.
pub enum ShiftOp {
    Left(Operand),
    LogicalRight(Operand),
    ArithmeticRight(Operand),
}

impl Op for ShiftOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        let operand = match *self {
            ShiftOp::Left(operand)
            | ShiftOp::LogicalRight(operand)
            | ShiftOp::ArithmeticRight(operand) => operand,
        };
        let amount = match operand {
            Operand::Register => alu.read(field.rx) as u64,
            Operand::Immediate => field.ux,
        };
        let value = alu.read(field.ry);

        match self {
            ShiftOp::Left(_) => alu.shift_left(amount, value, field.rz),
            ShiftOp::LogicalRight(_) => alu.logical_shift_right(amount, value, field.rz),
            ShiftOp::ArithmeticRight(_) => alu.arithmetic_shift_right(amount, value, field.rz),
        }
        Ok(())
    }
}
