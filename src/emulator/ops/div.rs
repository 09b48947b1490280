use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::{Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivOp {
    /// `(%Y+1 : %Y) / X` as unsigned 128 bit by 64 bit division. Quotient into
    /// `%Z` (low) and `%Z+1` (high), remainder into `%Z+2`.
    Unsigned(Operand),
    /// `%Y / X` truncating toward zero. Quotient into `%Z`, remainder into `%Z+1`.
    /// The immediate form takes the signed byte `sX`.
    Signed(Operand),
}

impl Op for DivOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        match *self {
            DivOp::Unsigned(operand) => {
                let divisor = match operand {
                    Operand::Register => alu.read(field.rx) as u64,
                    Operand::Immediate => field.ux,
                };
                alu.div_unsigned(divisor, field.ry, field.rz)
            }
            DivOp::Signed(operand) => {
                let divisor = match operand {
                    Operand::Register => alu.read(field.rx),
                    Operand::Immediate => field.sx,
                };
                let dividend = alu.read(field.ry);
                alu.div_signed(divisor, dividend, field.rz)
            }
        }
    }
}
