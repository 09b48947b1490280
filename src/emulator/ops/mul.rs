use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::{Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Signed multiply, `%Z <- X * %Y`. The immediate form takes the signed byte `sX`.
pub struct MulOp(pub Operand);

impl Op for MulOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        let x = match self.0 {
            Operand::Register => alu.read(field.rx),
            Operand::Immediate => field.sx,
        };
        let y = alu.read(field.ry);
        alu.mul(x, y, field.rz);
        Ok(())
    }
}
