use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::{Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// `%Z <- X + %Y`, updating all four flags
pub struct AddOp(pub Operand);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// `%Z <- %Y - X`, updating all four flags
pub struct SubOp(pub Operand);

impl Op for AddOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        let x = match self.0 {
            Operand::Register => alu.read(field.rx),
            Operand::Immediate => field.ux as i64,
        };
        let y = alu.read(field.ry);
        alu.add(x, y, field.rz);
        Ok(())
    }
}

impl Op for SubOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let alu = &mut machine.core.alu;
        let x = match self.0 {
            Operand::Register => alu.read(field.rx),
            Operand::Immediate => field.ux as i64,
        };
        let y = alu.read(field.ry);
        alu.sub(x, y, field.rz);
        Ok(())
    }
}
