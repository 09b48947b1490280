use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::{Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Read one character into `%X`. Blocks the machine when no input is available;
/// the same instruction is retried on the next step.
pub struct GetcOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Write the low byte of `%X` or of the immediate `uX`.
pub struct PutcOp(pub Operand);

impl Op for GetcOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        if machine.io.has_next_char() {
            let c = machine.io.getc();
            machine.core.alu.write(field.rx, c as i64);
            machine.blocked = false;
        } else {
            tracing::debug!("getc: no input available, blocking");
            machine.blocked = true;
        }
        Ok(())
    }
}

impl Op for PutcOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let c = match self.0 {
            Operand::Register => machine.core.alu.read(field.rx) as u8,
            Operand::Immediate => field.ux as u8,
        };
        machine.io.putc(c);
        Ok(())
    }
}
