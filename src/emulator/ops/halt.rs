use crate::emulator::error::Result;
use crate::emulator::field::OperationField;
use crate::emulator::Machine;

use super::{Op, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Stop the machine. The exit code is the low byte of `%X` or the immediate `uX`.
pub struct HaltOp(pub Operand);

impl Op for HaltOp {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        let code = match self.0 {
            Operand::Register => machine.core.alu.read(field.rx) as u8,
            Operand::Immediate => field.ux as u8,
        };
        tracing::debug!(exit_code = code, "halt");
        machine.exit_code = code;
        machine.halted = true;
        Ok(())
    }
}
