use std::fmt;

use super::field::OperationField;

/// How the operand field of an instruction is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandFormat {
    /// no operands
    None,
    /// `%X`
    R,
    /// `uX`
    U8,
    /// `%X, %Y`
    RR,
    /// `%X, %Y, %Z`
    RRR,
    /// `uX, %Y, %Z`
    URR,
    /// `sX, %Y, %Z`
    SRR,
    /// `uXY, %Z`
    U16R,
    /// `sXY, %Z`
    S16R,
    /// `sXYZ`
    S24,
    /// `M(%X + %Y) -> %Z`
    MrrR,
    /// `M(sX + %Y) -> %Z`
    MsrR,
    /// `%X -> M(%Y + %Z)`
    RMrr,
    /// `%X -> M(sY + %Z)`
    RMsr,
}

struct Reg(usize);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%0x{:X}", self.0)
    }
}

impl OperandFormat {
    pub fn render(&self, field: &OperationField) -> String {
        let (x, y, z) = (Reg(field.rx), Reg(field.ry), Reg(field.rz));
        match self {
            OperandFormat::None => String::new(),
            OperandFormat::R => format!("{x}"),
            OperandFormat::U8 => format!("{}", field.ux),
            OperandFormat::RR => format!("{x},\t{y}"),
            OperandFormat::RRR => format!("{x},\t{y},\t{z}"),
            OperandFormat::URR => format!("{},\t{y},\t{z}", field.ux),
            OperandFormat::SRR => format!("{},\t{y},\t{z}", field.sx),
            OperandFormat::U16R => format!("{},\t{z}", field.uxy),
            OperandFormat::S16R => format!("{},\t{z}", field.sxy),
            OperandFormat::S24 => format!("{}", field.sxyz),
            OperandFormat::MrrR => format!("M({x} + {y}) ->\t{z}"),
            OperandFormat::MsrR => format!("M({} + {y}) ->\t{z}", field.sx),
            OperandFormat::RMrr => format!("{x} ->\tM({y} + {z})"),
            OperandFormat::RMsr => format!("{x} ->\tM({} + {z})", field.sy),
        }
    }
}

/// Turns the operand field of one opcode back into assembly text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disassembler {
    pub mnemonic: &'static str,
    pub format: OperandFormat,
}

impl Disassembler {
    pub const fn new(mnemonic: &'static str, format: OperandFormat) -> Self {
        Self { mnemonic, format }
    }

    pub fn disassemble(&self, field: &OperationField) -> String {
        match self.format {
            OperandFormat::None => self.mnemonic.to_string(),
            format => format!("{}\t{}", self.mnemonic, format.render(field)),
        }
    }
}
