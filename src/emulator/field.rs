use super::error::{MachineError, Result};

/// The low 24 bits of an instruction word, decoded under every addressing
/// convention at once. Which of the interpretations is meaningful depends on
/// the opcode.
///
/// LAYOUT: opcode(8) | X(8) | Y(8) | Z(8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationField {
    pub raw: u32,

    /// Register selected by byte X
    pub rx: usize,
    /// Register selected by byte Y
    pub ry: usize,
    /// Register selected by byte Z
    pub rz: usize,

    pub ux: u64,
    pub uxy: u64,

    pub sx: i64,
    pub sy: i64,
    pub sxy: i64,
    pub sxyz: i64,
}

impl OperationField {
    pub fn new(raw: u32) -> Result<Self> {
        if raw >> 24 != 0 {
            return Err(MachineError::InvalidField { value: raw });
        }

        let x = (raw >> 16) & 0xFF;
        let y = (raw >> 8) & 0xFF;
        let z = raw & 0xFF;

        Ok(Self {
            raw,
            rx: x as usize,
            ry: y as usize,
            rz: z as usize,
            ux: x as u64,
            uxy: (raw >> 8) as u64,
            // shift the field to the top of an i32 and back down to sign extend
            sx: (((raw << 8) as i32) >> 24) as i64,
            sy: (((raw << 16) as i32) >> 24) as i64,
            sxy: (((raw << 8) as i32) >> 16) as i64,
            sxyz: (((raw << 8) as i32) >> 8) as i64,
        })
    }

    /// Split a full instruction word into its opcode and operation field.
    pub fn split(word: u32) -> (u8, Self) {
        let opcode = (word >> 24) as u8;
        let field = Self::new(word & 0x00FF_FFFF)
            .unwrap_or_else(|_| unreachable!("a masked field always fits into 24 bits"));
        (opcode, field)
    }
}
