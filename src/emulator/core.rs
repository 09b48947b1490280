use super::alu::Alu;
use super::error::Result;
use super::field::OperationField;
use super::memory::VirtualMemory;

/// Sign extend the low `width` bytes of `pattern` to 64 bits. `width` must be
/// one of the bus widths, 1 to 8.
pub fn sign_extend(pattern: u64, width: usize) -> i64 {
    debug_assert!((1..=8).contains(&width), "sign_extend width {width} out of range");
    let unused = 64 - 8 * width as u32;
    ((pattern << unused) as i64) >> unused
}

/// Condition a relative jump is gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Zero,
    NotZero,
    // signed
    Less,
    GreaterEqual,
    LessEqual,
    Greater,
    // unsigned
    Below,
    AboveEqual,
    BelowEqual,
    Above,
}

/// The fetch/execute unit: ALU, memory and the instruction pointer.
#[derive(Debug, Default)]
pub struct Core {
    pub alu: Alu,
    pub memory: VirtualMemory,

    /// Last fetched instruction word
    pub ir: u32,
    /// Byte address of the current instruction
    pub ip: u64,
    /// Set by a control transfer, swallows the next automatic advance
    pub jumped: bool,
}

impl Core {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.ir = 0;
        self.ip = 0;
        self.jumped = false;
        self.alu.reset();
        self.memory.reset();
    }

    pub fn load_instruction(&mut self) -> Result<()> {
        self.ir = self.memory.read(self.ip, 4)? as u32;
        tracing::trace!("Fetched IR={:08X} from IP={:016X}", self.ir, self.ip);
        Ok(())
    }

    pub fn increment_ip(&mut self) {
        if self.jumped {
            self.jumped = false;
        } else {
            self.ip = self.ip.wrapping_add(4);
        }
    }

    // BUS

    fn fetch(&mut self, address: i64, width: usize, signed: bool, register: usize) -> Result<()> {
        let value = self.memory.read(address as u64, width)?;
        let value = if signed {
            sign_extend(value, width)
        } else {
            value as i64
        };
        self.alu.write(register, value);
        Ok(())
    }

    /// `M(%X + (%Y << 8*scale)) -> %Z`
    pub fn fetch_scaled(&mut self, field: &OperationField, width: usize, scale: u32, signed: bool) -> Result<()> {
        let base = self.alu.read(field.rx);
        let index = self.alu.read(field.ry);
        let address = base.wrapping_add(index.wrapping_shl(8 * scale));
        self.fetch(address, width, signed, field.rz)
    }

    /// `M(sX + %Y) -> %Z`
    pub fn fetch_displaced(&mut self, field: &OperationField, width: usize, signed: bool) -> Result<()> {
        let address = field.sx.wrapping_add(self.alu.read(field.ry));
        self.fetch(address, width, signed, field.rz)
    }

    /// `%X -> M(%Y + (%Z << 8*scale))`
    pub fn store_scaled(&mut self, field: &OperationField, width: usize, scale: u32) -> Result<()> {
        let base = self.alu.read(field.ry);
        let index = self.alu.read(field.rz);
        let address = base.wrapping_add(index.wrapping_shl(8 * scale));
        let value = self.alu.read(field.rx);
        self.memory.write(address as u64, width, value as u64)
    }

    /// `%X -> M(sY + %Z)`
    pub fn store_displaced(&mut self, field: &OperationField, width: usize) -> Result<()> {
        let address = field.sy.wrapping_add(self.alu.read(field.rz));
        let value = self.alu.read(field.rx);
        self.memory.write(address as u64, width, value as u64)
    }

    // JUMP

    /// Jump to `%X`, leaving the return address in `%Y`.
    pub fn abs_jump(&mut self, field: &OperationField) {
        self.alu.write(field.ry, self.ip.wrapping_add(4) as i64);
        self.ip = self.alu.read(field.rx) as u64;
        self.jumped = true;
    }

    /// Jump `sXYZ` instructions relative to the current one.
    pub fn rel_jump(&mut self, field: &OperationField) {
        self.ip = self.ip.wrapping_add((field.sxyz << 2) as u64);
        self.jumped = true;
    }

    pub fn condition_holds(&self, condition: Condition) -> bool {
        let flags = self.alu.flags;
        match condition {
            Condition::Always => true,
            Condition::Zero => flags.zf,
            Condition::NotZero => !flags.zf,
            Condition::Less => flags.sf != flags.of,
            Condition::GreaterEqual => flags.sf == flags.of,
            Condition::LessEqual => flags.zf || flags.sf != flags.of,
            Condition::Greater => !flags.zf && flags.sf == flags.of,
            Condition::Below => flags.cf,
            Condition::AboveEqual => !flags.cf,
            Condition::BelowEqual => flags.cf || flags.zf,
            Condition::Above => !flags.cf && !flags.zf,
        }
    }

    pub fn conditional_jump(&mut self, field: &OperationField, condition: Condition) {
        let taken = self.condition_holds(condition);
        tracing::trace!(?condition, taken, "conditional jump");
        if taken {
            self.rel_jump(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(raw: u32) -> OperationField {
        OperationField::new(raw).unwrap()
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFF, 1), -1);
        assert_eq!(sign_extend(0x7F, 1), 0x7F);
        assert_eq!(sign_extend(0x8000, 2), -0x8000);
        assert_eq!(sign_extend(0x80000001, 4), 0xFFFF_FFFF_8000_0001u64 as i64);
        assert_eq!(sign_extend(u64::MAX, 8), -1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    #[cfg(debug_assertions)]
    fn test_sign_extend_rejects_zero_width() {
        sign_extend(0xFF, 0);
    }

    #[test]
    fn test_scaled_and_displaced_bus_access() {
        let mut core = Core::new();
        core.alu.write(1, 4);
        core.alu.write(2, 12);
        core.alu.write(3, 0x80000001);

        // %3 -> M(%1 + %2 << 8)
        core.store_scaled(&field(0x00030102), 4, 1).unwrap();
        assert_eq!(core.memory.read(4 + (12 << 8), 4).unwrap(), 0x80000001);
        // %3 -> M(-4 + %2)
        core.store_displaced(&field(0x0003FC02), 4).unwrap();
        assert_eq!(core.memory.read(8, 4).unwrap(), 0x80000001);

        // M(%1 + %2 << 8) -> %4
        core.fetch_scaled(&field(0x00010204), 4, 1, false).unwrap();
        assert_eq!(core.alu.read(4), 0x80000001);
        // M(-4 + %2) -> %5
        core.fetch_displaced(&field(0x00FC0205), 4, false).unwrap();
        assert_eq!(core.alu.read(5), 0x80000001);

        core.fetch_scaled(&field(0x00010204), 4, 1, true).unwrap();
        core.fetch_displaced(&field(0x00FC0205), 4, true).unwrap();
        assert_eq!(core.alu.read(4), 0xFFFF_FFFF_8000_0001u64 as i64);
        assert_eq!(core.alu.read(5), 0xFFFF_FFFF_8000_0001u64 as i64);
    }

    #[test]
    fn test_scale_eight_wraps_the_shift() {
        let mut core = Core::new();
        core.alu.write(1, 16);
        core.alu.write(2, 8);
        core.alu.write(3, 0x55);
        // a shift by 64 is a shift by 0
        core.store_scaled(&field(0x00030102), 1, 8).unwrap();
        assert_eq!(core.memory.read(24, 1).unwrap(), 0x55);
    }

    #[test]
    fn test_bus_faults_propagate() {
        let mut core = Core::new();
        core.alu.write(1, 2);
        assert!(core.fetch_displaced(&field(0x00000102), 4, false).is_err());
    }

    #[test]
    fn test_jumps() {
        let mut core = Core::new();
        core.alu.write(1, 4);

        // jmp %1, %2
        core.abs_jump(&field(0x00010200));
        assert_eq!(core.ip, 4);
        assert_eq!(core.alu.read(2), 4);
        assert!(core.jumped);

        core.rel_jump(&field(0x00000001));
        assert_eq!(core.ip, 8);
        core.increment_ip();
        assert_eq!(core.ip, 8);
        assert!(!core.jumped);
        core.increment_ip();
        assert_eq!(core.ip, 12);

        // jump backwards
        core.rel_jump(&field(0x00FFFFFF));
        assert_eq!(core.ip, 8);
    }

    #[test]
    fn test_jz_jnz() {
        let mut core = Core::new();
        let jump = field(0x00000001);

        core.alu.sub(10, 10, 0);
        core.conditional_jump(&jump, Condition::NotZero);
        assert!(!core.jumped);
        core.conditional_jump(&jump, Condition::Zero);
        assert!(core.jumped);
        core.increment_ip();

        core.alu.sub(10, 11, 0);
        core.conditional_jump(&jump, Condition::Zero);
        assert!(!core.jumped);
        core.conditional_jump(&jump, Condition::NotZero);
        assert!(core.jumped);
    }

    #[test]
    fn test_signed_and_unsigned_conditions() {
        let mut core = Core::new();

        // 5 compared against 3: 5 - 3
        core.alu.sub(3, 5, 0);
        assert!(core.condition_holds(Condition::Greater));
        assert!(core.condition_holds(Condition::GreaterEqual));
        assert!(!core.condition_holds(Condition::Less));
        assert!(!core.condition_holds(Condition::LessEqual));
        assert!(core.condition_holds(Condition::Above));
        assert!(core.condition_holds(Condition::AboveEqual));
        assert!(!core.condition_holds(Condition::Below));
        assert!(!core.condition_holds(Condition::BelowEqual));

        // equal operands
        core.alu.sub(7, 7, 0);
        assert!(!core.condition_holds(Condition::Greater));
        assert!(core.condition_holds(Condition::GreaterEqual));
        assert!(core.condition_holds(Condition::LessEqual));
        assert!(!core.condition_holds(Condition::Above));
        assert!(core.condition_holds(Condition::BelowEqual));

        // -1 compared against 1 is less when signed
        core.alu.sub(1, -1, 0);
        assert!(core.condition_holds(Condition::Less));
        assert!(!core.condition_holds(Condition::Greater));
        assert!(core.condition_holds(Condition::Always));
    }
}
