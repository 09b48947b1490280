use super::error::{MachineError, Result};
use super::field::OperationField;
use super::observer::RegisterObserver;

pub const NUM_REGISTERS: usize = 256;

/// The four condition flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// zero
    pub zf: bool,
    /// carry (unsigned overflow / borrow)
    pub cf: bool,
    /// signed overflow
    pub of: bool,
    /// sign
    pub sf: bool,
}

/// The ALU owns the register file and the flags. Register reads and writes all
/// go through [`Alu::read`] and [`Alu::write`] so observers see every access.
pub struct Alu {
    registers: Box<[i64; NUM_REGISTERS]>,
    pub flags: Flags,
    observers: Vec<Box<dyn RegisterObserver>>,
}

impl std::fmt::Debug for Alu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alu")
            .field("flags", &self.flags)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for Alu {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the register `n` slots after `base`, for the instructions that
/// touch a run of consecutive registers.
fn register_after(base: usize, n: usize) -> Result<usize> {
    let index = base + n;
    if index < NUM_REGISTERS {
        Ok(index)
    } else {
        Err(MachineError::RegisterOutOfRange { index })
    }
}

impl Alu {
    pub fn new() -> Self {
        Self {
            registers: Box::new([0; NUM_REGISTERS]),
            flags: Flags::default(),
            observers: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.registers.fill(0);
        self.flags = Flags::default();
        for observer in &mut self.observers {
            observer.reset();
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn RegisterObserver>) {
        self.observers.push(observer);
    }

    pub fn read(&mut self, register: usize) -> i64 {
        let value = self.registers[register];
        for observer in &mut self.observers {
            observer.on_read(register, value);
        }
        value
    }

    pub fn write(&mut self, register: usize, value: i64) {
        // %0 is hard-wired to zero
        let value = if register == 0 { 0 } else { value };
        for observer in &mut self.observers {
            observer.on_write(register, value);
        }
        self.registers[register] = value;
    }

    /// Read a register without notifying observers.
    pub fn get(&self, register: usize) -> i64 {
        self.registers[register]
    }

    /// Overwrite a register without notifying observers. %0 stays zero.
    pub fn set(&mut self, register: usize, value: i64) {
        if register != 0 {
            self.registers[register] = value;
        }
    }

    // LOAD

    fn load(&mut self, register: usize, value: i64) {
        self.write(register, value);
        self.flags.zf = value == 0;
    }

    pub fn load_unsigned(&mut self, field: &OperationField) {
        self.load(field.rz, field.uxy as i64);
    }

    pub fn load_signed(&mut self, field: &OperationField) {
        self.load(field.rz, field.sxy);
    }

    pub fn shift_left_load(&mut self, field: &OperationField) {
        let value = (self.read(field.rz) << 16).wrapping_add(field.uxy as i64);
        self.load(field.rz, value);
    }

    // SHIFT

    /// `amount` is the raw 64 bit shift count; the shift itself uses it modulo 64.
    pub fn shift_left(&mut self, amount: u64, value: i64, register: usize) {
        let z = value.wrapping_shl(amount as u32);
        self.write(register, z);

        if amount < 64 {
            self.flags.cf = (value as u64).wrapping_shr((64 - amount) as u32) & 1 == 1;
            tracing::trace!(cf = self.flags.cf, "shift left carry");
        }
    }

    pub fn arithmetic_shift_right(&mut self, amount: u64, value: i64, register: usize) {
        self.write(register, value.wrapping_shr(amount as u32));
    }

    pub fn logical_shift_right(&mut self, amount: u64, value: i64, register: usize) {
        self.write(register, (value as u64).wrapping_shr(amount as u32) as i64);
    }

    // ADD SUB

    pub fn add(&mut self, x: i64, y: i64, register: usize) {
        let (z, of) = x.overflowing_add(y);
        let (_, cf) = (x as u64).overflowing_add(y as u64);
        self.write(register, z);

        self.flags.zf = z == 0;
        self.flags.cf = cf;
        self.flags.of = of;
        self.flags.sf = z < 0;
        tracing::trace!(flags = ?self.flags, "add");
    }

    /// Computes `y - x`; the first operand is the subtrahend.
    pub fn sub(&mut self, x: i64, y: i64, register: usize) {
        let z = y.wrapping_sub(x);
        self.write(register, z);

        self.flags.zf = z == 0;
        self.flags.cf = (y as u64) < (z as u64);
        self.flags.of = (x >= 0 && y < 0 && z >= 0) || (x < 0 && y >= 0 && z < 0);
        self.flags.sf = z < 0;
        tracing::trace!(flags = ?self.flags, "sub");
    }

    // BITWISE

    pub fn and(&mut self, field: &OperationField) {
        let z = self.read(field.rx) & self.read(field.ry);
        self.write(field.rz, z);
        self.flags.zf = z == 0;
    }

    pub fn or(&mut self, field: &OperationField) {
        let z = self.read(field.rx) | self.read(field.ry);
        self.write(field.rz, z);
        self.flags.zf = z == 0;
    }

    pub fn not(&mut self, field: &OperationField) {
        let y = !self.read(field.rx);
        self.write(field.ry, y);
        self.flags.zf = y == 0;
    }

    // MUL DIV

    /// Signed 64x64 multiply. Only the low word of the product is kept; a
    /// non-zero high word sets carry and overflow.
    pub fn mul(&mut self, x: i64, y: i64, register: usize) {
        let product = (x as i128) * (y as i128);
        let low = product as i64;
        let high = (product >> 64) as i64;
        self.write(register, low);

        if high != 0 {
            self.flags.cf = true;
            self.flags.of = true;
        }
        tracing::trace!(low, high, "mul");
    }

    /// Unsigned 128 by 64 bit division. The dividend is `(dividend_reg + 1 :
    /// dividend_reg)`; quotient low, quotient high and remainder land in three
    /// consecutive registers starting at `register`.
    pub fn div_unsigned(&mut self, divisor: u64, dividend_reg: usize, register: usize) -> Result<()> {
        let low = self.read(dividend_reg) as u64;
        let high = self.read(register_after(dividend_reg, 1)?) as u64;
        let quotient_high_reg = register_after(register, 1)?;
        let remainder_reg = register_after(register, 2)?;

        if divisor == 0 {
            return Err(MachineError::DivisionByZero);
        }

        let dividend = ((high as u128) << 64) | low as u128;
        let quotient = dividend / divisor as u128;
        let remainder = dividend % divisor as u128;

        self.write(register, quotient as u64 as i64);
        self.write(quotient_high_reg, (quotient >> 64) as u64 as i64);
        self.write(remainder_reg, remainder as u64 as i64);
        Ok(())
    }

    /// Signed 64 bit division truncating toward zero. Quotient goes to
    /// `register`, remainder to the one after it.
    pub fn div_signed(&mut self, divisor: i64, dividend: i64, register: usize) -> Result<()> {
        let remainder_reg = register_after(register, 1)?;
        if divisor == 0 {
            return Err(MachineError::DivisionByZero);
        }

        let quotient = dividend.wrapping_div(divisor);
        let remainder = dividend.wrapping_sub(divisor.wrapping_mul(quotient));
        self.write(register, quotient);
        self.write(remainder_reg, remainder);
        Ok(())
    }
}
