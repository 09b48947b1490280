pub use add::{AddOp, SubOp};
pub use bus::{Addressing, FetchOp, StoreOp};
pub use div::DivOp;
pub use halt::HaltOp;
pub use io::{GetcOp, PutcOp};
pub use jmp::JmpOp;
pub use load::LoadOp;
pub use logic::LogicOp;
pub use mul::MulOp;
pub use shift::ShiftOp;

use lazy_static::lazy_static;

use super::core::Condition;
use super::disassembler::{Disassembler, OperandFormat};
use super::error::Result;
use super::field::OperationField;
use super::Machine;

mod add;
mod bus;
mod div;
mod halt;
mod io;
mod jmp;
mod load;
mod logic;
mod mul;
mod shift;

/// Where the first operand of a two-source instruction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// the register named by byte X
    Register,
    /// byte X itself
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Halt(HaltOp),
    Add(AddOp),
    Sub(SubOp),
    Mul(MulOp),
    Div(DivOp),
    Jmp(JmpOp),
    Logic(LogicOp),
    Shift(ShiftOp),
    Load(LoadOp),
    Getc(GetcOp),
    Putc(PutcOp),
    Nop,
    Fetch(FetchOp),
    Store(StoreOp),
}

pub trait Op: std::fmt::Debug {
    /// Run the instruction against the machine state.
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()>;
}

impl Op for OpCode {
    fn execute(&self, field: &OperationField, machine: &mut Machine) -> Result<()> {
        match self {
            OpCode::Halt(op) => op.execute(field, machine),
            OpCode::Add(op) => op.execute(field, machine),
            OpCode::Sub(op) => op.execute(field, machine),
            OpCode::Mul(op) => op.execute(field, machine),
            OpCode::Div(op) => op.execute(field, machine),
            OpCode::Jmp(op) => op.execute(field, machine),
            OpCode::Logic(op) => op.execute(field, machine),
            OpCode::Shift(op) => op.execute(field, machine),
            OpCode::Load(op) => op.execute(field, machine),
            OpCode::Getc(op) => op.execute(field, machine),
            OpCode::Putc(op) => op.execute(field, machine),
            OpCode::Nop => Ok(()),
            OpCode::Fetch(op) => op.execute(field, machine),
            OpCode::Store(op) => op.execute(field, machine),
        }
    }
}

impl OpCode {
    pub fn from_value(opcode: u8) -> Option<&'static OpCode> {
        OPERATIONS[opcode as usize].as_ref()
    }
}

impl Disassembler {
    pub fn for_opcode(opcode: u8) -> Option<&'static Disassembler> {
        DISASSEMBLERS[opcode as usize].as_ref()
    }
}

/// Text for an instruction word as the trace shows it, without running it.
pub fn disassemble(word: u32) -> String {
    let (opcode, field) = OperationField::split(word);
    if OpCode::from_value(opcode).is_none() {
        return "illegal instruction".to_string();
    }
    match Disassembler::for_opcode(opcode) {
        Some(disassembler) => disassembler.disassemble(&field),
        None => "not implemented".to_string(),
    }
}

/// The four bus access widths in bytes.
const WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// The complete instruction set. Each row: opcode, operation, disassembly.
/// The bus grid opcodes don't follow a formula, so they are listed as well.
fn instruction_set() -> Vec<(u8, OpCode, Disassembler)> {
    use OperandFormat as F;

    let mut set = vec![
        // HALT
        (0x01, OpCode::Halt(HaltOp(Operand::Register)), Disassembler::new("halt", F::R)),
        (0x09, OpCode::Halt(HaltOp(Operand::Immediate)), Disassembler::new("halt", F::U8)),
        // ADD SUB MUL DIV
        (0x30, OpCode::Add(AddOp(Operand::Register)), Disassembler::new("addq", F::RRR)),
        (0x31, OpCode::Sub(SubOp(Operand::Register)), Disassembler::new("subq", F::RRR)),
        (0x32, OpCode::Mul(MulOp(Operand::Register)), Disassembler::new("mulq", F::RRR)),
        (0x33, OpCode::Div(DivOp::Unsigned(Operand::Register)), Disassembler::new("divq", F::RRR)),
        (0x34, OpCode::Div(DivOp::Signed(Operand::Register)), Disassembler::new("idivq", F::RRR)),
        (0x38, OpCode::Add(AddOp(Operand::Immediate)), Disassembler::new("addq", F::URR)),
        (0x39, OpCode::Sub(SubOp(Operand::Immediate)), Disassembler::new("subq", F::URR)),
        (0x3A, OpCode::Mul(MulOp(Operand::Immediate)), Disassembler::new("mulq", F::SRR)),
        (0x3B, OpCode::Div(DivOp::Unsigned(Operand::Immediate)), Disassembler::new("divq", F::URR)),
        (0x3C, OpCode::Div(DivOp::Signed(Operand::Immediate)), Disassembler::new("idivq", F::SRR)),
        // JMP
        (0x40, OpCode::Jmp(JmpOp::Absolute), Disassembler::new("jmp", F::RR)),
        (0x41, OpCode::Jmp(JmpOp::Relative(Condition::Always)), Disassembler::new("jmp", F::S24)),
        (0x42, OpCode::Jmp(JmpOp::Relative(Condition::Zero)), Disassembler::new("jz", F::S24)),
        (0x43, OpCode::Jmp(JmpOp::Relative(Condition::NotZero)), Disassembler::new("jnz", F::S24)),
        // JMP - signed
        (0x44, OpCode::Jmp(JmpOp::Relative(Condition::Less)), Disassembler::new("jl", F::S24)),
        (0x45, OpCode::Jmp(JmpOp::Relative(Condition::GreaterEqual)), Disassembler::new("jge", F::S24)),
        (0x46, OpCode::Jmp(JmpOp::Relative(Condition::LessEqual)), Disassembler::new("jle", F::S24)),
        (0x47, OpCode::Jmp(JmpOp::Relative(Condition::Greater)), Disassembler::new("jg", F::S24)),
        // JMP - unsigned
        (0x48, OpCode::Jmp(JmpOp::Relative(Condition::Below)), Disassembler::new("jb", F::S24)),
        (0x49, OpCode::Jmp(JmpOp::Relative(Condition::AboveEqual)), Disassembler::new("jae", F::S24)),
        (0x4A, OpCode::Jmp(JmpOp::Relative(Condition::BelowEqual)), Disassembler::new("jbe", F::S24)),
        (0x4B, OpCode::Jmp(JmpOp::Relative(Condition::Above)), Disassembler::new("ja", F::S24)),
        // BITWISE
        (0x50, OpCode::Logic(LogicOp::Or), Disassembler::new("orq", F::RRR)),
        (0x51, OpCode::Logic(LogicOp::And), Disassembler::new("andq", F::RRR)),
        (0x5E, OpCode::Logic(LogicOp::Not), Disassembler::new("notq", F::RR)),
        // SHIFT and LOAD
        (0x52, OpCode::Shift(ShiftOp::Left(Operand::Register)), Disassembler::new("shlq", F::RRR)),
        (0x53, OpCode::Shift(ShiftOp::LogicalRight(Operand::Register)), Disassembler::new("shrq", F::RRR)),
        (0x54, OpCode::Shift(ShiftOp::ArithmeticRight(Operand::Register)), Disassembler::new("sarq", F::RRR)),
        (0x56, OpCode::Load(LoadOp::Unsigned), Disassembler::new("ldzwq", F::U16R)),
        (0x57, OpCode::Load(LoadOp::Signed), Disassembler::new("ldswq", F::S16R)),
        (0x5A, OpCode::Shift(ShiftOp::Left(Operand::Immediate)), Disassembler::new("shlq", F::URR)),
        (0x5B, OpCode::Shift(ShiftOp::LogicalRight(Operand::Immediate)), Disassembler::new("shrq", F::URR)),
        (0x5C, OpCode::Shift(ShiftOp::ArithmeticRight(Operand::Immediate)), Disassembler::new("sarq", F::URR)),
        (0x5D, OpCode::Load(LoadOp::ShiftLeft), Disassembler::new("shldwq", F::U16R)),
        // IO
        (0x60, OpCode::Getc(GetcOp), Disassembler::new("getc", F::R)),
        (0x61, OpCode::Putc(PutcOp(Operand::Register)), Disassembler::new("putc", F::R)),
        (0x69, OpCode::Putc(PutcOp(Operand::Immediate)), Disassembler::new("putc", F::U8)),
        // NOP
        (0xFF, OpCode::Nop, Disassembler::new("nop", F::None)),
    ];

    // Columns are byte, word, long, quad. Rows are displacement then scale 1, 2, 4, 8.
    const STORE: [[u8; 4]; 5] = [
        [0x2B, 0x2A, 0x29, 0x18],
        [0x23, 0x22, 0x21, 0x10],
        [0x93, 0x92, 0x91, 0x80],
        [0xB3, 0xB2, 0xB1, 0xA0],
        [0xD3, 0xD2, 0xD1, 0xC0],
    ];
    const FETCH_UNSIGNED: [[u8; 4]; 5] = [
        [0x1B, 0x1A, 0x19, 0x28],
        [0x13, 0x12, 0x11, 0x20],
        [0x83, 0x82, 0x81, 0x90],
        [0xA3, 0xA2, 0xA1, 0xB0],
        [0xC3, 0xC2, 0xC1, 0xD0],
    ];
    // a signed quad fetch would be the same as the unsigned one
    const FETCH_SIGNED: [[u8; 3]; 5] = [
        [0x1F, 0x1E, 0x1D],
        [0x17, 0x16, 0x15],
        [0x87, 0x86, 0x85],
        [0xA7, 0xA6, 0xA5],
        [0xC7, 0xC6, 0xC5],
    ];

    let addressing = |row: usize| match row {
        0 => Addressing::Displacement,
        row => Addressing::Scaled(1 << (row - 1)),
    };

    for row in 0..5 {
        let displaced = row == 0;
        for (column, &width) in WIDTHS.iter().enumerate() {
            set.push((
                STORE[row][column],
                OpCode::Store(StoreOp { width, addressing: addressing(row) }),
                Disassembler::new(
                    STORE_MNEMONICS[column],
                    if displaced { F::RMsr } else { F::RMrr },
                ),
            ));

            set.push((
                FETCH_UNSIGNED[row][column],
                OpCode::Fetch(FetchOp { width, addressing: addressing(row), signed: false }),
                Disassembler::new(
                    FETCH_UNSIGNED_MNEMONICS[column],
                    if displaced { F::MsrR } else { F::MrrR },
                ),
            ));

            if column < 3 {
                set.push((
                    FETCH_SIGNED[row][column],
                    OpCode::Fetch(FetchOp { width, addressing: addressing(row), signed: true }),
                    Disassembler::new(
                        FETCH_SIGNED_MNEMONICS[column],
                        if displaced { F::MsrR } else { F::MrrR },
                    ),
                ));
            }
        }
    }

    set
}

const STORE_MNEMONICS: [&str; 4] = ["movb", "movw", "movl", "movq"];
const FETCH_UNSIGNED_MNEMONICS: [&str; 4] = ["movzbq", "movzwq", "movzlq", "movq"];
const FETCH_SIGNED_MNEMONICS: [&str; 3] = ["movsbq", "movswq", "movslq"];

lazy_static! {
    static ref OPERATIONS: [Option<OpCode>; 256] = {
        let mut table = [None; 256];
        for (opcode, op, _) in instruction_set() {
            debug_assert!(table[opcode as usize].is_none(), "opcode 0x{opcode:02X} defined twice");
            table[opcode as usize] = Some(op);
        }
        table
    };
    static ref DISASSEMBLERS: [Option<Disassembler>; 256] = {
        let mut table = [None; 256];
        for (opcode, _, disassembler) in instruction_set() {
            table[opcode as usize] = Some(disassembler);
        }
        table
    };
}
