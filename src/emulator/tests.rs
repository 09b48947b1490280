use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use tracing_test::traced_test;

const HELLO_WORLD: [u32; 12] = [
    0x56002001, // ldzwq   32, %1
    0x1B000102, // movzbq  M(0 + %1) -> %2
    0x31000200, // subq    %0, %2, %0
    0x42000004, // jz      4
    0x61020000, // putc    %2
    0x38010101, // addq    1, %1, %1
    0x41FFFFFB, // jmp     -5
    0x09000000, // halt    0
    0x68656C6C, // "hell"
    0x6F2C2077, // "o, w"
    0x6F726C64, // "orld"
    0x210A0000, // "!\n\0\0"
];

fn machine_with(program: &[u32]) -> (Machine, BufferedIo) {
    let io = BufferedIo::new();
    let mut machine = Machine::new(Box::new(io.clone()));
    machine.load_program(program);
    (machine, io)
}

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    tag: &'static str,
    log: Log,
}

impl Recorder {
    fn boxed(tag: &'static str, log: &Log) -> Box<Self> {
        Box::new(Self {
            tag,
            log: log.clone(),
        })
    }

    fn push(&self, event: String) {
        self.log.borrow_mut().push(format!("{}:{}", self.tag, event));
    }
}

impl RegisterObserver for Recorder {
    fn on_read(&mut self, register: usize, value: i64) {
        self.push(format!("r{register}={value}"));
    }

    fn on_write(&mut self, register: usize, value: i64) {
        self.push(format!("w{register}={value}"));
    }

    fn reset(&mut self) {
        self.push("reset".to_string());
    }
}

impl MemoryObserver for Recorder {
    fn on_read(&mut self, address: u64, width: usize, _value: u64) {
        self.push(format!("read {address}/{width}"));
    }

    fn on_write(&mut self, address: u64, width: usize, _value: u64) {
        self.push(format!("write {address}/{width}"));
    }

    fn on_load_program(&mut self, program: &[u32]) {
        self.push(format!("load {}", program.len()));
    }
}

impl MachineObserver for Recorder {
    fn next_instruction(&mut self, field: u32, disassembly: &str) {
        self.push(format!("next {field:06X} {disassembly}"));
    }

    fn on_halt(&mut self, exit_code: u8, error: Option<&str>) {
        self.push(format!("halt {exit_code} {error:?}"));
    }

    fn on_block(&mut self) {
        self.push("block".to_string());
    }

    fn reset(&mut self) {
        self.push("reset".to_string());
    }
}

#[traced_test]
#[test]
fn test_hello_world() {
    tracing::info_span!("test_hello_world").in_scope(|| {
        let (mut machine, io) = machine_with(&HELLO_WORLD);

        assert_eq!(machine.run(), Ok(0));
        assert_eq!(io.output_string(), "hello, world!\n");
        assert!(machine.halted);
        assert!(machine.error_message.is_none());
        // one load, six instructions per character, and the final fetch, test and jump
        assert_eq!(machine.steps(), 1 + 6 * 14 + 3);
        assert_eq!(machine.status(), MachineStatus::Halted);
    });
}

#[traced_test]
#[test]
fn test_step_after_halt_does_nothing() {
    let (mut machine, _io) = machine_with(&[0x09050000, 0xFF000000]);
    assert_eq!(machine.step(), MachineStatus::Halted);
    let ip = machine.core.ip;
    assert_eq!(machine.step(), MachineStatus::Halted);
    assert_eq!(machine.core.ip, ip);
    assert_eq!(machine.exit_code, 5);
}

#[traced_test]
#[test]
fn test_reset_then_rerun_is_identical() {
    let (mut machine, io) = machine_with(&HELLO_WORLD);
    assert_eq!(machine.run(), Ok(0));
    let first = io.take_output();
    let first_steps = machine.steps();

    machine.reset();
    assert_eq!(machine.core.ip, 0);
    assert_eq!(machine.core.memory.page_count(), 0);
    assert_eq!(machine.core.alu.flags, Flags::default());
    assert!((0..alu::NUM_REGISTERS).all(|r| machine.core.alu.get(r) == 0));
    assert_eq!(machine.status(), MachineStatus::Running);

    machine.load_program(&HELLO_WORLD);
    assert_eq!(machine.run(), Ok(0));
    assert_eq!(io.output(), first);
    assert_eq!(machine.steps(), first_steps);
}

#[traced_test]
#[test]
fn test_getc_blocks_until_input_arrives() {
    let program = [
        0x60010000, // getc    %1
        0x61010000, // putc    %1
        0x01010000, // halt    %1
    ];
    let (mut machine, io) = machine_with(&program);

    assert_eq!(machine.step(), MachineStatus::Blocked);
    assert_eq!(machine.core.ip, 0);
    assert_eq!(machine.step(), MachineStatus::Blocked);
    assert_eq!(machine.core.ip, 0);
    assert_eq!(machine.run_for(None), Ok(RunOutcome::Blocked));

    io.push_input(b"A");
    assert_eq!(machine.step(), MachineStatus::Running);
    assert!(!machine.blocked);
    assert_eq!(machine.core.ip, 4);
    assert_eq!(machine.run(), Ok(b'A'));
    assert_eq!(io.output_string(), "A");
}

#[traced_test]
#[test]
fn test_illegal_instruction_keeps_exit_code() {
    let (mut machine, _io) = machine_with(&[0xFF000000, 0x02000000]);
    machine.exit_code = 7;

    assert_eq!(machine.run(), Err(MachineError::IllegalInstruction { opcode: 0x02 }));
    assert!(machine.halted);
    assert_eq!(machine.exit_code, 7);
    assert_eq!(machine.error_message.as_deref(), Some("illegal instruction: 0x02"));
    assert_eq!(machine.core.ip, 4);
    assert!(logs_contain("halting: illegal instruction"));
}

#[traced_test]
#[test]
fn test_division_by_zero_halts() {
    let program = [
        0x56000501, // ldzwq   5, %1
        0x33020103, // divq    %2, %1, %3
        0x09000001, // halt    1
    ];
    let (mut machine, _io) = machine_with(&program);

    assert_eq!(machine.run(), Err(MachineError::DivisionByZero));
    assert_eq!(machine.fault(), Some(&MachineError::DivisionByZero));
    assert_eq!(machine.core.ip, 4);
    assert_eq!(machine.exit_code, 0);
}

#[traced_test]
#[test]
fn test_divide_into_last_registers_is_a_fault() {
    let program = [
        0x56000701, // ldzwq   7, %1
        0x56000203, // ldzwq   2, %3
        0x330301FE, // divq    %3, %1, %0xFE
    ];
    let (mut machine, _io) = machine_with(&program);
    assert_eq!(
        machine.run(),
        Err(MachineError::RegisterOutOfRange { index: 256 })
    );
    assert_eq!(machine.core.alu.get(0xFE), 0);
    assert_eq!(machine.core.alu.get(0xFF), 0);
}

#[traced_test]
#[test]
fn test_misaligned_fetch_halts() {
    let program = [
        0x56000301, // ldzwq   3, %1
        0x28000102, // movq    M(0 + %1) -> %2
        0x09000000, // halt    0
    ];
    let (mut machine, _io) = machine_with(&program);

    assert_eq!(
        machine.run(),
        Err(MachineError::MemoryMisaligned { address: 3, width: 8 })
    );
    assert!(machine
        .error_message
        .as_deref()
        .is_some_and(|message| message.starts_with("misaligned 8 byte access")));
}

#[traced_test]
#[test]
fn test_store_and_fetch_through_memory() {
    let program = [
        0x57FFFE01, // ldswq   -2, %1
        0x56004002, // ldzwq   64, %2
        0x2A010002, // movw    %1 -> M(0 + %2)
        0x1E000203, // movswq  M(0 + %2) -> %3
        0x1A000204, // movzwq  M(0 + %2) -> %4
        0x56000105, // ldzwq   1, %5
        0x93010502, // movb    %1 -> M(%5 + %2 << 16)
        0x09000000, // halt    0
    ];
    let (mut machine, _io) = machine_with(&program);

    assert_eq!(machine.run(), Ok(0));
    assert_eq!(machine.core.alu.get(3), -2);
    assert_eq!(machine.core.alu.get(4), 0xFFFE);
    assert_eq!(machine.core.memory.peek(64, 2), Ok(0xFFFE));
    assert_eq!(machine.core.memory.peek(1 + (64 << 16), 1), Ok(0xFE));
}

#[traced_test]
#[test]
fn test_multiply_and_halt_with_register() {
    let program = [
        0x57FFFF01, // ldswq   -1, %1
        0x56000202, // ldzwq   2, %2
        0x32010203, // mulq    %1, %2, %3
        0x01030000, // halt    %3
    ];
    let (mut machine, _io) = machine_with(&program);
    assert_eq!(machine.run(), Ok(0xFE));
    assert_eq!(machine.core.alu.get(3), -2);
}

#[traced_test]
#[test]
fn test_jump_and_link() {
    let program = [
        0x56000C01, // ldzwq   12, %1
        0x40010200, // jmp     %1, %2
        0x09000001, // halt    1
        0x01020000, // halt    %2
    ];
    let (mut machine, _io) = machine_with(&program);
    assert_eq!(machine.run(), Ok(8));
}

#[traced_test]
#[test]
fn test_preview_is_not_a_memory_read() {
    let log = Log::default();
    let program = [
        0xFF000000, // nop
        0xFF000000, // nop
        0x09030000, // halt    3
    ];
    let io = BufferedIo::new();
    let mut machine = Machine::new(Box::new(io));
    machine.add_memory_observer(Recorder::boxed("mem", &log));
    machine.add_machine_observer(Recorder::boxed("vm", &log));
    machine.load_program(&program);

    assert_eq!(machine.run(), Ok(3));
    assert_eq!(
        *log.borrow(),
        vec![
            "mem:load 3",
            "mem:read 0/4",
            "vm:next 000000 nop",
            "mem:read 4/4",
            "vm:next 030000 halt\t3",
            "mem:read 8/4",
            "vm:halt 3 None",
        ]
    );
}

#[traced_test]
#[test]
fn test_observers_run_in_registration_order() {
    let log = Log::default();
    let (mut machine, _io) = machine_with(&[0x56002A01, 0x09000000]);
    machine.add_register_observer(Recorder::boxed("a", &log));
    machine.add_register_observer(Recorder::boxed("b", &log));

    assert_eq!(machine.run(), Ok(0));
    assert_eq!(*log.borrow(), vec!["a:w1=42", "b:w1=42"]);

    log.borrow_mut().clear();
    machine.reset();
    assert_eq!(*log.borrow(), vec!["a:reset", "b:reset"]);
}

#[traced_test]
#[test]
fn test_block_and_fault_reach_machine_observers() {
    let log = Log::default();
    let (mut machine, io) = machine_with(&[0x60010000, 0x00000000]);
    machine.add_machine_observer(Recorder::boxed("vm", &log));

    assert_eq!(machine.step(), MachineStatus::Blocked);
    io.push_input(b"x");
    assert_eq!(machine.step(), MachineStatus::Running);
    assert_eq!(machine.step(), MachineStatus::Halted);

    assert_eq!(
        *log.borrow(),
        vec![
            "vm:block",
            "vm:next 000000 illegal instruction",
            "vm:halt 0 Some(\"illegal instruction: 0x00\")",
        ]
    );
}

#[traced_test]
#[test]
fn test_run_for_stops_at_step_limit() {
    let (mut machine, io) = machine_with(&HELLO_WORLD);

    assert_eq!(machine.run_for(Some(10)), Ok(RunOutcome::StepLimit));
    assert_eq!(machine.steps(), 10);
    assert!(!machine.halted);
    // the first character goes out on the fifth step, the second on the eleventh
    assert_eq!(io.output_string(), "h");

    assert_eq!(machine.run_for(None), Ok(RunOutcome::Halted(0)));
    assert_eq!(io.output_string(), "hello, world!\n");
    assert!(logs_contain("Reached maximum steps"));
}

#[traced_test]
#[test]
fn test_infinite_loop_is_bounded_by_run_for() {
    // jmp 0
    let (mut machine, _io) = machine_with(&[0x41000000]);
    assert_eq!(machine.run_for(Some(1000)), Ok(RunOutcome::StepLimit));
    assert_eq!(machine.core.ip, 0);
}

#[traced_test]
#[test]
fn test_text_image_runs() {
    let source = "\
# prints 'ok' and exits with 2
696F0000  ; putc 'o'
696B0000  ; putc 'k'
09020000  ; halt 2
";
    let program = image::parse_text(source).unwrap();
    let (mut machine, io) = machine_with(&program);
    assert_eq!(machine.run(), Ok(2));
    assert_eq!(io.output_string(), "ok");
}

#[traced_test]
#[test]
fn test_shift_and_logic_programs() {
    let program = [
        0x57FFF001, // ldswq   -16, %1
        0x56000402, // ldzwq   4, %2
        0x52020103, // shlq    %2, %1, %3
        0x53020104, // shrq    %2, %1, %4
        0x54020105, // sarq    %2, %1, %5
        0x5A080206, // shlq    8, %2, %6
        0x5B3C0107, // shrq    60, %1, %7
        0x5C020108, // sarq    2, %1, %8
        0x560F0F09, // ldzwq   0x0F0F, %9
        0x5600FF0A, // ldzwq   0x00FF, %10
        0x50090A0B, // orq     %9, %10, %11
        0x51090A0C, // andq    %9, %10, %12
        0x5E090D00, // notq    %9, %13
        0x09000000, // halt    0
    ];
    let (mut machine, _io) = machine_with(&program);
    assert_eq!(machine.run(), Ok(0));

    let alu = &machine.core.alu;
    assert_eq!(alu.get(3), -256);
    assert_eq!(alu.get(4), 0x0FFF_FFFF_FFFF_FFFF);
    assert_eq!(alu.get(5), -1);
    assert_eq!(alu.get(6), 1024);
    assert_eq!(alu.get(7), 0xF);
    assert_eq!(alu.get(8), -4);
    assert_eq!(alu.get(11), 0x0FFF);
    assert_eq!(alu.get(12), 0x000F);
    assert_eq!(alu.get(13), !0x0F0F);
}

#[traced_test]
#[test]
fn test_immediate_arithmetic_programs() {
    let program = [
        0x56006401, // ldzwq   100, %1
        0x39070102, // subq    7, %1, %2
        0x3AFD0103, // mulq    -3, %1, %3
        0x3CF90104, // idivq   -7, %1, %4
        0x5603E80A, // ldzwq   1000, %10
        0x3BF90A0C, // divq    249, %10, %12
        0x34010A0F, // idivq   %1, %10, %15
        0x09000000, // halt    0
    ];
    let (mut machine, _io) = machine_with(&program);
    assert_eq!(machine.run(), Ok(0));

    let alu = &machine.core.alu;
    assert_eq!(alu.get(2), 93);
    // the multiply and signed divide immediates are signed bytes
    assert_eq!(alu.get(3), -300);
    assert_eq!(alu.get(4), -14);
    assert_eq!(alu.get(5), 2);
    // the unsigned divide immediate is not
    assert_eq!(alu.get(12), 4);
    assert_eq!(alu.get(13), 0);
    assert_eq!(alu.get(14), 4);
    assert_eq!(alu.get(15), 10);
    assert_eq!(alu.get(16), 0);
}

/// Compare `y` against `x` with `subq`, then branch over a `halt 1` to a
/// `halt 2` with the given conditional jump.
fn branch_exit_code(opcode: u8, y: i16, x: i16) -> u8 {
    let program = [
        0x57000001 | (x as u16 as u32) << 8, // ldswq   x, %1
        0x57000002 | (y as u16 as u32) << 8, // ldswq   y, %2
        0x31010200,                          // subq    %1, %2, %0
        (opcode as u32) << 24 | 2,           // jcc     2
        0x09010000,                          // halt    1
        0x09020000,                          // halt    2
    ];
    let (mut machine, _io) = machine_with(&program);
    match machine.run() {
        Ok(code) => code,
        Err(err) => panic!("0x{opcode:02X} faulted: {err}"),
    }
}

#[traced_test]
#[test]
fn test_conditional_jumps_taken_and_not_taken() {
    // (opcode, y, x) pairs that take the branch, then pairs that fall through
    let taken = [
        (0x42, 7, 7),
        (0x43, 7, 3),
        (0x44, -1, 1),
        (0x45, 5, 3),
        (0x46, 3, 3),
        (0x47, 5, 3),
        (0x48, 1, 2),
        (0x49, -1, 1),
        (0x4A, 2, 2),
        (0x4B, 5, 3),
    ];
    let not_taken = [
        (0x42, 7, 3),
        (0x43, 7, 7),
        (0x44, 5, 3),
        (0x45, -1, 1),
        (0x46, 5, 3),
        (0x47, 3, 3),
        (0x48, -1, 1),
        (0x49, 1, 2),
        (0x4A, -1, 1),
        (0x4B, 1, 2),
    ];

    for (opcode, y, x) in taken {
        assert_eq!(branch_exit_code(opcode, y, x), 2, "0x{opcode:02X} with {y} vs {x}");
    }
    for (opcode, y, x) in not_taken {
        assert_eq!(branch_exit_code(opcode, y, x), 1, "0x{opcode:02X} with {y} vs {x}");
    }
}
