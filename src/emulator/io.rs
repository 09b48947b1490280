use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Single character I/O used by `getc` and `putc`. The machine never buffers
/// anything itself; `getc` is only called after `has_next_char` said yes.
pub trait IoDevice {
    fn putc(&mut self, c: u8);
    fn getc(&mut self) -> u8;
    fn has_next_char(&mut self) -> bool;
    fn reset(&mut self) {}
}

#[derive(Debug, Default)]
struct Buffers {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

/// In-memory device: an input queue that the host fills and an output buffer
/// it drains. Clones share the same buffers, so the host can keep a handle
/// while the machine owns another.
#[derive(Debug, Clone, Default)]
pub struct BufferedIo {
    buffers: Rc<RefCell<Buffers>>,
}

impl BufferedIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&self, input: &[u8]) {
        self.buffers.borrow_mut().input.extend(input);
    }

    pub fn output(&self) -> Vec<u8> {
        self.buffers.borrow().output.clone()
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.buffers.borrow().output).into_owned()
    }

    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.buffers.borrow_mut().output)
    }
}

impl IoDevice for BufferedIo {
    fn putc(&mut self, c: u8) {
        self.buffers.borrow_mut().output.push(c);
    }

    fn getc(&mut self) -> u8 {
        // only called after has_next_char returned true
        self.buffers.borrow_mut().input.pop_front().unwrap_or(0)
    }

    fn has_next_char(&mut self) -> bool {
        !self.buffers.borrow().input.is_empty()
    }

    fn reset(&mut self) {
        let mut buffers = self.buffers.borrow_mut();
        buffers.input.clear();
        buffers.output.clear();
    }
}
