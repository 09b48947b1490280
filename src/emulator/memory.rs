use rustc_hash::FxHashMap as HashMap;

use super::error::{MachineError, Result};
use super::observer::MemoryObserver;

pub const PAGE_SIZE: usize = 1024;

/// One lazily allocated block of memory. Values are stored big-endian.
#[derive(Clone)]
pub struct MemoryPage {
    bytes: Box<[u8; PAGE_SIZE]>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPage").finish_non_exhaustive()
    }
}

impl MemoryPage {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; PAGE_SIZE]),
        }
    }

    /// Callers check the access with `locate` first; the range must lie
    /// inside the page.
    pub(crate) fn get(&self, offset: usize, width: usize) -> u64 {
        debug_assert!(offset + width <= PAGE_SIZE, "page access {offset}+{width} out of range");
        self.bytes[offset..offset + width]
            .iter()
            .fold(0, |value, &byte| (value << 8) | byte as u64)
    }

    /// Store the low `width` bytes of `value`, most significant byte first.
    pub(crate) fn set(&mut self, offset: usize, width: usize, value: u64) {
        debug_assert!(offset + width <= PAGE_SIZE, "page access {offset}+{width} out of range");
        let mut value = value;
        for byte in self.bytes[offset..offset + width].iter_mut().rev() {
            *byte = value as u8;
            value >>= 8;
        }
    }
}

/// Check an access against the page geometry and split the address into
/// (page number, offset). An access never spans two pages.
fn locate(address: u64, width: usize) -> Result<(u64, usize)> {
    if width == 0 || width > 8 {
        return Err(MachineError::InvalidWidth { width });
    }

    let page = address / PAGE_SIZE as u64;
    let offset = (address % PAGE_SIZE as u64) as usize;

    if offset % width != 0 {
        return Err(MachineError::MemoryMisaligned { address, width });
    }
    if offset + width > PAGE_SIZE {
        return Err(MachineError::MemoryOutOfBounds { address, width });
    }
    Ok((page, offset))
}

/// Sparse 64 bit address space. Pages are created on the first write that
/// touches them; unmapped pages read as zero.
#[derive(Default)]
pub struct VirtualMemory {
    pages: HashMap<u64, MemoryPage>,
    observers: Vec<Box<dyn MemoryObserver>>,
}

impl std::fmt::Debug for VirtualMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMemory")
            .field("pages", &self.pages.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl VirtualMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.pages.clear();
        for observer in &mut self.observers {
            observer.reset();
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn MemoryObserver>) {
        self.observers.push(observer);
    }

    /// Number of pages that have been materialized by writes.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn read(&mut self, address: u64, width: usize) -> Result<u64> {
        let value = self.peek(address, width)?;
        for observer in &mut self.observers {
            observer.on_read(address, width, value);
        }
        Ok(value)
    }

    /// Same as [`VirtualMemory::read`] but invisible to observers.
    pub fn peek(&self, address: u64, width: usize) -> Result<u64> {
        let (page, offset) = locate(address, width)?;
        Ok(self
            .pages
            .get(&page)
            .map_or(0, |page| page.get(offset, width)))
    }

    pub fn write(&mut self, address: u64, width: usize, value: u64) -> Result<()> {
        let (page, offset) = locate(address, width)?;
        self.pages
            .entry(page)
            .or_insert_with(|| {
                tracing::trace!(page, "allocating page");
                MemoryPage::new()
            })
            .set(offset, width, value);

        for observer in &mut self.observers {
            observer.on_write(address, width, value);
        }
        Ok(())
    }

    /// Place a program image at address 0, one word every 4 bytes.
    pub fn load_program(&mut self, program: &[u32]) {
        let span = tracing::info_span!("load_program", program_size = program.len());
        let _guard = span.enter();

        for (i, &word) in program.iter().enumerate() {
            let address = 4 * i as u64;
            let page = address / PAGE_SIZE as u64;
            let offset = (address % PAGE_SIZE as u64) as usize;
            self.pages
                .entry(page)
                .or_default()
                .set(offset, 4, word as u64);
        }

        for observer in &mut self.observers {
            observer.on_load_program(program);
        }
        tracing::debug!(pages = self.pages.len(), "program loaded");
    }
}
