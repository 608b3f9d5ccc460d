#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use nor_msc::{ChipControl, Filesystem, WriteMode};
use std::collections::BTreeMap;

pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const FLASH_PAGE_SIZE: usize = 256;
pub const WORD_SIZE: usize = 4;

pub struct Flash {
    pub buf: Vec<u8>,
    pub mode: WriteMode,
    pub fail_after_operation: usize,
    pub fail_initialize: bool,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Initialize,
    Reset,
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
    EraseWrite { offset: u32, len: usize },
}

impl Flash {
    pub fn new(sectors: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * sectors],
            mode: WriteMode(WriteMode::PAGE_256B),
            fail_after_operation: usize::MAX,
            fail_initialize: false,
            operations: Vec::new(),
        }
    }

    pub fn with_mode(sectors: usize, mode: u8) -> Self {
        Self {
            mode: WriteMode(mode),
            ..Self::new(sectors)
        }
    }

    pub fn new_with_fault(sectors: usize, fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Self::new(sectors)
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    /// Fail every operation issued from now on.
    pub fn fail_from_now(&mut self) {
        self.fail_after_operation = self.operations.len();
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
        self.disable_faults();
    }

    pub fn erases(&self) -> Vec<Operation> {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .cloned()
            .collect()
    }

    pub fn writes(&self) -> Vec<Operation> {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. } | Operation::EraseWrite { .. }))
            .cloned()
            .collect()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn record(&mut self, op: Operation) -> Result<(), FlashError> {
        println!("    flash: {op:?} #{:>2}", self.operations.len());
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        self.operations.push(op);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        self.record(Operation::Read {
            offset,
            len: bytes.len(),
        })?;

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        self.record(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        })?;

        self.buf[from as usize..to as usize].fill(0xff);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));
        assert!(!bytes.is_empty());
        // a program call never crosses a page
        assert!(bytes.len() <= FLASH_PAGE_SIZE);
        assert!(self.mode.contains(WriteMode::PAGE_256B));

        self.record(Operation::Write {
            offset,
            len: bytes.len(),
        })?;

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

impl ChipControl for Flash {
    const PAGE_SIZE: usize = FLASH_PAGE_SIZE;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        if self.fail_initialize {
            return Err(FlashError);
        }
        self.record(Operation::Initialize)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.record(Operation::Reset)
    }

    fn write_mode(&self) -> WriteMode {
        self.mode
    }

    fn erase_write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(self.mode.contains(WriteMode::AAI));

        self.record(Operation::EraseWrite {
            offset,
            len: bytes.len(),
        })?;

        let offset = offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// In-memory stand-in for the FAT volume.
#[derive(Default)]
pub struct MemFilesystem {
    pub files: BTreeMap<String, Vec<u8>>,
    pub read_only: bool,
    pub remounts: usize,
}

#[derive(Debug, PartialEq)]
pub enum FsError {
    NotFound,
    ReadOnly,
}

impl Filesystem for MemFilesystem {
    type Error = FsError;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, Self::Error> {
        self.files.get(path).cloned().ok_or(FsError::NotFound)
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), Self::Error> {
        if self.read_only {
            return Err(FsError::ReadOnly);
        }
        self.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    fn remount(&mut self) -> Result<(), Self::Error> {
        self.remounts += 1;
        Ok(())
    }
}

/// Test pattern that differs per block and per byte.
pub fn pattern(lba: u32, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u32 ^ lba.wrapping_mul(31)) as u8).collect()
}
