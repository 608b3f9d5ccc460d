//! Block translation layer: maps the host's logical blocks onto erase sectors of the chip.
//!
//! The transport hands over blocks in bursts smaller than a sector. Each direction keeps a
//! [`Cursor`] so that consecutive bursts for the same block land one after the other inside the
//! sector, and so that a sector is erased once, right before the first burst of a new fill.

use crate::cursor::{Cursor, Step};
use crate::error::Error;
use crate::geometry::{DiskConfig, Geometry};
use crate::platform::{Platform, WriteStrategy};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

pub struct Disk<T: Platform> {
    pub(crate) flash: T,
    pub(crate) geometry: Geometry,
    pub(crate) read_cursor: Cursor,
    pub(crate) write_cursor: Cursor,
}

impl<T: Platform> Disk<T> {
    /// Brings the chip up and wraps it. See [`Geometry::bring_up`].
    pub fn new(mut flash: T, config: DiskConfig) -> Result<Disk<T>, Error> {
        let geometry = Geometry::bring_up(&mut flash, config)?;
        Ok(Self::with_geometry(flash, geometry))
    }

    /// Wraps a chip that was already brought up.
    pub fn with_geometry(flash: T, geometry: Geometry) -> Disk<T> {
        Self {
            flash,
            geometry,
            read_cursor: Cursor::Idle,
            write_cursor: Cursor::Idle,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn read_cursor(&self) -> Cursor {
        self.read_cursor
    }

    pub fn write_cursor(&self) -> Cursor {
        self.write_cursor
    }

    /// Direct access to the chip, e.g. to read the legacy settings while the host is idle.
    pub fn flash_mut(&mut self) -> &mut T {
        &mut self.flash
    }

    pub fn into_inner(self) -> T {
        self.flash
    }

    /// Reads `buf.len()` bytes of block `lba`. Consecutive reads of the same block continue where
    /// the previous one stopped. A read that would run past the end of the sector fails with
    /// [`Error::TransferTooLarge`] instead of spilling into the next block. On error the contents
    /// of `buf` are unspecified.
    pub fn read(&mut self, lba: u32, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let (addr, _) = self.locate(lba, buf.len(), Direction::Read)?;

        #[cfg(feature = "defmt")]
        trace!("read: lba {} @{:#08x}[{}]", lba, addr, buf.len());

        self.flash.read(addr, buf).map_err(|_| {
            #[cfg(feature = "defmt")]
            warn!("read: flash error @{:#08x}", addr);
            Error::FlashError
        })?;

        Ok(buf.len())
    }

    /// Writes `buf` into block `lba`. The first write of a fresh fill erases the sector when the
    /// chip uses page programming. A write that would run past the end of the sector fails with
    /// [`Error::TransferTooLarge`] before anything is erased or programmed. A failing primitive
    /// aborts the remaining chunks; neither the cursor nor the flash contents are rolled back.
    pub fn write(&mut self, lba: u32, buf: &[u8]) -> Result<usize, Error> {
        if let WriteStrategy::Unsupported(mode) = self.geometry.write_strategy {
            return Err(Error::UnsupportedWriteMode(mode));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let (addr, step) = self.locate(lba, buf.len(), Direction::Write)?;

        #[cfg(feature = "debug-logs")]
        println!(
            "disk: write lba {lba} @0x{addr:0>8x}[0x{:04x}] fresh: {}",
            buf.len(),
            step.fresh
        );

        match self.geometry.write_strategy {
            WriteStrategy::PageProgram => {
                if step.fresh {
                    self.erase_sector(addr)?;
                }
                self.program_pages(addr, buf)?;
            }
            WriteStrategy::AutoIncrement => {
                #[cfg(feature = "defmt")]
                trace!("erase_write: @{:#08x}[{}]", addr, buf.len());
                self.flash
                    .erase_write(addr, buf)
                    .map_err(|_| Error::FlashError)?;
            }
            WriteStrategy::Unsupported(mode) => return Err(Error::UnsupportedWriteMode(mode)),
        }

        Ok(buf.len())
    }

    /// The host finished a transfer session. The next read or write starts a fresh sector no
    /// matter which block it addresses. No flash access happens here.
    pub fn flush(&mut self) {
        #[cfg(feature = "defmt")]
        trace!("flush");

        self.read_cursor.reset();
        self.write_cursor.reset();
    }

    fn locate(&mut self, lba: u32, size: usize, direction: Direction) -> Result<(u32, Step), Error> {
        if lba >= self.geometry.block_count {
            return Err(Error::LbaOutOfRange);
        }
        let cursor = match direction {
            Direction::Read => &mut self.read_cursor,
            Direction::Write => &mut self.write_cursor,
        };
        let step = cursor.advance(lba, size, self.geometry.block_size)?;
        let addr = self.geometry.address(lba, step.offset)?;
        Ok((addr, step))
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), Error> {
        let end = addr + self.geometry.block_size as u32;

        #[cfg(feature = "defmt")]
        trace!("erase: {:#08x} - {:#08x}", addr, end);

        self.flash.erase(addr, end).map_err(|_| {
            #[cfg(feature = "defmt")]
            warn!("erase: flash error @{:#08x}", addr);
            Error::FlashError
        })
    }

    fn program_pages(&mut self, addr: u32, buf: &[u8]) -> Result<(), Error> {
        for (i, page) in buf.chunks(T::PAGE_SIZE).enumerate() {
            let target = addr + (i * T::PAGE_SIZE) as u32;

            #[cfg(feature = "defmt")]
            trace!("write: @{:#08x}[{}]", target, page.len());

            self.flash
                .write(target, page)
                .map_err(|_| Error::FlashError)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone)]
enum Direction {
    Read,
    Write,
}
