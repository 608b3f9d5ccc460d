//! Chip bring-up and the logical disk geometry derived from it.

use crate::error::Error;
use crate::platform::{Platform, WriteStrategy};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Start of the disk on the chip. Everything below is reserved for another partition (factory
/// data, legacy settings) and is never touched by the block device.
pub const DEFAULT_PARTITION_OFFSET: u32 = 512 * 0x01f8;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiskConfig {
    pub partition_offset: u32,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            partition_offset: DEFAULT_PARTITION_OFFSET,
        }
    }
}

/// Fixed after bring-up. The logical block size equals the erase sector size of the chip.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub capacity: usize,
    pub partition_offset: u32,
    pub block_size: usize,
    /// `(capacity - partition_offset) / block_size`. The reserved region is not part of the disk,
    /// so an 8 MiB chip with 4 KiB sectors has 2048 blocks at offset 0 but 1985 behind the
    /// default [`DEFAULT_PARTITION_OFFSET`].
    pub block_count: u32,
    /// Bytes at the end of the chip that do not fill a whole block. They are not exposed.
    pub unaddressable_bytes: usize,
    pub write_strategy: WriteStrategy,
}

impl Geometry {
    /// Initializes and resets the chip, then derives the disk layout from its capacity and erase
    /// size. Fails if the chip does not come up, in which case no disk must be registered.
    pub fn bring_up<T: Platform>(flash: &mut T, config: DiskConfig) -> Result<Self, Error> {
        #[cfg(feature = "defmt")]
        trace!("bring_up: partition @{:#08x}", config.partition_offset);

        flash.initialize().map_err(|_| {
            #[cfg(feature = "defmt")]
            warn!("bring_up: chip initialization failed");
            Error::FlashError
        })?;
        flash.reset().map_err(|_| {
            #[cfg(feature = "defmt")]
            warn!("bring_up: chip reset failed");
            Error::FlashError
        })?;

        let geometry = Self::new(
            flash.capacity(),
            T::ERASE_SIZE,
            config.partition_offset,
            flash.write_mode().into(),
        )?;

        #[cfg(feature = "debug-logs")]
        println!(
            "geometry: {} blocks of {} bytes @0x{:0>8x}, {} bytes unaddressable, {}",
            geometry.block_count,
            geometry.block_size,
            geometry.partition_offset,
            geometry.unaddressable_bytes,
            geometry.write_strategy
        );

        Ok(geometry)
    }

    pub fn new(
        capacity: usize,
        block_size: usize,
        partition_offset: u32,
        write_strategy: WriteStrategy,
    ) -> Result<Self, Error> {
        if block_size == 0 || capacity < block_size {
            return Err(Error::InvalidGeometry);
        }

        let offset = partition_offset as usize;
        if !offset.is_multiple_of(block_size) || offset >= capacity {
            return Err(Error::InvalidPartitionOffset);
        }

        let usable = capacity - offset;
        let block_count = usable / block_size;
        if block_count > u32::MAX as usize {
            return Err(Error::InvalidGeometry);
        }

        Ok(Self {
            capacity,
            partition_offset,
            block_size,
            block_count: block_count as u32,
            unaddressable_bytes: usable % block_size,
            write_strategy,
        })
    }

    /// Physical address of `offset` bytes into block `lba`.
    pub fn address(&self, lba: u32, offset: usize) -> Result<u32, Error> {
        if lba >= self.block_count {
            return Err(Error::LbaOutOfRange);
        }
        let addr = self.block_size * lba as usize + self.partition_offset as usize + offset;
        u32::try_from(addr).map_err(|_| Error::LbaOutOfRange)
    }

    /// Size of the disk as seen by the host.
    pub fn disk_size(&self) -> usize {
        self.block_size * self.block_count as usize
    }
}
