use crate::error::Error;

/// Tracks how far the host got into the sector of the last addressed block. One instance per
/// direction; the read and write paths never share a cursor.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cursor {
    #[default]
    Idle,
    Active { lba: u32, accumulated: usize },
}

/// Where a single transfer lands inside its sector.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    pub offset: usize,
    /// First transfer into the sector since the cursor was idle or pointed at another block.
    pub fresh: bool,
}

impl Cursor {
    /// Accounts for a transfer of `size` bytes to `lba` and returns the offset inside the sector
    /// to use for it. A transfer that would run past the end of the sector is rejected and leaves
    /// the cursor untouched.
    pub fn advance(&mut self, lba: u32, size: usize, block_size: usize) -> Result<Step, Error> {
        let (offset, fresh) = match *self {
            Cursor::Active {
                lba: active,
                accumulated,
            } if active == lba => (accumulated, false),
            _ => (0, true),
        };

        if offset + size > block_size {
            return Err(Error::TransferTooLarge);
        }

        let accumulated = offset + size;
        *self = if accumulated >= block_size {
            Cursor::Idle
        } else {
            Cursor::Active { lba, accumulated }
        };

        Ok(Step { offset, fresh })
    }

    pub fn reset(&mut self) {
        *self = Cursor::Idle;
    }
}
