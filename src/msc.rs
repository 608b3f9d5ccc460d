//! The surface the USB mass storage transport talks to: identification strings, capacity and the
//! three block callbacks with their integer return convention.

use crate::disk::Disk;
use crate::error::Error;
use crate::geometry::{DiskConfig, Geometry};
use crate::platform::Platform;

const VENDOR_ID_LEN: usize = 8;
const PRODUCT_ID_LEN: usize = 16;
const REVISION_LEN: usize = 4;

/// SCSI INQUIRY identification. Longer strings are cut to the field widths of the INQUIRY
/// response (8, 16 and 4 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inquiry {
    pub vendor_id: &'static str,
    pub product_id: &'static str,
    pub revision: &'static str,
}

impl Default for Inquiry {
    fn default() -> Self {
        Self {
            vendor_id: "Seeed",
            product_id: "MSC",
            revision: "0.1",
        }
    }
}

impl Inquiry {
    pub fn vendor_id(&self) -> &str {
        truncate(self.vendor_id, VENDOR_ID_LEN)
    }

    pub fn product_id(&self) -> &str {
        truncate(self.product_id, PRODUCT_ID_LEN)
    }

    pub fn revision(&self) -> &str {
        truncate(self.revision, REVISION_LEN)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// A disk registered with the transport. Only exists once the chip came up.
pub struct MscDevice<T: Platform> {
    disk: Disk<T>,
    inquiry: Inquiry,
    ready: bool,
}

impl<T: Platform> MscDevice<T> {
    /// Brings up the chip and registers the disk as ready. Bring-up failures are returned and no
    /// device exists.
    pub fn begin(flash: T, config: DiskConfig, inquiry: Inquiry) -> Result<MscDevice<T>, Error> {
        let disk = Disk::new(flash, config)?;
        Ok(Self {
            disk,
            inquiry,
            ready: true,
        })
    }

    pub fn inquiry(&self) -> &Inquiry {
        &self.inquiry
    }

    pub fn geometry(&self) -> &Geometry {
        self.disk.geometry()
    }

    /// Block count and block size as reported in READ CAPACITY.
    pub fn capacity(&self) -> (u32, u32) {
        let geometry = self.disk.geometry();
        (geometry.block_count, geometry.block_size as u32)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Marks the medium as (not) present, e.g. while the settings are being written.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn disk(&mut self) -> &mut Disk<T> {
        &mut self.disk
    }

    pub fn into_disk(self) -> Disk<T> {
        self.disk
    }

    /// Returns the number of bytes read or -1.
    pub fn read_cb(&mut self, lba: u32, buf: &mut [u8]) -> i32 {
        to_status(self.disk.read(lba, buf))
    }

    /// Returns the number of bytes written or -1.
    pub fn write_cb(&mut self, lba: u32, buf: &[u8]) -> i32 {
        to_status(self.disk.write(lba, buf))
    }

    pub fn flush_cb(&mut self) {
        self.disk.flush();
    }
}

fn to_status(result: Result<usize, Error>) -> i32 {
    match result {
        Ok(len) => i32::try_from(len).unwrap_or(-1),
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("msc: {}", _e);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inquiry_fields_are_cut_to_width() {
        let inquiry = Inquiry {
            vendor_id: "VeryLongVendor",
            product_id: "MSC",
            revision: "1.2.3.4",
        };
        assert_eq!(inquiry.vendor_id(), "VeryLong");
        assert_eq!(inquiry.product_id(), "MSC");
        assert_eq!(inquiry.revision(), "1.2.");
    }

    #[test]
    fn status_codes() {
        assert_eq!(to_status(Ok(512)), 512);
        assert_eq!(to_status(Err(Error::FlashError)), -1);
    }
}
