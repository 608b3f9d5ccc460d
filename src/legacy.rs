//! Read-only support for the settings blob written by earlier firmware at the start of the chip.
//!
//! Layout: `"AZ01"`, payload length as little endian `u32`, then five MessagePack strings in the
//! order ssid, password, id scope, registration id, symmetric key. Nothing in this crate writes
//! this format anymore.

use crate::error::Error;
use crate::platform::Platform;
use crate::settings::Settings;
use alloc::string::String;
use alloc::vec;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

pub const LEGACY_MAGIC: &[u8; 4] = b"AZ01";
pub const LEGACY_OFFSET: u32 = 0;
pub(crate) const HEADER_SIZE: usize = 8;
/// The blob was always written into a single sector.
pub(crate) const MAX_PAYLOAD_SIZE: usize = 4096 - HEADER_SIZE;

const FIXSTR_MASK: u8 = 0xe0;
const FIXSTR: u8 = 0xa0;
const NIL: u8 = 0xc0;
const STR8: u8 = 0xd9;
const STR16: u8 = 0xda;
const STR32: u8 = 0xdb;

/// Returns the payload length announced by `header`, or [`Error::InvalidMagic`].
pub(crate) fn parse_header(header: &[u8; HEADER_SIZE]) -> Result<usize, Error> {
    if &header[..4] != LEGACY_MAGIC {
        return Err(Error::InvalidMagic);
    }
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(Error::CorruptedData);
    }
    Ok(len)
}

/// Decodes a complete blob. A buffer without the tag holds no settings.
pub fn decode(blob: &[u8]) -> Result<Settings, Error> {
    let Some(header) = blob.first_chunk::<HEADER_SIZE>() else {
        return Ok(Settings::default());
    };
    let len = match parse_header(header) {
        Ok(len) => len,
        Err(Error::InvalidMagic) => return Ok(Settings::default()),
        Err(e) => return Err(e),
    };
    let payload = blob
        .get(HEADER_SIZE..HEADER_SIZE + len)
        .ok_or(Error::CorruptedData)?;
    decode_payload(payload)
}

/// Decodes the five strings following the header.
pub fn decode_payload(payload: &[u8]) -> Result<Settings, Error> {
    let mut reader = Reader { buf: payload };
    Ok(Settings {
        wifi_ssid: reader.string()?,
        wifi_password: reader.string()?,
        id_scope: reader.string()?,
        registration_id: reader.string()?,
        symmetric_key: reader.string()?,
    })
}

/// Reads the blob at `offset` on the chip. Any failure yields empty settings.
pub fn load<T: Platform>(flash: &mut T, offset: u32) -> Settings {
    match read(flash, offset) {
        Ok(settings) => settings,
        Err(_e) => {
            #[cfg(feature = "defmt")]
            warn!("legacy: {}, using defaults", _e);
            Settings::default()
        }
    }
}

fn read<T: Platform>(flash: &mut T, offset: u32) -> Result<Settings, Error> {
    #[cfg(feature = "defmt")]
    trace!("legacy: read @{:#08x}", offset);

    let mut header = [0u8; HEADER_SIZE];
    flash
        .read(offset, &mut header)
        .map_err(|_| Error::FlashError)?;

    let len = match parse_header(&header) {
        Ok(len) => len,
        Err(Error::InvalidMagic) => return Ok(Settings::default()),
        Err(e) => return Err(e),
    };

    // reads have to be a multiple of the read granularity
    let mut payload = vec![0u8; len.div_ceil(T::READ_SIZE) * T::READ_SIZE];
    if !payload.is_empty() {
        flash
            .read(offset + HEADER_SIZE as u32, &mut payload)
            .map_err(|_| Error::FlashError)?;
    }
    decode_payload(&payload[..len])
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if n > self.buf.len() {
            return Err(Error::CorruptedData);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn byte(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn be_len(&mut self, width: usize) -> Result<usize, Error> {
        Ok(self
            .take(width)?
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize))
    }

    fn string(&mut self) -> Result<String, Error> {
        let marker = self.byte()?;
        let len = match marker {
            NIL => return Ok(String::new()),
            _ if marker & FIXSTR_MASK == FIXSTR => (marker & !FIXSTR_MASK) as usize,
            STR8 => self.be_len(1)?,
            STR16 => self.be_len(2)?,
            STR32 => self.be_len(4)?,
            _ => return Err(Error::CorruptedData),
        };
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::CorruptedData)
    }
}
