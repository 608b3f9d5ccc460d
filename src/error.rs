use thiserror::Error;

/// Errors surfaced by the block device and by bring-up. The configuration store never returns
/// these to its callers; it falls back to empty settings instead.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The partition offset has to be aligned to the erase sector size of the chip and must leave
    /// at least one sector for the disk.
    #[error("invalid partition offset")]
    InvalidPartitionOffset,

    /// The chip reported an erase size or capacity that cannot back a block device.
    #[error("invalid flash geometry")]
    InvalidGeometry,

    /// The internal error value is returned from the provided `impl Platform`
    #[error("internal flash error")]
    FlashError,

    /// The host addressed a block past the end of the disk.
    #[error("logical block address out of range")]
    LbaOutOfRange,

    /// The transfer is larger than a block or would run past the end of the current sector.
    #[error("transfer too large")]
    TransferTooLarge,

    /// The chip supports neither page programming nor auto address increment writes. The raw mode
    /// flags are reported.
    #[error("unsupported write mode: {0:#04x}")]
    UnsupportedWriteMode(u8),

    /// The legacy settings blob is truncated or malformed.
    #[error("corrupted data")]
    CorruptedData,

    /// The legacy settings region does not start with the expected tag.
    #[error("invalid magic")]
    InvalidMagic,
}
