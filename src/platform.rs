use embedded_storage::nor_flash::NorFlash;

/// Page size used by page programming chips when the driver does not report one.
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Everything the disk needs from a flash chip. Reads, erases, plain writes and the capacity come
/// from [`NorFlash`], the rest from [`ChipControl`].
pub trait Platform: ChipControl + NorFlash {}

impl<T: ChipControl + NorFlash> Platform for T {}

/// Write capability flags as reported by the flash driver. More than one flag may be set; the
/// page programming flag wins over the auto address increment flag.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteMode(pub u8);

impl WriteMode {
    /// Single byte programming.
    pub const BYTE: u8 = 1 << 0;
    /// Auto address increment: the chip erases and programs a whole range in one call.
    pub const AAI: u8 = 1 << 1;
    /// Dual buffer programming.
    pub const DUAL_BUFFER: u8 = 1 << 2;
    /// Up to 256 bytes per program call, explicit erase required.
    pub const PAGE_256B: u8 = 1 << 3;

    pub const fn contains(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

/// Chip services beyond the `embedded-storage` traits.
pub trait ChipControl: NorFlash {
    /// Largest number of bytes a single program call may write in page programming mode.
    const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE;

    fn initialize(&mut self) -> Result<(), Self::Error>;

    fn reset(&mut self) -> Result<(), Self::Error>;

    fn write_mode(&self) -> WriteMode;

    /// Erase the sectors covering `offset..offset + bytes.len()` and program `bytes` in a single
    /// primitive. Only called on chips reporting [`WriteMode::AAI`].
    fn erase_write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}

impl<T: ChipControl> ChipControl for &mut T {
    const PAGE_SIZE: usize = T::PAGE_SIZE;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        T::initialize(self)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        T::reset(self)
    }

    fn write_mode(&self) -> WriteMode {
        T::write_mode(self)
    }

    fn erase_write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        T::erase_write(self, offset, bytes)
    }
}

/// The physical write path chosen once at bring-up from the reported [`WriteMode`].
#[derive(strum::Display, Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteStrategy {
    /// Erase the sector on a fresh fill, then program page sized chunks.
    PageProgram,
    /// Hand the whole buffer to the chip's combined erase and write primitive.
    AutoIncrement,
    /// Neither mode is available; writes are rejected.
    Unsupported(u8),
}

impl From<WriteMode> for WriteStrategy {
    fn from(mode: WriteMode) -> Self {
        if mode.contains(WriteMode::PAGE_256B) {
            WriteStrategy::PageProgram
        } else if mode.contains(WriteMode::AAI) {
            WriteStrategy::AutoIncrement
        } else {
            WriteStrategy::Unsupported(mode.0)
        }
    }
}
