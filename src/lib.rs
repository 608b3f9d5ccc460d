#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

mod cursor;
pub mod disk;
pub mod error;
pub mod fs;
pub mod geometry;
pub mod legacy;
pub mod msc;
pub mod platform;
pub mod settings;

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use cursor::{Cursor, Step};
pub use disk::Disk;
pub use error::Error;
pub use fs::Filesystem;
#[cfg(feature = "std")]
pub use fs::StdFilesystem;
pub use geometry::{DEFAULT_PARTITION_OFFSET, DiskConfig, Geometry};
pub use msc::{Inquiry, MscDevice};
pub use platform::{ChipControl, Platform, WriteMode, WriteStrategy};
pub use settings::{CONFIG_FILE, Settings, SettingsStore};
