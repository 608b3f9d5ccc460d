use alloc::vec::Vec;

/// The volume mounted on the flash. The settings store reads and replaces whole files through
/// it; it never goes through the block device.
pub trait Filesystem {
    type Error;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, Self::Error>;

    /// Truncates or creates `path` and writes `contents`.
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), Self::Error>;

    /// Drops cached volume state so that changes made by the host over USB become visible.
    fn remount(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<F: Filesystem> Filesystem for &mut F {
    type Error = F::Error;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, Self::Error> {
        (*self).read_file(path)
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), Self::Error> {
        (*self).write_file(path, contents)
    }

    fn remount(&mut self) -> Result<(), Self::Error> {
        (*self).remount()
    }
}

#[cfg(feature = "std")]
mod host {
    use super::Filesystem;
    use std::path::PathBuf;
    use std::vec::Vec;

    /// Maps absolute volume paths such as `/settings.json` into a host directory.
    pub struct StdFilesystem {
        root: PathBuf,
    }

    impl StdFilesystem {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        fn resolve(&self, path: &str) -> PathBuf {
            self.root.join(path.trim_start_matches('/'))
        }
    }

    impl Filesystem for StdFilesystem {
        type Error = std::io::Error;

        fn read_file(&mut self, path: &str) -> Result<Vec<u8>, Self::Error> {
            std::fs::read(self.resolve(path))
        }

        fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), Self::Error> {
            std::fs::write(self.resolve(path), contents)
        }
    }
}

#[cfg(feature = "std")]
pub use host::StdFilesystem;
