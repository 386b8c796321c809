//! Filesystem-backed tile reader.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;

use super::types::{address_path, default_formatter, ProviderError, TileFormatter, TileReader};
use crate::coord::TileAddress;

/// Reads tiles from a directory tree.
///
/// The tile path is the formatter output for the address's location with the
/// sub-path appended, relative to `root`.
pub struct DirectoryReader {
    root: PathBuf,
    formatter: TileFormatter,
    name: String,
}

impl DirectoryReader {
    /// Creates a reader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, formatter: TileFormatter) -> Self {
        let root = root.into();
        let name = format!("dir:{}", root.display());
        Self {
            root,
            formatter,
            name,
        }
    }

    /// Creates a reader using the `level/row/column` layout.
    pub fn with_default_layout(root: impl Into<PathBuf>) -> Self {
        Self::new(root, default_formatter())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the file holding `address`.
    pub fn tile_path(&self, address: &TileAddress) -> PathBuf {
        self.root.join(address_path(&self.formatter, address))
    }
}

impl TileReader for DirectoryReader {
    fn read_data(
        &self,
        address: &TileAddress,
        _timeout: Duration,
    ) -> Result<Option<Bytes>, ProviderError> {
        let path = self.tile_path(address);
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            // A missing file under an existing root means the tile does not exist
            Err(e) if e.kind() == ErrorKind::NotFound && self.root.is_dir() => Ok(None),
            Err(e) => Err(ProviderError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileLocation;
    use crate::provider::pattern_formatter;
    use tempfile::TempDir;

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[test]
    fn test_reads_existing_tile() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("2/1")).unwrap();
        fs::write(dir.path().join("2/1/3"), b"tile").unwrap();

        let reader = DirectoryReader::with_default_layout(dir.path());
        let addr = TileAddress::new(TileLocation::new(2, 3, 1));
        let data = reader.read_data(&addr, timeout()).unwrap().unwrap();
        assert_eq!(&data[..], b"tile");
    }

    #[test]
    fn test_sub_path_is_appended() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("0/0/0")).unwrap();
        fs::write(dir.path().join("0/0/0/dem"), b"d").unwrap();

        let reader = DirectoryReader::with_default_layout(dir.path());
        let addr = TileAddress::with_sub_path(TileLocation::new(0, 0, 0), "dem");
        assert!(reader.read_data(&addr, timeout()).unwrap().is_some());
    }

    #[test]
    fn test_missing_tile_is_absent() {
        let dir = TempDir::new().unwrap();
        let reader = DirectoryReader::new(dir.path(), pattern_formatter("{z}/{x}_{y}.png"));
        let addr = TileAddress::new(TileLocation::new(4, 1, 1));
        assert_eq!(reader.read_data(&addr, timeout()).unwrap(), None);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let reader = DirectoryReader::with_default_layout(dir.path().join("nope"));
        let addr = TileAddress::new(TileLocation::new(0, 0, 0));
        assert!(matches!(
            reader.read_data(&addr, timeout()),
            Err(ProviderError::Io(_))
        ));
    }
}
