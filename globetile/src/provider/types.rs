//! Tile reader capability and shared provider types.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::RgbaImage;
use thiserror::Error;

use crate::coord::{TileAddress, TileLocation};

/// Errors that abort a single tile fetch.
///
/// A tile that is confirmed not to exist is not an error; readers report it
/// as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Timed out after {timeout:?} reading {target}")]
    Timeout { target: String, timeout: Duration },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to decode {target}: {reason}")]
    Decode { target: String, reason: String },
}

/// Caller-defined decoded tile payload.
pub type TileAny = Arc<dyn Any + Send + Sync>;

/// Turns raw tile bytes into a caller-defined object.
pub type ObjectDecoder = dyn Fn(&TileAddress, &[u8]) -> Result<TileAny, ProviderError> + Send + Sync;

/// Maps a tile location to a relative path or URL fragment.
pub type TileFormatter = Arc<dyn Fn(&TileLocation) -> String + Send + Sync>;

/// Source of raw tile bytes.
///
/// Implementations are shared by every load request against one data source
/// and may be called concurrently from the loader's worker threads.
pub trait TileReader: Send + Sync {
    /// Reads the raw bytes of a tile.
    ///
    /// # Returns
    ///
    /// `Ok(Some(bytes))` on success, `Ok(None)` if the tile is confirmed
    /// absent, or an error for transient failures.
    fn read_data(
        &self,
        address: &TileAddress,
        timeout: Duration,
    ) -> Result<Option<Bytes>, ProviderError>;

    /// Reads and decodes a tile image as RGBA8.
    fn read_image(
        &self,
        address: &TileAddress,
        timeout: Duration,
    ) -> Result<Option<Arc<RgbaImage>>, ProviderError> {
        match self.read_data(address, timeout)? {
            Some(data) => {
                let image =
                    image::load_from_memory(&data).map_err(|e| ProviderError::Decode {
                        target: address.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(Arc::new(image.to_rgba8())))
            }
            None => Ok(None),
        }
    }

    /// Reads a tile and hands the bytes to `decoder`.
    fn read_object(
        &self,
        address: &TileAddress,
        timeout: Duration,
        decoder: &ObjectDecoder,
    ) -> Result<Option<TileAny>, ProviderError> {
        match self.read_data(address, timeout)? {
            Some(data) => decoder(address, &data).map(Some),
            None => Ok(None),
        }
    }

    /// Short description for log messages.
    fn name(&self) -> &str;
}

/// Builds a formatter from a path template.
///
/// The placeholders `{z}`, `{x}` and `{y}` expand to the level, column and
/// row respectively.
///
/// # Example
///
/// ```ignore
/// let format = pattern_formatter("{z}/{y}/{x}.png");
/// assert_eq!(format(&TileLocation::new(3, 5, 2)), "3/2/5.png");
/// ```
pub fn pattern_formatter(pattern: &str) -> TileFormatter {
    let pattern = pattern.to_string();
    Arc::new(move |location: &TileLocation| {
        pattern
            .replace("{z}", &location.level.to_string())
            .replace("{x}", &location.column.to_string())
            .replace("{y}", &location.row.to_string())
    })
}

/// Formatter producing `level/row/column`.
pub fn default_formatter() -> TileFormatter {
    pattern_formatter("{z}/{y}/{x}")
}

/// Relative path of `address`: the formatted location with the sub-path appended.
pub(crate) fn address_path(formatter: &TileFormatter, address: &TileAddress) -> String {
    let path = formatter(&address.location);
    match &address.sub_path {
        Some(sub) if !sub.is_empty() => format!("{}/{}", path, sub),
        _ => path,
    }
}
