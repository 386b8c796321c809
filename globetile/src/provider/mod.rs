//! Tile data sources.
//!
//! A [`TileReader`] turns a [`TileAddress`](crate::coord::TileAddress) into
//! raw bytes, a decoded image or a caller-decoded object. Two readers are
//! provided: [`DirectoryReader`] for a local tile tree and [`UrlReader`] for
//! an HTTP tile server.
//!
//! # Example
//!
//! ```ignore
//! use globetile::provider::{DirectoryReader, pattern_formatter};
//!
//! let reader = DirectoryReader::new("/data/tiles", pattern_formatter("{z}/{y}/{x}.png"));
//! let image = reader.read_image(&address, Duration::from_secs(10))?;
//! ```

mod directory;
mod http;
mod types;
mod url;

pub use directory::DirectoryReader;
pub use http::{HttpClient, ReqwestClient};
pub use types::{
    default_formatter, pattern_formatter, ObjectDecoder, ProviderError, TileAny, TileFormatter,
    TileReader,
};
pub use url::UrlReader;

#[cfg(test)]
pub use http::tests::MockHttpClient;
