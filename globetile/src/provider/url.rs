//! HTTP-backed tile reader.

use std::time::Duration;

use bytes::Bytes;

use super::http::HttpClient;
use super::types::{address_path, ProviderError, TileFormatter, TileReader};
use crate::coord::TileAddress;

/// Reads tiles with synchronous HTTP GET requests.
///
/// # Example
///
/// ```ignore
/// use globetile::provider::{pattern_formatter, ReqwestClient, UrlReader};
///
/// let client = ReqwestClient::new()?;
/// let reader = UrlReader::new("https://tiles.example.com", pattern_formatter("{z}/{x}/{y}.png"), client);
/// ```
pub struct UrlReader<C: HttpClient> {
    base_url: String,
    formatter: TileFormatter,
    http_client: C,
}

impl<C: HttpClient> UrlReader<C> {
    /// Creates a reader for tiles below `base_url`.
    pub fn new(base_url: impl Into<String>, formatter: TileFormatter, http_client: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            formatter,
            http_client,
        }
    }

    /// Builds the tile URL for `address`.
    pub fn build_url(&self, address: &TileAddress) -> String {
        format!(
            "{}/{}",
            self.base_url,
            address_path(&self.formatter, address)
        )
    }
}

impl<C: HttpClient> TileReader for UrlReader<C> {
    fn read_data(
        &self,
        address: &TileAddress,
        timeout: Duration,
    ) -> Result<Option<Bytes>, ProviderError> {
        let url = self.build_url(address);
        let body = self.http_client.get(&url, timeout)?;
        Ok(body.map(Bytes::from))
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileLocation;
    use crate::provider::{pattern_formatter, MockHttpClient};

    fn timeout() -> Duration {
        Duration::from_millis(500)
    }

    #[test]
    fn test_url_construction() {
        let reader = UrlReader::new(
            "https://tiles.example.com/",
            pattern_formatter("{z}/{x}/{y}.jpg"),
            MockHttpClient::new(Ok(None)),
        );
        let addr = TileAddress::new(TileLocation::new(5, 10, 7));
        assert_eq!(
            reader.build_url(&addr),
            "https://tiles.example.com/5/10/7.jpg"
        );
    }

    #[test]
    fn test_success_returns_bytes() {
        let reader = UrlReader::new(
            "http://h",
            pattern_formatter("{z}/{x}/{y}"),
            MockHttpClient::new(Ok(Some(vec![9, 8]))),
        );
        let addr = TileAddress::new(TileLocation::new(0, 0, 0));
        let data = reader.read_data(&addr, timeout()).unwrap().unwrap();
        assert_eq!(&data[..], &[9, 8]);
    }

    #[test]
    fn test_not_found_is_absent() {
        let reader = UrlReader::new(
            "http://h",
            pattern_formatter("{z}/{x}/{y}"),
            MockHttpClient::new(Ok(None)),
        );
        let addr = TileAddress::new(TileLocation::new(3, 1, 1));
        assert_eq!(reader.read_data(&addr, timeout()).unwrap(), None);
    }

    #[test]
    fn test_timeout_propagates() {
        let reader = UrlReader::new(
            "http://h",
            pattern_formatter("{z}/{x}/{y}"),
            MockHttpClient::new(Err(ProviderError::Timeout {
                target: "http://h/0/0/0".to_string(),
                timeout: timeout(),
            })),
        );
        let addr = TileAddress::new(TileLocation::new(0, 0, 0));
        assert!(matches!(
            reader.read_data(&addr, timeout()),
            Err(ProviderError::Timeout { .. })
        ));
    }
}
