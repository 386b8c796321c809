//! HTTP client abstraction for testability

use std::time::Duration;

use super::types::ProviderError;

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `timeout` - Maximum time to wait for the whole response
    ///
    /// # Returns
    ///
    /// The response body, `None` for a 404 response, or an error.
    fn get(&self, url: &str, timeout: Duration) -> Result<Option<Vec<u8>>, ProviderError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("globetile/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<Option<Vec<u8>>, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| classify(url, timeout, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Http(format!("HTTP {} from {}", status, url)));
        }

        response
            .bytes()
            .map(|b| Some(b.to_vec()))
            .map_err(|e| classify(url, timeout, e))
    }
}

fn classify(url: &str, timeout: Duration, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout {
            target: url.to_string(),
            timeout,
        }
    } else {
        ProviderError::Http(format!("Request to {} failed: {}", url, e))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Mock HTTP client for testing
    pub struct MockHttpClient {
        pub response: Result<Option<Vec<u8>>, ProviderError>,
        pub requested: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(response: Result<Option<Vec<u8>>, ProviderError>) -> Self {
            Self {
                response,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str, _timeout: Duration) -> Result<Option<Vec<u8>>, ProviderError> {
            self.requested.lock().push(url.to_string());
            self.response.clone()
        }
    }

    #[test]
    fn test_mock_client_success() {
        let mock = MockHttpClient::new(Ok(Some(vec![1, 2, 3, 4])));

        let result = mock.get("http://example.com", Duration::from_secs(1));
        assert_eq!(result.unwrap(), Some(vec![1, 2, 3, 4]));
        assert_eq!(mock.requested.lock().len(), 1);
    }

    #[test]
    fn test_mock_client_error() {
        let mock = MockHttpClient::new(Err(ProviderError::Http("Test error".to_string())));

        let result = mock.get("http://example.com", Duration::from_secs(1));
        assert!(result.is_err());
    }
}
