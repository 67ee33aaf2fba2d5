//! HTTP client initialization.

use reqwest::ClientBuilder;

use crate::config::HTTP_REQUEST_TIMEOUT;
use crate::errors::InitializationError;

/// Initializes the shared HTTP client.
///
/// Creates a `reqwest::Client` configured with:
/// - Cookie store enabled, so a portal login session carries across requests
/// - Request timeout of [`HTTP_REQUEST_TIMEOUT`]
///
/// The same client backs both page fetching and attachment downloads;
/// `reqwest::Client` is cheaply cloneable and shares its connection pool.
///
/// # Returns
///
/// A configured HTTP client ready for making requests.
///
/// # Errors
///
/// Returns `InitializationError::HttpClient` if client creation fails.
pub fn init_client() -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .cookie_store(true)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_client() {
        assert!(init_client().is_ok());
    }
}
