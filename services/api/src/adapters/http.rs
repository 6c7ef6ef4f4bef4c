//! services/api/src/adapters/http.rs
//!
//! JSON fetching shared by the catalog adapters.

use book_scanner_core::ports::{PortError, PortResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

/// GETs `url` and decodes the body. A 404 maps to `NotFound`; any other
/// failure (transport, status, body) maps to `Unexpected`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> PortResult<T> {
    debug!(url, "Fetching catalog resource");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PortError::Unexpected(format!("Request to {} failed: {}", url, e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PortError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(PortError::Unexpected(format!(
            "Fetch failed: {} returned {}",
            url, status
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Invalid JSON from {}: {}", url, e)))
}
