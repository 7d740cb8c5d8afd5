//! Outbound HTTP for provider metadata.
//!
//! Both the discovery document and the key set are plain JSON `GET`s against
//! the identity provider. The client carries a request timeout so a hung
//! provider cannot stall validation indefinitely.

use std::time::Duration;

use reqwest::header::ACCEPT;

const USER_AGENT: &str = concat!("receiver/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for discovery and key set fetches.
///
/// # Errors
/// Returns the `reqwest` error if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// `GET` a JSON document and return its raw body.
///
/// The error is a human-readable reason; callers wrap it in the error variant
/// for the document they were fetching.
pub async fn fetch_json(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, String> {
    let response = http
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| describe_request_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| describe_request_error(&e))?;

    Ok(body.to_vec())
}

fn describe_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        format!("request failed: {error}")
    }
}
