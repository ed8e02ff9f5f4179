//! Shared HTTP plumbing for the platform clients.

use anyhow::Context;
use reqwest::blocking::{Client, Response};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 500;

/// Build a blocking client with a per-call timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!("stagehand/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;
    Ok(client)
}

/// Turn a non-success response into [`TransportError::Status`].
pub(crate) fn error_for_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...[truncated]");
    }
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://x/api/", "/a/1/"), "http://x/api/a/1/");
        assert_eq!(join_url("http://x/api", "a"), "http://x/api/a");
    }

    #[test]
    fn build_client_succeeds() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
    }
}
