//! Shared blocking HTTP client setup.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use super::provider::ProviderError;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build the blocking client every adapter uses.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))
}

/// Map non-success statuses to provider errors. No retries: the caller
/// marks the section unavailable.
pub fn check_status(resp: Response, what: &str) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(status_error(status, &resp, what))
}

fn status_error(status: StatusCode, resp: &Response, what: &str) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            ProviderError::RateLimited {
                retry_after_secs: retry_after,
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::AuthenticationRequired(format!("HTTP {status} for {what}"))
        }
        StatusCode::NOT_FOUND => ProviderError::SymbolNotFound {
            symbol: what.to_string(),
        },
        _ => ProviderError::Other(format!("HTTP {status} for {what}")),
    }
}
