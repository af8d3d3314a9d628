//! Mapping HTTP outcomes onto [`ProviderFailure`].
//!
//! Shared by the `llm` and `search` adapters so both classify transport
//! errors, auth failures and rate limits identically.

use std::time::Duration;

use pipeline::ProviderFailure;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};

/// Classifies a transport-level reqwest error.
pub fn transport_failure(err: reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::Timeout
    } else {
        ProviderFailure::Transport(err.to_string())
    }
}

/// Classifies a failure while reading or decoding a response body.
pub fn body_failure(err: reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::Timeout
    } else {
        ProviderFailure::InvalidResponse(err.to_string())
    }
}

/// Classifies a non-success response, consuming its body for diagnostics.
///
/// `Retry-After` is honoured only in its delay-seconds form.
pub async fn status_failure(response: Response) -> ProviderFailure {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderFailure::AuthFailed(body),
        StatusCode::TOO_MANY_REQUESTS => ProviderFailure::RateLimited { retry_after },
        _ => ProviderFailure::Status {
            status: status.as_u16(),
            body,
        },
    }
}
