#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP helpers shared by the geocoder and the spatial query engine.
//!
//! [`get_json`] performs a single GET and classifies the outcome into an
//! [`HttpError`]. Callers wrap it in [`retry::with_retry`] so that every
//! upstream call gets the same bounded backoff. Timeouts are set once on the
//! client built by [`build_client`].

pub mod retry;

use std::time::Duration;

use retry::Retryable;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// User agent sent with every upstream request.
const USER_AGENT: &str = concat!("parcel-lookup/", env!("CARGO_PKG_VERSION"));

/// Errors from a single upstream HTTP call.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request never produced a response (timeout, DNS, connection reset).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Numeric status code.
        status: u16,
        /// URL that produced the status (without query string).
        url: String,
    },

    /// The body could not be parsed as JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    /// Returns the upstream status code, if the failure was a status error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Json(_) => None,
        }
    }
}

impl Retryable for HttpError {
    /// 4xx responses other than 429 are permanent; everything else
    /// (timeouts, connection failures, 5xx, truncated bodies) is retried.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => is_transient(e),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) => true,
        }
    }
}

/// Builds the shared `reqwest` client with a per-request timeout.
///
/// # Errors
///
/// Returns [`HttpError::Transport`] if the TLS backend cannot be initialized.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, HttpError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Sends one GET request with the given query parameters and parses the
/// response body as JSON.
///
/// Does not retry; see [`retry::with_retry`].
///
/// # Errors
///
/// Returns [`HttpError::Status`] for non-2xx responses,
/// [`HttpError::Transport`] if the request or body read fails, and
/// [`HttpError::Json`] if the body is not valid JSON.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<serde_json::Value, HttpError> {
    let response = client.get(url).query(params).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(HttpError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    // Read as text first so a parse failure can log what actually arrived.
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed\n  \
             url: {url}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        HttpError::Json(e)
    })
}

/// Truncates a response body for logging without splitting a UTF-8 character.
fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
