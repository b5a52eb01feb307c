//! HTTP side of the SDK.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.
//!
//! [`RequestExecutor`] is the seam between the typed operations in
//! [`EWalletClient`] and whatever actually performs the request;
//! [`HttpClient`] is the `reqwest` implementation.

mod ewallet;
mod executor;
mod http;

pub use ewallet::{EWalletClient, endpoints};
pub use executor::{ApiRequest, RequestExecutor};
pub use http::HttpClient;

use reqwest::StatusCode;

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server refused the request.
    #[error("api error: status {status}, {code}: {description}")]
    Api {
        status: StatusCode,
        code: String,
        description: String,
    },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The response body was not a valid response envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Server error code, for [`ClientError::Api`].
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
