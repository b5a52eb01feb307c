//! Client authentication for the eWallet HTTP and socket APIs.
//!
//! Every request (and the websocket upgrade) carries the credentials in the
//! `Authorization` header:
//!
//! ```text
//! Authorization: OMGClient {base64("{api_key}:{auth_token}")}
//! ```

/// Scheme prefix of the `Authorization` header value.
pub const AUTHORIZATION_SCHEME: &str = "OMGClient";

/// Versioned media type sent in the `Accept` header.
pub const ACCEPT_MEDIA_TYPE: &str = "application/vnd.omisego.v1+json";

/// The API key / auth token pair identifying a client and its user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClientCredentials {
    pub api_key: String,
    pub auth_token: String,
}

impl ClientCredentials {
    pub fn new(api_key: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Format the full `Authorization` header value.
    pub fn to_header(&self) -> String {
        format_authorization_header(&self.api_key, &self.auth_token)
    }
}

/// Format an `OMGClient {base64}` header value from its parts.
pub fn format_authorization_header(api_key: &str, auth_token: &str) -> String {
    let raw = format!("{api_key}:{auth_token}");
    format!(
        "{} {}",
        AUTHORIZATION_SCHEME,
        fast32::base64::RFC4648.encode(raw.as_bytes())
    )
}
