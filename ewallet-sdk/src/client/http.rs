//! `reqwest` implementation of [`RequestExecutor`].
//!
//! Every response is wrapped in an envelope:
//!
//! ```json
//! {"version":"1","success":true,"data":{ ... }}
//! {"version":"1","success":false,"data":{"object":"error","code":"...","description":"..."}}
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::ClientError;
use super::executor::{ApiRequest, RequestExecutor};
use crate::auth::{ACCEPT_MEDIA_TYPE, ClientCredentials};
use crate::objects::ApiErrorBody;

/// HTTP executor for the eWallet **client API**.
///
/// Authenticates every request with the `OMGClient` authorization header.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    base_url: Url,
    credentials: ClientCredentials,
}

impl HttpClient {
    /// Create a new `HttpClient`.
    ///
    /// * `base_url` – root URL of the client API, ending with `/`.
    /// * `credentials` – API key and user auth token.
    pub fn new(base_url: Url, credentials: ClientCredentials) -> Self {
        Self {
            http: Client::new(),
            base_url,
            credentials,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }
}

#[async_trait]
impl RequestExecutor for HttpClient {
    async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value, ClientError> {
        let url = self.base_url.join(request.path)?;

        let resp = self
            .http
            .post(url)
            .json(&request.body)
            .header(reqwest::header::AUTHORIZATION, self.credentials.to_header())
            .header(reqwest::header::ACCEPT, ACCEPT_MEDIA_TYPE)
            .send()
            .await?;

        parse_response(resp).await
    }
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
}

async fn parse_response(resp: reqwest::Response) -> Result<serde_json::Value, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    unwrap_envelope(status, &bytes)
}

fn unwrap_envelope(status: StatusCode, body: &[u8]) -> Result<serde_json::Value, ClientError> {
    let envelope: ResponseEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(ClientError::Api {
                status,
                code: "http_error".into(),
                description: String::from_utf8_lossy(body).into_owned(),
            });
        }
        Err(e) => return Err(ClientError::Json(e)),
    };

    if envelope.success && status.is_success() {
        return Ok(envelope.data);
    }

    let error: ApiErrorBody = serde_json::from_value(envelope.data)
        .map_err(|e| ClientError::InvalidResponse(format!("malformed error object: {e}")))?;
    Err(ClientError::Api {
        status,
        code: error.code,
        description: error.description,
    })
}
