use async_trait::async_trait;

use super::ClientError;

/// Description of one API call. Every client endpoint is a POST with a
/// JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Endpoint path relative to the API base URL (e.g. `me.transfer`).
    pub path: &'static str,
    pub body: serde_json::Value,
}

impl ApiRequest {
    /// A POST with a JSON body, the shape of every eWallet client endpoint.
    pub fn post<T: serde::Serialize>(path: &'static str, body: &T) -> Result<Self, ClientError> {
        Ok(Self {
            path,
            body: serde_json::to_value(body)?,
        })
    }
}

/// Executes an [`ApiRequest`] and yields the `data` member of the response.
///
/// Failures the server reports (`"success": false`) must come back as
/// [`ClientError::Api`].
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value, ClientError>;
}

#[async_trait]
impl<E: RequestExecutor + ?Sized> RequestExecutor for std::sync::Arc<E> {
    async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value, ClientError> {
        (**self).execute(request).await
    }
}
