//! Configuration types for the eWallet SDK.
//!
//! These types are plain serde structs so applications can embed them in
//! their own configuration files. Loading them is up to the application.

mod socket;

pub use socket::{ReconnectPolicy, SocketConfig};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::ClientCredentials;

/// Everything a client needs to reach one eWallet deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the HTTP API (e.g. `https://ewallet.example.com/api/client/`).
    pub base_url: Url,
    /// URL of the event socket (e.g. `wss://ewallet.example.com/api/client/socket`).
    pub socket_url: Url,
    pub api_key: String,
    pub auth_token: String,
    #[serde(default)]
    pub socket: SocketConfig,
}

impl ClientConfig {
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(&self.api_key, &self.auth_token)
    }
}
