//! Transaction requests: the object a consumption is made against.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Metadata;
use super::token::Token;
use super::topic::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionRequestType {
    /// The requester sends the token to whoever consumes the request.
    Send,
    /// The requester receives the token from whoever consumes the request.
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionRequestStatus {
    Valid,
    Expired,
    #[serde(other)]
    Unknown,
}

/// A request for a transfer that other users can consume.
///
/// Its `socket_topic` receives `transaction_consumption_request` events when
/// someone consumes it, and `transaction_consumption_finalized` events once
/// those consumptions settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub request_type: TransactionRequestType,
    pub token: Token,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub status: TransactionRequestStatus,
    pub socket_topic: Topic,
    #[serde(default)]
    pub require_confirmation: bool,
    #[serde(default)]
    pub max_consumptions: Option<u32>,
    /// Lifetime of each consumption in milliseconds.
    #[serde(default)]
    pub consumption_lifetime: Option<u64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiration_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub allow_amount_override: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PartialEq for TransactionRequest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TransactionRequest {}
