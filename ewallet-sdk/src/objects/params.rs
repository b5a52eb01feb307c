//! Request bodies for the eWallet API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Metadata;
use super::transaction_request::TransactionRequestType;

/// Body for consuming a transaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionConsumptionParams {
    pub formatted_transaction_request_id: String,
    /// Replays with the same token return the original consumption.
    pub idempotency_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub encrypted_metadata: Metadata,
}

impl TransactionConsumptionParams {
    /// Build params for `transaction_request_id` with a fresh idempotency token.
    pub fn new(transaction_request_id: impl Into<String>) -> Self {
        Self {
            formatted_transaction_request_id: transaction_request_id.into(),
            idempotency_token: uuid::Uuid::new_v4().to_string(),
            amount: None,
            address: None,
            token_id: None,
            correlation_id: None,
            metadata: Metadata::new(),
            encrypted_metadata: Metadata::new(),
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_idempotency_token(mut self, token: impl Into<String>) -> Self {
        self.idempotency_token = token.into();
        self
    }
}

/// Body for approving or rejecting a consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConsumptionActionParams {
    pub id: String,
}

/// Body for a direct transfer between two addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCreateParams {
    pub from_address: Option<String>,
    pub to_address: String,
    pub amount: Decimal,
    pub token_id: String,
    pub idempotency_token: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub encrypted_metadata: Metadata,
}

impl TransactionCreateParams {
    /// Build a transfer with a fresh idempotency token.
    pub fn new(to_address: impl Into<String>, amount: Decimal, token_id: impl Into<String>) -> Self {
        Self {
            from_address: None,
            to_address: to_address.into(),
            amount,
            token_id: token_id.into(),
            idempotency_token: uuid::Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            encrypted_metadata: Metadata::new(),
        }
    }
}

/// Body for creating a transaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequestCreateParams {
    #[serde(rename = "type")]
    pub request_type: TransactionRequestType,
    pub token_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub require_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consumptions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption_lifetime: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expiration_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub allow_amount_override: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Body for retrieving one transaction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequestParams {
    pub formatted_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Body for listing the current user's transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionListParams {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: String,
    pub sort_dir: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for TransactionListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            sort_by: "created_at".into(),
            sort_dir: SortDirection::Desc,
            search_term: None,
            address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_consumption_params_generate_distinct_tokens() {
        let a = TransactionConsumptionParams::new("txr_01");
        let b = TransactionConsumptionParams::new("txr_01");
        assert_ne!(a.idempotency_token, b.idempotency_token);
        assert!(uuid::Uuid::parse_str(&a.idempotency_token).is_ok());
    }

    #[test]
    fn test_consumption_params_skip_unset_fields() {
        let params = TransactionConsumptionParams::new("txr_01")
            .with_idempotency_token("idem")
            .with_amount(dec!(12.5));
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["formatted_transaction_request_id"], "txr_01");
        assert_eq!(json["idempotency_token"], "idem");
        assert!(json.get("address").is_none());
        assert!(json.get("correlation_id").is_none());
    }
}
