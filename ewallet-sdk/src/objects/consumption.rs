//! Transaction consumptions and their statuses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Metadata;
use super::token::Token;
use super::topic::Topic;
use super::transaction::Transaction;

/// Status of a transaction consumption.
///
/// Any value this client build does not recognize decodes to
/// [`TransactionConsumptionStatus::Unknown`] instead of failing, so a newer
/// server never breaks decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionConsumptionStatus {
    /// Waiting for approval or settlement.
    Pending,
    /// Approved by the request owner; settlement still outstanding.
    Approved,
    /// Rejected by the request owner.
    Rejected,
    /// Settled; a transaction is attached.
    Confirmed,
    /// Settlement failed.
    Failed,
    /// Timed out before settling.
    Expired,
    #[serde(other)]
    Unknown,
}

impl TransactionConsumptionStatus {
    /// Returns `true` if no further transition is accepted from this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Confirmed | Self::Failed | Self::Expired
        )
    }

    /// Progress of the status through the lifecycle.
    ///
    /// `pending` is 0, the approval decision (`approved`/`rejected`) is 1,
    /// settlement (`confirmed`/`failed`/`expired`) is 2. `unknown` has no
    /// stage.
    pub fn stage(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Approved | Self::Rejected => Some(1),
            Self::Confirmed | Self::Failed | Self::Expired => Some(2),
            Self::Unknown => None,
        }
    }

    /// Returns `true` if the lifecycle allows moving from `self` to `next`.
    ///
    /// This is the forward lifecycle only. Reconciling with server snapshots
    /// may also replace one decision with another of the same stage (for
    /// example `approved` with a strictly later `rejected`), which this table
    /// does not permit.
    pub fn can_transition_to(self, next: Self) -> bool {
        use TransactionConsumptionStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Rejected | Confirmed | Failed | Expired)
                | (Approved, Confirmed | Failed | Expired)
        )
    }
}

impl std::fmt::Display for TransactionConsumptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
            Self::Expired => write!(f, "expired"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A consumption of a transaction request.
///
/// Two snapshots with the same `id` are the same logical consumption:
/// equality and hashing look at `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConsumption {
    pub id: String,
    pub status: TransactionConsumptionStatus,
    /// Amount asked for by the consumer, if it overrides the request amount.
    #[serde(default)]
    pub amount: Option<Decimal>,
    pub estimated_request_amount: Decimal,
    pub estimated_consumption_amount: Decimal,
    /// Amount actually moved in the request currency; set once confirmed.
    #[serde(default)]
    pub finalized_request_amount: Option<Decimal>,
    /// Amount actually moved in the consumption currency; set once confirmed.
    #[serde(default)]
    pub finalized_consumption_amount: Option<Decimal>,
    pub token: Token,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub idempotency_token: Option<String>,
    /// The settled transaction; `None` until the consumption is confirmed.
    #[serde(default)]
    pub transaction: Option<Transaction>,
    pub address: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    pub transaction_request_id: String,
    /// Topic carrying this consumption's updates.
    pub socket_topic: Topic,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiration_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub rejected_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub confirmed_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub failed_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub encrypted_metadata: Metadata,
}

impl TransactionConsumption {
    /// Timestamp recorded for reaching `status`, if any.
    pub fn timestamp_for(&self, status: TransactionConsumptionStatus) -> Option<OffsetDateTime> {
        match status {
            TransactionConsumptionStatus::Pending => Some(self.created_at),
            TransactionConsumptionStatus::Approved => self.approved_at,
            TransactionConsumptionStatus::Rejected => self.rejected_at,
            TransactionConsumptionStatus::Confirmed => self.confirmed_at,
            TransactionConsumptionStatus::Failed => self.failed_at,
            TransactionConsumptionStatus::Expired => self.expired_at,
            TransactionConsumptionStatus::Unknown => None,
        }
    }

    /// Mutable slot of the timestamp recorded for reaching `status`.
    pub fn timestamp_slot(
        &mut self,
        status: TransactionConsumptionStatus,
    ) -> Option<&mut Option<OffsetDateTime>> {
        match status {
            TransactionConsumptionStatus::Approved => Some(&mut self.approved_at),
            TransactionConsumptionStatus::Rejected => Some(&mut self.rejected_at),
            TransactionConsumptionStatus::Confirmed => Some(&mut self.confirmed_at),
            TransactionConsumptionStatus::Failed => Some(&mut self.failed_at),
            TransactionConsumptionStatus::Expired => Some(&mut self.expired_at),
            TransactionConsumptionStatus::Pending | TransactionConsumptionStatus::Unknown => None,
        }
    }

    /// Check that `status` and the set of terminal timestamps agree.
    ///
    /// Only `approved_at` may co-exist with another terminal timestamp, and
    /// only with `confirmed_at`, `failed_at` or `expired_at`.
    pub fn is_consistent(&self) -> bool {
        use TransactionConsumptionStatus::*;
        let approved = self.approved_at.is_some();
        let rejected = self.rejected_at.is_some();
        let confirmed = self.confirmed_at.is_some();
        let failed = self.failed_at.is_some();
        let expired = self.expired_at.is_some();
        match self.status {
            Pending => !(approved || rejected || confirmed || failed || expired),
            Approved => approved && !(rejected || confirmed || failed || expired),
            Rejected => rejected && !(approved || confirmed || failed || expired),
            Confirmed => confirmed && !(rejected || failed || expired),
            Failed => failed && !(rejected || confirmed || expired),
            Expired => expired && !(rejected || confirmed || failed),
            Unknown => true,
        }
    }
}

impl PartialEq for TransactionConsumption {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TransactionConsumption {}

impl std::hash::Hash for TransactionConsumption {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CONSUMPTION_JSON: &str = r#"{
        "id": "txc_01",
        "status": "pending",
        "amount": null,
        "estimated_request_amount": "100.00",
        "estimated_consumption_amount": "100.00",
        "token": {"id": "tok_OMG", "symbol": "OMG", "name": "OmiseGO", "subunit_to_unit": 100},
        "address": "addr_01",
        "transaction_request_id": "txr_01",
        "socket_topic": "transaction_consumption:txc_01",
        "created_at": "2018-05-01T10:00:00Z",
        "metadata": {},
        "encrypted_metadata": {}
    }"#;

    #[test]
    fn test_decode_pending_consumption() {
        let consumption: TransactionConsumption = serde_json::from_str(CONSUMPTION_JSON).unwrap();
        assert_eq!(consumption.status, TransactionConsumptionStatus::Pending);
        assert_eq!(consumption.estimated_request_amount, dec!(100.00));
        assert_eq!(consumption.socket_topic.name(), "transaction_consumption:txc_01");
        assert!(consumption.finalized_request_amount.is_none());
        assert!(consumption.approved_at.is_none());
        assert!(consumption.is_consistent());
    }

    #[test]
    fn test_unrecognized_status_decodes_to_unknown() {
        for raw in ["\"settling\"", "\"\"", "\"PENDING\"", "\"reverted\""] {
            let status: TransactionConsumptionStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, TransactionConsumptionStatus::Unknown, "{raw}");
        }

        let json = CONSUMPTION_JSON.replace("\"pending\"", "\"on_hold\"");
        let consumption: TransactionConsumption = serde_json::from_str(&json).unwrap();
        assert_eq!(consumption.status, TransactionConsumptionStatus::Unknown);
    }

    #[test]
    fn test_equality_by_id() {
        let a: TransactionConsumption = serde_json::from_str(CONSUMPTION_JSON).unwrap();
        let mut b = a.clone();
        b.status = TransactionConsumptionStatus::Confirmed;
        b.address = "somewhere_else".into();
        assert_eq!(a, b);

        b.id = "txc_02".into();
        assert_ne!(a, b);
    }

    #[test]
    fn test_transition_table() {
        use TransactionConsumptionStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Expired));
        assert!(Approved.can_transition_to(Confirmed));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        for terminal in [Rejected, Confirmed, Failed, Expired] {
            assert!(terminal.is_terminal());
            for next in [Pending, Approved, Rejected, Confirmed, Failed, Expired] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
