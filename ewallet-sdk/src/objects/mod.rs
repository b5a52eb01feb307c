//! Wire and data types shared by the HTTP client and the socket layer.

pub mod consumption;
pub mod error;
pub mod pagination;
pub mod params;
pub mod socket;
pub mod token;
pub mod topic;
pub mod transaction;
pub mod transaction_request;
pub mod user;
pub mod wallet;

pub use consumption::{TransactionConsumption, TransactionConsumptionStatus};
pub use error::ApiErrorBody;
pub use pagination::{Pagination, PaginationList};
pub use token::{Setting, Token};
pub use topic::Topic;
pub use transaction::{Transaction, TransactionStatus};
pub use transaction_request::{TransactionRequest, TransactionRequestStatus, TransactionRequestType};
pub use user::User;
pub use wallet::{Balance, Wallet, WalletList};

/// Free-form metadata attached to most ledger objects.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
