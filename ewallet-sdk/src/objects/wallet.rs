//! Wallets and their balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Metadata;
use super::token::Token;
use super::topic::Topic;

/// Amount of one token held by a wallet, in subunits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub token: Token,
    pub amount: Decimal,
}

impl Balance {
    /// The amount in whole units of the token.
    pub fn display_amount(&self) -> Decimal {
        if self.token.subunit_to_unit.is_zero() {
            return self.amount;
        }
        self.amount / self.token.subunit_to_unit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    #[serde(default)]
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub encrypted_metadata: Metadata,
    #[serde(default)]
    pub socket_topic: Option<Topic>,
}

impl Wallet {
    pub fn balance_of(&self, token_id: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.token.id == token_id)
    }
}

/// Every wallet of the current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletList {
    pub data: Vec<Wallet>,
}
