use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A token (currency) managed by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// How many subunits make one unit (e.g. `100` for cents).
    pub subunit_to_unit: Decimal,
}

/// Server-side settings visible to the client: the tokens it supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    #[serde(default)]
    pub tokens: Vec<Token>,
}
