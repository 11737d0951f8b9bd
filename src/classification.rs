use crate::error::ValuationError;
use crate::schema::{EntityId, EntityRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Named bucket that raw account categories roll up into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Bucket {
    #[serde(rename = "Stocks and funds")]
    StocksAndFunds,
    #[serde(rename = "Bank accounts")]
    BankAccounts,
    #[serde(rename = "Savings books")]
    SavingsBooks,
}

const STOCKS_AND_FUNDS: &[&str] = &[
    "article83",
    "capitalisation",
    "crowdlending",
    "lifeinsurance",
    "madelin",
    "market",
    "pea",
    "pee",
    "per",
    "perco",
    "perp",
    "rsp",
];
const BANK_ACCOUNTS: &[&str] = &["checking"];
const SAVINGS_BOOKS: &[&str] = &["savings"];

impl Bucket {
    /// Legend order used by the portfolio overview.
    pub const ALL: [Bucket; 3] = [
        Bucket::StocksAndFunds,
        Bucket::BankAccounts,
        Bucket::SavingsBooks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Bucket::StocksAndFunds => "Stocks and funds",
            Bucket::BankAccounts => "Bank accounts",
            Bucket::SavingsBooks => "Savings books",
        }
    }

    pub fn raw_categories(&self) -> &'static [&'static str] {
        match self {
            Bucket::StocksAndFunds => STOCKS_AND_FUNDS,
            Bucket::BankAccounts => BANK_ACCOUNTS,
            Bucket::SavingsBooks => SAVINGS_BOOKS,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bucket {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValuationError::UnknownClassification(s.to_string()))
    }
}

/// Maps a raw category to its bucket. Categories outside the three buckets
/// (loan, card, real_estate, deposit, unknown, ...) map to `None`.
pub fn classify(raw_category: &str) -> Option<Bucket> {
    let category = raw_category.trim().to_ascii_lowercase();
    Bucket::ALL
        .into_iter()
        .find(|b| b.raw_categories().contains(&category.as_str()))
}

/// Ids of the entities whose raw category falls in `bucket`.
pub fn select_entities(entities: &[EntityRecord], bucket: Bucket) -> BTreeSet<EntityId> {
    entities
        .iter()
        .filter(|e| classify(&e.raw_category) == Some(bucket))
        .map(|e| e.entity_id)
        .collect()
}
