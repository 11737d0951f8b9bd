use crate::config::EngineConfig;
use crate::error::{Result, ValuationError};
use crate::utils::{parse_snapshot_date, window_start};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type EntityId = i64;

/// A parsed observation: one value for one entity on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValuationSnapshot {
    pub entity_id: EntityId,
    pub date: NaiveDate,
    pub value: Decimal,
}

impl ValuationSnapshot {
    pub fn new(entity_id: EntityId, date: NaiveDate, value: Decimal) -> Self {
        Self {
            entity_id,
            date,
            value,
        }
    }
}

/// A snapshot row as the store keeps it, with the date still as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawSnapshot {
    #[schemars(description = "Identifier of the account or investment this value belongs to")]
    pub entity_id: EntityId,

    #[schemars(description = "Calendar day of the observation in YYYY-MM-DD format, no time or timezone")]
    pub date: String,

    #[schemars(description = "Balance or valuation reported for that day")]
    pub value: Decimal,
}

impl RawSnapshot {
    pub fn new(entity_id: EntityId, date: impl Into<String>, value: Decimal) -> Self {
        Self {
            entity_id,
            date: date.into(),
            value,
        }
    }

    pub fn parse(&self) -> Result<ValuationSnapshot> {
        let date = parse_snapshot_date(self.entity_id, &self.date)?;
        Ok(ValuationSnapshot::new(self.entity_id, date, self.value))
    }
}

/// A row dropped because its date did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedSnapshot {
    pub entity_id: EntityId,
    pub raw_date: String,
    pub reason: String,
}

/// Parses a batch of rows, keeping order. Malformed rows are returned
/// separately instead of failing the whole batch.
pub fn parse_rows(rows: &[RawSnapshot]) -> (Vec<ValuationSnapshot>, Vec<RejectedSnapshot>) {
    let mut parsed = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for row in rows {
        match row.parse() {
            Ok(snapshot) => parsed.push(snapshot),
            Err(e) => rejected.push(RejectedSnapshot {
                entity_id: row.entity_id,
                raw_date: row.date.clone(),
                reason: e.to_string(),
            }),
        }
    }

    (parsed, rejected)
}

/// An account or investment known to the store, with its raw category string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityRecord {
    pub entity_id: EntityId,

    #[schemars(description = "Raw account category as reported upstream, e.g. 'checking', 'pea', 'loan'")]
    pub raw_category: String,

    pub label: String,
}

impl EntityRecord {
    pub fn new(
        entity_id: EntityId,
        raw_category: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            entity_id,
            raw_category: raw_category.into(),
            label: label.into(),
        }
    }
}

/// How far back a history query reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryWindow {
    #[default]
    All,
    Month,
    Year,
}

impl HistoryWindow {
    /// Accepts the query-string spellings: "" or "all", "month", "year".
    pub fn parse(period: &str) -> Result<Self> {
        match period.trim() {
            "" | "all" => Ok(Self::All),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(ValuationError::InvalidConfig(format!(
                "Invalid history window '{}'. Expected 'all', 'month' or 'year'",
                other
            ))),
        }
    }

    /// Exclusive lower bound on snapshot dates, or `None` for no bound.
    pub fn since(&self, today: NaiveDate, config: &EngineConfig) -> Option<NaiveDate> {
        match self {
            Self::All => None,
            Self::Month => window_start(today, config.month_window_days),
            Self::Year => window_start(today, config.year_window_days),
        }
    }
}

/// Import format for a batch of entities and their snapshot rows.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SnapshotBatch {
    #[serde(default)]
    #[schemars(description = "Accounts and investments with their raw category")]
    pub entities: Vec<EntityRecord>,

    #[serde(default)]
    #[schemars(description = "Snapshot rows; at most one per entity and day, later rows replace earlier ones")]
    pub snapshots: Vec<RawSnapshot>,
}

impl SnapshotBatch {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SnapshotBatch)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
