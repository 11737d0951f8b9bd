use chrono::NaiveDate;
use thiserror::Error;

use crate::schema::EntityId;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Malformed snapshot date '{raw}' for entity {entity_id}: expected YYYY-MM-DD")]
    MalformedDate { entity_id: EntityId, raw: String },

    #[error("Snapshots for entity {entity_id} are not strictly ascending: {previous} is followed by {next}")]
    UnorderedSnapshots {
        entity_id: EntityId,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("Series for entity {entity_id} spans {days} days from {first} to {last}, more than the allowed {max_days}")]
    SpanTooLarge {
        entity_id: EntityId,
        first: NaiveDate,
        last: NaiveDate,
        days: i64,
        max_days: i64,
    },

    #[error("Unknown classification: {0}")]
    UnknownClassification(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ValuationError>;
