use crate::error::Result;
use crate::schema::{EntityId, EntityRecord, RawSnapshot, SnapshotBatch};
use crate::utils::format_snapshot_date;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Read side of the snapshot database.
pub trait SnapshotStore {
    fn entities(&self) -> Result<Vec<EntityRecord>>;

    /// Rows for one entity, ascending by date. With `since`, only rows dated
    /// strictly after it.
    fn snapshots_for_entity(
        &self,
        entity_id: EntityId,
        since: Option<NaiveDate>,
    ) -> Result<Vec<RawSnapshot>>;

    /// Rows of every entity whose raw category is one of `categories`,
    /// ascending by date. Rows of different entities may interleave.
    fn snapshots_for_categories(
        &self,
        categories: &[&str],
        since: Option<NaiveDate>,
    ) -> Result<Vec<RawSnapshot>> {
        let mut rows = Vec::new();
        for entity in self.entities()? {
            let category = entity.raw_category.trim();
            if categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                rows.extend(self.snapshots_for_entity(entity.entity_id, since)?);
            }
        }
        // Stable, so each entity keeps its own ascending order.
        rows.sort_by(|a, b| a.date.trim().cmp(b.date.trim()));
        Ok(rows)
    }
}

/// Store backed by ordered maps, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    entities: BTreeMap<EntityId, EntityRecord>,
    rows: BTreeMap<(EntityId, String), RawSnapshot>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_batch(batch: SnapshotBatch) -> Self {
        let mut store = Self::new();
        for entity in batch.entities {
            store.add_entity(entity);
        }
        for row in batch.snapshots {
            store.upsert(row);
        }
        store
    }

    pub fn add_entity(&mut self, entity: EntityRecord) {
        self.entities.insert(entity.entity_id, entity);
    }

    /// Inserts a row, replacing any existing row for the same entity and day.
    pub fn upsert(&mut self, row: RawSnapshot) {
        let key = (row.entity_id, row.date.trim().to_string());
        self.rows.insert(key, row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn entities(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.entities.values().cloned().collect())
    }

    fn snapshots_for_entity(
        &self,
        entity_id: EntityId,
        since: Option<NaiveDate>,
    ) -> Result<Vec<RawSnapshot>> {
        // Text comparison, as the database does on its ISO date column.
        let bound = since.map(format_snapshot_date);
        Ok(self
            .rows
            .range((entity_id, String::new())..)
            .take_while(|((id, _), _)| *id == entity_id)
            .filter(|((_, date), _)| bound.as_ref().map_or(true, |b| date > b))
            .map(|(_, row)| row.clone())
            .collect())
    }
}
