use crate::config::EngineConfig;
use crate::engine::SeriesBuilder;
use crate::error::Result;
use crate::schema::{EntityId, ValuationSnapshot};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-day totals for a named set of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSeries {
    pub name: String,
    pub points: BTreeMap<NaiveDate, Decimal>,
}

impl GroupSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    pub fn value_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.points.get(&date).copied()
    }

    /// Most recent point, the "current total" of the group.
    pub fn latest(&self) -> Option<(NaiveDate, Decimal)> {
        self.points.iter().next_back().map(|(d, v)| (*d, *v))
    }

    pub fn to_pairs(&self) -> Vec<(NaiveDate, Decimal)> {
        self.points.iter().map(|(d, v)| (*d, *v)).collect()
    }
}

/// Sums the dense series of every member entity per day.
#[derive(Debug, Clone)]
pub struct GroupAggregator {
    builder: SeriesBuilder,
}

impl GroupAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            builder: SeriesBuilder::new(config),
        }
    }

    /// Builds the group series for `entity_ids`, fetching each member's
    /// snapshots through `lookup`. Members without snapshots add no dates;
    /// a lookup failure fails the whole group. Returns `None` when no member
    /// has any data.
    pub fn build<F>(
        &self,
        name: &str,
        entity_ids: &BTreeSet<EntityId>,
        mut lookup: F,
        today: NaiveDate,
    ) -> Result<Option<GroupSeries>>
    where
        F: FnMut(EntityId) -> Result<Vec<ValuationSnapshot>>,
    {
        let mut totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        let mut contributors = 0usize;

        for &entity_id in entity_ids {
            let snapshots = lookup(entity_id)?;
            match self.builder.build(entity_id, &snapshots, today)? {
                Some(series) => {
                    contributors += 1;
                    for (date, point) in series.points {
                        *totals.entry(date).or_insert(Decimal::ZERO) += point.value;
                    }
                }
                None => debug!("Entity {} in '{}' has no snapshots", entity_id, name),
            }
        }

        if contributors == 0 {
            debug!("Group '{}' has no data among {} entities", name, entity_ids.len());
            return Ok(None);
        }

        debug!(
            "Group '{}': {} of {} entities contributed {} days",
            name,
            contributors,
            entity_ids.len(),
            totals.len()
        );

        Ok(Some(GroupSeries {
            name: name.to_string(),
            points: totals,
        }))
    }

    /// Same as [`build`](Self::build) for rows already fetched in one query,
    /// ascending by date and possibly interleaving several entities.
    pub fn build_from_snapshots(
        &self,
        name: &str,
        snapshots: &[ValuationSnapshot],
        today: NaiveDate,
    ) -> Result<Option<GroupSeries>> {
        let mut by_entity: BTreeMap<EntityId, Vec<ValuationSnapshot>> = BTreeMap::new();
        for snapshot in snapshots {
            by_entity
                .entry(snapshot.entity_id)
                .or_default()
                .push(snapshot.clone());
        }

        let ids: BTreeSet<EntityId> = by_entity.keys().copied().collect();
        self.build(
            name,
            &ids,
            |entity_id| Ok(by_entity.remove(&entity_id).unwrap_or_default()),
            today,
        )
    }
}
