use crate::config::EngineConfig;
use crate::error::{Result, ValuationError};
use crate::schema::{EntityId, ValuationSnapshot};
use crate::utils::{day_range, days_between_exclusive, days_inclusive};
use crate::{DailyPoint, DataOrigin, DenseSeries};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Turns one entity's sparse snapshots into a gap-filled daily series.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    max_span_days: i64,
}

impl SeriesBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_span_days: config.max_span_days,
        }
    }

    /// Builds the dense series for `entity_id`, or `None` when there are no snapshots.
    ///
    /// `snapshots` must belong to `entity_id` and be strictly ascending by date.
    /// Every day between two snapshots carries the earlier value; days after the
    /// last snapshot through `today` carry the last value. A snapshot dated after
    /// `today` ends the series at its own date.
    pub fn build(
        &self,
        entity_id: EntityId,
        snapshots: &[ValuationSnapshot],
        today: NaiveDate,
    ) -> Result<Option<DenseSeries>> {
        let (first, last) = match (snapshots.first(), snapshots.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(None),
        };

        for pair in snapshots.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ValuationError::UnorderedSnapshots {
                    entity_id,
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }

        let end = last.date.max(today);
        let span = days_inclusive(first.date, end);
        if span > self.max_span_days {
            return Err(ValuationError::SpanTooLarge {
                entity_id,
                first: first.date,
                last: end,
                days: span,
                max_days: self.max_span_days,
            });
        }

        let mut points = BTreeMap::new();
        let mut cursor = first;
        points.insert(cursor.date, point(cursor, DataOrigin::Snapshot));

        for next in &snapshots[1..] {
            for date in days_between_exclusive(cursor.date, next.date) {
                points.insert(date, point(cursor, DataOrigin::CarriedForward));
            }
            points.insert(next.date, point(next, DataOrigin::Snapshot));
            cursor = next;
        }

        if let Some(after_last) = cursor.date.succ_opt() {
            for date in day_range(after_last, today) {
                points.insert(date, point(cursor, DataOrigin::ExtendedToToday));
            }
        }

        debug!(
            "Entity {}: {} snapshots densified into {} days ({} to {})",
            entity_id,
            snapshots.len(),
            points.len(),
            first.date,
            end
        );

        Ok(Some(DenseSeries { entity_id, points }))
    }
}

fn point(snapshot: &ValuationSnapshot, origin: DataOrigin) -> DailyPoint {
    DailyPoint {
        value: snapshot.value,
        origin,
    }
}
