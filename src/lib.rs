//! # Valuation History
//!
//! A library for converting sparse, irregularly dated account balance and
//! investment valuation snapshots into dense daily time series suitable for
//! dashboards and charts.
//!
//! ## Core Concepts
//!
//! - **Snapshot**: one observed value for an entity on one calendar day
//! - **Dense Series**: one value per calendar day from an entity's first snapshot
//!   through "today", gaps filled by carrying the last observed value forward
//! - **Group Series**: the per-day sum of the dense series of every entity in a
//!   classification bucket (stocks and funds, bank accounts, savings books)
//! - **Aligned Series**: several group series laid on one shared date axis, with
//!   explicit zeros before a group's first real date
//!
//! "Today" is captured once per request in a [`RequestContext`] and threaded
//! through every step, so all series in one response share the same axis.
//!
//! ## Example
//!
//! ```rust,ignore
//! use valuation_history::*;
//! use chrono::NaiveDate;
//!
//! let mut store = InMemorySnapshotStore::new();
//! store.add_entity(EntityRecord::new(1, "checking", "Main account"));
//! store.upsert(RawSnapshot::new(1, "2024-01-01", Decimal::from(100)));
//! store.upsert(RawSnapshot::new(1, "2024-01-05", Decimal::from(150)));
//!
//! let service = ValuationHistoryService::new(store, EngineConfig::default());
//! let ctx = RequestContext::new(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
//!
//! let report = service.get_entity_series(&ctx, 1, HistoryWindow::All).unwrap();
//! let series = report.data.unwrap();
//! assert_eq!(series.len(), 7);
//! ```

pub mod aggregation;
pub mod alignment;
pub mod classification;
pub mod config;
pub mod engine;
pub mod error;
pub mod schema;
pub mod store;
pub mod utils;

pub use aggregation::{GroupAggregator, GroupSeries};
pub use alignment::{AlignedGroup, AlignedMultiSeries, MultiGroupAligner};
pub use classification::{classify, select_entities, Bucket};
pub use config::EngineConfig;
pub use engine::SeriesBuilder;
pub use error::{Result, ValuationError};
pub use rust_decimal::Decimal;
pub use schema::*;
pub use store::{InMemorySnapshotStore, SnapshotStore};
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOrigin {
    /// Exact value recorded by the store for this day
    Snapshot,
    /// Day between two snapshots, holding the earlier snapshot's value
    CarriedForward,
    /// Day after the last snapshot, up to and including today
    ExtendedToToday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub value: Decimal,
    pub origin: DataOrigin,
}

/// Gap-filled daily series for one entity. Keys are ascending and contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSeries {
    pub entity_id: EntityId,
    pub points: BTreeMap<NaiveDate, DailyPoint>,
}

impl DenseSeries {
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
        self.points.get(&date).map(|p| p.value)
    }

    /// Ordered `(date, value)` pairs, the shape handed to charts.
    pub fn to_pairs(&self) -> Vec<(NaiveDate, Decimal)> {
        self.points.iter().map(|(d, p)| (*d, p.value)).collect()
    }
}

/// Per-request state. `today` is sampled once and never re-read from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub today: NaiveDate,
}

impl RequestContext {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn for_local_today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

/// A query result together with the snapshots that were dropped on the way
/// because their stored date could not be parsed.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation<T> {
    /// `None` means no data, which is not the same as a series of zeros
    pub data: Option<T>,
    pub rejected: Vec<RejectedSnapshot>,
}

impl<T> Reconciliation<T> {
    pub fn is_no_data(&self) -> bool {
        self.data.is_none()
    }

    pub fn has_integrity_issues(&self) -> bool {
        !self.rejected.is_empty()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

pub struct ValuationHistoryService<S: SnapshotStore> {
    store: S,
    config: EngineConfig,
}

impl<S: SnapshotStore> ValuationHistoryService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_entity_series(
        &self,
        ctx: &RequestContext,
        entity_id: EntityId,
        window: HistoryWindow,
    ) -> Result<Reconciliation<DenseSeries>> {
        self.config.validate()?;
        info!(
            "Building entity series for {} (window {:?}, today {})",
            entity_id, window, ctx.today
        );

        let since = window.since(ctx.today, &self.config);
        let rows = self.store.snapshots_for_entity(entity_id, since)?;
        let (snapshots, rejected) = parse_rows(&rows);
        log_rejections(&rejected);

        let builder = SeriesBuilder::new(&self.config);
        let data = builder.build(entity_id, &snapshots, ctx.today)?;

        Ok(Reconciliation { data, rejected })
    }

    pub fn get_group_series(
        &self,
        ctx: &RequestContext,
        bucket: Bucket,
        window: HistoryWindow,
    ) -> Result<Reconciliation<GroupSeries>> {
        self.config.validate()?;
        info!(
            "Building group series for '{}' (window {:?}, today {})",
            bucket, window, ctx.today
        );

        let mut rejected = Vec::new();
        let data = self.build_group(ctx, bucket, window, &mut rejected)?;
        log_rejections(&rejected);

        Ok(Reconciliation { data, rejected })
    }

    pub fn get_aligned_multi_series(
        &self,
        ctx: &RequestContext,
        buckets: &[Bucket],
        window: HistoryWindow,
    ) -> Result<Reconciliation<AlignedMultiSeries>> {
        self.config.validate()?;
        info!(
            "Building aligned series for {} buckets (window {:?}, today {})",
            buckets.len(),
            window,
            ctx.today
        );

        let mut rejected = Vec::new();
        let mut groups = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            match self.build_group(ctx, *bucket, window, &mut rejected)? {
                Some(group) => groups.push(group),
                None => debug!("Bucket '{}' has no data, left out of alignment", bucket),
            }
        }
        log_rejections(&rejected);

        let data = MultiGroupAligner::align(groups, ctx.today);
        Ok(Reconciliation { data, rejected })
    }

    /// All three buckets on one axis, in legend order.
    pub fn portfolio_overview(
        &self,
        ctx: &RequestContext,
        window: HistoryWindow,
    ) -> Result<Reconciliation<AlignedMultiSeries>> {
        self.get_aligned_multi_series(ctx, &Bucket::ALL, window)
    }

    fn build_group(
        &self,
        ctx: &RequestContext,
        bucket: Bucket,
        window: HistoryWindow,
        rejected: &mut Vec<RejectedSnapshot>,
    ) -> Result<Option<GroupSeries>> {
        let entities = self.store.entities()?;
        let members = select_entities(&entities, bucket);
        debug!(
            "Bucket '{}' selects {} of {} entities",
            bucket,
            members.len(),
            entities.len()
        );

        let since = window.since(ctx.today, &self.config);
        let rows = self
            .store
            .snapshots_for_categories(bucket.raw_categories(), since)?;
        let (snapshots, mut dropped) = parse_rows(&rows);
        rejected.append(&mut dropped);

        // The store narrows the read; the table decides membership.
        let snapshots: Vec<ValuationSnapshot> = snapshots
            .into_iter()
            .filter(|s| members.contains(&s.entity_id))
            .collect();

        let aggregator = GroupAggregator::new(&self.config);
        aggregator.build_from_snapshots(bucket.name(), &snapshots, ctx.today)
    }
}

fn log_rejections(rejected: &[RejectedSnapshot]) {
    for r in rejected {
        warn!(
            "Rejected snapshot for entity {} with unparseable date '{}'",
            r.entity_id, r.raw_date
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_store() -> InMemorySnapshotStore {
        let mut store = InMemorySnapshotStore::new();
        store.add_entity(EntityRecord::new(1, "checking", "Current account"));
        store.add_entity(EntityRecord::new(2, "pea", "PEA"));
        store.add_entity(EntityRecord::new(3, "loan", "Mortgage"));
        store.upsert(RawSnapshot::new(1, "2024-01-01", dec!(100)));
        store.upsert(RawSnapshot::new(1, "2024-01-05", dec!(150)));
        store.upsert(RawSnapshot::new(2, "2024-01-03", dec!(1000)));
        store.upsert(RawSnapshot::new(3, "2024-01-01", dec!(-50000)));
        store
    }

    #[test]
    fn test_entity_series_end_to_end() {
        let service = ValuationHistoryService::new(sample_store(), EngineConfig::default());
        let ctx = RequestContext::new(day(2024, 1, 7));

        let report = service
            .get_entity_series(&ctx, 1, HistoryWindow::All)
            .unwrap();
        assert!(!report.has_integrity_issues());

        let series = report.into_data().unwrap();
        let values: Vec<Decimal> = series.to_pairs().into_iter().map(|(_, v)| v).collect();
        assert_eq!(
            values,
            vec![
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(150),
                dec!(150),
                dec!(150)
            ]
        );
    }

    #[test]
    fn test_unknown_entity_is_no_data() {
        let service = ValuationHistoryService::new(sample_store(), EngineConfig::default());
        let ctx = RequestContext::new(day(2024, 1, 7));

        let report = service
            .get_entity_series(&ctx, 42, HistoryWindow::All)
            .unwrap();
        assert!(report.is_no_data());
    }

    #[test]
    fn test_malformed_date_is_rejected_not_defaulted() {
        let mut store = sample_store();
        store.upsert(RawSnapshot::new(1, "2024-13-40", dec!(999)));
        let service = ValuationHistoryService::new(store, EngineConfig::default());
        let ctx = RequestContext::new(day(2024, 1, 7));

        let report = service
            .get_entity_series(&ctx, 1, HistoryWindow::All)
            .unwrap();
        assert!(report.has_integrity_issues());
        assert_eq!(report.rejected[0].raw_date, "2024-13-40");

        let series = report.data.unwrap();
        assert_eq!(series.first_date(), Some(day(2024, 1, 1)));
        assert!(series.points.values().all(|p| p.value != dec!(999)));
    }

    #[test]
    fn test_portfolio_overview_excludes_unclassified() {
        let service = ValuationHistoryService::new(sample_store(), EngineConfig::default());
        let ctx = RequestContext::new(day(2024, 1, 7));

        let aligned = service
            .portfolio_overview(&ctx, HistoryWindow::All)
            .unwrap()
            .into_data()
            .unwrap();

        assert_eq!(aligned.names(), vec!["Stocks and funds", "Bank accounts"]);
        assert_eq!(aligned.axis().first(), Some(&day(2024, 1, 1)));
        assert_eq!(aligned.grand_total(), dec!(1150));
    }

    #[test]
    fn test_unpadded_date_is_rejected_without_failing_entity() {
        let mut store = InMemorySnapshotStore::new();
        store.add_entity(EntityRecord::new(1, "checking", "Current account"));
        store.upsert(RawSnapshot::new(1, "2024-1-5", dec!(50)));
        store.upsert(RawSnapshot::new(1, "2024-01-10", dec!(100)));
        store.upsert(RawSnapshot::new(1, "2024-01-05", dec!(60)));
        let service = ValuationHistoryService::new(store, EngineConfig::default());
        let ctx = RequestContext::new(day(2024, 1, 12));

        let report = service
            .get_entity_series(&ctx, 1, HistoryWindow::All)
            .unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].raw_date, "2024-1-5");

        let series = report.data.unwrap();
        assert_eq!(series.first_date(), Some(day(2024, 1, 5)));
        assert_eq!(series.value_on(day(2024, 1, 5)), Some(dec!(60)));
        assert_eq!(series.value_on(day(2024, 1, 10)), Some(dec!(100)));

        let group = service
            .get_group_series(&ctx, Bucket::BankAccounts, HistoryWindow::All)
            .unwrap();
        assert_eq!(group.rejected.len(), 1);
        assert_eq!(group.data.unwrap().len(), 8);
    }

    #[test]
    fn test_dense_series_json_is_exact() {
        let big = dec!(12345678901234567.89);
        let series = SeriesBuilder::new(&EngineConfig::default())
            .build(
                1,
                &[ValuationSnapshot::new(1, day(2024, 1, 1), big)],
                day(2024, 1, 2),
            )
            .unwrap()
            .unwrap();

        let json = serde_json::to_string(&series).unwrap();
        let restored: DenseSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, series);
        assert_eq!(restored.value_on(day(2024, 1, 2)), Some(big));
    }

    #[test]
    fn test_local_today_context() {
        let before = chrono::Local::now().date_naive();
        let ctx = RequestContext::for_local_today();
        let after = chrono::Local::now().date_naive();
        assert!(before <= ctx.today && ctx.today <= after);
    }
}
