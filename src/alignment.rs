use crate::aggregation::GroupSeries;
use crate::utils::{day_range, days_inclusive, previous_day};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedGroup {
    pub name: String,
    /// One value per axis date, same order as the axis.
    pub values: Vec<Decimal>,
}

/// Several group series laid on one shared, contiguous date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedAlignedSeries")]
pub struct AlignedMultiSeries {
    axis: Vec<NaiveDate>,
    groups: Vec<AlignedGroup>,
}

#[derive(Deserialize)]
struct UncheckedAlignedSeries {
    axis: Vec<NaiveDate>,
    groups: Vec<AlignedGroup>,
}

impl TryFrom<UncheckedAlignedSeries> for AlignedMultiSeries {
    type Error = String;

    fn try_from(raw: UncheckedAlignedSeries) -> Result<Self, Self::Error> {
        if raw.axis.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err("axis dates must be strictly ascending".to_string());
        }
        if let Some(group) = raw.groups.iter().find(|g| g.values.len() != raw.axis.len()) {
            return Err(format!(
                "group '{}' has {} values for an axis of {} dates",
                group.name,
                group.values.len(),
                raw.axis.len()
            ));
        }
        Ok(Self {
            axis: raw.axis,
            groups: raw.groups,
        })
    }
}

impl AlignedMultiSeries {
    pub fn axis(&self) -> &[NaiveDate] {
        &self.axis
    }

    pub fn groups(&self) -> &[AlignedGroup] {
        &self.groups
    }

    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn values(&self, name: &str) -> Option<&[Decimal]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.values.as_slice())
    }

    pub fn value_on(&self, name: &str, date: NaiveDate) -> Option<Decimal> {
        let idx = self.axis.binary_search(&date).ok()?;
        self.values(name).map(|v| v[idx])
    }

    /// Pointwise sum across all groups for each axis date.
    pub fn daily_totals(&self) -> Vec<(NaiveDate, Decimal)> {
        self.axis
            .iter()
            .enumerate()
            .map(|(i, date)| (*date, self.groups.iter().map(|g| g.values[i]).sum()))
            .collect()
    }

    /// Each group's value on the last axis date.
    pub fn latest_totals(&self) -> Vec<(&str, Decimal)> {
        self.groups
            .iter()
            .map(|g| {
                (
                    g.name.as_str(),
                    g.values.last().copied().unwrap_or(Decimal::ZERO),
                )
            })
            .collect()
    }

    pub fn grand_total(&self) -> Decimal {
        self.latest_totals().into_iter().map(|(_, v)| v).sum()
    }

    /// Share of the grand total held by each group, in percent. `None` when
    /// the grand total is zero.
    pub fn repartition(&self) -> Option<Vec<(&str, Decimal)>> {
        let total = self.grand_total();
        if total.is_zero() {
            return None;
        }
        Some(
            self.latest_totals()
                .into_iter()
                .map(|(name, v)| (name, v / total * Decimal::ONE_HUNDRED))
                .collect(),
        )
    }

    /// Axis-ordered rows with one column per group, for tabular export.
    pub fn to_rows(&self) -> Vec<(NaiveDate, Vec<Decimal>)> {
        self.axis
            .iter()
            .enumerate()
            .map(|(i, date)| (*date, self.groups.iter().map(|g| g.values[i]).collect()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub struct MultiGroupAligner;

impl MultiGroupAligner {
    /// Aligns `groups` on `[earliest first date, today]`, keeping their order.
    ///
    /// Days before a group's own first date are zero. Should a group be missing
    /// a day inside its own span, that day holds the group's previous value.
    /// The axis runs past `today` only when some group already does.
    pub fn align(groups: Vec<GroupSeries>, today: NaiveDate) -> Option<AlignedMultiSeries> {
        let groups: Vec<GroupSeries> = groups.into_iter().filter(|g| !g.is_empty()).collect();

        let global_min = groups.iter().filter_map(|g| g.first_date()).min()?;
        let global_max = groups
            .iter()
            .filter_map(|g| g.last_date())
            .max()
            .map_or(today, |last| last.max(today));

        let axis: Vec<NaiveDate> = day_range(global_min, global_max).collect();

        let aligned = groups
            .into_iter()
            .map(|group| {
                let padding = group
                    .first_date()
                    .and_then(previous_day)
                    .map_or(0, |end| days_inclusive(global_min, end));
                debug!(
                    "Aligning '{}': {} zero days before {:?}",
                    group.name,
                    padding,
                    group.first_date()
                );

                let mut held = Decimal::ZERO;
                let values = axis
                    .iter()
                    .map(|date| {
                        if let Some(v) = group.value_on(*date) {
                            held = v;
                        }
                        held
                    })
                    .collect();

                AlignedGroup {
                    name: group.name,
                    values,
                }
            })
            .collect();

        Some(AlignedMultiSeries {
            axis,
            groups: aligned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn day0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn plus(days: u64) -> NaiveDate {
        day0() + chrono::Days::new(days)
    }

    fn group(name: &str, start: u64, end: u64, value: Decimal) -> GroupSeries {
        let points: BTreeMap<NaiveDate, Decimal> =
            day_range(plus(start), plus(end)).map(|d| (d, value)).collect();
        GroupSeries {
            name: name.to_string(),
            points,
        }
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert!(MultiGroupAligner::align(vec![], day0()).is_none());
    }

    #[test]
    fn test_later_group_is_zero_padded() {
        let mut savings = group("savings", 2, 4, dec!(30));
        savings.points.insert(plus(3), dec!(35));
        savings.points.insert(plus(4), dec!(35));

        let aligned = MultiGroupAligner::align(
            vec![group("stocks", 0, 4, dec!(100)), savings],
            plus(4),
        )
        .unwrap();

        assert_eq!(aligned.axis().len(), 5);
        assert_eq!(aligned.axis()[0], day0());
        assert_eq!(
            aligned.values("savings").unwrap(),
            &[dec!(0), dec!(0), dec!(30), dec!(35), dec!(35)]
        );
        assert_eq!(aligned.values("stocks").unwrap(), &[dec!(100); 5]);
    }

    #[test]
    fn test_single_group_unchanged() {
        let stocks = group("stocks", 0, 3, dec!(7));
        let aligned = MultiGroupAligner::align(vec![stocks.clone()], plus(3)).unwrap();

        assert_eq!(aligned.len(), stocks.len());
        let pairs: Vec<(NaiveDate, Decimal)> = aligned
            .axis()
            .iter()
            .copied()
            .zip(aligned.values("stocks").unwrap().iter().copied())
            .collect();
        assert_eq!(pairs, stocks.to_pairs());
    }

    #[test]
    fn test_group_order_is_preserved() {
        let aligned = MultiGroupAligner::align(
            vec![
                group("Savings books", 0, 2, dec!(1)),
                group("Stocks and funds", 1, 2, dec!(2)),
            ],
            plus(2),
        )
        .unwrap();
        assert_eq!(aligned.names(), vec!["Savings books", "Stocks and funds"]);
    }

    #[test]
    fn test_totals_and_repartition() {
        let aligned = MultiGroupAligner::align(
            vec![
                group("stocks", 0, 2, dec!(300)),
                group("checking", 1, 2, dec!(100)),
            ],
            plus(2),
        )
        .unwrap();

        assert_eq!(
            aligned.daily_totals(),
            vec![(day0(), dec!(300)), (plus(1), dec!(400)), (plus(2), dec!(400))]
        );
        assert_eq!(aligned.grand_total(), dec!(400));

        let shares = aligned.repartition().unwrap();
        assert_eq!(shares, vec![("stocks", dec!(75)), ("checking", dec!(25))]);
    }

    #[test]
    fn test_repartition_of_zero_total_is_none() {
        let aligned =
            MultiGroupAligner::align(vec![group("checking", 0, 1, dec!(0))], plus(1)).unwrap();
        assert!(aligned.repartition().is_none());
    }

    #[test]
    fn test_rows_follow_axis() {
        let aligned = MultiGroupAligner::align(
            vec![group("a", 0, 1, dec!(1)), group("b", 1, 1, dec!(2))],
            plus(1),
        )
        .unwrap();

        assert_eq!(
            aligned.to_rows(),
            vec![
                (day0(), vec![dec!(1), dec!(0)]),
                (plus(1), vec![dec!(1), dec!(2)])
            ]
        );
        assert_eq!(aligned.value_on("b", day0()), Some(dec!(0)));
        assert!(aligned.to_json().unwrap().contains("\"axis\""));
    }

    #[test]
    fn test_axis_runs_past_today_for_future_dated_group() {
        let aligned = MultiGroupAligner::align(
            vec![group("checking", 0, 2, dec!(10)), group("stocks", 1, 4, dec!(20))],
            plus(2),
        )
        .unwrap();

        assert_eq!(aligned.axis().first(), Some(&day0()));
        assert_eq!(aligned.axis().last(), Some(&plus(4)));
        assert_eq!(
            aligned.values("checking").unwrap(),
            &[dec!(10), dec!(10), dec!(10), dec!(10), dec!(10)]
        );
        assert_eq!(
            aligned.values("stocks").unwrap(),
            &[dec!(0), dec!(20), dec!(20), dec!(20), dec!(20)]
        );
    }

    #[test]
    fn test_json_keeps_exact_values() {
        let big = dec!(12345678901234567.89);
        let aligned = MultiGroupAligner::align(
            vec![group("stocks", 0, 1, big), group("checking", 1, 1, dec!(0.01))],
            plus(1),
        )
        .unwrap();

        let json = aligned.to_json().unwrap();
        assert!(json.contains("12345678901234567.89"));

        let restored = AlignedMultiSeries::from_json(&json).unwrap();
        assert_eq!(restored, aligned);
        assert_eq!(restored.value_on("stocks", plus(1)), Some(big));
        assert_eq!(restored.daily_totals()[1].1, dec!(12345678901234567.90));
    }

    #[test]
    fn test_json_with_mismatched_lengths_is_rejected() {
        let short = r#"{
            "axis": ["2024-01-01", "2024-01-02"],
            "groups": [{"name": "stocks", "values": ["1"]}]
        }"#;
        let err = AlignedMultiSeries::from_json(short).unwrap_err();
        assert!(err.to_string().contains("stocks"));

        let unordered = r#"{
            "axis": ["2024-01-02", "2024-01-01"],
            "groups": [{"name": "stocks", "values": ["1", "2"]}]
        }"#;
        assert!(AlignedMultiSeries::from_json(unordered).is_err());
    }
}
