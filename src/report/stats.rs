//! Aggregate counts over dataset slices.
//!
//! Branch sets that combine two slices are sorted by name so output is stable.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::constants::{RATE_HIGH_THRESHOLD, RATE_MEDIUM_THRESHOLD};
use crate::types::{ApplicationRecord, Dataset, Decision};

/// Approval-rate band used to highlight branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBand {
    High,
    Medium,
    Low,
}

impl RateBand {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= RATE_HIGH_THRESHOLD {
            RateBand::High
        } else if rate >= RATE_MEDIUM_THRESHOLD {
            RateBand::Medium
        } else {
            RateBand::Low
        }
    }
}

/// Decision counts for one slice. `approval_rate` is a percentage, 0 when empty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BranchMetrics {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub approval_rate: f64,
}

impl BranchMetrics {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ApplicationRecord>,
    {
        let mut m = BranchMetrics::default();
        for record in records {
            m.total += 1;
            match record.result {
                Some(Decision::Approved) => m.approved += 1,
                Some(Decision::Rejected) => m.rejected += 1,
                _ => {}
            }
        }
        m.approval_rate = percent(m.approved, m.total);
        m
    }

    pub fn of(dataset: &Dataset) -> Self {
        Self::from_records(dataset.iter())
    }

    pub fn band(&self) -> RateBand {
        RateBand::from_rate(self.approval_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub branch: String,
    pub scoring: usize,
    pub back_office: usize,
    pub total: usize,
    /// Scoring count as a percentage of `total`, 0 when `total` is 0
    pub scoring_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchTrend {
    pub branch: String,
    pub today: usize,
    pub yesterday: usize,
    pub change: i64,
    pub today_rate: f64,
    pub yesterday_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DecisionCounts {
    pub approved: usize,
    pub rejected: usize,
    pub other: usize,
}

impl DecisionCounts {
    fn add(&mut self, decision: &Decision) {
        match decision {
            Decision::Approved => self.approved += 1,
            Decision::Rejected => self.rejected += 1,
            Decision::Other(_) => self.other += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedCounts<K> {
    pub key: K,
    #[serde(flatten)]
    pub counts: DecisionCounts,
}

pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Metrics per branch, in first-appearance order
pub fn metrics_by_branch(dataset: &Dataset) -> Vec<(String, BranchMetrics)> {
    dataset
        .branches()
        .into_iter()
        .map(|branch| {
            let m = BranchMetrics::of(&dataset.for_branch(&branch));
            (branch, m)
        })
        .collect()
}

fn union_of_branches(a: &Dataset, b: &Dataset) -> BTreeSet<String> {
    a.iter().chain(b.iter()).map(|r| r.branch.clone()).collect()
}

fn count_branch(dataset: &Dataset, branch: &str) -> usize {
    dataset.iter().filter(|r| r.branch == branch).count()
}

/// Per-branch counts across the two sources, over the union of their branches
pub fn compare(scoring: &Dataset, back_office: &Dataset) -> Vec<ComparisonEntry> {
    union_of_branches(scoring, back_office)
        .into_iter()
        .map(|branch| {
            let s = count_branch(scoring, &branch);
            let b = count_branch(back_office, &branch);
            ComparisonEntry {
                scoring: s,
                back_office: b,
                total: s + b,
                scoring_share: percent(s, s + b),
                branch,
            }
        })
        .collect()
}

pub fn day_over_day(today: &Dataset, yesterday: &Dataset) -> Vec<BranchTrend> {
    union_of_branches(today, yesterday)
        .into_iter()
        .map(|branch| {
            let t = BranchMetrics::from_records(today.iter().filter(|r| r.branch == branch));
            let y = BranchMetrics::from_records(yesterday.iter().filter(|r| r.branch == branch));
            BranchTrend {
                today: t.total,
                yesterday: y.total,
                change: t.total as i64 - y.total as i64,
                today_rate: t.approval_rate,
                yesterday_rate: y.approval_rate,
                branch,
            }
        })
        .collect()
}

/// Decision counts grouped by `key`; records without a key or a decision are skipped.
pub fn crosstab<F>(dataset: &Dataset, key: F) -> Vec<KeyedCounts<String>>
where
    F: Fn(&ApplicationRecord) -> Option<&str>,
{
    let mut groups: BTreeMap<String, DecisionCounts> = BTreeMap::new();
    for record in dataset.iter() {
        if let (Some(k), Some(decision)) = (key(record), record.result.as_ref()) {
            groups.entry(k.to_string()).or_default().add(decision);
        }
    }
    groups
        .into_iter()
        .map(|(key, counts)| KeyedCounts { key, counts })
        .collect()
}

/// Decision counts per calendar day, oldest first
pub fn daily_series(dataset: &Dataset) -> Vec<KeyedCounts<NaiveDate>> {
    let mut days: BTreeMap<NaiveDate, DecisionCounts> = BTreeMap::new();
    for record in dataset.iter() {
        if let Some(decision) = &record.result {
            days.entry(record.day()).or_default().add(decision);
        }
    }
    days.into_iter()
        .map(|(key, counts)| KeyedCounts { key, counts })
        .collect()
}

/// Count per decision label, most frequent first
pub fn status_distribution(dataset: &Dataset) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for decision in dataset.iter().filter_map(|r| r.result.as_ref()) {
        *counts.entry(decision.label().to_string()).or_default() += 1;
    }
    let mut out: Vec<_> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn rec(day: u32, branch: &str, manager: Option<&str>, result: Option<Decision>) -> ApplicationRecord {
        ApplicationRecord {
            date: NaiveDate::from_ymd_opt(2024, 12, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            branch: branch.into(),
            manager: manager.map(String::from),
            client: None,
            result,
            number: None,
        }
    }

    fn scoring(records: Vec<ApplicationRecord>) -> Dataset {
        Dataset::new(Source::Scoring, records)
    }

    #[test]
    fn test_empty_slice_is_all_zero() {
        let m = BranchMetrics::of(&Dataset::empty(Source::Scoring));
        assert_eq!(m, BranchMetrics { total: 0, approved: 0, rejected: 0, approval_rate: 0.0 });
        assert_eq!(m.band(), RateBand::Low);
    }

    #[test]
    fn test_other_decisions_count_towards_total_only() {
        let m = BranchMetrics::of(&scoring(vec![
            rec(1, "A", None, Some(Decision::Approved)),
            rec(1, "A", None, Some(Decision::Approved)),
            rec(1, "A", None, Some(Decision::Rejected)),
            rec(1, "A", None, Some(Decision::Other("В работе".into()))),
        ]));
        assert_eq!((m.total, m.approved, m.rejected), (4, 2, 1));
        assert_eq!(m.approval_rate, 50.0);
        assert_eq!(m.band(), RateBand::Medium);
    }

    #[test]
    fn test_rate_band_edges() {
        assert_eq!(RateBand::from_rate(70.0), RateBand::High);
        assert_eq!(RateBand::from_rate(69.9), RateBand::Medium);
        assert_eq!(RateBand::from_rate(50.0), RateBand::Medium);
        assert_eq!(RateBand::from_rate(49.9), RateBand::Low);
    }

    #[test]
    fn test_metrics_by_branch_keeps_first_appearance_order() {
        let ds = scoring(vec![
            rec(1, "Панчакент", None, Some(Decision::Approved)),
            rec(1, "Спитамен", None, Some(Decision::Rejected)),
            rec(1, "Панчакент", None, Some(Decision::Rejected)),
        ]);
        let by_branch = metrics_by_branch(&ds);
        assert_eq!(by_branch[0].0, "Панчакент");
        assert_eq!(by_branch[0].1.total, 2);
        assert_eq!(by_branch[1].1.rejected, 1);
    }

    #[test]
    fn test_compare_share() {
        let s = scoring(vec![rec(1, "A", None, None), rec(1, "A", None, None), rec(1, "A", None, None)]);
        let b = Dataset::new(Source::BackOffice, vec![rec(1, "A", None, None), rec(1, "B", None, None)]);
        let entries = compare(&s, &b);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].branch, "A");
        assert_eq!(entries[0].total, 4);
        assert_eq!(entries[0].scoring_share, 75.0);
        assert_eq!(entries[1].scoring_share, 0.0);
    }

    #[test]
    fn test_day_over_day_includes_branches_from_either_day() {
        let today = scoring(vec![rec(9, "A", None, Some(Decision::Approved))]);
        let yesterday = scoring(vec![
            rec(8, "B", None, Some(Decision::Rejected)),
            rec(8, "B", None, Some(Decision::Approved)),
        ]);
        let trend = day_over_day(&today, &yesterday);
        assert_eq!(trend.len(), 2);
        assert_eq!((trend[0].branch.as_str(), trend[0].change), ("A", 1));
        assert_eq!((trend[1].branch.as_str(), trend[1].change), ("B", -2));
        assert_eq!(trend[1].yesterday_rate, 50.0);
    }

    #[test]
    fn test_crosstab_skips_missing_keys() {
        let ds = scoring(vec![
            rec(1, "A", Some("Алиев"), Some(Decision::Approved)),
            rec(1, "A", Some("Алиев"), Some(Decision::Rejected)),
            rec(1, "A", None, Some(Decision::Approved)),
            rec(1, "A", Some("Каримов"), None),
        ]);
        let table = crosstab(&ds, |r| r.manager.as_deref());
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].key, "Алиев");
        assert_eq!(table[0].counts, DecisionCounts { approved: 1, rejected: 1, other: 0 });
    }

    #[test]
    fn test_daily_series_sorted_by_day() {
        let ds = scoring(vec![
            rec(9, "A", None, Some(Decision::Approved)),
            rec(7, "A", None, Some(Decision::Other("x".into()))),
        ]);
        let series = daily_series(&ds);
        assert_eq!(series[0].key, NaiveDate::from_ymd_opt(2024, 12, 7).unwrap());
        assert_eq!(series[0].counts.other, 1);
        assert_eq!(series[1].counts.approved, 1);
    }

    #[test]
    fn test_status_distribution_most_frequent_first() {
        let ds = scoring(vec![
            rec(1, "A", None, Some(Decision::Rejected)),
            rec(1, "A", None, Some(Decision::Approved)),
            rec(1, "A", None, Some(Decision::Rejected)),
        ]);
        assert_eq!(
            status_distribution(&ds),
            vec![("Отказано".to_string(), 2), ("Одобрено".to_string(), 1)]
        );
    }
}
