use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::app::reconcile_use_case::{BackOfficeOrigin, Reconciliation};
use crate::report::period::Period;
use crate::report::stats::{
    self, BranchMetrics, BranchTrend, ComparisonEntry, KeyedCounts, RateBand,
};
use crate::types::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: Period,
    #[serde(flatten)]
    pub metrics: BranchMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchCard {
    pub branch: String,
    #[serde(flatten)]
    pub metrics: BranchMetrics,
    pub band: RateBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Comparison of both sources for one day, plus scoring cards for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySection {
    pub day: NaiveDate,
    pub comparison: Vec<ComparisonEntry>,
    pub branches: Vec<BranchCard>,
}

/// Everything the dashboard shows, computed from one reconciliation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub generated_at: NaiveDateTime,
    pub back_office_origin: BackOfficeOrigin,
    pub scoring_records: usize,
    pub back_office_records: usize,
    pub summary: Vec<PeriodSummary>,
    pub detail_period: Period,
    pub status_distribution: Vec<StatusCount>,
    pub by_manager: Vec<KeyedCounts<String>>,
    pub by_branch: Vec<KeyedCounts<String>>,
    pub daily: Vec<KeyedCounts<NaiveDate>>,
    pub today: DaySection,
    pub yesterday: DaySection,
    pub trend: Vec<BranchTrend>,
    pub branch_detail: Vec<BranchCard>,
}

fn cards(dataset: &Dataset) -> Vec<BranchCard> {
    stats::metrics_by_branch(dataset)
        .into_iter()
        .map(|(branch, metrics)| BranchCard {
            branch,
            band: metrics.band(),
            metrics,
        })
        .collect()
}

fn slice(dataset: &Dataset, period: Period, today: NaiveDate) -> Dataset {
    dataset.filter(|r| period.contains(r.date, today))
}

impl DashboardReport {
    /// `detail` selects the window for the breakdowns (week or month).
    pub fn build(rec: &Reconciliation, detail: Period) -> Self {
        let today = rec.reconciled_at.date();
        let yesterday = today - Duration::days(1);
        let scoring = &rec.scoring;

        let summary = Period::ALL
            .iter()
            .map(|&period| PeriodSummary {
                period,
                metrics: BranchMetrics::of(&slice(scoring, period, today)),
            })
            .collect();

        let selected = slice(scoring, detail, today);
        let today_scoring = scoring.on_day(today);
        let yesterday_scoring = scoring.on_day(yesterday);

        DashboardReport {
            generated_at: rec.reconciled_at,
            back_office_origin: rec.back_office_origin,
            scoring_records: scoring.len(),
            back_office_records: rec.back_office.len(),
            summary,
            detail_period: detail,
            status_distribution: stats::status_distribution(&selected)
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            by_manager: stats::crosstab(&selected, |r| r.manager.as_deref()),
            by_branch: stats::crosstab(&selected, |r| Some(r.branch.as_str())),
            daily: stats::daily_series(&selected),
            today: DaySection {
                day: today,
                comparison: rec.compare_on(today),
                branches: cards(&today_scoring),
            },
            yesterday: DaySection {
                day: yesterday,
                comparison: rec.compare_on(yesterday),
                branches: cards(&yesterday_scoring),
            },
            trend: stats::day_over_day(&today_scoring, &yesterday_scoring),
            branch_detail: cards(&selected),
        }
    }
}

fn arrow(change: i64) -> &'static str {
    match change {
        c if c > 0 => "↑",
        c if c < 0 => "↓",
        _ => "=",
    }
}

fn band_mark(band: RateBand) -> &'static str {
    match band {
        RateBand::High => "+",
        RateBand::Medium => "~",
        RateBand::Low => "-",
    }
}

fn write_day(f: &mut fmt::Formatter<'_>, title: &str, section: &DaySection) -> fmt::Result {
    writeln!(f, "\n== {} ({}) ==", title, section.day)?;
    if section.comparison.is_empty() {
        writeln!(f, "  no applications")?;
        return Ok(());
    }
    writeln!(
        f,
        "  {:<24} {:>8} {:>12} {:>7} {:>9}",
        "branch", "scoring", "back office", "total", "scoring %"
    )?;
    for e in &section.comparison {
        writeln!(
            f,
            "  {:<24} {:>8} {:>12} {:>7} {:>8.1}%",
            e.branch, e.scoring, e.back_office, e.total, e.scoring_share
        )?;
    }
    for card in &section.branches {
        writeln!(
            f,
            "  {} total {}, approved {}, rejected {}, rate {:.1}%",
            card.branch,
            card.metrics.total,
            card.metrics.approved,
            card.metrics.rejected,
            card.metrics.approval_rate
        )?;
    }
    Ok(())
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kredit Market scoring dashboard, {}", self.generated_at)?;
        writeln!(
            f,
            "scoring records: {}, back-office records: {} (from {:?})",
            self.scoring_records, self.back_office_records, self.back_office_origin
        )?;

        writeln!(f, "\n== Summary ==")?;
        for s in &self.summary {
            writeln!(
                f,
                "  {:<13} total {:>5}  approved {:>5}  rejected {:>5}  rate {:>5.1}%",
                s.period.label(),
                s.metrics.total,
                s.metrics.approved,
                s.metrics.rejected,
                s.metrics.approval_rate
            )?;
        }

        writeln!(f, "\n== Status distribution, {} ==", self.detail_period.label())?;
        for s in &self.status_distribution {
            writeln!(f, "  {:<24} {:>6}", s.status, s.count)?;
        }

        for (title, rows) in [("Managers", &self.by_manager), ("Branches", &self.by_branch)] {
            writeln!(f, "\n== {}, {} ==", title, self.detail_period.label())?;
            for row in rows {
                writeln!(
                    f,
                    "  {:<24} approved {:>5}  rejected {:>5}  other {:>5}",
                    row.key, row.counts.approved, row.counts.rejected, row.counts.other
                )?;
            }
        }

        writeln!(f, "\n== Daily, {} ==", self.detail_period.label())?;
        for row in &self.daily {
            writeln!(
                f,
                "  {}  approved {:>5}  rejected {:>5}  other {:>5}",
                row.key, row.counts.approved, row.counts.rejected, row.counts.other
            )?;
        }

        write_day(f, "Today", &self.today)?;
        write_day(f, "Yesterday", &self.yesterday)?;

        writeln!(f, "\n== Day over day ==")?;
        for t in &self.trend {
            writeln!(
                f,
                "  {:<24} today {:>5}  yesterday {:>5}  {} {:<5} rate {:.1}% / {:.1}%",
                t.branch,
                t.today,
                t.yesterday,
                arrow(t.change),
                t.change.abs(),
                t.today_rate,
                t.yesterday_rate
            )?;
        }

        writeln!(f, "\n== Branch detail, {} ==", self.detail_period.label())?;
        for card in &self.branch_detail {
            writeln!(
                f,
                "  [{}] {:<24} total {:>5}  approved {:>5}  rejected {:>5}  rate {:>5.1}%",
                band_mark(card.band),
                card.branch,
                card.metrics.total,
                card.metrics.approved,
                card.metrics.rejected,
                card.metrics.approval_rate
            )?;
        }
        Ok(())
    }
}
