use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Reporting window, relative to "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    Yesterday,
    /// Calendar days from `today - 7` onwards
    Week,
    /// Calendar days from `today - 30` onwards
    Month,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Today, Period::Yesterday, Period::Week, Period::Month];

    pub fn contains(&self, date: NaiveDateTime, today: NaiveDate) -> bool {
        let day = date.date();
        match self {
            Period::Today => day == today,
            Period::Yesterday => day == today - Duration::days(1),
            Period::Week => day >= today - Duration::days(7),
            Period::Month => day >= today - Duration::days(30),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Yesterday => "yesterday",
            Period::Week => "last 7 days",
            Period::Month => "last 30 days",
        }
    }
}
