//! Calendar periods used to align wind data with the pollutant series

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Resampling period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    /// ISO weeks, starting Monday
    Weekly,
    #[default]
    Monthly,
}

impl Period {
    /// First calendar day of the period containing `time`
    #[must_use]
    pub fn start_of(&self, time: DateTime<Utc>) -> NaiveDate {
        let day = time.date_naive();
        match self {
            Period::Daily => day,
            Period::Weekly => day - Duration::days(i64::from(day.weekday().num_days_from_monday())),
            Period::Monthly => day.with_day(1).unwrap_or(day),
        }
    }

    /// Start of the period as a UTC timestamp at midnight
    #[must_use]
    pub fn start_time(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        self.start_of(time).and_time(chrono::NaiveTime::default()).and_utc()
    }
}
