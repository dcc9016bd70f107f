use crate::error::{AppError, Result};
use serde::Serialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration};

/// Calendar date format used on every boundary (`YYYY-MM-DD`).
pub const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_iso_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), ISO_DATE)
        .map_err(|e| AppError::Parse(format!("Invalid date '{}': {}", raw, e)))
}

pub fn format_iso_date(date: Date) -> String {
    // The format only contains numeric components; it cannot fail for a valid Date.
    date.format(ISO_DATE)
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day()))
}

/// Serde adapter writing dates as `YYYY-MM-DD` strings.
pub mod iso_date {
    use serde::Serializer;
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_iso_date(*date))
    }
}

/// Inclusive date range used as a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

impl TimeWindow {
    /// `date ± weeks`, both ends inclusive.
    pub fn around(date: Date, weeks: i64) -> Result<Self> {
        let half = Duration::weeks(weeks);
        let start = date
            .checked_sub(half)
            .ok_or_else(|| AppError::Parse(format!("Date {} minus {} weeks is out of range", date, weeks)))?;
        let end = date
            .checked_add(half)
            .ok_or_else(|| AppError::Parse(format!("Date {} plus {} weeks is out of range", date, weeks)))?;
        Ok(TimeWindow { start, end })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}
