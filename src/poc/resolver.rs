// src/poc/resolver.rs

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

use super::error::PocError;
use super::model::Poc;
use super::store::PocStore;

/// Closed instant interval covering one calendar day in the reference offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn day_window(date: NaiveDate, offset: FixedOffset) -> DayWindow {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    let start = DateTime::<Utc>::from_naive_utc_and_offset(utc_midnight, Utc);
    // postgres timestamptz resolution is one microsecond
    let end = start + Duration::days(1) - Duration::microseconds(1);
    DayWindow { start, end }
}

/// Start of `date` in the reference offset; calendar-day inputs are stored this way.
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    day_window(date, offset).start
}

pub fn covers(poc: &Poc, window: &DayWindow) -> bool {
    poc.start_date <= window.end && poc.stop_date.is_none_or(|stop| stop >= window.start)
}

/// Latest `start_date` wins; `created_at` then `id` settle exact ties.
pub fn select_active(candidates: Vec<Poc>, window: &DayWindow) -> Option<Poc> {
    candidates
        .into_iter()
        .filter(|p| covers(p, window))
        .max_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
}

pub async fn resolve(
    store: &dyn PocStore,
    individual_id: &str,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<Option<Poc>, PocError> {
    let window = day_window(date, offset);
    let candidates = store.pocs_covering(individual_id, &window).await?;
    Ok(select_active(candidates, &window))
}

pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, PocError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| PocError::Validation(format!("{field} must be YYYY-MM-DD")))
}
