use chrono::{DateTime, Duration, Utc};

use crate::models::GrowthResult;
use crate::period::{filter_by_date_range, Timestamped};

pub fn calculate_growth<T>(current: &[T], previous: &[T]) -> GrowthResult {
    let current_count = current.len();
    let previous_count = previous.len();

    if previous_count == 0 {
        return GrowthResult {
            percentage: if current_count > 0 { 100 } else { 0 },
            is_increase: current_count > 0,
        };
    }

    let raw = (current_count as f64 - previous_count as f64) / previous_count as f64 * 100.0;
    GrowthResult {
        percentage: raw.abs().round() as u32,
        is_increase: raw >= 0.0,
    }
}

/// Compares the `period_days` ending at `now` against the same span ending
/// one day before the current period starts.
pub fn calculate_period_growth<T, F>(
    items: &[T],
    period_days: i64,
    filter: Option<F>,
    now: DateTime<Utc>,
) -> GrowthResult
where
    T: Timestamped,
    F: Fn(&T) -> bool,
{
    let scoped: Vec<&T> = items
        .iter()
        .filter(|item| filter.as_ref().map_or(true, |keep| keep(*item)))
        .collect();

    let (current_start, current_end) = current_window(now, period_days);
    let (previous_start, previous_end) = previous_window(current_start, period_days);

    let current = filter_by_date_range(&scoped, current_start, current_end);
    let previous = filter_by_date_range(&scoped, previous_start, previous_end);
    calculate_growth(&current, &previous)
}

pub fn current_window(now: DateTime<Utc>, period_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(period_days), now)
}

pub fn previous_window(
    current_start: DateTime<Utc>,
    period_days: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let previous_end = current_start - Duration::days(1);
    let previous_start = previous_end - Duration::days(period_days - 1);
    (previous_start, previous_end)
}
