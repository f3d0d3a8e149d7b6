//! Construction of the fixed trimester buckets and month-to-bucket lookup.
//!
//! The window always spans [`BUCKET_COUNT`] consecutive three-month
//! buckets ending with the reference month, so bucket `0` starts 35
//! months before the reference month and bucket `11` ends on it.

use estate_map_analytics_models::{BUCKET_COUNT, MONTHS_PER_BUCKET, TimeBucket};
use estate_map_transaction_models::YearMonth;

/// Total months covered by the bucket window.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const WINDOW_MONTHS: i32 = BUCKET_COUNT as i32 * MONTHS_PER_BUCKET;

/// Builds the [`BUCKET_COUNT`] buckets ending at `reference`, oldest first.
#[must_use]
pub fn build_periods(reference: YearMonth) -> Vec<TimeBucket> {
    let oldest = reference.add_months(-(WINDOW_MONTHS - 1));

    std::iter::successors(Some(oldest), |start| Some(start.add_months(MONTHS_PER_BUCKET)))
        .take(BUCKET_COUNT)
        .map(|start| {
            let end = start.add_months(MONTHS_PER_BUCKET - 1);
            TimeBucket {
                start,
                end,
                label: period_label(start, end),
            }
        })
        .collect()
}

/// Formats a bucket label as `"{startYear}.{startMonth:02} ~ {endMonth:02}"`.
///
/// The end year is never printed, so a window from December to February
/// reads `"2023.12 ~ 02"`.
#[must_use]
pub fn period_label(start: YearMonth, end: YearMonth) -> String {
    format!("{}.{:02} ~ {:02}", start.year(), start.month(), end.month())
}

/// Returns the index of the bucket containing `month`, or `None` when the
/// month is older than the window or later than the reference month.
#[must_use]
pub fn bucket_index(buckets: &[TimeBucket], month: YearMonth) -> Option<usize> {
    buckets.iter().position(|bucket| bucket.contains(month))
}
