//! Epoch timestamp bucketing.

use chrono::{DateTime, NaiveDate, Timelike};

/// Shift an epoch timestamp by `offset_secs`; out-of-range values clamp to the epoch.
fn shifted(epoch: i64, offset_secs: i64) -> DateTime<chrono::Utc> {
    DateTime::from_timestamp(epoch.saturating_add(offset_secs), 0).unwrap_or_default()
}

/// Hour-truncated ISO timestamp, e.g. `2021-02-01T13:00:00`.
pub fn hour_bucket(epoch: i64, offset_secs: i64) -> String {
    shifted(epoch, offset_secs)
        .format("%Y-%m-%dT%H:00:00")
        .to_string()
}

/// Calendar day of an epoch timestamp after applying the offset.
pub fn day_of(epoch: i64, offset_secs: i64) -> NaiveDate {
    shifted(epoch, offset_secs).date_naive()
}

/// Hour of day (0-23) of an epoch timestamp after applying the offset.
pub fn hour_of(epoch: i64, offset_secs: i64) -> u32 {
    shifted(epoch, offset_secs).hour()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2021-02-01T13:45:10Z
    const TS: i64 = 1_612_187_110;

    #[test]
    fn test_hour_bucket_truncates() {
        assert_eq!(hour_bucket(TS, 0), "2021-02-01T13:00:00");
        assert_eq!(hour_bucket(TS, -5 * 3600), "2021-02-01T08:00:00");
    }

    #[test]
    fn test_day_crosses_midnight_with_offset() {
        assert_eq!(day_of(TS, 0), NaiveDate::from_ymd_opt(2021, 2, 1).unwrap());
        assert_eq!(
            day_of(TS, 11 * 3600),
            NaiveDate::from_ymd_opt(2021, 2, 2).unwrap()
        );
    }

    #[test]
    fn test_hour_of() {
        assert_eq!(hour_of(TS, 0), 13);
        assert_eq!(hour_of(TS, 12 * 3600), 1);
    }
}
