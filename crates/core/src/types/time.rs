//! Epoch-millisecond timestamps and their display format.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Current time as epoch milliseconds.
///
/// Token expiries are stored in this form so the expiry gate is a plain
/// integer comparison.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format an epoch-millisecond timestamp as `YYYY/M/D H:MM:SS`.
///
/// Month, day and hour are unpadded. This is the display form used for
/// echoed token expiries and order authorization dates; the stored value
/// stays numeric.
#[must_use]
pub fn display_timestamp(ms: i64) -> String {
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(ms).unwrap_or_default();
    format!(
        "{}/{}/{} {}:{:02}:{:02}",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_timestamp_unpadded_date() {
        // 2021-02-03 04:05:06 UTC
        let ms = 1_612_325_106_000;
        assert_eq!(display_timestamp(ms), "2021/2/3 4:05:06");
    }

    #[test]
    fn display_timestamp_epoch() {
        assert_eq!(display_timestamp(0), "1970/1/1 0:00:00");
    }

    #[test]
    fn now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
