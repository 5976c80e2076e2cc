use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use http::HeaderValue;

const DAY_NAMES: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Format a time as an RFC 1123 HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
///
/// Times before the epoch format as the epoch.
#[must_use]
pub fn format_http_date(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format_epoch_secs(secs)
}

fn format_epoch_secs(secs: u64) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
        DAY_NAMES[(days % 7) as usize],
        day,
        MONTH_NAMES[(month - 1) as usize],
        year,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to a (year, month, day) civil date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

struct Stamp {
    secs: u64,
    value: HeaderValue,
}

/// `Date` header value, formatted at most once per second.
///
/// Readers load the current stamp without locking; the first request of a new
/// second formats and publishes a replacement.
pub(crate) struct DateCache {
    stamp: ArcSwap<Stamp>,
}

impl DateCache {
    pub(crate) fn new() -> Self {
        Self {
            stamp: ArcSwap::from_pointee(Self::stamp_for(Self::now_secs())),
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn stamp_for(secs: u64) -> Stamp {
        let formatted = format_epoch_secs(secs);
        let value = HeaderValue::from_str(&formatted)
            .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));
        Stamp { secs, value }
    }

    pub(crate) fn current(&self) -> HeaderValue {
        let now = Self::now_secs();
        let stamp = self.stamp.load();
        if stamp.secs == now {
            return stamp.value.clone();
        }
        let fresh = Arc::new(Self::stamp_for(now));
        let value = fresh.value.clone();
        self.stamp.store(fresh);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_epoch() {
        assert_eq!(format_http_date(UNIX_EPOCH), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_rfc_example() {
        let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(format_http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29T12:00:00Z
        let t = UNIX_EPOCH + Duration::from_secs(1_709_208_000);
        assert_eq!(format_http_date(t), "Thu, 29 Feb 2024 12:00:00 GMT");
    }

    #[test]
    fn test_cache_returns_valid_value() {
        let cache = DateCache::new();
        let value = cache.current();
        let text = value.to_str().unwrap();
        assert!(text.ends_with(" GMT"));
        assert_eq!(text.len(), 29);
    }
}
