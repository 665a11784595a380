//! Timestamp formatting shared by everything that writes to the warehouse.
//!
//! Stored timestamps are RFC 3339 in UTC with a fixed microsecond precision and
//! a `Z` suffix. With a fixed width, string order equals chronological order,
//! which the registry relies on for `ORDER BY created_at`.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
pub fn format(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time, formatted for storage.
pub fn now() -> String {
    format(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_width_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);

        assert_eq!(format(earlier), "2024-01-01T09:00:00.000000Z");
        assert_eq!(format(earlier).len(), format(later).len());
        assert!(format(earlier) < format(later));
    }
}
