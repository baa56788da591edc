// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compact filesystem-safe timestamp for export filenames.
pub fn export_stamp(date: DateTime<Utc>) -> String {
    date.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_stamp_has_no_separators() {
        let date = Utc.with_ymd_and_hms(2024, 3, 10, 7, 12, 0).unwrap();
        assert_eq!(export_stamp(date), "20240310T071200Z");
        assert_eq!(format_utc_rfc3339(date), "2024-03-10T07:12:00Z");
    }
}
