//! Human-friendly time formatting for the console.

use chrono::{DateTime, Duration, Utc};

/// Short last-seen text: "Active now" while online, clock time within the
/// last day, date otherwise.
pub fn last_seen_short(last_seen: Option<DateTime<Utc>>, online: bool) -> String {
    last_seen_short_at(last_seen, online, Utc::now())
}

fn last_seen_short_at(last_seen: Option<DateTime<Utc>>, online: bool, now: DateTime<Utc>) -> String {
    if online {
        return "Active now".to_string();
    }
    let Some(seen) = last_seen else {
        return "-".to_string();
    };
    if now.signed_duration_since(seen) < Duration::hours(24) {
        seen.format("%-I:%M %p UTC").to_string()
    } else {
        seen.format("%b %-d").to_string()
    }
}

/// Full last-seen timestamp for hover text.
pub fn last_seen_full(last_seen: Option<DateTime<Utc>>) -> String {
    match last_seen {
        Some(seen) => seen.format("%B %-d, %Y at %-I:%M:%S %p UTC").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_online_is_active_now() {
        assert_eq!(last_seen_short(None, true), "Active now");
    }

    #[test]
    fn test_never_seen_offline() {
        assert_eq!(last_seen_short(None, false), "-");
    }

    #[test]
    fn test_recent_shows_time_older_shows_date() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        let recent = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        assert_eq!(last_seen_short_at(Some(recent), false, now), "9:30 AM UTC");

        let old = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        assert_eq!(last_seen_short_at(Some(old), false, now), "Jun 1");
    }

    #[test]
    fn test_full_timestamp() {
        let seen = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 5).unwrap();
        assert_eq!(last_seen_full(Some(seen)), "June 1, 2024 at 9:30:05 AM UTC");
        assert_eq!(last_seen_full(None), "");
    }
}
