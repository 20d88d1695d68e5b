//! Promotion windows and lenient timestamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The `[starts_at, ends_at]` interval during which a discount applies.
///
/// Either bound may be missing when it came from a feed and failed to parse; a
/// window with a missing bound never matches. Windows are evaluated literally:
/// `starts_at > ends_at` never matches and `starts_at == ends_at` matches only
/// that instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionWindow {
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
}

impl PromotionWindow {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        Self {
            starts_at: Some(starts_at),
            ends_at: Some(ends_at),
        }
    }

    /// Build a window from raw timestamps, keeping unparseable bounds as missing.
    pub fn parse(starts_at: &str, ends_at: &str) -> Self {
        let window = Self {
            starts_at: parse_instant(starts_at),
            ends_at: parse_instant(ends_at),
        };
        if window.starts_at.is_none() || window.ends_at.is_none() {
            tracing::debug!(starts_at, ends_at, "unparseable discount window; treating as inactive");
        }
        window
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.starts_at
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.ends_at
    }

    /// Inclusive on both ends.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }

    /// Both bounds present and `starts_at < ends_at`.
    pub fn is_well_formed(&self) -> bool {
        matches!((self.starts_at, self.ends_at), (Some(s), Some(e)) if s < e)
    }
}

/// Parse an instant the way the discounts feed emits them.
///
/// Accepts RFC 3339 (`2026-03-01T10:00:00Z`, `...+02:00`), naive date-times
/// taken as UTC (`2026-03-01T10:00:00`, `2026-03-01 10:00:00.250`) and bare
/// dates taken as midnight UTC (`2026-03-01`).
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn parses_supported_formats() {
        assert_eq!(parse_instant("2026-03-01T10:00:00Z"), Some(at(2026, 3, 1, 10)));
        assert_eq!(parse_instant("2026-03-01T12:00:00+02:00"), Some(at(2026, 3, 1, 10)));
        assert_eq!(parse_instant("2026-03-01T10:00:00"), Some(at(2026, 3, 1, 10)));
        assert_eq!(parse_instant("2026-03-01 10:00:00.000"), Some(at(2026, 3, 1, 10)));
        assert_eq!(parse_instant("2026-03-01T10:00"), Some(at(2026, 3, 1, 10)));
        assert_eq!(parse_instant(" 2026-03-01 "), Some(at(2026, 3, 1, 0)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_instant(""), None);
        assert_eq!(parse_instant("yesterday"), None);
        assert_eq!(parse_instant("2026-13-01"), None);
    }

    #[test]
    fn contains_is_inclusive() {
        let w = PromotionWindow::new(at(2026, 3, 1, 0), at(2026, 3, 2, 0));
        assert!(w.contains(at(2026, 3, 1, 0)));
        assert!(w.contains(at(2026, 3, 1, 12)));
        assert!(w.contains(at(2026, 3, 2, 0)));
        assert!(!w.contains(at(2026, 3, 2, 0) + Duration::nanoseconds(1)));
        assert!(!w.contains(at(2026, 3, 1, 0) - Duration::seconds(1)));
    }

    #[test]
    fn malformed_windows_are_evaluated_literally() {
        let instant = at(2026, 3, 1, 0);
        let reversed = PromotionWindow::new(at(2026, 3, 2, 0), instant);
        assert!(!reversed.is_well_formed());
        assert!(!reversed.contains(instant));
        assert!(!reversed.contains(at(2026, 3, 1, 12)));

        let point = PromotionWindow::new(instant, instant);
        assert!(!point.is_well_formed());
        assert!(point.contains(instant));
        assert!(!point.contains(instant + Duration::seconds(1)));
    }

    #[test]
    fn unparseable_bound_never_matches() {
        let w = PromotionWindow::parse("2026-03-01", "soon");
        assert_eq!(w.starts_at(), Some(at(2026, 3, 1, 0)));
        assert_eq!(w.ends_at(), None);
        assert!(!w.contains(at(2026, 3, 1, 0)));
        assert!(!w.is_well_formed());
    }
}
