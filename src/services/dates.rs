//! Timestamp normalization for raw listing dates.
//!
//! The source prints today's posts as a bare `HH:MM` and older posts with an
//! absolute date in one of several layouts.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Absolute date-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Absolute date layouts, tried in order after the date-time layouts.
const DATE_FORMATS: &[&str] = &["%Y.%m.%d", "%Y-%m-%d"];

/// What to do with a raw date that cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Drop the row
    #[default]
    Strict,
    /// Attribute the row to the reference date
    AssumeToday,
}

/// Resolve a raw date string to a calendar date.
///
/// Returns `None` when no rule applies.
pub fn normalize(raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if is_time_of_day(raw) {
        return Some(reference);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.date());
    }

    if is_short_year(raw) {
        return NaiveDate::parse_from_str(raw, "%y.%m.%d").ok();
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// `HH:MM` or `HH:MM:SS` with valid ranges.
fn is_time_of_day(raw: &str) -> bool {
    raw.len() <= 8
        && raw.bytes().all(|b| b.is_ascii_digit() || b == b':')
        && (NaiveTime::parse_from_str(raw, "%H:%M").is_ok()
            || NaiveTime::parse_from_str(raw, "%H:%M:%S").is_ok())
}

/// `YY.MM.DD`, printed by the listing for posts from earlier years.
fn is_short_year(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Normalizer bound to a date policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampNormalizer {
    policy: DatePolicy,
}

impl TimestampNormalizer {
    pub fn new(policy: DatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DatePolicy {
        self.policy
    }

    /// Normalize, then apply the policy to unresolvable input.
    pub fn resolve(&self, raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
        match (normalize(raw, reference), self.policy) {
            (Some(date), _) => Some(date),
            (None, DatePolicy::AssumeToday) => Some(reference),
            (None, DatePolicy::Strict) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bare_time_resolves_to_reference() {
        let today = ymd(2024, 6, 1);
        assert_eq!(normalize("14:30", today), Some(today));
        assert_eq!(normalize(" 09:05:59 ", today), Some(today));
    }

    #[test]
    fn test_absolute_formats() {
        let today = ymd(2024, 6, 1);
        assert_eq!(normalize("2024.05.30", today), Some(ymd(2024, 5, 30)));
        assert_eq!(normalize("2024-05-30", today), Some(ymd(2024, 5, 30)));
        assert_eq!(normalize("2024.05.30 14:30", today), Some(ymd(2024, 5, 30)));
        assert_eq!(normalize("2024-05-30 14:30:12", today), Some(ymd(2024, 5, 30)));
        assert_eq!(normalize("23.12.31", today), Some(ymd(2023, 12, 31)));
    }

    #[test]
    fn test_unresolvable() {
        let today = ymd(2024, 6, 1);
        assert_eq!(normalize("not-a-date", today), None);
        assert_eq!(normalize("", today), None);
        assert_eq!(normalize("25:99", today), None);
        assert_eq!(normalize("2024.13.40", today), None);
    }

    #[test]
    fn test_policy() {
        let today = ymd(2024, 6, 1);
        let strict = TimestampNormalizer::default();
        assert_eq!(strict.policy(), DatePolicy::Strict);
        assert_eq!(strict.resolve("garbage", today), None);

        let lenient = TimestampNormalizer::new(DatePolicy::AssumeToday);
        assert_eq!(lenient.resolve("garbage", today), Some(today));
        assert_eq!(lenient.resolve("2024.05.30", today), Some(ymd(2024, 5, 30)));
    }
}
