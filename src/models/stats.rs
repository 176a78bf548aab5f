//! Aggregated word statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Word count for one word on one calendar date.
///
/// `(date, word)` is unique within a table. For a fixed date the counts of
/// all words sum to `total_words`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyWordStat {
    pub date: NaiveDate,
    pub word: String,
    pub count: u64,
    pub total_words: u64,
    pub total_posts: u64,
    pub freq: f64,
}

impl DailyWordStat {
    /// Build a row, deriving `freq` from the counts.
    pub fn new(
        date: NaiveDate,
        word: impl Into<String>,
        count: u64,
        total_words: u64,
        total_posts: u64,
    ) -> Self {
        Self {
            date,
            word: word.into(),
            count,
            total_words,
            total_posts,
            freq: relative_freq(count, total_words),
        }
    }
}

/// `count / total`, or 0 when the total is 0.
pub fn relative_freq(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Per-day totals derived from a table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayTotals {
    pub date: NaiveDate,
    pub total_words: u64,
    pub total_posts: u64,
}

/// One word's figures over a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordSummary {
    pub word: String,
    pub sum_count: u64,
    pub days_appeared: usize,
    pub avg_freq: f64,
    pub max_freq: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freq_derivation() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let stat = DailyWordStat::new(date, "tesla", 2, 8, 3);
        assert_eq!(stat.freq, 0.25);
        assert_eq!(relative_freq(0, 0), 0.0);
    }
}
