// src/pipeline/query.rs

//! Range and single-day queries over a daily word table.
//!
//! Results are sorted descending by the chosen key; ties fall back to the
//! word in ascending order so output is stable across runs.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{DailyWordStat, WordSummary};

/// Ordering key for range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSort {
    #[default]
    SumCount,
    AvgFreq,
    MaxFreq,
}

impl FromStr for RangeSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "sum_count" => Ok(RangeSort::SumCount),
            "avg_freq" => Ok(RangeSort::AvgFreq),
            "max_freq" => Ok(RangeSort::MaxFreq),
            other => Err(AppError::invalid_argument(format!(
                "unknown range sort key '{other}' (expected sum_count, avg_freq or max_freq)"
            ))),
        }
    }
}

impl fmt::Display for RangeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RangeSort::SumCount => "sum_count",
            RangeSort::AvgFreq => "avg_freq",
            RangeSort::MaxFreq => "max_freq",
        })
    }
}

/// Ordering key for single-day queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySort {
    #[default]
    Count,
    Freq,
}

impl FromStr for DaySort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "count" => Ok(DaySort::Count),
            "freq" => Ok(DaySort::Freq),
            other => Err(AppError::invalid_argument(format!(
                "unknown day sort key '{other}' (expected count or freq)"
            ))),
        }
    }
}

impl fmt::Display for DaySort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DaySort::Count => "count",
            DaySort::Freq => "freq",
        })
    }
}

/// Words over an inclusive date range.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Minimum number of distinct days a word must appear on (≥ 1)
    pub min_days: usize,
    /// Row limit, 0 for all
    pub top_n: usize,
    pub sort: RangeSort,
}

impl RangeQuery {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            min_days: 1,
            top_n: 0,
            sort: RangeSort::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(AppError::invalid_argument(format!(
                "range start {} is after end {}",
                self.start, self.end
            )));
        }
        if self.min_days == 0 {
            return Err(AppError::invalid_argument("min_days must be at least 1"));
        }
        Ok(())
    }
}

/// Words on a single date.
#[derive(Debug, Clone)]
pub struct DayQuery {
    pub date: NaiveDate,
    /// Minimum count on that date (≥ 1)
    pub min_count: u64,
    /// Row limit, 0 for all
    pub top_n: usize,
    pub sort: DaySort,
}

impl DayQuery {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            min_count: 1,
            top_n: 0,
            sort: DaySort::default(),
        }
    }
}

fn truncate<T>(mut rows: Vec<T>, top_n: usize) -> Vec<T> {
    if top_n > 0 {
        rows.truncate(top_n);
    }
    rows
}

/// Aggregate each word's rows in `[start, end]`.
pub fn range(stats: &[DailyWordStat], query: &RangeQuery) -> Result<Vec<WordSummary>> {
    query.validate()?;

    let mut by_word: BTreeMap<&str, Vec<&DailyWordStat>> = BTreeMap::new();
    for row in stats
        .iter()
        .filter(|row| row.date >= query.start && row.date <= query.end)
    {
        by_word.entry(row.word.as_str()).or_default().push(row);
    }

    let mut summaries: Vec<WordSummary> = by_word
        .into_iter()
        .filter(|(_, rows)| rows.len() >= query.min_days)
        .map(|(word, rows)| {
            let sum_freq: f64 = rows.iter().map(|r| r.freq).sum();
            WordSummary {
                word: word.to_string(),
                sum_count: rows.iter().map(|r| r.count).sum(),
                days_appeared: rows.len(),
                avg_freq: sum_freq / rows.len() as f64,
                max_freq: rows.iter().map(|r| r.freq).fold(0.0, f64::max),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        let key = match query.sort {
            RangeSort::SumCount => b.sum_count.cmp(&a.sum_count),
            RangeSort::AvgFreq => b.avg_freq.total_cmp(&a.avg_freq),
            RangeSort::MaxFreq => b.max_freq.total_cmp(&a.max_freq),
        };
        key.then_with(|| a.word.cmp(&b.word))
    });

    Ok(truncate(summaries, query.top_n))
}

/// Rows of a single date with at least `min_count` occurrences.
pub fn day(stats: &[DailyWordStat], query: &DayQuery) -> Result<Vec<DailyWordStat>> {
    if query.min_count == 0 {
        return Err(AppError::invalid_argument("min_count must be at least 1"));
    }

    let mut rows: Vec<DailyWordStat> = stats
        .iter()
        .filter(|row| row.date == query.date && row.count >= query.min_count)
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        let key = match query.sort {
            DaySort::Count => b.count.cmp(&a.count),
            DaySort::Freq => b.freq.total_cmp(&a.freq),
        };
        key.then_with(|| a.word.cmp(&b.word))
    });

    Ok(truncate(rows, query.top_n))
}

/// Word with the highest total count across the table.
pub fn top_word(stats: &[DailyWordStat]) -> Option<String> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for row in stats {
        *totals.entry(row.word.as_str()).or_insert(0) += row.count;
    }
    totals
        .into_iter()
        .max_by(|(wa, ca), (wb, cb)| match ca.cmp(cb) {
            Ordering::Equal => wb.cmp(wa),
            other => other,
        })
        .map(|(word, _)| word.to_string())
}

/// Distinct dates present in the table, ascending.
pub fn dates(stats: &[DailyWordStat]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = stats.iter().map(|row| row.date).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn table() -> Vec<DailyWordStat> {
        vec![
            DailyWordStat::new(date(1), "테슬라", 2, 10, 4),
            DailyWordStat::new(date(1), "금리", 3, 10, 4),
            DailyWordStat::new(date(1), "엔비디아", 5, 10, 4),
            DailyWordStat::new(date(2), "테슬라", 5, 20, 6),
            DailyWordStat::new(date(2), "금리", 1, 20, 6),
            DailyWordStat::new(date(3), "테슬라", 1, 4, 1),
            DailyWordStat::new(date(3), "반도체", 3, 4, 1),
        ]
    }

    #[test]
    fn test_range_sum_count() {
        let query = RangeQuery::new(date(1), date(3));
        let rows = range(&table(), &query).unwrap();

        assert_eq!(rows[0].word, "테슬라");
        assert_eq!(rows[0].sum_count, 8);
        assert_eq!(rows[0].days_appeared, 3);
        let expected_avg = (0.2 + 0.25 + 0.25) / 3.0;
        assert!((rows[0].avg_freq - expected_avg).abs() < 1e-12);
        assert!((rows[0].max_freq - 0.25).abs() < 1e-12);

        let words: Vec<&str> = rows.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["테슬라", "엔비디아", "금리", "반도체"]);
    }

    #[test]
    fn test_range_min_days_and_top_n() {
        let mut query = RangeQuery::new(date(1), date(3));
        query.min_days = 2;
        let rows = range(&table(), &query).unwrap();
        assert_eq!((rows[0].sum_count, rows[0].days_appeared), (8, 3));
        let words: Vec<&str> = rows.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["테슬라", "금리"]);

        query.top_n = 1;
        assert_eq!(range(&table(), &query).unwrap().len(), 1);
    }

    #[test]
    fn test_range_max_freq_and_bounds() {
        let mut query = RangeQuery::new(date(2), date(3));
        query.sort = RangeSort::MaxFreq;
        let rows = range(&table(), &query).unwrap();
        assert_eq!(rows[0].word, "반도체");
        assert!(rows.iter().all(|r| r.word != "엔비디아"));
    }

    #[test]
    fn test_range_ties_break_by_word() {
        let stats = vec![
            DailyWordStat::new(date(1), "나", 2, 4, 1),
            DailyWordStat::new(date(1), "가", 2, 4, 1),
        ];
        let rows = range(&stats, &RangeQuery::new(date(1), date(1))).unwrap();
        assert_eq!(rows[0].word, "가");
    }

    #[test]
    fn test_range_invalid_arguments() {
        let reversed = RangeQuery::new(date(3), date(1));
        assert!(matches!(
            range(&table(), &reversed),
            Err(AppError::InvalidArgument(_))
        ));

        let mut zero_days = RangeQuery::new(date(1), date(3));
        zero_days.min_days = 0;
        assert!(range(&table(), &zero_days).is_err());
    }

    #[test]
    fn test_day_query() {
        let mut query = DayQuery::new(date(1));
        query.min_count = 3;
        let words: Vec<String> = day(&table(), &query)
            .unwrap()
            .into_iter()
            .map(|r| r.word)
            .collect();
        assert_eq!(words, vec!["엔비디아", "금리"]);

        query.min_count = 0;
        assert!(matches!(day(&table(), &query), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_day_query_missing_date_is_empty() {
        let rows = day(&table(), &DayQuery::new(date(9))).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_sort_keys_parse() {
        assert_eq!("avg_freq".parse::<RangeSort>().unwrap(), RangeSort::AvgFreq);
        assert_eq!("freq".parse::<DaySort>().unwrap(), DaySort::Freq);
        assert!("median".parse::<RangeSort>().is_err());
        assert!("sum_count".parse::<DaySort>().is_err());
        assert_eq!(RangeSort::MaxFreq.to_string(), "max_freq");
    }

    #[test]
    fn test_top_word_and_dates() {
        assert_eq!(top_word(&table()).as_deref(), Some("테슬라"));
        assert_eq!(top_word(&[]), None);
        assert_eq!(dates(&table()), vec![date(1), date(2), date(3)]);
    }
}
