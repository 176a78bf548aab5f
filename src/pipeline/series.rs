//! Per-word daily series for correlation with external daily data.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DailyWordStat;

/// One point of a word series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
    pub freq: f64,
}

/// Dense series for `word` over `dates`; dates without the word read as zero.
///
/// Output follows the order of `dates`.
pub fn word_series<I>(stats: &[DailyWordStat], word: &str, dates: I) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let observed: HashMap<NaiveDate, &DailyWordStat> = stats
        .iter()
        .filter(|row| row.word == word)
        .map(|row| (row.date, row))
        .collect();

    dates
        .into_iter()
        .map(|date| match observed.get(&date) {
            Some(row) => SeriesPoint {
                date,
                count: row.count,
                freq: row.freq,
            },
            None => SeriesPoint {
                date,
                count: 0,
                freq: 0.0,
            },
        })
        .collect()
}

/// Every calendar date from `start` to `end`, inclusive.
pub fn date_span(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        return Err(AppError::invalid_argument(format!(
            "series start {start} is after end {end}"
        )));
    }
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}
