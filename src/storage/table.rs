// src/storage/table.rs

//! CSV form of the daily word table.
//!
//! Export always writes the full header. Import also accepts the minimal
//! `date,word,count` layout and rebuilds the missing totals from the counts.
//! Stored totals must agree with the counts; `freq` is always recomputed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Write};
use std::mem::take;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{AppError, Result};
use crate::models::{DailyWordStat, relative_freq};

/// Column order of exported tables.
pub const HEADER: [&str; 6] = ["date", "word", "count", "freq", "total_words", "total_posts"];

const BOM: char = '\u{feff}';

/* ---------------- Parsing ---------------- */

/// Split CSV text into records. Quotes, doubled quotes and CRLF are handled;
/// blank lines are skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.len() == 1 && row[0].is_empty() {
                    row.clear();
                } else {
                    rows.push(take(&mut row));
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

/// Write one CSV record.
pub fn write_row<W: Write>(mut w: W, row: &[&str]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)
}

/// Serialize the table with the full header.
pub fn export_stats<W: Write>(mut w: W, stats: &[DailyWordStat]) -> io::Result<()> {
    write_row(&mut w, &HEADER)?;
    for row in stats {
        let date = row.date.format("%Y-%m-%d").to_string();
        let count = row.count.to_string();
        let freq = row.freq.to_string();
        let total_words = row.total_words.to_string();
        let total_posts = row.total_posts.to_string();
        write_row(
            &mut w,
            &[&date, &row.word, &count, &freq, &total_words, &total_posts].map(String::as_str),
        )?;
    }
    Ok(())
}

/// Table as a CSV string.
pub fn export_string(stats: &[DailyWordStat]) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = export_stats(&mut buf, stats);
    String::from_utf8(buf).unwrap_or_default()
}

/* ---------------- Import ---------------- */

/// Calendar date of a `date` cell: plain date, naive datetime or RFC 3339.
fn parse_date_cell(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(cell)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

struct Columns {
    date: usize,
    word: usize,
    count: usize,
    freq: Option<usize>,
    total_words: Option<usize>,
    total_posts: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let index: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();
        let required = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| AppError::import(1, format!("missing required column '{name}'")))
        };

        Ok(Self {
            date: required("date")?,
            word: required("word")?,
            count: required("count")?,
            freq: index.get("freq").copied(),
            total_words: index.get("total_words").copied(),
            total_posts: index.get("total_posts").copied(),
        })
    }
}

/// A parsed record before totals are settled.
struct Record {
    line: usize,
    date: NaiveDate,
    word: String,
    count: u64,
    total_words: Option<u64>,
    total_posts: Option<u64>,
}

fn optional_cell<T: std::str::FromStr>(
    row: &[String],
    column: Option<usize>,
    line: usize,
    name: &str,
) -> Result<Option<T>> {
    let Some(cell) = column.and_then(|i| row.get(i)).map(|c| c.trim()) else {
        return Ok(None);
    };
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse()
        .map(Some)
        .map_err(|_| AppError::import(line, format!("invalid {name} '{cell}'")))
}

/// Parse a CSV table back into rows ordered by `(date, word)`.
pub fn import_stats(text: &str) -> Result<Vec<DailyWordStat>> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rows = parse_rows(text).into_iter();

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns = Columns::from_header(&header)?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for (idx, row) in rows.enumerate() {
        let line = idx + 2;
        let cell = |i: usize| row.get(i).map(|c| c.trim()).unwrap_or_default();

        let date = parse_date_cell(cell(columns.date)).ok_or_else(|| {
            AppError::import(line, format!("invalid date '{}'", cell(columns.date)))
        })?;
        let word = cell(columns.word).to_string();
        if word.is_empty() {
            return Err(AppError::import(line, "empty word"));
        }
        let count: u64 = cell(columns.count).parse().map_err(|_| {
            AppError::import(line, format!("invalid count '{}'", cell(columns.count)))
        })?;
        if count == 0 {
            return Err(AppError::import(line, format!("zero count for '{word}'")));
        }

        if !seen.insert((date, word.clone())) {
            return Err(AppError::import(line, format!("duplicate row for {date} '{word}'")));
        }

        // Stored freq is only checked for syntax; it is derived from the counts below.
        optional_cell::<f64>(&row, columns.freq, line, "freq")?;

        records.push(Record {
            line,
            date,
            word,
            count,
            total_words: optional_cell(&row, columns.total_words, line, "total_words")?,
            total_posts: optional_cell(&row, columns.total_posts, line, "total_posts")?,
        });
    }

    let mut day_sums: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut day_posts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in &records {
        *day_sums.entry(record.date).or_insert(0) += record.count;

        let Some(posts) = record.total_posts else {
            continue;
        };
        if posts == 0 {
            return Err(AppError::import(record.line, "total_posts must be at least 1"));
        }
        let known = *day_posts.entry(record.date).or_insert(posts);
        if known != posts {
            return Err(AppError::import(
                record.line,
                format!("total_posts {posts} disagrees with {known} for {}", record.date),
            ));
        }
    }

    let mut stats = Vec::with_capacity(records.len());
    for r in records {
        let total_words = day_sums[&r.date];
        if let Some(stored) = r.total_words.filter(|&stored| stored != total_words) {
            return Err(AppError::import(
                r.line,
                format!(
                    "total_words {stored} does not match the {total_words} counted for {}",
                    r.date
                ),
            ));
        }
        let total_posts = day_posts.get(&r.date).copied().unwrap_or(1);
        stats.push(DailyWordStat {
            freq: relative_freq(r.count, total_words),
            date: r.date,
            word: r.word,
            count: r.count,
            total_words,
            total_posts,
        });
    }

    stats.sort_by(|a, b| (a.date, &a.word).cmp(&(b.date, &b.word)));
    log::debug!("Imported {} table rows", stats.len());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_parse_rows_quotes_and_crlf() {
        let rows = parse_rows("a,\"b,c\",\"say \"\"hi\"\"\"\r\n\r\nx,y,z");
        assert_eq!(
            rows,
            vec![
                vec!["a", "b,c", "say \"hi\""],
                vec!["x", "y", "z"],
            ]
        );
    }

    #[test]
    fn test_export_then_import_preserves_rows() {
        let stats = vec![
            DailyWordStat::new(date(1), "테슬라", 2, 3, 2),
            DailyWordStat::new(date(1), "a,b", 1, 3, 2),
            DailyWordStat::new(date(2), "금리", 4, 4, 1),
        ];
        let csv = export_string(&stats);
        assert!(csv.starts_with("date,word,count,freq,total_words,total_posts\n"));
        assert!(csv.contains("\"a,b\""));

        let mut expected = stats.clone();
        expected.sort_by(|a, b| (a.date, &a.word).cmp(&(b.date, &b.word)));
        assert_eq!(import_stats(&csv).unwrap(), expected);
    }

    #[test]
    fn test_minimal_layout_recomputes_totals() {
        let csv = "\u{feff}date,word,count\n2024-05-01 00:00:00,테슬라,3\n2024-05-01,금리,1\n2024-05-02T09:00:00+09:00,금리,2\n";
        let stats = import_stats(csv).unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].word, "금리");
        assert_eq!(stats[0].total_words, 4);
        assert_eq!(stats[0].total_posts, 1);
        assert!((stats[1].freq - 0.75).abs() < 1e-12);
        assert_eq!(stats[2].date, date(2));
        assert_eq!(stats[2].freq, 1.0);
    }

    #[test]
    fn test_import_errors_name_the_line() {
        let missing = import_stats("date,count\n2024-05-01,3\n");
        assert!(matches!(missing, Err(AppError::Import { line: 1, .. })));

        let bad_date = import_stats("date,word,count\n2024-05-01,a,1\nyesterday,b,2\n");
        assert!(matches!(bad_date, Err(AppError::Import { line: 3, .. })));

        let bad_count = import_stats("date,word,count\n2024-05-01,a,many\n");
        assert!(matches!(bad_count, Err(AppError::Import { line: 2, .. })));

        let duplicate = import_stats("date,word,count\n2024-05-01,a,1\n2024-05-01,a,2\n");
        assert!(matches!(duplicate, Err(AppError::Import { line: 3, .. })));
    }

    #[test]
    fn test_import_rejects_inconsistent_numbers() {
        let zero = import_stats("date,word,count\n2024-05-01,a,0\n");
        assert!(matches!(zero, Err(AppError::Import { line: 2, .. })));

        let header = "date,word,count,freq,total_words,total_posts\n";
        let short_total = format!("{header}2024-05-01,a,2,0.5,4,1\n2024-05-01,b,5,0.5,4,1\n");
        assert!(matches!(
            import_stats(&short_total),
            Err(AppError::Import { line: 2, .. })
        ));

        let no_posts = format!("{header}2024-05-01,a,1,1.0,1,0\n");
        assert!(matches!(
            import_stats(&no_posts),
            Err(AppError::Import { line: 2, .. })
        ));

        let split_posts = format!("{header}2024-05-01,a,1,0.5,2,1\n2024-05-01,b,1,0.5,2,3\n");
        assert!(matches!(
            import_stats(&split_posts),
            Err(AppError::Import { line: 3, .. })
        ));
    }

    #[test]
    fn test_import_derives_freq_from_counts() {
        let csv = "date,word,count,freq,total_words,total_posts\n2024-05-01,a,1,0.9,4,2\n2024-05-01,b,3,0.1,4,2\n";
        let stats = import_stats(csv).unwrap();
        assert_eq!(stats[0], DailyWordStat::new(date(1), "a", 1, 4, 2));
        assert_eq!(stats[1], DailyWordStat::new(date(1), "b", 3, 4, 2));
    }

    #[test]
    fn test_empty_input() {
        assert!(import_stats("").unwrap().is_empty());
        assert!(import_stats("date,word,count\n").unwrap().is_empty());
        assert_eq!(export_string(&[]).lines().count(), 1);
    }
}
