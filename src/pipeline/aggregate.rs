//! Daily word statistics.
//!
//! Folds dated posts into one `(date, word)` row per distinct word per day.
//! Undated posts and repeated post ids are skipped.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::models::{DailyWordStat, DayTotals, Post};
use crate::services::{TokenFilter, Tokenizer};

#[derive(Debug, Default)]
struct DayBucket {
    counts: BTreeMap<String, u64>,
    posts: usize,
}

/// Incremental builder for a daily word table.
pub struct Aggregator<'a> {
    tokenizer: &'a dyn Tokenizer,
    filter: &'a TokenFilter,
    days: BTreeMap<NaiveDate, DayBucket>,
    seen: HashSet<String>,
    skipped_undated: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, filter: &'a TokenFilter) -> Self {
        Self {
            tokenizer,
            filter,
            days: BTreeMap::new(),
            seen: HashSet::new(),
            skipped_undated: 0,
        }
    }

    /// Fold one post into the table.
    pub fn add_post(&mut self, post: &Post) {
        let Some(date) = post.date else {
            self.skipped_undated += 1;
            return;
        };
        if !self.seen.insert(post.id.clone()) {
            log::debug!("Skipping repeated post {}", post.id);
            return;
        }

        let tokens = self.tokenizer.tokenize(&post.text(), self.filter);
        if tokens.is_empty() {
            return;
        }

        let bucket = self.days.entry(date).or_default();
        bucket.posts += 1;
        for token in tokens {
            *bucket.counts.entry(token).or_insert(0) += 1;
        }
    }

    /// Posts ignored for lacking a date so far.
    pub fn skipped_undated(&self) -> usize {
        self.skipped_undated
    }

    /// Finish the table, ordered by `(date, word)`.
    pub fn build(self) -> Vec<DailyWordStat> {
        let mut stats = Vec::new();
        for (date, bucket) in self.days {
            let total_words: u64 = bucket.counts.values().sum();
            let total_posts = bucket.posts as u64;
            stats.extend(bucket.counts.into_iter().map(|(word, count)| {
                DailyWordStat::new(date, word, count, total_words, total_posts)
            }));
        }
        log::info!(
            "Aggregated {} rows using {} tokenizer ({} undated posts skipped)",
            stats.len(),
            self.tokenizer.name(),
            self.skipped_undated
        );
        stats
    }
}

/// Aggregate a batch of posts in one call.
pub fn aggregate(
    posts: &[Post],
    tokenizer: &dyn Tokenizer,
    filter: &TokenFilter,
) -> Vec<DailyWordStat> {
    let mut aggregator = Aggregator::new(tokenizer, filter);
    for post in posts {
        aggregator.add_post(post);
    }
    aggregator.build()
}

/// One `DayTotals` per date present in the table, in date order.
pub fn day_totals(stats: &[DailyWordStat]) -> Vec<DayTotals> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for row in stats {
        days.entry(row.date).or_insert(DayTotals {
            date: row.date,
            total_words: row.total_words,
            total_posts: row.total_posts,
        });
    }
    days.into_values().collect()
}
