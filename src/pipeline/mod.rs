//! Pipeline stages.
//!
//! - `harvest`: Walk listing pages and collect dated posts
//! - `aggregate`: Fold posts into the daily word table
//! - `query`: Range and single-day queries over the table
//! - `series`: Zero-filled per-word series for correlation

pub mod aggregate;
pub mod harvest;
pub mod query;
pub mod series;

pub use aggregate::{Aggregator, aggregate, day_totals};
pub use harvest::{
    HarvestError, HarvestEvent, HarvestSink, HarvestSummary, HarvestUnit, HarvestVerdict,
    Harvester, PageHarvest, PostCollector,
};
pub use query::{DayQuery, DaySort, RangeQuery, RangeSort, top_word};
pub use series::{SeriesPoint, date_span, word_series};
