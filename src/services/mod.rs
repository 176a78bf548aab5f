//! Service layer for the harvesting pipeline.
//!
//! This module contains the building blocks the harvester combines:
//! - Rate-limited HTTP session (`RateLimitedFetcher`)
//! - Listing and detail parsers (`ListingParser`, `DetailParser`)
//! - Raw date normalization (`TimestampNormalizer`)
//! - Tokenization strategies (`Tokenizer`)

pub mod dates;
pub mod detail;
pub mod fetcher;
pub mod listing;
pub mod tokenizer;

pub use dates::{DatePolicy, TimestampNormalizer, normalize};
pub use detail::DetailParser;
pub use fetcher::{FetchResponse, RateLimitedFetcher, RequestKind};
pub use listing::{AnchorStrategy, ListingParser};
pub use tokenizer::{
    MorphologicalNoun, NounAnalyzer, SimpleSplit, TokenFilter, Tokenizer, TokenizerKind,
    build_tokenizer,
};
