// src/models/mod.rs

//! Domain models for the harvesting pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

pub mod config;
mod gallery;
mod post;
mod selectors;
mod stats;

// Re-export all public types
pub use config::{AnalysisConfig, Config, CrawlerConfig, DelayWindow, HarvestConfig};
pub use gallery::{GalleryTarget, GalleryVariant};
pub use post::{Post, PostStub};
pub use selectors::ListingSelectors;
pub use stats::{DailyWordStat, DayTotals, WordSummary, relative_freq};
