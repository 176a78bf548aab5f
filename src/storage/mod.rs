//! Persistence of harvest output.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── posts.json            # Harvested posts with run metadata
//! └── stats.csv             # Daily word table
//! ```

pub mod local;
pub mod table;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AnalysisConfig, DailyWordStat, GalleryTarget, Post};
use crate::pipeline::aggregate;
use crate::services::{NounAnalyzer, TokenFilter, build_tokenizer};

pub use local::LocalStorage;
pub use table::{export_stats, export_string, import_stats};

/// Envelope of `posts.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDump {
    /// When the dump was written
    pub saved_at: DateTime<Utc>,
    /// Gallery the posts came from
    pub target: GalleryTarget,
    /// Number of posts
    pub count: usize,
    pub posts: Vec<Post>,
}

impl PostDump {
    pub fn new(target: GalleryTarget, posts: Vec<Post>) -> Self {
        Self {
            saved_at: Utc::now(),
            target,
            count: posts.len(),
            posts,
        }
    }
}

/// Storage backend for posts and the daily word table.
#[async_trait]
pub trait HarvestStorage: Send + Sync {
    /// Replace the stored posts.
    async fn save_posts(&self, dump: &PostDump) -> Result<()>;

    /// Stored posts, or `None` when nothing was saved yet.
    async fn load_posts(&self) -> Result<Option<PostDump>>;

    /// Replace the stored table.
    async fn save_stats(&self, stats: &[DailyWordStat]) -> Result<()>;

    /// Stored table; empty when nothing was saved yet.
    async fn load_stats(&self) -> Result<Vec<DailyWordStat>>;
}

/// Aggregate `posts` with the configured tokenizer, then replace the stored
/// posts and table. Returns the table that was written.
///
/// Also used for the partial post set of a run that ended early.
pub async fn save_harvest(
    storage: &dyn HarvestStorage,
    target: GalleryTarget,
    posts: Vec<Post>,
    analysis: &AnalysisConfig,
) -> Result<Vec<DailyWordStat>> {
    let stats = {
        let analyzer = NounAnalyzer::from_config(analysis);
        let tokenizer = build_tokenizer(analysis.tokenizer, &analyzer);
        let filter = TokenFilter::from_config(analysis);
        aggregate(&posts, &*tokenizer, &filter)
    };

    storage.save_posts(&PostDump::new(target, posts)).await?;
    storage.save_stats(&stats).await?;
    Ok(stats)
}
