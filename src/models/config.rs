//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ListingSelectors;
use crate::services::DatePolicy;
use crate::services::tokenizer::TokenizerKind;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP session and politeness settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Harvest orchestration settings
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Markup extraction rules
    #[serde(default)]
    pub selectors: ListingSelectors,

    /// Tokenization and aggregation settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        url::Url::parse(&self.crawler.base_url)?;
        self.crawler.listing_delay.validate("crawler.listing_delay")?;
        self.crawler.detail_delay.validate("crawler.detail_delay")?;
        if self.crawler.listing_timeout_secs == 0 || self.crawler.detail_timeout_secs == 0 {
            return Err(AppError::validation("crawler timeouts must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.selectors.row_selectors.is_empty() {
            return Err(AppError::validation("selectors.row_selectors is empty"));
        }
        if self.analysis.min_length == 0 {
            return Err(AppError::validation("analysis.min_length must be > 0"));
        }
        Ok(())
    }
}

/// HTTP session and politeness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Site root; warmed once per session and used to build listing/detail URLs
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Jitter window before listing requests
    #[serde(default = "defaults::listing_delay")]
    pub listing_delay: DelayWindow,

    /// Jitter window before detail requests
    #[serde(default = "defaults::detail_delay")]
    pub detail_delay: DelayWindow,

    /// Listing request timeout in seconds
    #[serde(default = "defaults::listing_timeout")]
    pub listing_timeout_secs: u64,

    /// Detail request timeout in seconds
    #[serde(default = "defaults::detail_timeout")]
    pub detail_timeout_secs: u64,

    /// Detail fetches in flight per listing page
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            listing_delay: defaults::listing_delay(),
            detail_delay: defaults::detail_delay(),
            listing_timeout_secs: defaults::listing_timeout(),
            detail_timeout_secs: defaults::detail_timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

impl CrawlerConfig {
    /// Config with every politeness delay set to zero (used against local servers).
    pub fn without_delays(mut self) -> Self {
        self.listing_delay = DelayWindow::ZERO;
        self.detail_delay = DelayWindow::ZERO;
        self
    }
}

/// Uniform delay window in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayWindow {
    pub const ZERO: DelayWindow = DelayWindow {
        min_ms: 0,
        max_ms: 0,
    };

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a delay uniformly from the window.
    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(AppError::validation(format!(
                "{name}: min_ms ({}) exceeds max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Harvest orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Extra attempts for a failed listing fetch
    #[serde(default = "defaults::listing_retries")]
    pub listing_retries: u32,

    /// Base backoff between listing attempts, multiplied by the attempt number
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    /// What to do with rows whose date cannot be resolved
    #[serde(default)]
    pub date_policy: DatePolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            listing_retries: defaults::listing_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            date_policy: DatePolicy::default(),
        }
    }
}

/// Tokenization and aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Tokenization strategy
    #[serde(default)]
    pub tokenizer: TokenizerKind,

    /// Minimum token length in characters
    #[serde(default = "defaults::min_length")]
    pub min_length: usize,

    /// Words excluded from the table
    #[serde(default = "defaults::stopwords")]
    pub stopwords: Vec<String>,

    /// Nouns kept whole by the noun tokenizer
    #[serde(default)]
    pub lexicon: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::default(),
            min_length: defaults::min_length(),
            stopwords: defaults::stopwords(),
            lexicon: Vec::new(),
        }
    }
}

mod defaults {
    use super::DelayWindow;

    // Crawler defaults
    pub fn base_url() -> String {
        "https://gall.dcinside.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn listing_delay() -> DelayWindow {
        DelayWindow::new(500, 800)
    }
    pub fn detail_delay() -> DelayWindow {
        DelayWindow::new(100, 300)
    }
    pub fn listing_timeout() -> u64 {
        10
    }
    pub fn detail_timeout() -> u64 {
        5
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Harvest defaults
    pub fn listing_retries() -> u32 {
        2
    }
    pub fn retry_backoff() -> u64 {
        1000
    }

    // Analysis defaults
    pub fn min_length() -> usize {
        2
    }
    pub fn stopwords() -> Vec<String> {
        [
            "그냥", "근데", "진짜", "존나", "시발", "생각", "사람", "오늘", "지금", "주식",
            "매수", "매도", "정도", "때문", "이거", "저거", "어떻게", "왜", "다시", "하나",
            "뭐냐", "아니", "내가", "형들",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
