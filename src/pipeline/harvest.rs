// src/pipeline/harvest.rs

//! Harvest orchestration.
//!
//! Walks a page range of one gallery: listing page → stubs → optional detail
//! pages → dated posts. Page and post failures are reported through the
//! sink and never end the run; a block marker or a broken session does.

use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::error::{AppError, FetchError, Result};
use crate::models::{Config, GalleryTarget, HarvestConfig, Post, PostStub};
use crate::services::{
    DetailParser, ListingParser, RateLimitedFetcher, RequestKind, TimestampNormalizer,
};
use crate::utils::{extract_post_no, resolve_url};

/// What a recorded error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestUnit {
    Page(u32),
    Post(String),
}

impl fmt::Display for HarvestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestUnit::Page(page) => write!(f, "page {page}"),
            HarvestUnit::Post(id) => write!(f, "post {id}"),
        }
    }
}

/// A non-fatal failure collected during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestError {
    pub unit: HarvestUnit,
    pub cause: String,
}

impl HarvestError {
    fn fetch(unit: HarvestUnit, error: &FetchError) -> Self {
        Self {
            unit,
            cause: error.to_string(),
        }
    }
}

/// Receives posts, progress and errors while a run is in flight.
pub trait HarvestSink: Send {
    fn on_post(&mut self, post: Post);

    /// `(pages_done, pages_total)` after each page.
    fn on_progress(&mut self, _done: usize, _total: usize) {}

    fn on_error(&mut self, _error: HarvestError) {}
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct PostCollector {
    pub posts: Vec<Post>,
    pub errors: Vec<HarvestError>,
    pub progress: (usize, usize),
}

impl HarvestSink for PostCollector {
    fn on_post(&mut self, post: Post) {
        self.posts.push(post);
    }

    fn on_progress(&mut self, done: usize, total: usize) {
        self.progress = (done, total);
    }

    fn on_error(&mut self, error: HarvestError) {
        self.errors.push(error);
    }
}

/// Event form of the sink callbacks, for channel subscribers.
#[derive(Debug, Clone)]
pub enum HarvestEvent {
    Post(Post),
    Progress { done: usize, total: usize },
    Error(HarvestError),
}

impl HarvestSink for UnboundedSender<HarvestEvent> {
    fn on_post(&mut self, post: Post) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(HarvestEvent::Post(post));
    }

    fn on_progress(&mut self, done: usize, total: usize) {
        let _ = self.send(HarvestEvent::Progress { done, total });
    }

    fn on_error(&mut self, error: HarvestError) {
        let _ = self.send(HarvestEvent::Error(error));
    }
}

/// Result of harvesting a single listing page.
#[derive(Debug, Default)]
pub struct PageHarvest {
    pub page: u32,
    /// Listing rows that survived filtering
    pub rows: usize,
    /// Rows dropped for an unresolvable date
    pub undated: usize,
    pub posts: Vec<Post>,
    pub errors: Vec<HarvestError>,
}

/// Counters for a finished (or cancelled) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub pages_total: usize,
    pub pages_completed: usize,
    pub pages_failed: usize,
    pub posts: usize,
    pub undated: usize,
    pub detail_failures: usize,
    pub cancelled: bool,
}

/// How a run that did not get blocked should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestVerdict {
    /// At least one post was collected
    Collected,
    /// Pages loaded fine but held no matching content
    NoContent,
    /// No page could be fetched at all
    Unreachable,
    /// Stopped by the caller before anything was collected
    Cancelled,
}

impl HarvestSummary {
    pub fn verdict(&self) -> HarvestVerdict {
        if self.posts > 0 {
            HarvestVerdict::Collected
        } else if self.cancelled {
            HarvestVerdict::Cancelled
        } else if self.pages_completed == 0 && self.pages_failed > 0 {
            HarvestVerdict::Unreachable
        } else {
            HarvestVerdict::NoContent
        }
    }
}

/// Drives the fetcher and parsers over a page range.
pub struct Harvester {
    fetcher: RateLimitedFetcher,
    listing: ListingParser,
    detail: DetailParser,
    normalizer: TimestampNormalizer,
    settings: HarvestConfig,
    max_concurrent: usize,
    reference_date: NaiveDate,
    cancel: Arc<AtomicBool>,
}

impl Harvester {
    /// Build a harvester; session setup failures are returned as errors.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: RateLimitedFetcher::new(&config.crawler)?,
            listing: ListingParser::new(&config.selectors)?,
            detail: DetailParser::new(&config.selectors)?,
            normalizer: TimestampNormalizer::new(config.harvest.date_policy),
            settings: config.harvest.clone(),
            max_concurrent: config.crawler.max_concurrent.max(1),
            reference_date: Local::now().date_naive(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Date that bare `HH:MM` listings resolve to.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Share an existing cancellation flag.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Flag that stops the run when set; checked between pages and before detail fetches.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Harvest every page in `pages`, streaming results into `sink`.
    ///
    /// Returns `AppError::Blocked` as soon as a listing page carries a block
    /// marker; posts from earlier pages have already reached the sink.
    pub async fn run(
        &self,
        target: &GalleryTarget,
        pages: RangeInclusive<u32>,
        fetch_detail: bool,
        sink: &mut dyn HarvestSink,
    ) -> Result<HarvestSummary> {
        let total = pages.clone().count();
        let mut summary = HarvestSummary {
            pages_total: total,
            ..HarvestSummary::default()
        };
        let mut seen = HashSet::new();

        log::info!(
            "Harvesting {} ({}) pages {}..={} (details: {})",
            target.id,
            target.variant,
            pages.start(),
            pages.end(),
            fetch_detail
        );

        for (idx, page) in pages.enumerate() {
            if self.is_cancelled() {
                log::warn!("Harvest cancelled before page {}", page);
                summary.cancelled = true;
                break;
            }

            match self.harvest_page(target, page, fetch_detail).await {
                Ok(result) => {
                    summary.pages_completed += 1;
                    summary.undated += result.undated;
                    summary.detail_failures += result.errors.len();
                    log::info!(
                        "Page {}: {} rows, {} posts, {} undated",
                        page,
                        result.rows,
                        result.posts.len(),
                        result.undated
                    );

                    for error in result.errors {
                        sink.on_error(error);
                    }
                    for post in result.posts {
                        if seen.insert(post.id.clone()) {
                            summary.posts += 1;
                            sink.on_post(post);
                        }
                    }
                }
                Err(error @ AppError::Blocked { .. }) => {
                    log::error!("{}", error);
                    return Err(error);
                }
                Err(error) => {
                    summary.pages_failed += 1;
                    log::warn!("Failed to harvest page {}: {}", page, error);
                    sink.on_error(HarvestError {
                        unit: HarvestUnit::Page(page),
                        cause: error.to_string(),
                    });
                }
            }

            sink.on_progress(idx + 1, total);
        }

        if self.is_cancelled() {
            summary.cancelled = true;
        }

        Ok(summary)
    }

    /// Harvest one listing page. Safe to call again for the same page.
    pub async fn harvest_page(
        &self,
        target: &GalleryTarget,
        page: u32,
        fetch_detail: bool,
    ) -> Result<PageHarvest> {
        let html = self.fetch_listing(target, page).await?;

        if let Some(marker) = self.listing.detect_block(&html) {
            return Err(AppError::Blocked { page, marker });
        }

        let stubs = self.listing.parse(&html);
        let mut result = PageHarvest {
            page,
            rows: stubs.len(),
            ..PageHarvest::default()
        };

        let mut dated = Vec::with_capacity(stubs.len());
        for stub in stubs {
            match self.normalizer.resolve(&stub.raw_date, self.reference_date) {
                Some(date) => dated.push((stub, date)),
                None => {
                    log::debug!("Dropping '{}': unresolvable date '{}'", stub.title, stub.raw_date);
                    result.undated += 1;
                }
            }
        }

        let view_url = self.fetcher.url_for(target.variant.view_path())?;
        let completed: Vec<(Post, Option<HarvestError>)> = stream::iter(dated)
            .map(|(stub, date)| {
                let view_url = &view_url;
                async move {
                    self.complete_post(target, view_url, stub, date, fetch_detail)
                        .await
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for (post, error) in completed {
            result.posts.push(post);
            result.errors.extend(error);
        }

        Ok(result)
    }

    /// Listing fetch with bounded retries and linear backoff.
    async fn fetch_listing(&self, target: &GalleryTarget, page: u32) -> Result<String> {
        let list_url = self.fetcher.url_for(target.variant.list_path())?;
        let params = target.list_params(page);
        let mut attempt = 0;

        loop {
            match self
                .fetcher
                .fetch(list_url.as_str(), &params, RequestKind::Listing)
                .await
            {
                Ok(response) => return Ok(response.body),
                Err(error) if attempt < self.settings.listing_retries && !self.is_cancelled() => {
                    attempt += 1;
                    log::debug!(
                        "Listing page {} attempt {} failed: {}",
                        page,
                        attempt,
                        error
                    );
                    let backoff = self.settings.retry_backoff_ms * u64::from(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Turn a dated stub into a post, fetching its body when asked.
    async fn complete_post(
        &self,
        target: &GalleryTarget,
        view_url: &Url,
        stub: PostStub,
        date: NaiveDate,
        fetch_detail: bool,
    ) -> (Post, Option<HarvestError>) {
        let post_no = extract_post_no(&stub.detail_ref);
        let source_url = match &post_no {
            Some(no) => {
                let mut url = view_url.clone();
                url.query_pairs_mut()
                    .extend_pairs(target.view_params(no).iter().map(|(k, v)| (*k, v.as_str())));
                url.to_string()
            }
            None => resolve_url(view_url, &stub.detail_ref),
        };

        let mut body = String::new();
        let mut error = None;

        let wants_body = fetch_detail && !self.is_cancelled();
        if let Some(no) = post_no.as_ref().filter(|_| wants_body) {
            match self
                .fetcher
                .fetch(view_url.as_str(), &target.view_params(no), RequestKind::Detail)
                .await
            {
                Ok(response) => body = self.detail.parse(&response.body),
                Err(e) => {
                    log::warn!("Detail fetch failed for post {}: {}", no, e);
                    error = Some(HarvestError::fetch(HarvestUnit::Post(no.clone()), &e));
                }
            }
        }

        (Post::from_stub(stub, body, Some(date), source_url), error)
    }
}
