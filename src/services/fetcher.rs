// src/services/fetcher.rs

//! Rate-limited HTTP fetcher.
//!
//! Wraps a cookie-keeping reqwest session. The first call warms the session
//! with a GET to the site root; every request then waits for its turn on a
//! shared limiter with a jittered delay, so the aggregate request rate stays
//! capped no matter how many tasks share the fetcher.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use url::Url;

use crate::error::{AppError, FetchCause, FetchError, Result};
use crate::models::{CrawlerConfig, DelayWindow};

/// Which kind of page a request is for; selects delay window and timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Listing,
    Detail,
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP session with politeness delays. Does not retry.
pub struct RateLimitedFetcher {
    client: Client,
    config: CrawlerConfig,
    warmed: OnceCell<()>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimitedFetcher {
    /// Build the session. Failure here is fatal to a harvest run.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(&config.base_url)
            .map_err(|e| AppError::Session(format!("invalid referer: {e}")))?;
        headers.insert(REFERER, referer);

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::Session(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            warmed: OnceCell::new(),
            next_slot: Mutex::new(None),
        })
    }

    /// Absolute URL for a path on the configured site.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.config.base_url)?.join(path)?)
    }

    /// GET `url` with query `params`.
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, String)],
        kind: RequestKind,
    ) -> std::result::Result<FetchResponse, FetchError> {
        let full_url = Url::parse_with_params(url, params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| FetchError::new(url, FetchCause::Network(e.to_string())))?;

        self.warm_up().await;
        self.wait_turn(kind).await;

        log::debug!("GET {}", full_url);
        let response = self
            .client
            .get(full_url.clone())
            .timeout(self.timeout(kind))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(full_url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                full_url.as_str(),
                FetchCause::Status(status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(full_url.as_str(), &e))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// One unauthenticated GET to the site root, once per session. The outcome is ignored.
    async fn warm_up(&self) {
        self.warmed
            .get_or_init(|| async {
                let result = self
                    .client
                    .get(&self.config.base_url)
                    .timeout(self.timeout(RequestKind::Listing))
                    .send()
                    .await;
                match result {
                    Ok(resp) => log::debug!("Session warmed ({})", resp.status()),
                    Err(e) => log::debug!("Session warm-up failed, continuing: {}", e),
                }
            })
            .await;
    }

    /// Reserve the next request slot and sleep until it opens.
    async fn wait_turn(&self, kind: RequestKind) {
        let delay = self.window(kind).sample(&mut rand::thread_rng());
        if delay.is_zero() {
            return;
        }

        let ready_at = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = match *slot {
                Some(t) if t > now => t,
                _ => now,
            };
            let ready_at = start + delay;
            *slot = Some(ready_at);
            ready_at
        };

        tokio::time::sleep_until(ready_at).await;
    }

    fn window(&self, kind: RequestKind) -> DelayWindow {
        match kind {
            RequestKind::Listing => self.config.listing_delay,
            RequestKind::Detail => self.config.detail_delay,
        }
    }

    fn timeout(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Listing => Duration::from_secs(self.config.listing_timeout_secs),
            RequestKind::Detail => Duration::from_secs(self.config.detail_timeout_secs),
        }
    }
}
