//! Gallery Pulse CLI
//!
//! Harvest a gallery into `{out_dir}/posts.json` and `{out_dir}/stats.csv`,
//! then query the stored table.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gallery_pulse::{
    error::{AppError, Result},
    models::{Config, GalleryTarget, GalleryVariant},
    pipeline::{
        self, DayQuery, DaySort, HarvestVerdict, Harvester, PostCollector, RangeQuery, RangeSort,
    },
    services::{DetailParser, ListingParser},
    storage::{HarvestStorage, LocalStorage, save_harvest},
};

/// Gallery Pulse - daily word trends from forum galleries
#[derive(Parser, Debug)]
#[command(
    name = "gallery-pulse",
    version,
    about = "Harvest gallery posts into a daily word-frequency table"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gallery-pulse.toml")]
    config: PathBuf,

    /// Directory holding posts.json and stats.csv
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest a page range and rebuild the word table
    Harvest {
        /// Gallery id (e.g. `stockus`)
        #[arg(short, long)]
        gallery: String,

        /// Gallery variant: standard, minor or mini
        #[arg(long, default_value = "standard")]
        variant: GalleryVariant,

        /// First listing page
        #[arg(long, default_value_t = 1)]
        start_page: u32,

        /// Last listing page (inclusive)
        #[arg(long, default_value_t = 1)]
        end_page: u32,

        /// Titles only; skip detail pages
        #[arg(long)]
        fast: bool,
    },

    /// Words over a date range
    Range {
        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// Minimum number of days a word must appear on
        #[arg(long, default_value_t = 1)]
        min_days: usize,

        /// Row limit (0 = all)
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// sum_count, avg_freq or max_freq
        #[arg(long, default_value = "sum_count")]
        sort: RangeSort,
    },

    /// Words on a single date
    Day {
        #[arg(long)]
        date: NaiveDate,

        /// Minimum count on that date
        #[arg(long, default_value_t = 1)]
        min_count: u64,

        /// Row limit (0 = all)
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// count or freq
        #[arg(long, default_value = "count")]
        sort: DaySort,
    },

    /// Zero-filled daily series of one word
    Series {
        /// Word to chart; defaults to the most frequent word
        #[arg(short, long)]
        word: Option<String>,

        /// First date (default: earliest date in the table)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date (default: latest date in the table)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    let storage = LocalStorage::new(&cli.out_dir);

    match cli.command {
        Command::Harvest {
            gallery,
            variant,
            start_page,
            end_page,
            fast,
        } => {
            if start_page == 0 || start_page > end_page {
                return Err(AppError::invalid_argument(format!(
                    "invalid page range {start_page}..={end_page}"
                )));
            }
            config.validate()?;

            let target = GalleryTarget::new(gallery, variant);
            let harvester = Harvester::new(&config)?;

            let cancel = harvester.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted; stopping after the current page");
                    cancel.store(true, Ordering::SeqCst);
                }
            });

            let mut collector = PostCollector::default();
            let outcome = harvester
                .run(&target, start_page..=end_page, !fast, &mut collector)
                .await;

            for error in &collector.errors {
                log::warn!("Skipped {}: {}", error.unit, error.cause);
            }

            let blocked = match outcome {
                Ok(summary) => {
                    match summary.verdict() {
                        HarvestVerdict::Collected => log::info!(
                            "Collected {} posts from {}/{} pages ({} undated, {} detail failures)",
                            summary.posts,
                            summary.pages_completed,
                            summary.pages_total,
                            summary.undated,
                            summary.detail_failures
                        ),
                        HarvestVerdict::NoContent => {
                            log::warn!("No posts found in the requested pages")
                        }
                        HarvestVerdict::Unreachable => {
                            return Err(AppError::validation(
                                "no listing page could be fetched; check the gallery id and variant",
                            ));
                        }
                        HarvestVerdict::Cancelled => log::warn!("Harvest cancelled"),
                    }
                    if summary.cancelled && summary.posts > 0 {
                        log::warn!(
                            "Saving the {} posts collected before cancellation",
                            summary.posts
                        );
                    }
                    None
                }
                Err(error @ AppError::Blocked { .. }) if collector.posts.is_empty() => {
                    return Err(error);
                }
                Err(error @ AppError::Blocked { .. }) => {
                    log::error!(
                        "Blocked by the source; saving the {} posts collected before the block",
                        collector.posts.len()
                    );
                    Some(error)
                }
                Err(error) => return Err(error),
            };

            let stats = save_harvest(&storage, target, collector.posts, &config.analysis).await?;
            if let Some(word) = pipeline::top_word(&stats) {
                log::info!("Most frequent word: {}", word);
            }

            if let Some(error) = blocked {
                return Err(error);
            }
        }

        Command::Range {
            start,
            end,
            min_days,
            top,
            sort,
        } => {
            let stats = storage.load_stats().await?;
            let query = RangeQuery {
                start,
                end,
                min_days,
                top_n: top,
                sort,
            };
            let rows = pipeline::query::range(&stats, &query)?;

            println!("word\tsum_count\tdays\tavg_freq\tmax_freq");
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{:.6}\t{:.6}",
                    row.word, row.sum_count, row.days_appeared, row.avg_freq, row.max_freq
                );
            }
        }

        Command::Day {
            date,
            min_count,
            top,
            sort,
        } => {
            let stats = storage.load_stats().await?;
            let query = DayQuery {
                date,
                min_count,
                top_n: top,
                sort,
            };
            let rows = pipeline::query::day(&stats, &query)?;
            if rows.is_empty() {
                log::warn!("No words recorded on {}", date);
            }

            println!("word\tcount\tfreq");
            for row in rows {
                println!("{}\t{}\t{:.6}", row.word, row.count, row.freq);
            }
        }

        Command::Series { word, start, end } => {
            let stats = storage.load_stats().await?;
            let dates = pipeline::query::dates(&stats);
            let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
                log::warn!("The word table is empty; run 'harvest' first");
                return Ok(());
            };

            let word = match word.or_else(|| pipeline::top_word(&stats)) {
                Some(word) => word,
                None => return Ok(()),
            };
            let span = pipeline::date_span(start.unwrap_or(*first), end.unwrap_or(*last))?;

            println!("date\t{word}\tfreq");
            for point in pipeline::word_series(&stats, &word, span) {
                println!("{}\t{}\t{:.6}", point.date, point.count, point.freq);
            }
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());
            let config = Config::load(&cli.config)?;
            config.validate()?;
            ListingParser::new(&config.selectors)?;
            DetailParser::new(&config.selectors)?;
            log::info!("✓ Config OK (crawler, harvest, selectors and analysis)");
        }
    }

    Ok(())
}
