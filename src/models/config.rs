//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ListingView;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Listing views to walk when crawling posts
    #[serde(default)]
    pub listings: ListingsConfig,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Aggregation and chart settings
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
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.page_size == 0 || self.crawler.page_size > 100 {
            return Err(AppError::validation(
                "crawler.page_size must be between 1 and 100",
            ));
        }
        if self.crawler.max_pages_per_view == 0 {
            return Err(AppError::validation(
                "crawler.max_pages_per_view must be > 0",
            ));
        }
        if self.crawler.backoff_initial_ms > self.crawler.backoff_max_ms {
            return Err(AppError::validation(
                "crawler.backoff_initial_ms must not exceed crawler.backoff_max_ms",
            ));
        }
        if self.listings.all_views().is_empty() {
            return Err(AppError::validation("No listing views defined"));
        }
        if !(-12..=14).contains(&self.analysis.timezone_offset_hours) {
            return Err(AppError::validation(
                "analysis.timezone_offset_hours must be between -12 and 14",
            ));
        }
        if self.analysis.chart_width < 200 || self.analysis.chart_height < 150 {
            return Err(AppError::validation("analysis chart size is too small"));
        }
        Ok(())
    }

    /// Default store location for one forum: `<cache_dir>/<forum>.db`.
    pub fn default_db_path(&self, forum: &str) -> PathBuf {
        self.paths.cache_dir.join(format!("{forum}.db"))
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for API requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between consecutive API calls in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Items requested per listing page (API maximum is 100)
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Upper bound on pages walked per listing view
    #[serde(default = "defaults::max_pages_per_view")]
    pub max_pages_per_view: usize,

    /// Attempts per request before a transient failure is given up on
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::backoff_initial")]
    pub backoff_initial_ms: u64,

    #[serde(default = "defaults::backoff_max")]
    pub backoff_max_ms: u64,

    /// Bulk "more comments" expansions allowed per post
    #[serde(default = "defaults::max_more_batches")]
    pub max_more_batches: usize,

    /// Persist the comment cache after this many posts
    #[serde(default = "defaults::flush_every")]
    pub flush_every: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            page_size: defaults::page_size(),
            max_pages_per_view: defaults::max_pages_per_view(),
            max_retries: defaults::max_retries(),
            backoff_initial_ms: defaults::backoff_initial(),
            backoff_max_ms: defaults::backoff_max(),
            max_more_batches: defaults::max_more_batches(),
            flush_every: defaults::flush_every(),
        }
    }
}

/// Listing views walked by the post crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsConfig {
    #[serde(default = "defaults::views")]
    pub views: Vec<ListingView>,

    /// Each term becomes a `search:<term>` view sorted by new
    #[serde(default)]
    pub search_terms: Vec<String>,
}

impl ListingsConfig {
    /// Configured views followed by one search view per term.
    pub fn all_views(&self) -> Vec<ListingView> {
        let mut views = self.views.clone();
        for term in &self.search_terms {
            let view = ListingView::Search(term.clone());
            if !views.contains(&view) {
                views.push(view);
            }
        }
        views
    }
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            views: defaults::views(),
            search_terms: Vec::new(),
        }
    }
}

/// File system locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root for `<forum>/posts.json`, `<forum>/comments.json` and `<forum>.db`
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "defaults::credentials")]
    pub credentials: PathBuf,

    /// Where charts are written unless `--output` is given
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: defaults::cache_dir(),
            credentials: defaults::credentials(),
            output_dir: defaults::output_dir(),
        }
    }
}

/// Aggregation and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Shift applied to UTC timestamps before bucketing by day or hour
    #[serde(default)]
    pub timezone_offset_hours: i32,

    /// Term charted by `mentions` when `--term` is absent
    #[serde(default = "defaults::mention_term")]
    pub default_term: String,

    #[serde(default = "defaults::chart_width")]
    pub chart_width: u32,

    #[serde(default = "defaults::chart_height")]
    pub chart_height: u32,
}

impl AnalysisConfig {
    pub fn offset_secs(&self) -> i64 {
        i64::from(self.timezone_offset_hours) * 3600
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timezone_offset_hours: 0,
            default_term: defaults::mention_term(),
            chart_width: defaults::chart_width(),
            chart_height: defaults::chart_height(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::{ListingView, TimeFilter};

    // Crawler defaults
    pub fn user_agent() -> String {
        concat!("subcrawl/", env!("CARGO_PKG_VERSION"), " (personal research)").into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn max_pages_per_view() -> usize {
        10
    }
    pub fn max_retries() -> u32 {
        5
    }
    pub fn backoff_initial() -> u64 {
        1000
    }
    pub fn backoff_max() -> u64 {
        60_000
    }
    pub fn max_more_batches() -> usize {
        32
    }
    pub fn flush_every() -> usize {
        25
    }

    // Listing defaults
    pub fn views() -> Vec<ListingView> {
        vec![
            ListingView::New,
            ListingView::Top(TimeFilter::Day),
            ListingView::Top(TimeFilter::Hour),
            ListingView::Top(TimeFilter::Week),
            ListingView::Hot,
            ListingView::Controversial(TimeFilter::Day),
            ListingView::Controversial(TimeFilter::Hour),
            ListingView::Controversial(TimeFilter::Week),
            ListingView::Rising,
        ]
    }

    // Path defaults
    pub fn cache_dir() -> PathBuf {
        PathBuf::from(".")
    }
    pub fn credentials() -> PathBuf {
        PathBuf::from("credentials.ini")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("charts")
    }

    // Analysis defaults
    pub fn mention_term() -> String {
        "GME".into()
    }
    pub fn chart_width() -> u32 {
        1200
    }
    pub fn chart_height() -> u32 {
        600
    }
}
