//! Pipeline entry points, one per CLI command.
//!
//! - `run_scrape`: forum API into the JSON cache
//! - `run_load`: JSON cache into the SQLite store
//! - `run_plot`: store aggregates into an SVG chart
//! - `run_validate` / `run_info`: sanity checks and summaries

mod inspect;
pub mod load;
pub mod plot;
pub mod scrape;

pub use inspect::{ForumInfo, run_info, run_validate};
pub use load::{CachedRecords, Loader, run_load};
pub use plot::{default_output, run_plot};
pub use scrape::{crawl_with, run_scrape};
