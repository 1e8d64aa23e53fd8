//! Persistence for crawled records.
//!
//! - [`JsonCache`]: per-forum JSON arrays written by the crawler
//! - [`ForumStore`]: SQLite store written by the loader and read by the plotter

pub mod database;
pub mod local;

pub use database::{ForumStore, InsertCounts};
pub use local::JsonCache;
