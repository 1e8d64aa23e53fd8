// src/lib.rs

//! subcrawl: scrape a forum, load it into SQLite, plot what people talk about.

pub mod analysis;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
