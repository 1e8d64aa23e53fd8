// src/analysis/mod.rs

//! Aggregate queries over the store and their charts.

mod chart;
mod queries;

use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

pub use chart::{ChartStyle, render_daily, render_hourly};
pub use queries::{
    DailySeries, HOURS, daily_activity, daily_mentions, daily_scores, hourly_activity,
    mention_pattern,
};

/// Which aggregate a `plot` run draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSelector {
    /// Posts and comments mentioning a term per day
    Mentions,
    /// Sum of post scores per day
    Score,
    /// Posts per day and comments per day
    Activity,
    /// Posts and comments by hour of day
    Hourly,
}

impl ChartSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartSelector::Mentions => "mentions",
            ChartSelector::Score => "score",
            ChartSelector::Activity => "activity",
            ChartSelector::Hourly => "hourly",
        }
    }
}

impl fmt::Display for ChartSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mentions" => Ok(ChartSelector::Mentions),
            "score" => Ok(ChartSelector::Score),
            "activity" => Ok(ChartSelector::Activity),
            "hourly" => Ok(ChartSelector::Hourly),
            other => Err(AppError::validation(format!(
                "unknown chart '{other}' (expected mentions, score, activity or hourly)"
            ))),
        }
    }
}
