// src/pipeline/plot.rs

//! Plot stage: aggregate queries into an SVG chart.

use std::path::{Path, PathBuf};

use crate::analysis::{
    ChartSelector, ChartStyle, daily_activity, daily_mentions, daily_scores, hourly_activity,
    render_daily, render_hourly,
};
use crate::error::Result;
use crate::models::Config;
use crate::storage::ForumStore;

/// Default chart location: `<output_dir>/<forum>-<selector>.svg`.
pub fn default_output(config: &Config, forum: &str, selector: ChartSelector) -> PathBuf {
    config
        .paths
        .output_dir
        .join(format!("{forum}-{selector}.svg"))
}

fn utc_label(offset_hours: i32) -> String {
    match offset_hours {
        0 => "UTC".to_string(),
        h => format!("UTC{h:+}"),
    }
}

/// Run one chart query against a read-only store and write the chart.
///
/// Returns the path of the written SVG.
pub async fn run_plot(
    config: &Config,
    db_path: &Path,
    forum: &str,
    selector: ChartSelector,
    term: Option<&str>,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(config, forum, selector));
    let offset = config.analysis.offset_secs();
    let tz = utc_label(config.analysis.timezone_offset_hours);
    let style = ChartStyle::from(&config.analysis);

    let store = ForumStore::open_read_only(db_path).await?;
    let result = draw(&store, forum, selector, term, config, &output, offset, &tz, style).await;
    store.close().await;
    let rows = result?;

    if rows == 0 {
        log::warn!("No rows for r/{forum} in {}; chart is empty", db_path.display());
    }
    log::info!("Wrote {selector} chart to {}", output.display());
    Ok(output)
}

/// Query and render; returns the number of data points drawn.
#[allow(clippy::too_many_arguments)]
async fn draw(
    store: &ForumStore,
    forum: &str,
    selector: ChartSelector,
    term: Option<&str>,
    config: &Config,
    output: &Path,
    offset: i64,
    tz: &str,
    style: ChartStyle,
) -> Result<usize> {
    match selector {
        ChartSelector::Mentions => {
            let term = term.unwrap_or(&config.analysis.default_term);
            let series = daily_mentions(store, forum, term, offset).await?;
            let title = format!("r/{forum}: posts and comments mentioning {term} per day ({tz})");
            render_daily(output, &title, "mentions", &[(term, &series)], style)?;
            Ok(series.len())
        }
        ChartSelector::Score => {
            let series = daily_scores(store, forum, offset).await?;
            let title = format!("r/{forum}: total post score per day ({tz})");
            render_daily(output, &title, "score", &[("score", &series)], style)?;
            Ok(series.len())
        }
        ChartSelector::Activity => {
            let (posts, comments) = daily_activity(store, forum, offset).await?;
            let title = format!("r/{forum}: activity per day ({tz})");
            render_daily(
                output,
                &title,
                "count",
                &[("posts", &posts), ("comments", &comments)],
                style,
            )?;
            Ok(posts.len() + comments.len())
        }
        ChartSelector::Hourly => {
            let counts = hourly_activity(store, forum, offset).await?;
            let title = format!("r/{forum}: posts and comments by hour ({tz})");
            render_hourly(output, &title, &counts, style)?;
            Ok(counts.iter().filter(|c| **c > 0).count())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{ContentKind, Post};
    use tempfile::TempDir;

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.to_string(),
            title: title.to_string(),
            author: "ape".to_string(),
            created_utc: 1_612_137_600,
            score: 3,
            listing: "new".to_string(),
            num_comments: 0,
            selftext: String::new(),
            url: String::new(),
            permalink: String::new(),
            edited: None,
        }
    }

    #[test]
    fn test_default_output_and_tz_label() {
        let mut config = Config::default();
        config.paths.output_dir = PathBuf::from("out");
        assert_eq!(
            default_output(&config, "wsv", ChartSelector::Hourly),
            PathBuf::from("out/wsv-hourly.svg")
        );
        assert_eq!(utc_label(0), "UTC");
        assert_eq!(utc_label(-5), "UTC-5");
        assert_eq!(utc_label(9), "UTC+9");
    }

    #[tokio::test]
    async fn test_plot_every_selector_leaves_store_unchanged() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("wsv.db");
        let store = ForumStore::open(&db).await.unwrap();
        store
            .insert_posts("wsv", &[post("a", "GME"), post("b", "gold")], 0)
            .await
            .unwrap();
        store.close().await;

        let mut config = Config::default();
        config.paths.output_dir = tmp.path().join("charts");

        for selector in [
            ChartSelector::Mentions,
            ChartSelector::Score,
            ChartSelector::Activity,
            ChartSelector::Hourly,
        ] {
            let path = run_plot(&config, &db, "wsv", selector, None, None).await.unwrap();
            assert!(path.exists(), "{selector} chart missing");
        }

        let store = ForumStore::open_read_only(&db).await.unwrap();
        assert_eq!(store.count(ContentKind::Posts).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_plot_missing_store() {
        let tmp = TempDir::new().unwrap();
        let err = run_plot(
            &Config::default(),
            &tmp.path().join("none.db"),
            "wsv",
            ChartSelector::Score,
            None,
            Some(&tmp.path().join("x.svg")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::MissingInput(_)));
    }
}
