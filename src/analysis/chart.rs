//! SVG rendering of aggregate series.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;

use crate::analysis::{DailySeries, HOURS};
use crate::error::{AppError, Result};
use crate::models::AnalysisConfig;

/// Canvas size of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
}

impl From<&AnalysisConfig> for ChartStyle {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            width: config.chart_width,
            height: config.chart_height,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Value axis covering `values`, always including zero, with some headroom.
fn value_range(values: impl Iterator<Item = i64>) -> std::ops::Range<i64> {
    let (lo, hi) = values.fold((0i64, 1i64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) / 10).max(1);
    let lo = if lo < 0 { lo - pad } else { 0 };
    lo..hi + pad
}

/// Draw one line per named daily series on a shared date axis.
pub fn render_daily(
    path: &Path,
    title: &str,
    y_desc: &str,
    series: &[(&str, &DailySeries)],
    style: ChartStyle,
) -> Result<()> {
    let days = || series.iter().flat_map(|(_, s)| s.keys().copied());
    let first: NaiveDate = days().min().unwrap_or_default();
    let last: NaiveDate = days().max().unwrap_or(first);
    let span = (last - first).num_days().max(1);
    let y_range = value_range(series.iter().flat_map(|(_, s)| s.values().copied()));

    ensure_parent(path)?;
    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(AppError::chart)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0i64..span, y_range)
        .map_err(AppError::chart)?;

    let day_label = |x: &i64| (first + Duration::days(*x)).format("%Y-%m-%d").to_string();
    chart
        .configure_mesh()
        .x_labels(10)
        .x_label_formatter(&day_label)
        .y_desc(y_desc)
        .draw()
        .map_err(AppError::chart)?;

    for (idx, (name, data)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                data.iter().map(|(day, v)| ((*day - first).num_days(), *v)),
                color.stroke_width(2),
            ))
            .map_err(AppError::chart)?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(AppError::chart)?;

    root.present().map_err(AppError::chart)?;
    Ok(())
}

/// Draw a 24-bar histogram of activity by hour of day.
pub fn render_hourly(path: &Path, title: &str, counts: &[i64; HOURS], style: ChartStyle) -> Result<()> {
    let y_range = value_range(counts.iter().copied());

    ensure_parent(path)?;
    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(AppError::chart)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0i64..HOURS as i64, y_range)
        .map_err(AppError::chart)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(HOURS)
        .x_desc("hour of day")
        .y_desc("posts + comments")
        .draw()
        .map_err(AppError::chart)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(hour, count)| {
            let hour = hour as i64;
            Rectangle::new([(hour, 0), (hour + 1, *count)], BLUE.mix(0.6).filled())
        }))
        .map_err(AppError::chart)?;

    root.present().map_err(AppError::chart)?;
    Ok(())
}
