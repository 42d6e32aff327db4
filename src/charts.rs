//! Chart rendering: pure functions from aggregate data to a base64-encoded
//! SVG image.
//!
//! Rendering never touches stored data. Failures come back as
//! [`RenderError`] and are surfaced to the caller of the view that asked
//! for the chart.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::DateTime;
use plotters::coord::ranged1d::{IntoSegmentedCoord, SegmentValue};
use plotters::prelude::*;

use crate::{Reading, RenderError, Summary};

// ---

const SIZE: (u32, u32) = (640, 360);
const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);
const CAPTION_FONT: (&str, i32) = ("sans-serif", 18);

/// Bar chart of average / maximum / minimum temperature.
pub fn daily_summary_chart(summary: &Summary) -> Result<String, RenderError> {
    // ---
    let bars = [
        ("Average", summary.avg_temp),
        ("Maximum", summary.max_temp),
        ("Minimum", summary.min_temp),
    ];
    let title = format!(
        "Daily Temperature Summary - Dominant condition: {}",
        summary.dominant_condition
    );
    bar_chart(&title, "Temperature (°C)", &bars).map(encode)
}

/// Line chart of temperature over time for one location.
///
/// `readings` should be in ascending `observed_at` order.
pub fn historical_trend_chart(location: &str, readings: &[Reading]) -> Result<String, RenderError> {
    // ---
    let (first, last) = match (readings.first(), readings.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(RenderError::EmptySeries),
    };
    ensure_finite(readings.iter().map(|r| r.temperature))?;

    let t0 = first.observed_at;
    let t1 = last.observed_at.max(t0 + 1);
    let (lo, hi) = padded_range(readings.iter().map(|r| r.temperature));
    let day_label = |ts: &i64| format_day(*ts);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Historical Temperature Trend for {location}"), CAPTION_FONT)
            .margin(16)
            .x_label_area_size(32)
            .y_label_area_size(48)
            .build_cartesian_2d(t0..t1, lo..hi)?;

        chart
            .configure_mesh()
            .x_labels(4)
            .x_label_formatter(&day_label)
            .y_desc("Temperature (°C)")
            .draw()?;

        let points = readings.iter().map(|r| (r.observed_at, r.temperature));
        chart.draw_series(LineSeries::new(points.clone(), &BLUE))?;
        chart.draw_series(points.map(|p| Circle::new(p, 3, BLUE.filled())))?;

        root.present()?;
    }
    Ok(encode(svg))
}

/// Bar chart of the configured alert thresholds by location.
pub fn alert_thresholds_chart(thresholds: &BTreeMap<String, f64>) -> Result<String, RenderError> {
    // ---
    let bars: Vec<(&str, f64)> = thresholds
        .iter()
        .map(|(location, threshold)| (location.as_str(), *threshold))
        .collect();
    bar_chart("Alert Thresholds by City", "Alert Threshold (°C)", &bars).map(encode)
}

fn bar_chart(title: &str, y_label: &str, bars: &[(&str, f64)]) -> Result<String, RenderError> {
    // ---
    ensure_finite(bars.iter().map(|(_, v)| *v))?;

    // Bars grow from zero, so zero is always inside the range
    let (lo, hi) = padded_range(bars.iter().map(|(_, v)| *v).chain([0.0]));
    // Integer ranges are inclusive when segmented; keep at least two slots
    let last_slot = bars.len().max(2) as u32 - 1;
    let slot_label = |slot: &SegmentValue<u32>| match slot {
        SegmentValue::CenterOf(i) => bars
            .get(*i as usize)
            .map_or_else(String::new, |(label, _)| label.to_string()),
        _ => String::new(),
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, CAPTION_FONT)
            .margin(16)
            .x_label_area_size(32)
            .y_label_area_size(48)
            .build_cartesian_2d((0..last_slot).into_segmented(), lo..hi)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len().max(2))
            .x_label_formatter(&slot_label)
            .y_desc(y_label)
            .draw()?;

        chart.draw_series(bars.iter().zip(0u32..).map(|(&(_, value), i)| {
            let top = (SegmentValue::Exact(i), value.max(0.0));
            let bottom = (SegmentValue::Exact(i + 1), value.min(0.0));
            let mut bar = Rectangle::new([top, bottom], BAR_COLOR.filled());
            bar.set_margin(0, 0, 12, 12);
            bar
        }))?;

        root.present()?;
    }
    Ok(svg)
}

fn ensure_finite(values: impl Iterator<Item = f64>) -> Result<(), RenderError> {
    // ---
    for v in values {
        if !v.is_finite() {
            return Err(RenderError::NonFinite(v));
        }
    }
    Ok(())
}

/// Min/max widened by 10% of the span (or by 1°C for a flat series).
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    // ---
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.1 } else { 1.0 };
    (lo - pad, hi + pad)
}

fn format_day(ts: i64) -> String {
    // ---
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn encode(svg: String) -> String {
    STANDARD.encode(svg)
}
