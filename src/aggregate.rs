//! Aggregator: statistical summaries over windows of readings.
//!
//! Window selection is the store's job; this module only turns the
//! window's lower bound into a timestamp and reduces the readings it gets.

use crate::{Reading, Summary};

// ---

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Time windows used by the query layer, open-ended up to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    // ---
    /// Last 24 hours.
    Daily,
    /// Last 7 days.
    Historical,
}

impl Window {
    // ---
    /// Lower bound (inclusive) of the window ending at `now`.
    pub fn min_timestamp(self, now: i64) -> i64 {
        // ---
        match self {
            Window::Daily => now - SECONDS_PER_DAY,
            Window::Historical => now - 7 * SECONDS_PER_DAY,
        }
    }
}

/// Summarize a non-empty collection of readings.
///
/// The dominant condition is the most frequent label; ties go to the label
/// seen first in `readings` order. Callers must not pass an empty slice,
/// see [`summarize_or_sentinel`].
pub fn summarize(readings: &[Reading]) -> Summary {
    // ---
    debug_assert!(!readings.is_empty(), "summarize called with no readings");

    let mut total = 0.0;
    let mut max_temp = f64::NEG_INFINITY;
    let mut min_temp = f64::INFINITY;
    // (label, count) in first-seen order
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for r in readings {
        total += r.temperature;
        max_temp = max_temp.max(r.temperature);
        min_temp = min_temp.min(r.temperature);

        match counts.iter_mut().find(|(label, _)| *label == r.condition) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.condition.as_str(), 1)),
        }
    }

    let mut dominant: Option<(&str, usize)> = None;
    for &(label, n) in &counts {
        // Strict comparison keeps the earliest label on ties
        if dominant.map_or(true, |(_, best)| n > best) {
            dominant = Some((label, n));
        }
    }

    // Rounding in the sum can push the mean just outside [min, max]
    let avg_temp = (total / readings.len() as f64).max(min_temp).min(max_temp);

    Summary {
        avg_temp,
        max_temp,
        min_temp,
        dominant_condition: dominant.map(|(label, _)| label.to_string()).unwrap_or_default(),
    }
}

/// Caller-side guard: the "No data" sentinel for an empty window, otherwise
/// [`summarize`].
pub fn summarize_or_sentinel(readings: &[Reading]) -> Summary {
    // ---
    if readings.is_empty() {
        Summary::no_data()
    } else {
        summarize(readings)
    }
}
