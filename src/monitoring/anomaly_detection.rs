//! Hampel identifier over a clipped sliding window.
//!
//! For every position `i` the window is `[i - k, i + k]` clipped to the
//! series, never shifted, so edge windows hold fewer points. A point is an
//! outlier when it sits further than `n_sigma` scaled MADs from the window
//! median.

use serde::Serialize;

use crate::core::{DetectionParameters, OutlierSet, TimeSeries};

/// Consistency constant turning a MAD into a standard deviation estimate for
/// normally distributed data.
pub const MAD_SCALE: f64 = 1.4826;

/// Anything that flags positions of a series.
pub trait OutlierDetector {
    fn detect(&self, series: &TimeSeries) -> OutlierSet;
}

/// Per-position statistics behind a Hampel decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub median: f64,
    /// `MAD_SCALE * MAD`
    pub sigma: f64,
    /// `|x - median|`
    pub deviation: f64,
    /// `n_sigma * sigma`
    pub threshold: f64,
}

impl WindowStats {
    pub fn is_outlier(&self) -> bool {
        // sigma == 0 makes the threshold 0: any differing point is flagged, equal ones never
        self.deviation > self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HampelDetector {
    half_window: usize,
    n_sigma: f64,
}

impl HampelDetector {
    pub fn new(half_window: usize, n_sigma: f64) -> Self {
        Self {
            half_window,
            n_sigma,
        }
    }

    pub fn from_parameters(params: &DetectionParameters) -> Self {
        Self::new(params.window_size(), params.n_sigma())
    }

    /// Window statistics for every position, in series order.
    pub fn scores(&self, values: &[f64]) -> Vec<WindowStats> {
        let len = values.len();
        let mut scratch = Vec::with_capacity(2 * self.half_window + 1);

        (0..len)
            .map(|i| {
                let lo = i.saturating_sub(self.half_window);
                let hi = i.saturating_add(self.half_window).min(len - 1);

                scratch.clear();
                scratch.extend_from_slice(&values[lo..=hi]);
                let median = median_in_place(&mut scratch);

                for v in scratch.iter_mut() {
                    *v = (*v - median).abs();
                }
                let sigma = MAD_SCALE * median_in_place(&mut scratch);

                WindowStats {
                    median,
                    sigma,
                    deviation: (values[i] - median).abs(),
                    threshold: self.n_sigma * sigma,
                }
            })
            .collect()
    }

    pub fn detect_values(&self, values: &[f64]) -> OutlierSet {
        Self::outliers_from(&self.scores(values))
    }

    /// Positions whose statistics cross the threshold.
    pub fn outliers_from(stats: &[WindowStats]) -> OutlierSet {
        stats
            .iter()
            .enumerate()
            .filter(|(_, stats)| stats.is_outlier())
            .map(|(i, _)| i)
            .collect()
    }
}

impl OutlierDetector for HampelDetector {
    fn detect(&self, series: &TimeSeries) -> OutlierSet {
        self.detect_values(&series.values())
    }
}

/// Median of a non-empty slice; even lengths average the two middle values.
fn median_in_place(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
