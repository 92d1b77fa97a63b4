use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, AnalysisResult};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// One analysis request as the outer layers hand it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[serde(alias = "window_size")]
    pub window_size: usize,
    #[serde(alias = "n_sigma")]
    pub n_sigma: f64,
    #[serde(alias = "lookback_days")]
    pub lookback_days: u32,
    #[serde(alias = "source_field")]
    pub source_field: String,
    #[serde(alias = "tool_filter")]
    pub tool_filter: String,
}

impl DetectionRequest {
    pub fn parameters(&self) -> AnalysisResult<DetectionParameters> {
        DetectionParameters::new(self.window_size, self.n_sigma, self.lookback_days)
    }

    pub fn query_spec(&self, now_ms: i64) -> AnalysisResult<QuerySpec> {
        if self.source_field.trim().is_empty() {
            return Err(AnalysisError::InvalidParameters(
                "sourceField must not be empty".to_string(),
            ));
        }
        Ok(QuerySpec::new(
            self.source_field.clone(),
            self.tool_filter.clone(),
            self.lookback_days,
            now_ms,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParameters {
    window_size: usize,
    n_sigma: f64,
    lookback_days: u32,
}

impl DetectionParameters {
    pub fn new(window_size: usize, n_sigma: f64, lookback_days: u32) -> AnalysisResult<Self> {
        if window_size == 0 {
            return Err(AnalysisError::InvalidParameters(
                "windowSize must be at least 1".to_string(),
            ));
        }
        if !n_sigma.is_finite() || n_sigma <= 0.0 {
            return Err(AnalysisError::InvalidParameters(format!(
                "nSigma must be a positive number, got {}",
                n_sigma
            )));
        }
        if lookback_days == 0 {
            return Err(AnalysisError::InvalidParameters(
                "lookbackDays must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            window_size,
            n_sigma,
            lookback_days,
        })
    }

    /// Half-window radius `k`; windows span up to `2k + 1` points.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn n_sigma(&self) -> f64 {
        self.n_sigma
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }
}

/// Which stored measurements to retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub source_field: String,
    pub tool_filter: String,
    pub since_epoch_ms: i64,
}

impl QuerySpec {
    pub fn new(source_field: String, tool_filter: String, lookback_days: u32, now_ms: i64) -> Self {
        Self {
            source_field,
            tool_filter,
            since_epoch_ms: now_ms - i64::from(lookback_days) * MILLIS_PER_DAY,
        }
    }
}
