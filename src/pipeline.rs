use serde::Serialize;
use tracing::{info, info_span};

use crate::config::Settings;
use crate::core::{DetectionRequest, OutlierSet, TimeSeries};
use crate::errors::{AnalysisResult, TruncatedResult};
use crate::monitoring::{HampelDetector, SeriesFetcher, WindowStats};
use crate::render::{RenderedArtifact, SeriesRenderer};
use crate::store::MeasurementStore;
use crate::with_context;

/// Everything one analysis produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub series: TimeSeries,
    pub outliers: OutlierSet,
    pub artifact: RenderedArtifact,
    pub truncated: Option<TruncatedResult>,
    pub skipped_records: usize,
    /// Hampel statistics for every position of `series`
    pub window_stats: Vec<WindowStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierPoint {
    pub index: usize,
    pub timestamp: i64,
    pub value: f64,
    pub median: f64,
    pub threshold: f64,
}

impl AnalysisReport {
    /// Flagged positions with their timestamp and value, ascending by index.
    pub fn outlier_points(&self) -> Vec<OutlierPoint> {
        self.outliers
            .iter()
            .filter_map(|index| {
                let m = self.series.get(index)?;
                let stats = self.window_stats.get(index)?;
                Some(OutlierPoint {
                    index,
                    timestamp: m.timestamp,
                    value: m.value,
                    median: stats.median,
                    threshold: stats.threshold,
                })
            })
            .collect()
    }
}

/// Fetch, detect, render. One call per request, nothing kept in between.
pub struct AnalysisPipeline<S> {
    fetcher: SeriesFetcher<S>,
    renderer: SeriesRenderer,
}

impl<S: MeasurementStore> AnalysisPipeline<S> {
    pub fn new(store: S, settings: &Settings) -> Self {
        Self {
            fetcher: SeriesFetcher::new(store, &settings.store),
            renderer: SeriesRenderer::new(&settings.render),
        }
    }

    pub fn from_parts(fetcher: SeriesFetcher<S>, renderer: SeriesRenderer) -> Self {
        Self { fetcher, renderer }
    }

    pub fn run(&self, request: &DetectionRequest) -> AnalysisResult<AnalysisReport> {
        self.run_at(request, chrono::Utc::now().timestamp_millis())
    }

    /// Same as [`run`](Self::run) with an explicit "now" in epoch ms.
    pub fn run_at(&self, request: &DetectionRequest, now_ms: i64) -> AnalysisResult<AnalysisReport> {
        let span = info_span!(
            "analysis",
            field = %request.source_field,
            tool = %request.tool_filter,
            window = request.window_size,
            n_sigma = request.n_sigma,
        );
        let _guard = span.enter();

        let params = request.parameters()?;
        let spec = request.query_spec(now_ms)?;

        let fetched = with_context!(self.fetcher.fetch(&spec), "fetch series")?;

        let detector = HampelDetector::from_parameters(&params);
        let window_stats = detector.scores(&fetched.series.values());
        let outliers = HampelDetector::outliers_from(&window_stats);

        let artifact = with_context!(
            self.renderer.render(&fetched.series, &outliers),
            "render series"
        )?;

        info!(
            points = fetched.series.len(),
            outliers = outliers.len(),
            truncated = fetched.truncated.is_some(),
            "Analysis complete"
        );

        Ok(AnalysisReport {
            series: fetched.series,
            outliers,
            artifact,
            truncated: fetched.truncated,
            skipped_records: fetched.skipped,
            window_stats,
        })
    }
}
