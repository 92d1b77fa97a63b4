pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod monitoring;
pub mod pipeline;
pub mod render;
pub mod store;

// Re-exports
pub use config::Settings;
pub use crate::core::{DetectionParameters, DetectionRequest, Measurement, OutlierSet, QuerySpec, TimeSeries};
pub use errors::{AnalysisError, AnalysisResult, InvariantViolation, RetrievalError, TruncatedResult};
pub use monitoring::{HampelDetector, OutlierDetector, SeriesFetcher};
pub use pipeline::{AnalysisPipeline, AnalysisReport};
pub use render::{RenderedArtifact, SeriesRenderer};
pub use store::{ElasticStore, InMemoryStore, MeasurementStore};
