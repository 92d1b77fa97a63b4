pub mod anomaly_detection;
pub mod fetcher;

pub use anomaly_detection::{HampelDetector, OutlierDetector, WindowStats, MAD_SCALE};
pub use fetcher::{normalize_value, FetchedSeries, SeriesFetcher};
