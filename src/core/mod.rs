pub mod request;
pub mod series;

pub use request::{DetectionParameters, DetectionRequest, QuerySpec, MILLIS_PER_DAY};
pub use series::{Measurement, OutlierSet, TimeSeries};
