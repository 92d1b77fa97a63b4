use tracing::{debug, warn};

use crate::config::StoreSettings;
use crate::core::{Measurement, QuerySpec, TimeSeries};
use crate::errors::{AnalysisResult, TruncatedResult};
use crate::store::{MeasurementStore, StoreQuery, StoreRecord};

/// Result of a fetch: the series plus what the caller should know about it.
#[derive(Debug, Clone, Default)]
pub struct FetchedSeries {
    pub series: TimeSeries,
    pub truncated: Option<TruncatedResult>,
    /// Records of the right tool that lacked a usable value or timestamp
    pub skipped: usize,
}

/// Turns a [`QuerySpec`] into a [`TimeSeries`] using an injected store.
pub struct SeriesFetcher<S> {
    store: S,
    index: String,
    timestamp_field: String,
    tool_field: String,
    max_results: usize,
}

enum RecordOutcome {
    Kept(Measurement),
    OtherTool,
    Skipped(&'static str),
}

/// Measurements are rounded up to whole units before detection.
pub fn normalize_value(raw: f64) -> f64 {
    raw.ceil()
}

impl<S: MeasurementStore> SeriesFetcher<S> {
    pub fn new(store: S, settings: &StoreSettings) -> Self {
        Self {
            store,
            index: settings.index.clone(),
            timestamp_field: settings.timestamp_field.clone(),
            tool_field: settings.tool_field.clone(),
            max_results: settings.max_results,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn fetch(&self, spec: &QuerySpec) -> AnalysisResult<FetchedSeries> {
        let query = StoreQuery {
            index: self.index.clone(),
            sort_field: self.timestamp_field.clone(),
            min_timestamp: spec.since_epoch_ms,
            max_results: self.max_results,
        };

        let response = self.store.search(&query)?;

        let truncated = response.is_truncated().then(|| TruncatedResult {
            returned: response.records.len(),
            available: response.total_matches,
        });
        if let Some(truncated) = &truncated {
            warn!(
                returned = truncated.returned,
                available = truncated.available,
                cap = self.max_results,
                "Store result truncated, detection runs on a partial series"
            );
        }

        let mut measurements = Vec::with_capacity(response.records.len());
        let mut skipped = 0;
        for record in &response.records {
            match self.read_record(record, spec) {
                RecordOutcome::Kept(measurement) => measurements.push(measurement),
                RecordOutcome::OtherTool => {}
                RecordOutcome::Skipped(reason) => {
                    skipped += 1;
                    debug!(reason, "Skipping record");
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, field = %spec.source_field, "Records without a usable value were skipped");
        }

        let series = TimeSeries::new(measurements)?;
        debug!(points = series.len(), tool = %spec.tool_filter, "Series fetched");

        Ok(FetchedSeries {
            series,
            truncated,
            skipped,
        })
    }

    fn read_record(&self, record: &StoreRecord, spec: &QuerySpec) -> RecordOutcome {
        let tool = match record.field(&self.tool_field).and_then(|v| v.as_str()) {
            Some(tool) => tool,
            None => return RecordOutcome::Skipped("missing tool tag"),
        };
        if tool != spec.tool_filter {
            return RecordOutcome::OtherTool;
        }

        let value = match record.field(&spec.source_field).and_then(|v| v.as_f64()) {
            Some(value) => value,
            None => return RecordOutcome::Skipped("missing or non-numeric value"),
        };
        let timestamp = match record.timestamp(&self.timestamp_field) {
            Some(ts) => ts,
            None => return RecordOutcome::Skipped("missing timestamp"),
        };

        RecordOutcome::Kept(Measurement {
            timestamp,
            value: normalize_value(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generate_default_config;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn spec() -> QuerySpec {
        QuerySpec {
            source_field: "downloadThroughput".to_string(),
            tool_filter: "NetTest".to_string(),
            since_epoch_ms: 0,
        }
    }

    #[test]
    fn test_ceiling_normalization() {
        assert_eq!(normalize_value(7.2), 8.0);
        assert_eq!(normalize_value(7.0), 7.0);
        assert_eq!(normalize_value(-1.5), -1.0);
    }

    #[test]
    fn test_filters_tool_and_skips_broken_records() {
        let store = InMemoryStore::from_values(vec![
            json!({"Timestamp": 1, "Test-Tool": "NetTest", "downloadThroughput": 7.2}),
            json!({"Timestamp": 2, "Test-Tool": "boomerang", "downloadThroughput": 99.0}),
            json!({"Timestamp": 3, "Test-Tool": "NetTest"}),
            json!({"Timestamp": 4, "Test-Tool": "NetTest", "downloadThroughput": "fast"}),
            json!({"Timestamp": 5, "downloadThroughput": 3.0}),
            json!({"Timestamp": 6, "Test-Tool": "NetTest", "downloadThroughput": 12}),
        ]);
        let fetcher = SeriesFetcher::new(store, &generate_default_config().store);

        let fetched = fetcher.fetch(&spec()).unwrap();
        assert_eq!(fetched.series.values(), vec![8.0, 12.0]);
        assert_eq!(fetched.skipped, 3);
        assert!(fetched.truncated.is_none());
    }
}
