pub mod elastic;
pub mod memory;

use serde_json::{Map, Value};

use crate::errors::RetrievalError;

pub use elastic::ElasticStore;
pub use memory::InMemoryStore;

/// A read-only query against a timestamp-indexed store. Results are always
/// sorted ascending on `sort_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    pub index: String,
    pub sort_field: String,
    pub min_timestamp: i64,
    pub max_results: usize,
}

/// One stored document, fields addressed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreRecord {
    fields: Map<String, Value>,
}

impl StoreRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn timestamp(&self, name: &str) -> Option<i64> {
        let value = self.field(name)?;
        value.as_i64().or_else(|| value.as_f64().map(|ms| ms as i64))
    }
}

impl From<Map<String, Value>> for StoreRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreResponse {
    pub records: Vec<StoreRecord>,
    /// Matches the store holds for the query, capped or not
    pub total_matches: u64,
}

impl StoreResponse {
    pub fn is_truncated(&self) -> bool {
        self.total_matches > self.records.len() as u64
    }
}

/// Anything that can answer a [`StoreQuery`]. Calls block until the store
/// responds or fails.
pub trait MeasurementStore {
    fn search(&self, query: &StoreQuery) -> Result<StoreResponse, RetrievalError>;
}

impl<S: MeasurementStore + ?Sized> MeasurementStore for Box<S> {
    fn search(&self, query: &StoreQuery) -> Result<StoreResponse, RetrievalError> {
        (**self).search(query)
    }
}

impl<S: MeasurementStore + ?Sized> MeasurementStore for &S {
    fn search(&self, query: &StoreQuery) -> Result<StoreResponse, RetrievalError> {
        (**self).search(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_timestamp_accepts_floats() {
        let record: StoreRecord = json!({"Timestamp": 1_700_000_000_000.0})
            .as_object()
            .cloned()
            .unwrap()
            .into();
        assert_eq!(record.timestamp("Timestamp"), Some(1_700_000_000_000));
        assert_eq!(record.timestamp("Missing"), None);
    }
}
