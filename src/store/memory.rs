use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use super::{MeasurementStore, StoreQuery, StoreRecord, StoreResponse};
use crate::errors::RetrievalError;

/// Store backed by records held in memory, e.g. an exported JSON dump.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Vec<StoreRecord>,
}

impl InMemoryStore {
    pub fn new(records: Vec<StoreRecord>) -> Self {
        Self { records }
    }

    /// Builds a store from JSON objects; anything that is not an object is dropped.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(
            values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(fields) => Some(StoreRecord::new(fields)),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Loads a JSON array of documents from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, RetrievalError> {
        let source_err = |message: String| RetrievalError::Source {
            message,
            path: path.display().to_string(),
        };

        let raw = std::fs::read_to_string(path).map_err(|e| source_err(e.to_string()))?;
        let documents: Vec<Map<String, Value>> =
            serde_json::from_str(&raw).map_err(|e| source_err(e.to_string()))?;

        debug!(path = %path.display(), records = documents.len(), "Loaded records from file");
        Ok(Self::new(documents.into_iter().map(StoreRecord::new).collect()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MeasurementStore for InMemoryStore {
    fn search(&self, query: &StoreQuery) -> Result<StoreResponse, RetrievalError> {
        let mut matching: Vec<(i64, &StoreRecord)> = self
            .records
            .iter()
            .filter_map(|record| {
                record
                    .timestamp(&query.sort_field)
                    .filter(|&ts| ts >= query.min_timestamp)
                    .map(|ts| (ts, record))
            })
            .collect();

        // stable, so equal timestamps keep insertion order
        matching.sort_by_key(|(ts, _)| *ts);

        let total_matches = matching.len() as u64;
        let records = matching
            .into_iter()
            .take(query.max_results)
            .map(|(_, record)| record.clone())
            .collect();

        Ok(StoreResponse {
            records,
            total_matches,
        })
    }
}
