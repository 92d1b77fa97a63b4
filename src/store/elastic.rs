use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{MeasurementStore, StoreQuery, StoreRecord, StoreResponse};
use crate::config::StoreSettings;
use crate::errors::RetrievalError;

/// Blocking client for the `_search` endpoint of an Elasticsearch
/// compatible store.
#[derive(Debug, Clone)]
pub struct ElasticStore {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    // pre-7.x clusters report a bare number
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

impl ElasticStore {
    pub fn new(settings: &StoreSettings) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| RetrievalError::Unreachable {
                message: e.to_string(),
                url: settings.url.clone(),
            })?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.base_url, index)
    }

    fn search_body(query: &StoreQuery) -> Value {
        let mut sort = Map::new();
        sort.insert(query.sort_field.clone(), json!("asc"));

        let mut range = Map::new();
        range.insert(query.sort_field.clone(), json!({ "gte": query.min_timestamp }));

        json!({
            "size": query.max_results,
            "sort": sort,
            "query": { "range": range },
            "track_total_hits": true,
        })
    }
}

impl MeasurementStore for ElasticStore {
    fn search(&self, query: &StoreQuery) -> Result<StoreResponse, RetrievalError> {
        let url = self.search_url(&query.index);
        debug!(url = %url, min_timestamp = query.min_timestamp, size = query.max_results, "Querying store");

        let mut request = self.client.post(&url).json(&Self::search_body(query));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().map_err(|e| RetrievalError::Unreachable {
            message: e.to_string(),
            url: url.clone(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RetrievalError::Unauthorized {
                    status: status.as_u16(),
                },
                StatusCode::BAD_REQUEST => RetrievalError::MalformedQuery { message: body },
                _ => RetrievalError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let parsed: SearchResponse = response.json().map_err(|e| RetrievalError::Decode {
            message: e.to_string(),
        })?;

        let records: Vec<StoreRecord> = parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| StoreRecord::new(hit.source))
            .collect();

        let total_matches = match parsed.hits.total {
            Some(TotalHits::Object { value }) | Some(TotalHits::Count(value)) => value,
            None => records.len() as u64,
        };

        info!(returned = records.len(), total = total_matches, index = %query.index, "Store query complete");

        Ok(StoreResponse {
            records,
            total_matches,
        })
    }
}
