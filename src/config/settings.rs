/*
* WiFiMon Analysis Configuration
* ------------------------------
* @project: wifimon-analysis
*
* Hierarchical configuration, lowest to highest priority:
*
* 1. Hardcoded defaults (set_default below, so a bare checkout just runs)
* 2. {config_dir}/default.toml
* 3. {config_dir}/local.toml (machine specific, keep it out of git)
* 4. Environment variables: WIFIMON__SECTION__KEY, e.g.
*    WIFIMON__STORE__PASSWORD=hunter2
*
* Sections:
* ---------
* server      - where `serve` listens and the API prefix
* store       - Elasticsearch endpoint, credentials, index, field names and
*               the per-query result cap (10k is the ES default window)
* detection   - fallback Hampel parameters when the caller leaves them out
* render      - PNG size in pixels
* rate_limits - requests per minute accepted by the HTTP API
*
* Settings are loaded exactly once at start-up and handed to whoever needs
* them. Nothing downstream reads the environment on its own.
*/

use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub detection: DetectionDefaults,
    pub render: RenderSettings,
    pub rate_limits: RateLimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub url: String,
    pub index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub timestamp_field: String,
    pub tool_field: String,
    pub max_results: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionDefaults {
    pub window_size: usize,
    pub n_sigma: f64,
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub api_requests_per_minute: u32,
}

impl Default for Settings {
    fn default() -> Self {
        generate_default_config()
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
        Self::from_dir(Path::new(&config_path))
    }

    pub fn from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        Self::load(config_dir, None)
    }

    /// `env` replaces the process environment as the override source when given.
    fn load(config_dir: &Path, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        info!("Loading configuration from path: {}", config_dir.display());

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8888)?
            .set_default("server.api_prefix", "/api/v1")?
            .set_default("store.url", "https://localhost:9200")?
            .set_default("store.index", "wifimon")?
            .set_default("store.username", "elastic")?
            .set_default("store.timestamp_field", "Timestamp")?
            .set_default("store.tool_field", "Test-Tool")?
            .set_default("store.max_results", 10_000)?
            .set_default("store.timeout_seconds", 30)?
            .set_default("detection.window_size", 5)?
            .set_default("detection.n_sigma", 3.0)?
            .set_default("detection.lookback_days", 7)?
            .set_default("render.width", 1600)?
            .set_default("render.height", 800)?
            .set_default("rate_limits.api_requests_per_minute", 100)?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join("local")).required(false))
            .add_source(
                Environment::with_prefix("WIFIMON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        config.try_deserialize()
    }
}

pub fn generate_default_config() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8888,
            api_prefix: "/api/v1".to_string(),
        },
        store: StoreSettings {
            url: "https://localhost:9200".to_string(),
            index: "wifimon".to_string(),
            username: Some("elastic".to_string()),
            password: None,
            timestamp_field: "Timestamp".to_string(),
            tool_field: "Test-Tool".to_string(),
            max_results: 10_000,
            timeout_seconds: 30,
        },
        detection: DetectionDefaults {
            window_size: 5,
            n_sigma: 3.0,
            lookback_days: 7,
        },
        render: RenderSettings {
            width: 1600,
            height: 800,
        },
        rate_limits: RateLimitSettings {
            api_requests_per_minute: 100,
        },
    }
}
