/*
* WiFiMon Analysis API Routes
* ---------------------------
* @project: wifimon-analysis
*
* Thin HTTP shell around the analysis pipeline. The pipeline itself is
* synchronous (the store call blocks), so every request hops onto tokio's
* blocking pool, builds a fresh store client + pipeline there, runs it and
* comes back with either a PNG or a JSON report.
*
* Endpoints:
* ----------
* GET  /health                   - liveness, always "ok"
* POST {prefix}/analysis         - DetectionRequest in, image/png out
*                                  (x-wifimon-truncated: returned/available
*                                  when the store capped the result)
* POST {prefix}/analysis/report  - DetectionRequest in, JSON out: flagged
*                                  points with timestamps + base64 PNG
*
* Shared state is read-only settings, the store factory and the governor
* rate limiter. No locks, requests never see each other.
*/

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::DefaultDirectRateLimiter;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::api::error::ErrorResponse;
use crate::api::middleware::rate_limit::{api_limiter, rate_limit};
use crate::config::Settings;
use crate::core::DetectionRequest;
use crate::errors::{AnalysisResult, RetrievalError, TruncatedResult};
use crate::pipeline::{AnalysisPipeline, AnalysisReport, OutlierPoint};
use crate::render::PNG_MEDIA_TYPE;
use crate::store::{ElasticStore, MeasurementStore};

pub const TRUNCATED_HEADER: &str = "x-wifimon-truncated";

const MAX_BODY_BYTES: usize = 16 * 1024;

pub type BoxedStore = Box<dyn MeasurementStore + Send>;

/// Opens a store for one request.
pub type StoreFactory = Arc<dyn Fn(&Settings) -> Result<BoxedStore, RetrievalError> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store_factory: StoreFactory,
    pub limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    /// State backed by the configured Elasticsearch store.
    pub fn new(settings: Settings) -> Self {
        Self::with_store_factory(
            settings,
            Arc::new(|settings: &Settings| {
                ElasticStore::new(&settings.store).map(|store| Box::new(store) as BoxedStore)
            }),
        )
    }

    pub fn with_store_factory(settings: Settings, store_factory: StoreFactory) -> Self {
        let limiter = api_limiter(&settings.rate_limits);
        Self {
            settings: Arc::new(settings),
            store_factory,
            limiter,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub points: usize,
    pub outliers: Vec<OutlierPoint>,
    pub truncated: Option<TruncatedResult>,
    pub skipped_records: usize,
    pub image: String,
}

impl From<&AnalysisReport> for ReportResponse {
    fn from(report: &AnalysisReport) -> Self {
        Self {
            points: report.series.len(),
            outliers: report.outlier_points(),
            truncated: report.truncated,
            skipped_records: report.skipped_records,
            image: report.artifact.to_base64(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let prefix = state.settings.server.api_prefix.trim_end_matches('/').to_string();

    let analysis_router = Router::new()
        .route(&format!("{}/analysis", prefix), post(analyze))
        .route(&format!("{}/analysis/report", prefix), post(analyze_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health))
        .merge(analysis_router)
        .fallback(fallback_handler)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, port: u16) -> anyhow::Result<()> {
    let host: IpAddr = settings.server.host.parse()?;
    let addr = SocketAddr::new(host, port);
    let app = create_router(AppState::new(settings));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_analysis(state: &AppState, request: DetectionRequest) -> Result<AnalysisReport, ErrorResponse> {
    let settings = state.settings.clone();
    let store_factory = state.store_factory.clone();
    let span = info_span!("request", request_id = %Uuid::new_v4());

    tokio::task::spawn_blocking(move || -> AnalysisResult<AnalysisReport> {
        let _guard = span.enter();
        let store = store_factory(&*settings)?;
        AnalysisPipeline::new(store, &*settings).run(&request)
    })
    .await
    .map_err(|e| ErrorResponse::internal(format!("analysis task failed: {}", e)))?
    .map_err(ErrorResponse::from)
}

async fn health() -> &'static str {
    "ok"
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<Response, ErrorResponse> {
    let Json(request) = payload?;
    let report = run_analysis(&state, request).await?;

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PNG_MEDIA_TYPE)],
        report.artifact.bytes,
    )
        .into_response();

    if let Some(truncated) = report.truncated {
        let value = format!("{}/{}", truncated.returned, truncated.available);
        if let Ok(value) = HeaderValue::from_str(&value) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(TRUNCATED_HEADER), value);
        }
    }

    Ok(response)
}

async fn analyze_report(
    State(state): State<AppState>,
    payload: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ErrorResponse> {
    let Json(request) = payload?;
    let report = run_analysis(&state, request).await?;
    Ok(Json(ReportResponse::from(&report)))
}

async fn fallback_handler(req: Request) -> ErrorResponse {
    warn!("Fallback handler called for request: {} {}", req.method(), req.uri());
    ErrorResponse::new(StatusCode::NOT_FOUND, 404, format!("no route for {}", req.uri().path()))
}
