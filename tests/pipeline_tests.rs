mod common;

use common::{decode_png, records, store, BLUE, FIELD, MINUTE_MS, RED, TOOL, WHITE};
use serde_json::json;
use wifimon_analysis::config::{generate_default_config, Settings};
use wifimon_analysis::core::{DetectionRequest, OutlierSet, TimeSeries, MILLIS_PER_DAY};
use wifimon_analysis::errors::{AnalysisError, InvariantViolation, RetrievalError, TruncatedResult};
use wifimon_analysis::pipeline::AnalysisPipeline;
use wifimon_analysis::monitoring::SeriesFetcher;
use wifimon_analysis::render::{SeriesRenderer, MARGIN, Y_LABEL_AREA};
use wifimon_analysis::store::{InMemoryStore, MeasurementStore, StoreQuery, StoreResponse};

const NOW: i64 = 1_700_000_000_000;

fn settings() -> Settings {
    let mut settings = generate_default_config();
    settings.render.width = 400;
    settings.render.height = 200;
    settings
}

fn request(window_size: usize, n_sigma: f64) -> DetectionRequest {
    DetectionRequest {
        window_size,
        n_sigma,
        lookback_days: 1,
        source_field: FIELD.to_string(),
        tool_filter: TOOL.to_string(),
    }
}

struct RejectingStore;

impl MeasurementStore for RejectingStore {
    fn search(&self, _query: &StoreQuery) -> Result<StoreResponse, RetrievalError> {
        Err(RetrievalError::Unauthorized { status: 401 })
    }
}

#[test]
fn test_spike_end_to_end() {
    let values = [10.0, 11.0, 10.0, 50.0, 10.0, 11.0, 10.0];
    let mut docs = records(&values, TOOL, NOW);
    docs.extend(records(&[900.0, 1.0, 900.0], "boomerang", NOW));

    let pipeline = AnalysisPipeline::new(InMemoryStore::from_values(docs), &settings());
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();

    assert_eq!(report.series.values(), values.to_vec());
    assert_eq!(report.outliers.iter().collect::<Vec<_>>(), vec![3]);
    assert!(report.truncated.is_none());

    let points = report.outlier_points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].index, 3);
    assert_eq!(points[0].value, 50.0);
    assert_eq!(points[0].timestamp, NOW - 3 * MINUTE_MS);
    assert_eq!(points[0].median, 11.0);
    assert!(points[0].threshold < 50.0 - 11.0);
    assert_eq!(report.window_stats.len(), values.len());

    let png = decode_png(&report.artifact.bytes);
    assert_eq!((png.width, png.height), (400, 200));
    assert!(png.count(RED) > 0, "outlier marker missing");
}

#[test]
fn test_marker_sits_on_the_flagged_point() {
    let values = [10.0, 11.0, 10.0, 50.0, 10.0, 11.0, 10.0];
    let pipeline = AnalysisPipeline::new(store(&values, NOW), &settings());
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();
    let png = decode_png(&report.artifact.bytes);

    // plot area spans [MARGIN + Y_LABEL_AREA, width - MARGIN) over x in 0..len
    let left = f64::from(MARGIN + Y_LABEL_AREA);
    let right = f64::from(png.width - MARGIN);
    let expected_x = left + 3.0 / values.len() as f64 * (right - left);

    let (x, y) = png.centroid(RED).expect("outlier marker missing");
    assert!(
        (x - expected_x).abs() < 6.0,
        "marker at x = {}, expected about {}",
        x,
        expected_x
    );

    // 50 is the maximum: the marker sits in the upper half, above the bulk of the line
    let (_, line_y) = png.centroid(BLUE).expect("series line missing");
    assert!(y < f64::from(png.height) / 2.0, "marker at y = {}", y);
    assert!(y < line_y, "marker y {} not above line y {}", y, line_y);
}

#[test]
fn test_chart_has_title_and_axis_text() {
    let pipeline = AnalysisPipeline::new(store(&[3.0, 4.0, 5.0], NOW), &settings());
    let report = pipeline.run_at(&request(1, 3.0), NOW).unwrap();
    let png = decode_png(&report.artifact.bytes);

    assert!(png.dark_pixels_in_rows(MARGIN..MARGIN + 20) > 0, "title missing");
    assert!(
        png.dark_pixels_in_rows(png.height - MARGIN - 20..png.height - MARGIN) > 0,
        "x axis description missing"
    );
    assert!(png.count(BLUE) > 0);
}

#[test]
fn test_values_are_rounded_up() {
    let pipeline = AnalysisPipeline::new(store(&[7.2, 7.0, 0.01], NOW), &settings());
    let report = pipeline.run_at(&request(1, 3.0), NOW).unwrap();
    assert_eq!(report.series.values(), vec![8.0, 7.0, 1.0]);
}

#[test]
fn test_empty_store_gives_blank_image() {
    let pipeline = AnalysisPipeline::new(InMemoryStore::default(), &settings());
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();

    assert!(report.series.is_empty());
    assert!(report.outliers.is_empty());
    assert!(report.truncated.is_none());

    let png = decode_png(&report.artifact.bytes);
    assert_eq!(png.count(WHITE), (png.width * png.height) as usize);
}

#[test]
fn test_no_outliers_means_no_markers() {
    let pipeline = AnalysisPipeline::new(store(&[10.0, 11.0, 10.0, 11.0, 10.0], NOW), &settings());
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();
    assert!(report.outliers.is_empty());
    assert_eq!(decode_png(&report.artifact.bytes).count(RED), 0);
}

#[test]
fn test_result_cap_surfaces_truncation() {
    let mut settings = settings();
    settings.store.max_results = 2;

    let pipeline = AnalysisPipeline::new(store(&[1.0, 2.0, 3.0, 4.0, 5.0], NOW), &settings);
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();

    assert_eq!(report.series.values(), vec![1.0, 2.0]);
    assert_eq!(report.truncated, Some(TruncatedResult { returned: 2, available: 5 }));
}

#[test]
fn test_fetcher_cap_overrides_settings() {
    let settings = settings();
    let fetcher = SeriesFetcher::new(store(&[1.0, 2.0, 3.0, 4.0, 5.0], NOW), &settings.store)
        .with_max_results(3);
    let pipeline = AnalysisPipeline::from_parts(fetcher, SeriesRenderer::with_size(300, 150));

    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();
    assert_eq!(report.series.values(), vec![1.0, 2.0, 3.0]);
    assert_eq!(report.truncated, Some(TruncatedResult { returned: 3, available: 5 }));
    assert_eq!((report.artifact.width, report.artifact.height), (300, 150));
}

#[test]
fn test_lookback_excludes_older_records() {
    let docs = vec![
        json!({"Timestamp": NOW - 2 * MILLIS_PER_DAY, "Test-Tool": TOOL, FIELD: 1.0}),
        json!({"Timestamp": NOW - MILLIS_PER_DAY, "Test-Tool": TOOL, FIELD: 2.0}),
        json!({"Timestamp": NOW - 1, "Test-Tool": TOOL, FIELD: 3.0}),
    ];
    let pipeline = AnalysisPipeline::new(InMemoryStore::from_values(docs), &settings());
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();

    // since = now - 1 day, inclusive
    assert_eq!(report.series.values(), vec![2.0, 3.0]);
}

#[test]
fn test_skipped_records_are_counted() {
    let mut docs = records(&[4.0, 5.0], TOOL, NOW);
    docs.push(json!({"Timestamp": NOW, "Test-Tool": TOOL}));
    let pipeline = AnalysisPipeline::new(InMemoryStore::from_values(docs), &settings());
    let report = pipeline.run_at(&request(2, 3.0), NOW).unwrap();
    assert_eq!(report.series.len(), 2);
    assert_eq!(report.skipped_records, 1);
}

#[test]
fn test_invalid_parameters_are_rejected_before_fetching() {
    let pipeline = AnalysisPipeline::new(RejectingStore, &settings());
    let err = pipeline.run_at(&request(0, 3.0), NOW).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidParameters(_)));
}

#[test]
fn test_retrieval_failure_fails_the_request() {
    let pipeline = AnalysisPipeline::new(RejectingStore, &settings());
    let err = pipeline.run_at(&request(2, 3.0), NOW).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Retrieval(RetrievalError::Unauthorized { status: 401 })
    ));
}

#[test]
fn test_renderer_rejects_foreign_outlier_indices() {
    let series = TimeSeries::from_parts(&[1, 2], &[1.0, 2.0]).unwrap();
    let outliers: OutlierSet = [5].into_iter().collect();
    let err = SeriesRenderer::with_size(200, 100).render(&series, &outliers).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Invariant(InvariantViolation::IndexOutOfRange { index: 5, len: 2 })
    ));
}
