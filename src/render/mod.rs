/*
* Series Renderer
* ---------------
* Draws the fetched series as one continuous blue line over its positional
* index (x = 0..len, not wall-clock time) and drops a filled red marker on
* every flagged index. The chart carries the "WiFiMon Time Series" title,
* a labelled mesh ("Index" / "Monitored Metric") and tick values.
*
* Pixels go into an in-memory RGB buffer through plotters' bitmap backend and
* the buffer is PNG-encoded with the `png` crate. Text goes through the
* ab_glyph backend with DejaVu Sans compiled into the binary, so the box
* needs no font packages. Nothing touches disk.
*/

use base64::Engine;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::sync::OnceLock;

use crate::config::RenderSettings;
use crate::core::{OutlierSet, TimeSeries};
use crate::errors::{AnalysisResult, RenderError};

pub const PNG_MEDIA_TYPE: &str = "image/png";

pub const TITLE: &str = "WiFiMon Time Series";
pub const X_DESC: &str = "Index";
pub const Y_DESC: &str = "Monitored Metric";

/// Outer margin around the chart.
pub const MARGIN: u32 = 20;
/// Width of the tick label area left of the plot.
pub const Y_LABEL_AREA: u32 = 60;
/// Height of the tick label area below the plot.
pub const X_LABEL_AREA: u32 = 40;

pub const MIN_WIDTH: u32 = 160;
pub const MIN_HEIGHT: u32 = 120;
const MAX_PIXELS: usize = 64 * 1024 * 1024;

const MARKER_RADIUS: i32 = 5;
const FONT_FAMILY: &str = "sans-serif";
static DEJAVU_SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Encoded image produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedArtifact {
    pub fn media_type(&self) -> &'static str {
        PNG_MEDIA_TYPE
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SeriesRenderer {
    width: u32,
    height: u32,
}

impl SeriesRenderer {
    pub fn new(settings: &RenderSettings) -> Self {
        Self::with_size(settings.width, settings.height)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_WIDTH),
            height: height.max(MIN_HEIGHT),
        }
    }

    /// An empty series yields a blank image, not an error.
    pub fn render(&self, series: &TimeSeries, outliers: &OutlierSet) -> AnalysisResult<RenderedArtifact> {
        outliers.check_against(series.len())?;

        let mut pixels = vec![0u8; self.buffer_len()?];
        self.draw(&mut pixels, series, outliers)
            .map_err(RenderError::Draw)?;

        Ok(RenderedArtifact {
            bytes: encode_png(&pixels, self.width, self.height)?,
            width: self.width,
            height: self.height,
        })
    }

    fn buffer_len(&self) -> Result<usize, RenderError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .filter(|&pixels| pixels <= MAX_PIXELS)
            .map(|pixels| pixels * 3)
            .ok_or_else(|| {
                RenderError::Draw(format!(
                    "image of {}x{} pixels exceeds the {} pixel limit",
                    self.width, self.height, MAX_PIXELS
                ))
            })
    }

    fn draw(&self, pixels: &mut [u8], series: &TimeSeries, outliers: &OutlierSet) -> Result<(), String> {
        let draw_err = |e: DrawingAreaErrorKind<_>| e.to_string();

        let root = BitMapBackend::with_buffer(pixels, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        if !series.is_empty() {
            ensure_font()?;

            let values = series.values();
            let x_max = values.len().max(2) as f64;
            let (y_min, y_max) = value_range(&values);

            let mut chart = ChartBuilder::on(&root)
                .caption(TITLE, (FONT_FAMILY, 24))
                .margin(MARGIN)
                .x_label_area_size(X_LABEL_AREA)
                .y_label_area_size(Y_LABEL_AREA)
                .build_cartesian_2d(0f64..x_max, y_min..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_desc(X_DESC)
                .y_desc(Y_DESC)
                .draw()
                .map_err(draw_err)?;

            chart
                .draw_series(LineSeries::new(
                    values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                    BLUE.stroke_width(2),
                ))
                .map_err(draw_err)?;

            chart
                .draw_series(
                    outliers
                        .iter()
                        .map(|i| Circle::new((i as f64, values[i]), MARKER_RADIUS, RED.filled())),
                )
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
        Ok(())
    }
}

// plotters keeps one global font registry
fn ensure_font() -> Result<(), String> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            register_font(FONT_FAMILY, FontStyle::Normal, DEJAVU_SANS)
                .map_err(|_| "embedded font rejected by the text backend".to_string())
        })
        .clone()
}

/// y bounds with some headroom; flat series get a unit band.
fn value_range(values: &[f64]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max - min < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    let mut encoder = png::Encoder::new(&mut bytes, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels)?;
    writer.finish()?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnalysisError;

    #[test]
    fn test_value_range_pads() {
        assert_eq!(value_range(&[4.0, 4.0]), (3.0, 5.0));
        let (lo, hi) = value_range(&[0.0, 100.0]);
        assert_eq!((lo, hi), (-5.0, 105.0));
    }

    #[test]
    fn test_tiny_sizes_are_clamped() {
        let renderer = SeriesRenderer::with_size(10, 10);
        let artifact = renderer.render(&TimeSeries::default(), &OutlierSet::new()).unwrap();
        assert_eq!((artifact.width, artifact.height), (MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(artifact.media_type(), "image/png");
    }

    #[test]
    fn test_oversized_canvas_is_rejected() {
        let renderer = SeriesRenderer::with_size(40_000, 40_000);
        let err = renderer.render(&TimeSeries::default(), &OutlierSet::new()).unwrap_err();
        assert!(matches!(err, AnalysisError::Render(RenderError::Draw(_))));
    }

    #[test]
    fn test_embedded_font_registers() {
        assert_eq!(ensure_font(), Ok(()));
        assert_eq!(ensure_font(), Ok(()));
    }
}
