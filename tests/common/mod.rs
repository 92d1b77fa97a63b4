#![allow(dead_code)]

use serde_json::{json, Value};
use wifimon_analysis::store::InMemoryStore;

pub const FIELD: &str = "downloadThroughput";
pub const TOOL: &str = "NetTest";
pub const MINUTE_MS: i64 = 60_000;

/// Records for `values`, one minute apart, newest at `newest_ms`.
pub fn records(values: &[f64], tool: &str, newest_ms: i64) -> Vec<Value> {
    let oldest = newest_ms - (values.len() as i64 - 1) * MINUTE_MS;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            json!({
                "Timestamp": oldest + i as i64 * MINUTE_MS,
                "Test-Tool": tool,
                FIELD: v,
            })
        })
        .collect()
}

pub fn store(values: &[f64], newest_ms: i64) -> InMemoryStore {
    InMemoryStore::from_values(records(values, TOOL, newest_ms))
}

pub struct DecodedPng {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl DecodedPng {
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.rgb.chunks_exact(3)
    }

    pub fn count(&self, rgb: [u8; 3]) -> usize {
        self.pixels().filter(|p| *p == rgb).count()
    }

    /// Mean (x, y) of the pixels with exactly this colour.
    pub fn centroid(&self, rgb: [u8; 3]) -> Option<(f64, f64)> {
        let width = self.width as usize;
        let (mut n, mut sx, mut sy) = (0usize, 0f64, 0f64);
        for (i, _) in self.pixels().enumerate().filter(|(_, p)| *p == rgb) {
            n += 1;
            sx += (i % width) as f64;
            sy += (i / width) as f64;
        }
        (n > 0).then(|| (sx / n as f64, sy / n as f64))
    }

    /// Dark (text or axis) pixels within the given rows.
    pub fn dark_pixels_in_rows(&self, rows: std::ops::Range<u32>) -> usize {
        let row_bytes = self.width as usize * 3;
        rows.filter_map(|row| self.rgb.get(row as usize * row_bytes..(row as usize + 1) * row_bytes))
            .flat_map(|line| line.chunks_exact(3))
            .filter(|p| p.iter().all(|&c| c < 128))
            .count()
    }
}

pub fn decode_png(bytes: &[u8]) -> DecodedPng {
    let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    let mut reader = decoder.read_info().expect("valid png header");
    let mut rgb = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut rgb).expect("valid png frame");
    assert_eq!(info.color_type, png::ColorType::Rgb);
    rgb.truncate(info.buffer_size());
    DecodedPng {
        width: info.width,
        height: info.height,
        rgb,
    }
}

pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const WHITE: [u8; 3] = [255, 255, 255];
