//! Generators for synthetic frame payloads.
//!
//! Payloads use the same wire encoding as the upstream API:
//! `base64(gzip(GeoJSON FeatureCollection))`.

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};

/// Fill colors cycled through by [`contour_document`].
pub const BAND_COLORS: [&str; 4] = ["#3b4cc0", "#8db0fe", "#f49a7b", "#b40426"];

/// Encode a GeoJSON document the way frame payloads arrive.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use test_utils::encode_geojson;
///
/// let encoded = encode_geojson(&json!({"type": "FeatureCollection", "features": []}));
/// assert!(!encoded.is_empty());
/// ```
pub fn encode_geojson(document: &Value) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(document.to_string().as_bytes())
        .expect("write to in-memory gzip encoder");
    let compressed = encoder.finish().expect("finish in-memory gzip encoder");
    STANDARD.encode(compressed)
}

/// A contour document with `bands` nested square MultiPolygons around
/// (-105, 40), each with a fill color.
pub fn contour_document(bands: usize) -> Value {
    let features: Vec<Value> = (0..bands)
        .map(|band| {
            let half = 0.5 + band as f64 * 0.25;
            let ring = vec![
                vec![-105.0 - half, 40.0 - half],
                vec![-105.0 + half, 40.0 - half],
                vec![-105.0 + half, 40.0 + half],
                vec![-105.0 - half, 40.0 + half],
                vec![-105.0 - half, 40.0 - half],
            ];
            json!({
                "type": "Feature",
                "geometry": {"type": "MultiPolygon", "coordinates": [[ring]]},
                "properties": {
                    "fill": BAND_COLORS[band % BAND_COLORS.len()],
                    "stroke-width": 0,
                },
            })
        })
        .collect();

    json!({"type": "FeatureCollection", "features": features})
}

/// A dense row-major vector document of `rows * row_length` points.
///
/// Point `i` sits at `(-105 + col * 0.02, 40 + row * 0.02)` with direction
/// `(i * 15) % 360`, magnitude `i % 20` and an extra `gust` attribute of
/// `magnitude * 1.5`.
pub fn vector_document(rows: usize, row_length: usize, native_spacing: f64) -> Value {
    let features: Vec<Value> = (0..rows * row_length)
        .map(|i| {
            let row = i / row_length;
            let col = i % row_length;
            let magnitude = (i % 20) as f64;
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [-105.0 + col as f64 * 0.02, 40.0 + row as f64 * 0.02],
                },
                "properties": {
                    "direction": ((i * 15) % 360) as f64,
                    "magnitude": magnitude,
                    "gust": magnitude * 1.5,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "spacing": native_spacing,
        "row_length": row_length,
        "features": features,
    })
}
