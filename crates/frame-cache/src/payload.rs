//! Geometry payload decoding.
//!
//! Frame payloads are `base64(gzip(GeoJSON FeatureCollection))`. Contour
//! documents hold `MultiPolygon` features with a `fill` color; vector
//! documents hold `Point` features plus top-level `spacing` and `row_length`
//! members describing the dense grid they were flattened from.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::{Map, Value};

use field_sampler::{VectorField, VectorPoint};
use projection::lonlat_to_mercator;

use crate::error::{PayloadError, PayloadResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A decoded GeoJSON FeatureCollection.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryDocument {
    #[serde(default)]
    pub features: Vec<Feature>,

    /// Native spacing of a vector field, in meters
    #[serde(default)]
    pub spacing: Option<f64>,

    /// Points per row of a vector field
    #[serde(default)]
    pub row_length: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

/// One filled contour band, reprojected to Web Mercator.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourFeature {
    /// Fill color embedded by the producer (e.g. "#3b4cc0")
    pub fill: Option<String>,
    /// Polygons, each an outer ring followed by its holes
    pub polygons: Vec<Vec<Vec<(f64, f64)>>>,
}

/// Renderable contour geometry for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourShape {
    pub features: Vec<ContourFeature>,
}

impl ContourShape {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Decode `base64 -> (gzip) -> JSON`.
///
/// Payloads that are not gzip-compressed are read as plain JSON.
pub fn decode_document(encoded: &str) -> PayloadResult<GeometryDocument> {
    let raw = STANDARD.decode(encoded.trim())?;

    let json = if raw.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(raw.as_slice()).read_to_string(&mut text)?;
        text
    } else {
        String::from_utf8(raw).map_err(|e| {
            PayloadError::Decompression(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?
    };

    Ok(serde_json::from_str(&json)?)
}

/// Build contour geometry. Style comes only from each feature's `fill`.
pub fn parse_contour(document: &GeometryDocument) -> PayloadResult<ContourShape> {
    let mut features = Vec::with_capacity(document.features.len());

    for (index, feature) in document.features.iter().enumerate() {
        let polygons = match &feature.geometry {
            Some(Geometry::MultiPolygon { coordinates }) => coordinates
                .iter()
                .map(|polygon| project_polygon(polygon, index))
                .collect::<PayloadResult<Vec<_>>>()?,
            Some(Geometry::Polygon { coordinates }) => vec![project_polygon(coordinates, index)?],
            // Points and unknown geometry have no place in a filled contour
            _ => continue,
        };

        let fill = feature
            .properties
            .get("fill")
            .and_then(Value::as_str)
            .map(str::to_string);

        features.push(ContourFeature { fill, polygons });
    }

    Ok(ContourShape { features })
}

/// Build the dense vector field, keeping every extra per-point attribute.
pub fn parse_vector(document: &GeometryDocument) -> PayloadResult<VectorField> {
    let native_spacing = document
        .spacing
        .ok_or(PayloadError::MissingAttribute("spacing"))?;
    let row_length = document
        .row_length
        .ok_or(PayloadError::MissingAttribute("row_length"))?;

    let mut points = Vec::with_capacity(document.features.len());

    for (index, feature) in document.features.iter().enumerate() {
        let (lon, lat) = match &feature.geometry {
            Some(Geometry::Point { coordinates }) => lon_lat(coordinates, index)?,
            _ => {
                return Err(PayloadError::InvalidFeature {
                    index,
                    message: "vector features must be points".to_string(),
                })
            }
        };

        let mut attributes = feature.properties.clone();
        let direction = take_number(&mut attributes, "direction", index)?;
        let magnitude = take_number(&mut attributes, "magnitude", index)?;

        points.push(VectorPoint {
            lon,
            lat,
            direction,
            magnitude,
            attributes,
        });
    }

    Ok(VectorField::new(points, row_length, native_spacing))
}

fn take_number(
    attributes: &mut Map<String, Value>,
    name: &str,
    index: usize,
) -> PayloadResult<f64> {
    attributes
        .remove(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| PayloadError::InvalidFeature {
            index,
            message: format!("missing numeric '{}'", name),
        })
}

fn lon_lat(coordinates: &[f64], index: usize) -> PayloadResult<(f64, f64)> {
    match coordinates {
        [lon, lat, ..] => Ok((*lon, *lat)),
        _ => Err(PayloadError::InvalidFeature {
            index,
            message: "position needs longitude and latitude".to_string(),
        }),
    }
}

fn project_polygon(rings: &[Vec<Vec<f64>>], index: usize) -> PayloadResult<Vec<Vec<(f64, f64)>>> {
    let mut projected = Vec::with_capacity(rings.len());
    for ring in rings {
        let mut points = Vec::with_capacity(ring.len());
        for position in ring {
            let (lon, lat) = lon_lat(position, index)?;
            points.push(lonlat_to_mercator(lon, lat));
        }
        projected.push(points);
    }
    Ok(projected)
}
