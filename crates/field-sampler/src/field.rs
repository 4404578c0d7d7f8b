//! Vector field representation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of a dense vector field, in geographic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub lon: f64,
    pub lat: f64,
    /// Direction in degrees
    pub direction: f64,
    pub magnitude: f64,
    /// Any other per-point attributes, kept verbatim for styling
    #[serde(default, flatten)]
    pub attributes: Map<String, Value>,
}

impl VectorPoint {
    pub fn new(lon: f64, lat: f64, direction: f64, magnitude: f64) -> Self {
        Self {
            lon,
            lat,
            direction,
            magnitude,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A dense row-major vector field.
#[derive(Debug, Clone)]
pub struct VectorField {
    /// Points in row-major order
    pub points: Vec<Arc<VectorPoint>>,
    /// Number of points per row
    pub row_length: usize,
    /// Physical distance between adjacent points, in meters
    pub native_spacing: f64,
}

impl VectorField {
    pub fn new(points: Vec<VectorPoint>, row_length: usize, native_spacing: f64) -> Self {
        Self {
            points: points.into_iter().map(Arc::new).collect(),
            row_length,
            native_spacing,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of rows, counting a trailing partial row.
    pub fn row_count(&self) -> usize {
        if self.row_length == 0 {
            return usize::from(!self.points.is_empty());
        }
        self.points.len().div_ceil(self.row_length)
    }
}

/// A retained point, reprojected to Web Mercator.
///
/// The source record is shared, not copied, so caching several reductions
/// of one field costs one pointer per point.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPoint {
    /// Flattened row-major index in the source field
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub record: Arc<VectorPoint>,
}

impl ProjectedPoint {
    pub fn direction(&self) -> f64 {
        self.record.direction
    }

    pub fn magnitude(&self) -> f64 {
        self.record.magnitude
    }
}
