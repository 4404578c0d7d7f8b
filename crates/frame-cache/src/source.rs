//! Collaborator interfaces: data fetching, map surface, error presentation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use field_sampler::ProjectedPoint;
use viewer_common::layer::deserialize_level;
use viewer_common::{BoundingBox, FrameKey, JobListing, ValidTime, ViewerError, ViewerResult};

use crate::cache::Frame;

/// Response to a per-frame data request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    pub job_id: String,
    pub valid_time: ValidTime,
    pub variable: String,
    #[serde(default, alias = "z_level", deserialize_with = "deserialize_level")]
    pub level: i32,
    /// `base64(gzip(GeoJSON))`
    pub geojson: String,
}

impl FramePayload {
    pub fn key(&self) -> FrameKey {
        FrameKey::new(&self.job_id, self.valid_time, &self.variable, self.level)
    }
}

/// Envelope every API response is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope. `ok: false` becomes an upstream error carrying the
    /// API's messages verbatim.
    pub fn into_result(self) -> ViewerResult<T> {
        if !self.ok {
            return Err(ViewerError::Upstream {
                messages: self.errors,
            });
        }
        self.data
            .ok_or_else(|| ViewerError::Decode("response is missing 'data'".to_string()))
    }
}

/// Source of job listings and frame payloads.
///
/// Timeouts and retries are the implementation's business; the cache treats
/// each call as either eventually resolving or never resolving.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch job metadata and its flat layer list.
    async fn fetch_job(&self, job_id: &str) -> ViewerResult<JobListing>;

    /// Fetch the geometry payload of one frame.
    async fn fetch_frame(&self, key: &FrameKey) -> ViewerResult<FramePayload>;
}

/// The interactive map surface.
///
/// Extents and coordinates are Web Mercator meters.
pub trait Viewport {
    /// Meters per pixel, once the map knows it.
    fn resolution(&self) -> Option<f64>;

    fn zoom(&self) -> Option<f64>;

    fn extent(&self) -> BoundingBox;

    /// Screen size in pixels.
    fn size(&self) -> (u32, u32);

    /// Register a newly realized frame. Vector frames start without points.
    fn add_frame(&mut self, frame: &Frame);

    fn set_frame_visible(&mut self, key: &FrameKey, visible: bool);

    fn set_frame_opacity(&mut self, key: &FrameKey, opacity: f64);

    /// Replace the points drawn for a vector frame.
    fn set_vector_points(&mut self, key: &FrameKey, points: &[ProjectedPoint], scale: f64);

    /// Map click hook. Nothing in the core reacts to clicks.
    fn on_click(&mut self, _x: f64, _y: f64) {}
}

/// Shows error messages to the user.
pub trait ErrorPresenter: Send + Sync {
    fn present(&self, messages: &[String]);
}
