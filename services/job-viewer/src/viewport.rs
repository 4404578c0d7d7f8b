//! Headless map surface and log-based error presenter.
//!
//! Keeps just enough map state (center, zoom, screen size) to answer the
//! viewer's resolution and extent queries, and records what it was asked to
//! draw so a run can be summarized.

use std::collections::HashMap;

use tracing::{debug, error, info};

use field_sampler::ProjectedPoint;
use frame_cache::{ErrorPresenter, Frame, Viewport};
use projection::{lonlat_to_mercator, meters_per_pixel_at, zoom_for_meters_per_pixel};
use viewer_common::{BoundingBox, FrameKey, Job, PlotKind};

/// Drawn state of one frame.
#[derive(Debug, Clone)]
pub struct DrawnFrame {
    pub kind: PlotKind,
    pub visible: bool,
    pub opacity: f64,
    /// Arrows currently drawn (vector frames)
    pub arrows: usize,
    pub arrow_scale: f64,
}

/// A map with no pixels.
#[derive(Debug)]
pub struct HeadlessViewport {
    /// Web Mercator center
    center: (f64, f64),
    zoom: f64,
    size: (u32, u32),
    frames: HashMap<FrameKey, DrawnFrame>,
}

impl HeadlessViewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, size: (u32, u32)) -> Self {
        Self {
            center: lonlat_to_mercator(center_lon, center_lat),
            zoom,
            size,
            frames: HashMap::new(),
        }
    }

    /// Center on a job's domain at the zoom that just fits it.
    pub fn fit_job(&mut self, job: &Job) {
        let (lon, lat) = job.center();
        let (width, height) = (self.size.0.max(1) as f64, self.size.1.max(1) as f64);
        let resolution = (job.domain_size_ew / width).max(job.domain_size_ns / height);
        if resolution > 0.0 {
            self.zoom = zoom_for_meters_per_pixel(resolution);
        }
        self.pan_to(lon, lat);
        info!(zoom = self.zoom, lon, lat, "Fitted map to job domain");
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn pan_to(&mut self, lon: f64, lat: f64) {
        self.center = lonlat_to_mercator(lon, lat);
    }

    pub fn frame(&self, key: &FrameKey) -> Option<&DrawnFrame> {
        self.frames.get(key)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Keys of frames currently shown.
    pub fn visible_frames(&self) -> Vec<&FrameKey> {
        let mut keys: Vec<&FrameKey> = self
            .frames
            .iter()
            .filter(|(_, drawn)| drawn.visible)
            .map(|(key, _)| key)
            .collect();
        keys.sort();
        keys
    }
}

impl Viewport for HeadlessViewport {
    fn resolution(&self) -> Option<f64> {
        Some(meters_per_pixel_at(self.zoom))
    }

    fn zoom(&self) -> Option<f64> {
        Some(self.zoom)
    }

    fn extent(&self) -> BoundingBox {
        let resolution = meters_per_pixel_at(self.zoom);
        let half_w = self.size.0 as f64 / 2.0 * resolution;
        let half_h = self.size.1 as f64 / 2.0 * resolution;
        let (x, y) = self.center;
        BoundingBox::new(x - half_w, y - half_h, x + half_w, y + half_h)
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn add_frame(&mut self, frame: &Frame) {
        debug!(key = %frame.key, kind = %frame.plot_kind(), "Add frame");
        self.frames.insert(
            frame.key.clone(),
            DrawnFrame {
                kind: frame.plot_kind(),
                visible: frame.visible,
                opacity: frame.opacity,
                arrows: 0,
                arrow_scale: 1.0,
            },
        );
    }

    fn set_frame_visible(&mut self, key: &FrameKey, visible: bool) {
        if let Some(drawn) = self.frames.get_mut(key) {
            if drawn.visible != visible {
                debug!(key = %key, visible, "Frame visibility");
            }
            drawn.visible = visible;
        }
    }

    fn set_frame_opacity(&mut self, key: &FrameKey, opacity: f64) {
        if let Some(drawn) = self.frames.get_mut(key) {
            drawn.opacity = opacity;
        }
    }

    fn set_vector_points(&mut self, key: &FrameKey, points: &[ProjectedPoint], scale: f64) {
        if let Some(drawn) = self.frames.get_mut(key) {
            debug!(key = %key, arrows = points.len(), scale, "Draw arrows");
            drawn.arrows = points.len();
            drawn.arrow_scale = scale;
        }
    }

    fn on_click(&mut self, x: f64, y: f64) {
        info!(x, y, "Map click");
    }
}

/// Presents upstream errors as log records.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl ErrorPresenter for LogPresenter {
    fn present(&self, messages: &[String]) {
        for message in messages {
            error!(message = %message, "Upstream error");
        }
    }
}
