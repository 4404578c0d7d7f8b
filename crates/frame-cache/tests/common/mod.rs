//! Common test utilities for frame-cache tests
//!
//! Provides in-memory stand-ins for the collaborators:
//! - A data source serving generated payloads and counting fetches
//! - A viewport that records every command it receives
//! - An error presenter that collects messages

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use field_sampler::ProjectedPoint;
use frame_cache::{
    DataSource, ErrorPresenter, FetchOutcome, Frame, FrameCache, FramePayload, LayerCatalog, Viewport,
};
use viewer_common::{BoundingBox, FrameKey, JobListing, PlotKind, ViewerError, ViewerResult};

/// Serves one job listing and generated frame payloads.
pub struct MockDataSource {
    listing: ViewerResult<JobListing>,
    kinds: HashMap<String, PlotKind>,
    failing: Mutex<HashSet<FrameKey>>,
    calls: Mutex<Vec<FrameKey>>,
}

impl MockDataSource {
    pub fn new(listing: JobListing) -> Self {
        let kinds = listing
            .layers
            .iter()
            .map(|l| (l.variable.clone(), l.plot_kind.clone()))
            .collect();
        Self {
            listing: Ok(listing),
            kinds,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A source whose job listing request fails with these messages.
    pub fn failing_job(messages: &[&str]) -> Self {
        Self {
            listing: Err(ViewerError::upstream(messages.iter().copied())),
            kinds: HashMap::new(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make requests for `key` fail upstream.
    pub fn fail_frame(&self, key: FrameKey) {
        self.failing.lock().unwrap().insert(key);
    }

    pub fn calls(&self) -> Vec<FrameKey> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_job(&self, _job_id: &str) -> ViewerResult<JobListing> {
        self.listing.clone()
    }

    async fn fetch_frame(&self, key: &FrameKey) -> ViewerResult<FramePayload> {
        self.calls.lock().unwrap().push(key.clone());

        if self.failing.lock().unwrap().contains(key) {
            return Err(ViewerError::upstream([format!("No data for {}", key)]));
        }

        let secs = key.valid_time.seconds();
        let json = match self.kinds.get(&key.variable) {
            Some(PlotKind::Vector) => {
                test_utils::wind_payload_json(&key.job_id, &key.variable, key.level, secs)
            }
            _ => test_utils::contour_payload_json(&key.job_id, &key.variable, key.level, secs),
        };
        Ok(serde_json::from_value(json)?)
    }
}

/// What a [`RecordingViewport`] last drew for one vector frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnPoints {
    pub indices: Vec<usize>,
    pub scale: f64,
}

/// Map surface that records every command.
#[derive(Debug, Default)]
pub struct RecordingViewport {
    pub resolution: Option<f64>,
    pub zoom: Option<f64>,
    pub extent: Option<BoundingBox>,
    pub added: Vec<FrameKey>,
    pub visible: HashMap<FrameKey, bool>,
    pub opacity: HashMap<FrameKey, f64>,
    pub points: HashMap<FrameKey, DrawnPoints>,
    pub clicks: Vec<(f64, f64)>,
}

impl RecordingViewport {
    pub fn with_resolution(resolution: f64) -> Self {
        Self {
            resolution: Some(resolution),
            zoom: Some(5.0),
            ..Default::default()
        }
    }

    /// Keys currently shown, in key order.
    pub fn visible_keys(&self) -> Vec<FrameKey> {
        let mut keys: Vec<FrameKey> = self
            .visible
            .iter()
            .filter(|(_, shown)| **shown)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn is_visible(&self, key: &FrameKey) -> bool {
        self.visible.get(key).copied().unwrap_or(false)
    }
}

impl Viewport for RecordingViewport {
    fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    fn extent(&self) -> BoundingBox {
        self.extent.unwrap_or_else(BoundingBox::unbounded)
    }

    fn size(&self) -> (u32, u32) {
        (1024, 768)
    }

    fn add_frame(&mut self, frame: &Frame) {
        self.added.push(frame.key.clone());
    }

    fn set_frame_visible(&mut self, key: &FrameKey, visible: bool) {
        self.visible.insert(key.clone(), visible);
    }

    fn set_frame_opacity(&mut self, key: &FrameKey, opacity: f64) {
        self.opacity.insert(key.clone(), opacity);
    }

    fn set_vector_points(&mut self, key: &FrameKey, points: &[ProjectedPoint], scale: f64) {
        self.points.insert(
            key.clone(),
            DrawnPoints {
                indices: points.iter().map(|p| p.index).collect(),
                scale,
            },
        );
    }

    fn on_click(&mut self, x: f64, y: f64) {
        self.clicks.push((x, y));
    }
}

/// Collects presented error lists.
#[derive(Debug, Default)]
pub struct CollectingPresenter {
    presented: Mutex<Vec<Vec<String>>>,
}

impl CollectingPresenter {
    pub fn presented(&self) -> Vec<Vec<String>> {
        self.presented.lock().unwrap().clone()
    }
}

impl ErrorPresenter for CollectingPresenter {
    fn present(&self, messages: &[String]) {
        self.presented.lock().unwrap().push(messages.to_vec());
    }
}

/// Parse a payload fixture.
pub fn payload(json: serde_json::Value) -> FramePayload {
    serde_json::from_value(json).unwrap()
}

/// Claim a payload's key and hand the payload to the cache, the way a
/// session does for one completed fetch.
pub fn deliver(
    cache: &mut FrameCache,
    catalog: &mut LayerCatalog,
    viewport: &mut RecordingViewport,
    json: serde_json::Value,
) -> FetchOutcome {
    let payload = payload(json);
    cache.ensure_loaded(&payload.job_id, &payload.variable, payload.level, &[payload.valid_time]);
    cache.on_fetched(&payload, catalog, viewport)
}
