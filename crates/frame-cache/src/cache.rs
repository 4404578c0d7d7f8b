//! Keyed store of realized frames.
//!
//! Every key moves through at most two states: claimed (`Pending`) when its
//! fetch is issued, then `Ready` once the payload materializes. A key is
//! never claimed twice, which is what keeps fetches at most once per key.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use tracing::{debug, warn};

use field_sampler::{magnitude_scale, reduce, within_extent, ProjectedPoint, SpacingPolicy, VectorField};
use viewer_common::{BoundingBox, FrameKey, PlotKind, ValidTime};

use crate::catalog::{LayerCatalog, LoadProgress};
use crate::error::PayloadError;
use crate::payload::{decode_document, parse_contour, parse_vector, ContourShape};
use crate::source::{FramePayload, Viewport};

/// Map state that drives vector level of detail.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Visible extent in Web Mercator meters
    pub extent: BoundingBox,
    /// Meters per pixel
    pub resolution: Option<f64>,
    pub zoom: Option<f64>,
}

impl ViewState {
    pub fn of(viewport: &dyn Viewport) -> Self {
        Self {
            extent: viewport.extent(),
            resolution: viewport.resolution(),
            zoom: viewport.zoom(),
        }
    }
}

/// A dense vector field with its reductions cached by spacing.
#[derive(Debug, Clone)]
pub struct VectorFrame {
    field: VectorField,
    /// Reductions in the order they were derived
    reductions: Vec<(u32, Arc<Vec<ProjectedPoint>>)>,
    current_spacing: u32,
}

impl VectorFrame {
    /// Reduce at the spacing implied by `resolution` first, then at every
    /// policy candidate not already covered.
    pub fn materialize(field: VectorField, resolution: Option<f64>, policy: &SpacingPolicy) -> Self {
        let current = policy.spacing_for(resolution, field.native_spacing);
        let mut frame = Self {
            field,
            reductions: Vec::with_capacity(policy.candidates.len() + 1),
            current_spacing: current,
        };

        frame.reduced(current);
        for &spacing in &policy.candidates {
            frame.reduced(spacing);
        }
        frame
    }

    pub fn field(&self) -> &VectorField {
        &self.field
    }

    pub fn native_spacing(&self) -> f64 {
        self.field.native_spacing
    }

    /// Spacing last rendered.
    pub fn current_spacing(&self) -> u32 {
        self.current_spacing
    }

    /// Cached spacings in derivation order.
    pub fn cached_spacings(&self) -> Vec<u32> {
        self.reductions.iter().map(|(s, _)| *s).collect()
    }

    pub fn cached(&self, spacing: u32) -> Option<Arc<Vec<ProjectedPoint>>> {
        self.reductions
            .iter()
            .find(|(s, _)| *s == spacing)
            .map(|(_, points)| points.clone())
    }

    /// Reduced points at `spacing`, deriving them from the dense field and
    /// caching them when not yet known.
    pub fn reduced(&mut self, spacing: u32) -> Arc<Vec<ProjectedPoint>> {
        let spacing = spacing.max(1);
        if let Some(points) = self.cached(spacing) {
            return points;
        }
        let points = Arc::new(reduce(&self.field, spacing));
        self.reductions.push((spacing, points.clone()));
        points
    }
}

/// Renderable content of a frame.
#[derive(Debug, Clone)]
pub enum FrameContent {
    Contour(ContourShape),
    Vector(VectorFrame),
}

/// One realized (job, time, variable, level) artifact.
#[derive(Debug, Clone)]
pub struct Frame {
    pub key: FrameKey,
    pub content: FrameContent,
    pub opacity: f64,
    pub visible: bool,
}

impl Frame {
    pub fn plot_kind(&self) -> PlotKind {
        match self.content {
            FrameContent::Contour(_) => PlotKind::Contour,
            FrameContent::Vector(_) => PlotKind::Vector,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorFrame> {
        match &self.content {
            FrameContent::Vector(vector) => Some(vector),
            FrameContent::Contour(_) => None,
        }
    }

    pub fn as_contour(&self) -> Option<&ContourShape> {
        match &self.content {
            FrameContent::Contour(shape) => Some(shape),
            FrameContent::Vector(_) => None,
        }
    }
}

/// What became of one fetched payload.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A new frame was registered
    Materialized { key: FrameKey, progress: LoadProgress },
    /// The key was already realized
    Duplicate,
    /// No descriptor matches the payload's (variable, time, level)
    NoDescriptor,
    /// The payload's key was never claimed by `ensure_loaded`
    Unclaimed,
    /// The descriptor's plot kind cannot be drawn
    UnsupportedKind(PlotKind),
    /// The geometry could not be decoded
    DecodeFailed(PayloadError),
}

#[derive(Debug)]
enum Slot {
    Pending,
    Ready(Frame),
}

/// Frames of a session, keyed by [`FrameKey`].
#[derive(Debug)]
pub struct FrameCache {
    slots: BTreeMap<FrameKey, Slot>,
    policy: SpacingPolicy,
}

impl FrameCache {
    pub fn new(policy: SpacingPolicy) -> Self {
        Self {
            slots: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &SpacingPolicy {
        &self.policy
    }

    /// Claim every key of (variable, level) at `times` that is neither
    /// pending nor realized.
    ///
    /// Returns the newly claimed keys; the caller issues exactly one fetch
    /// for each. Keys already claimed are skipped, so overlapping calls
    /// never produce a second fetch for the same key.
    pub fn ensure_loaded(
        &mut self,
        job_id: &str,
        variable: &str,
        level: i32,
        times: &[ValidTime],
    ) -> Vec<FrameKey> {
        let mut claimed = Vec::new();
        for &time in times {
            let key = FrameKey::new(job_id, time, variable, level);
            if self.slots.contains_key(&key) {
                continue;
            }
            self.slots.insert(key.clone(), Slot::Pending);
            claimed.push(key);
        }

        if !claimed.is_empty() {
            debug!(variable, level, count = claimed.len(), "Claimed frames for fetch");
            counter!("frame_fetches_total").increment(claimed.len() as u64);
        }
        claimed
    }

    /// Materialize a fetched payload.
    ///
    /// Payloads without a matching descriptor, or whose key was never
    /// claimed, leave every piece of state untouched. A new frame starts invisible with the group's opacity and
    /// counts once toward its group's progress.
    pub fn on_fetched(
        &mut self,
        payload: &FramePayload,
        catalog: &mut LayerCatalog,
        viewport: &mut dyn Viewport,
    ) -> FetchOutcome {
        let key = payload.key();

        let descriptor =
            match catalog.find_descriptor(&payload.variable, payload.valid_time, payload.level) {
                Some(descriptor) => descriptor.clone(),
                None => {
                    debug!(key = %key, "Dropping payload with no matching layer");
                    counter!("frame_payloads_dropped_total", "reason" => "no_descriptor")
                        .increment(1);
                    return FetchOutcome::NoDescriptor;
                }
            };

        match self.slots.get(&key) {
            Some(Slot::Pending) => {}
            Some(Slot::Ready(_)) => {
                debug!(key = %key, "Ignoring duplicate payload");
                return FetchOutcome::Duplicate;
            }
            None => {
                debug!(key = %key, "Dropping payload for a key that was never requested");
                counter!("frame_payloads_dropped_total", "reason" => "unclaimed").increment(1);
                return FetchOutcome::Unclaimed;
            }
        }

        let content = match descriptor.plot_kind {
            PlotKind::Contour => decode_document(&payload.geojson)
                .and_then(|doc| parse_contour(&doc))
                .map(FrameContent::Contour),
            PlotKind::Vector => decode_document(&payload.geojson)
                .and_then(|doc| parse_vector(&doc))
                .map(|field| {
                    FrameContent::Vector(VectorFrame::materialize(
                        field,
                        viewport.resolution(),
                        &self.policy,
                    ))
                }),
            PlotKind::Unknown => {
                debug!(key = %key, "Discarding payload of unsupported plot kind");
                counter!("frame_payloads_dropped_total", "reason" => "unsupported_kind")
                    .increment(1);
                return FetchOutcome::UnsupportedKind(descriptor.plot_kind.clone());
            }
        };

        let content = match content {
            Ok(content) => content,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to decode frame payload");
                counter!("frame_payloads_dropped_total", "reason" => "decode").increment(1);
                return FetchOutcome::DecodeFailed(e);
            }
        };

        let progress = match catalog.record_loaded(&descriptor) {
            Some(progress) => progress,
            None => return FetchOutcome::NoDescriptor,
        };
        let opacity = catalog
            .group(&descriptor.variable)
            .map(|g| g.opacity())
            .unwrap_or(descriptor.opacity);

        let frame = Frame {
            key: key.clone(),
            content,
            opacity,
            visible: false,
        };
        viewport.add_frame(&frame);
        viewport.set_frame_opacity(&key, opacity);
        viewport.set_frame_visible(&key, false);

        self.slots.insert(key.clone(), Slot::Ready(frame));
        counter!("frames_materialized_total").increment(1);
        gauge!("frame_cache_entries").set(self.realized_count() as f64);

        debug!(
            key = %key,
            loaded = progress.loaded,
            total = progress.total,
            "Materialized frame"
        );

        FetchOutcome::Materialized { key, progress }
    }

    /// A fetch failed. The claim stays, so the frame never completes and is
    /// not fetched again.
    pub fn on_fetch_failed(&mut self, key: &FrameKey) {
        counter!("frame_fetch_errors_total").increment(1);
        debug!(key = %key, pending = self.is_pending(key), "Frame fetch failed");
    }

    pub fn frame(&self, key: &FrameKey) -> Option<&Frame> {
        match self.slots.get(key) {
            Some(Slot::Ready(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Realized frames in key order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.slots.values().filter_map(|slot| match slot {
            Slot::Ready(frame) => Some(frame),
            Slot::Pending => None,
        })
    }

    pub fn is_pending(&self, key: &FrameKey) -> bool {
        matches!(self.slots.get(key), Some(Slot::Pending))
    }

    pub fn is_realized(&self, key: &FrameKey) -> bool {
        matches!(self.slots.get(key), Some(Slot::Ready(_)))
    }

    /// Claimed keys, pending or realized.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn realized_count(&self) -> usize {
        self.frames().count()
    }

    /// Show or hide one frame. Returns false when the frame is not realized.
    ///
    /// Vector frames are re-rendered for the current view when shown.
    pub fn set_frame_visible(
        &mut self,
        key: &FrameKey,
        visible: bool,
        viewport: &mut dyn Viewport,
    ) -> bool {
        let view = ViewState::of(&*viewport);
        let policy = &self.policy;
        match self.slots.get_mut(key) {
            Some(Slot::Ready(frame)) => {
                if visible {
                    render_vector(frame, policy, &view, viewport);
                }
                frame.visible = visible;
                viewport.set_frame_visible(key, visible);
                true
            }
            _ => false,
        }
    }

    /// Show or hide every realized frame of a group, across all levels and
    /// times. Returns how many frames changed.
    pub fn set_visibility_for_group(
        &mut self,
        variable: &str,
        visible: bool,
        viewport: &mut dyn Viewport,
    ) -> usize {
        let view = ViewState::of(&*viewport);
        let policy = &self.policy;
        let mut changed = 0;

        for slot in self.slots.values_mut() {
            let Slot::Ready(frame) = slot else { continue };
            if !frame.key.in_group(variable) || frame.visible == visible {
                continue;
            }
            if visible {
                render_vector(frame, policy, &view, viewport);
            }
            frame.visible = visible;
            viewport.set_frame_visible(&frame.key, visible);
            changed += 1;
        }
        changed
    }

    /// Apply an opacity to every realized frame of a group.
    pub fn set_opacity_for_group(
        &mut self,
        variable: &str,
        opacity: f64,
        viewport: &mut dyn Viewport,
    ) -> usize {
        let mut changed = 0;
        for slot in self.slots.values_mut() {
            let Slot::Ready(frame) = slot else { continue };
            if !frame.key.in_group(variable) {
                continue;
            }
            frame.opacity = opacity;
            viewport.set_frame_opacity(&frame.key, opacity);
            changed += 1;
        }
        changed
    }

    /// Re-render every visible vector frame for a new view.
    ///
    /// The spacing implied by the view's resolution selects (or derives) a
    /// reduction, which is then clipped to the visible extent.
    pub fn on_viewport_change(&mut self, view: &ViewState, viewport: &mut dyn Viewport) {
        let policy = &self.policy;
        for slot in self.slots.values_mut() {
            if let Slot::Ready(frame) = slot {
                if frame.visible {
                    render_vector(frame, policy, view, viewport);
                }
            }
        }
    }
}

/// Push the reduced, extent-clipped points of a vector frame to the map.
/// Contour frames are left alone.
fn render_vector(
    frame: &mut Frame,
    policy: &SpacingPolicy,
    view: &ViewState,
    viewport: &mut dyn Viewport,
) {
    let FrameContent::Vector(vector) = &mut frame.content else {
        return;
    };

    let spacing = policy.spacing_for(view.resolution, vector.native_spacing());
    let points = vector.reduced(spacing);
    vector.current_spacing = spacing;

    let visible: Vec<ProjectedPoint> = within_extent(&points, &view.extent).cloned().collect();
    viewport.set_vector_points(&frame.key, &visible, magnitude_scale(view.zoom));
}
