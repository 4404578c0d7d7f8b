//! Cyclic timeline with play/pause/step and nearest-time selection.

use std::time::Duration;

use tracing::debug;
use viewer_common::{FrameKey, ValidTime};

use crate::cache::FrameCache;
use crate::catalog::LayerGroup;
use crate::source::Viewport;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// The (job, variable, level) whose frames the timeline drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTarget {
    pub job_id: String,
    pub variable: String,
    pub level: i32,
}

impl FrameTarget {
    pub fn new(job_id: impl Into<String>, variable: impl Into<String>, level: i32) -> Self {
        Self {
            job_id: job_id.into(),
            variable: variable.into(),
            level,
        }
    }

    pub fn key_at(&self, valid_time: ValidTime) -> FrameKey {
        FrameKey::new(&self.job_id, valid_time, &self.variable, self.level)
    }
}

/// Timeline of distinct valid times and the current selection.
#[derive(Debug, Clone)]
pub struct AnimationController {
    /// Distinct times, ascending
    timeline: Vec<ValidTime>,
    selected: usize,
    state: PlaybackState,
    delay: Duration,
}

impl AnimationController {
    pub fn new(delay: Duration) -> Self {
        Self {
            timeline: Vec::new(),
            selected: 0,
            state: PlaybackState::Stopped,
            delay,
        }
    }

    /// Timeline from one group's level; selection goes to the earliest time.
    pub fn build_timeline(&mut self, group: &LayerGroup, level: i32) -> &[ValidTime] {
        self.timeline = sorted_distinct(group.times_at(level));
        self.selected = 0;
        &self.timeline
    }

    /// Replace the timeline, keeping the selection on the closest time.
    pub fn set_timeline(&mut self, times: Vec<ValidTime>) {
        let current = self.selected_time();
        self.timeline = sorted_distinct(times);
        self.selected = current
            .and_then(|t| self.nearest_index(t.millis()))
            .unwrap_or(0);
    }

    pub fn timeline(&self) -> &[ValidTime] {
        &self.timeline
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_time(&self) -> Option<ValidTime> {
        self.timeline.get(self.selected).copied()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// stopped -> playing. Returns false if already playing.
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.state = PlaybackState::Playing;
        true
    }

    /// playing -> stopped. Returns false if already stopped.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = PlaybackState::Stopped;
        true
    }

    /// Move the selection by `delta` with wraparound; the result is always
    /// within `[0, len)`. No-op on an empty timeline.
    pub fn advance(&mut self, delta: i64) -> usize {
        let len = self.timeline.len();
        if len == 0 {
            return 0;
        }
        let next = (self.selected as i128 + delta as i128).rem_euclid(len as i128);
        self.selected = next as usize;
        self.selected
    }

    /// Index of the time closest to `target_ms`; ties go to the earlier time.
    pub fn nearest_index(&self, target_ms: i64) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (index, time) in self.timeline.iter().enumerate() {
            let distance = time.distance_millis(target_ms);
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Hide the current frame, step by `delta`, show the new frame.
    ///
    /// The selection advances even when the new frame is not realized yet;
    /// nothing is visible until it loads.
    pub fn step(
        &mut self,
        delta: i64,
        target: Option<&FrameTarget>,
        cache: &mut FrameCache,
        viewport: &mut dyn Viewport,
    ) -> Option<ValidTime> {
        if self.timeline.is_empty() {
            return None;
        }
        self.hide_current(target, cache, viewport);
        self.advance(delta);
        self.reveal_current(target, cache, viewport);
        self.selected_time()
    }

    /// Select the time nearest `target_ms`, swapping the shown frame.
    pub fn select_nearest(
        &mut self,
        target_ms: i64,
        target: Option<&FrameTarget>,
        cache: &mut FrameCache,
        viewport: &mut dyn Viewport,
    ) -> Option<ValidTime> {
        let index = self.nearest_index(target_ms)?;
        self.hide_current(target, cache, viewport);
        self.selected = index;
        self.reveal_current(target, cache, viewport);
        self.selected_time()
    }

    /// One playback iteration: `step(1)` while playing, nothing otherwise.
    pub fn tick(
        &mut self,
        target: Option<&FrameTarget>,
        cache: &mut FrameCache,
        viewport: &mut dyn Viewport,
    ) -> Option<ValidTime> {
        if !self.is_playing() {
            return None;
        }
        self.step(1, target, cache, viewport)
    }

    /// Show the target's frame at the selected time. Returns whether a
    /// realized frame was shown.
    pub fn reveal_current(
        &self,
        target: Option<&FrameTarget>,
        cache: &mut FrameCache,
        viewport: &mut dyn Viewport,
    ) -> bool {
        self.set_current_visible(true, target, cache, viewport)
    }

    pub fn hide_current(
        &self,
        target: Option<&FrameTarget>,
        cache: &mut FrameCache,
        viewport: &mut dyn Viewport,
    ) -> bool {
        self.set_current_visible(false, target, cache, viewport)
    }

    fn set_current_visible(
        &self,
        visible: bool,
        target: Option<&FrameTarget>,
        cache: &mut FrameCache,
        viewport: &mut dyn Viewport,
    ) -> bool {
        let (Some(target), Some(time)) = (target, self.selected_time()) else {
            return false;
        };
        let key = target.key_at(time);
        let changed = cache.set_frame_visible(&key, visible, viewport);
        if changed {
            debug!(key = %key, visible, "Frame visibility");
        }
        changed
    }
}

fn sorted_distinct(mut times: Vec<ValidTime>) -> Vec<ValidTime> {
    times.sort();
    times.dedup();
    times
}
