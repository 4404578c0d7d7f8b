//! Viewer session: one job, one map, one event loop.
//!
//! The session owns every piece of mutable state. Frame fetches run as
//! spawned tasks and report back over a channel, so completions are handled
//! one at a time on the session's own task, interleaved with user events and
//! playback ticks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use viewer_common::{FrameKey, Job, ValidTime, ViewerError, ViewerResult};

use crate::animation::{AnimationController, FrameTarget};
use crate::cache::{FetchOutcome, FrameCache, ViewState};
use crate::catalog::LayerCatalog;
use crate::config::ViewerConfig;
use crate::readiness::{Readiness, ReadySignal};
use crate::source::{DataSource, ErrorPresenter, FramePayload, Viewport};

/// Result of one spawned frame fetch.
#[derive(Debug)]
pub struct FetchCompletion {
    pub key: FrameKey,
    pub result: ViewerResult<FramePayload>,
}

/// Inputs the session reacts to.
#[derive(Debug)]
pub enum ViewerEvent {
    /// A frame fetch finished
    Fetched(FetchCompletion),
    /// The map moved or zoomed
    ViewportChanged,
    Play,
    Pause,
    Step(i64),
    /// Select the time nearest this epoch-millisecond value
    SelectTime(i64),
    /// Show a group exclusively, optionally at a given level
    Show { variable: String, level: Option<i32> },
    /// Hide whichever group is visible
    Hide,
    Toggle(String),
    SetLevel { variable: String, level: i32 },
    SetOpacity { variable: String, opacity: f64 },
    Click { x: f64, y: f64 },
    Shutdown,
}

enum Turn {
    Completion(FetchCompletion),
    Event(Option<ViewerEvent>),
    Tick,
}

/// Coordinates catalog, frame cache and animation for one job.
pub struct ViewerSession<V: Viewport> {
    config: ViewerConfig,
    source: Arc<dyn DataSource>,
    presenter: Arc<dyn ErrorPresenter>,
    viewport: V,

    job: Option<Job>,
    catalog: LayerCatalog,
    frames: FrameCache,
    animation: AnimationController,
    readiness: Readiness<Job>,

    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    in_flight: usize,
    next_tick: Instant,
}

impl<V: Viewport> ViewerSession<V> {
    pub fn new(
        config: ViewerConfig,
        source: Arc<dyn DataSource>,
        viewport: V,
        presenter: Arc<dyn ErrorPresenter>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            frames: FrameCache::new(config.spacing.clone()),
            animation: AnimationController::new(config.frame_delay()),
            config,
            source,
            presenter,
            viewport,
            job: None,
            catalog: LayerCatalog::default(),
            readiness: Readiness::new(),
            completions_tx,
            completions_rx,
            in_flight: 0,
            next_tick: Instant::now(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    pub fn frames(&self) -> &FrameCache {
        &self.frames
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    /// Fetches issued but not yet handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Resolves once the job listing has been adopted.
    pub fn ready(&self) -> ReadySignal<Job> {
        self.readiness.subscribe()
    }

    /// Fetch and adopt the job listing.
    ///
    /// On failure the messages go to the presenter and no state is adopted.
    /// A session holds one job; later calls are ignored.
    #[instrument(skip(self))]
    pub async fn load_job(&mut self, job_id: &str) -> ViewerResult<()> {
        if let Some(job) = &self.job {
            warn!(loaded = %job.job_id, requested = %job_id, "Session already has a job");
            return Ok(());
        }

        let listing = match self.source.fetch_job(job_id).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Failed to load job");
                self.presenter.present(&e.messages());
                return Err(e);
            }
        };

        let catalog = LayerCatalog::build(listing.layers);
        if let Some(group) = catalog.groups().next() {
            self.animation.build_timeline(group, group.selected_level());
        }

        info!(
            job_id = %listing.job.job_id,
            groups = catalog.len(),
            times = self.animation.timeline().len(),
            "Loaded job"
        );

        self.catalog = catalog;
        self.job = Some(listing.job.clone());
        self.readiness.resolve(listing.job);

        let initial = self
            .catalog
            .groups()
            .find(|g| g.initially_visible())
            .map(|g| g.variable().to_string());
        if let Some(variable) = initial {
            self.show_group(&variable, None)?;
        }

        Ok(())
    }

    /// Make `variable` the only visible group.
    ///
    /// All groups are hidden first, then the group's frames at its selected
    /// (or the given) level are loaded, and the current-time frame is shown
    /// once the level is complete.
    #[instrument(skip(self))]
    pub fn show_group(&mut self, variable: &str, level: Option<i32>) -> ViewerResult<()> {
        let job_id = self.job_id()?;
        self.catalog.require(variable)?;
        if let Some(level) = level {
            self.catalog.set_selected_level(variable, level)?;
        }

        let hidden = self.catalog.set_visible_group(Some(variable))?;
        for name in &hidden {
            self.frames
                .set_visibility_for_group(name, false, &mut self.viewport);
        }

        let group = self.catalog.require(variable)?;
        let level = group.selected_level();
        let times = group.times_at(level);
        self.animation.set_timeline(times);

        let issued = self.ensure_group_loaded(&job_id, variable, level);
        info!(variable, level, issued, "Showing layer group");

        if self.catalog.is_complete(variable, level) {
            let target = FrameTarget::new(job_id, variable, level);
            self.animation
                .reveal_current(Some(&target), &mut self.frames, &mut self.viewport);
        }
        Ok(())
    }

    /// Hide whichever group is visible.
    pub fn hide_group(&mut self) -> ViewerResult<()> {
        let hidden = self.catalog.set_visible_group(None)?;
        for name in &hidden {
            self.frames
                .set_visibility_for_group(name, false, &mut self.viewport);
        }
        Ok(())
    }

    /// Hide the group if it is visible, otherwise show it exclusively.
    pub fn toggle_group(&mut self, variable: &str) -> ViewerResult<()> {
        let visible = self.catalog.require(variable)?.is_visible();
        if visible {
            self.hide_group()
        } else {
            self.show_group(variable, None)
        }
    }

    /// Switch a group's level. A visible group swaps frames immediately.
    pub fn set_level(&mut self, variable: &str, level: i32) -> ViewerResult<()> {
        if self.catalog.require(variable)?.is_visible() {
            self.show_group(variable, Some(level))
        } else {
            self.catalog.set_selected_level(variable, level)?;
            Ok(())
        }
    }

    pub fn set_opacity(&mut self, variable: &str, opacity: f64) -> ViewerResult<()> {
        self.catalog.set_opacity(variable, opacity)?;
        self.frames
            .set_opacity_for_group(variable, opacity, &mut self.viewport);
        Ok(())
    }

    pub fn step(&mut self, delta: i64) -> Option<ValidTime> {
        let target = self.target();
        self.animation
            .step(delta, target.as_ref(), &mut self.frames, &mut self.viewport)
    }

    pub fn select_nearest(&mut self, target_ms: i64) -> Option<ValidTime> {
        let target = self.target();
        self.animation.select_nearest(
            target_ms,
            target.as_ref(),
            &mut self.frames,
            &mut self.viewport,
        )
    }

    /// Start playback; the first step happens on the next loop turn.
    pub fn play(&mut self) -> bool {
        let started = self.animation.play();
        if started {
            self.next_tick = Instant::now();
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        self.animation.pause()
    }

    /// Re-render visible vector frames for the map's current view.
    pub fn on_viewport_change(&mut self) {
        let view = ViewState::of(&self.viewport);
        self.frames.on_viewport_change(&view, &mut self.viewport);
    }

    /// Apply one finished fetch.
    #[instrument(skip(self, completion), fields(key = %completion.key))]
    pub fn handle_completion(&mut self, completion: FetchCompletion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let FetchCompletion { key, result } = completion;

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Frame fetch failed");
                self.frames.on_fetch_failed(&key);
                if e.is_upstream() {
                    self.presenter.present(&e.messages());
                }
                return;
            }
        };

        let outcome = self
            .frames
            .on_fetched(&payload, &mut self.catalog, &mut self.viewport);

        if let FetchOutcome::Materialized { key, progress } = outcome {
            if progress.completed_now {
                debug!(variable = %key.variable, level = key.level, "Level complete");
                self.reveal_if_selected(&key);
            }
        }
    }

    /// Handle fetch completions until none are in flight.
    ///
    /// Waits forever if a fetch never resolves.
    pub async fn drain_fetches(&mut self) -> usize {
        let mut handled = 0;
        while self.in_flight > 0 {
            match self.completions_rx.recv().await {
                Some(completion) => {
                    self.handle_completion(completion);
                    handled += 1;
                }
                None => break,
            }
        }
        handled
    }

    /// Apply one event.
    pub fn handle(&mut self, event: ViewerEvent) -> ViewerResult<()> {
        match event {
            ViewerEvent::Fetched(completion) => self.handle_completion(completion),
            ViewerEvent::ViewportChanged => self.on_viewport_change(),
            ViewerEvent::Play => {
                self.play();
            }
            ViewerEvent::Pause => {
                self.pause();
            }
            ViewerEvent::Step(delta) => {
                self.step(delta);
            }
            ViewerEvent::SelectTime(ms) => {
                self.select_nearest(ms);
            }
            ViewerEvent::Show { variable, level } => self.show_group(&variable, level)?,
            ViewerEvent::Hide => self.hide_group()?,
            ViewerEvent::Toggle(variable) => self.toggle_group(&variable)?,
            ViewerEvent::SetLevel { variable, level } => self.set_level(&variable, level)?,
            ViewerEvent::SetOpacity { variable, opacity } => {
                self.set_opacity(&variable, opacity)?
            }
            ViewerEvent::Click { x, y } => self.viewport.on_click(x, y),
            ViewerEvent::Shutdown => {}
        }
        Ok(())
    }

    /// Drive the session until `Shutdown` or the event channel closes.
    ///
    /// Each turn handles exactly one of: a fetch completion, an external
    /// event, or a playback tick. Ticks are only scheduled while playing.
    pub async fn run(&mut self, mut events: mpsc::Receiver<ViewerEvent>) {
        loop {
            let playing = self.animation.is_playing();
            let next_tick = self.next_tick;

            let turn = tokio::select! {
                Some(completion) = self.completions_rx.recv() => Turn::Completion(completion),
                event = events.recv() => Turn::Event(event),
                _ = tokio::time::sleep_until(next_tick), if playing => Turn::Tick,
            };

            match turn {
                Turn::Completion(completion) => self.handle_completion(completion),
                Turn::Event(None) | Turn::Event(Some(ViewerEvent::Shutdown)) => {
                    info!("Viewer session stopping");
                    break;
                }
                Turn::Event(Some(event)) => {
                    if let Err(e) = self.handle(event) {
                        warn!(error = %e, "Event rejected");
                    }
                }
                Turn::Tick => {
                    let target = self.target();
                    let time = self.animation.tick(
                        target.as_ref(),
                        &mut self.frames,
                        &mut self.viewport,
                    );
                    debug!(time = ?time, "Playback tick");
                    self.next_tick = Instant::now() + self.animation.delay();
                }
            }
        }
    }

    fn job_id(&self) -> ViewerResult<String> {
        self.job
            .as_ref()
            .map(|job| job.job_id.clone())
            .ok_or(ViewerError::NotReady)
    }

    /// The visible group's frames at its selected level.
    fn target(&self) -> Option<FrameTarget> {
        let job = self.job.as_ref()?;
        let group = self.catalog.visible_group()?;
        Some(FrameTarget::new(
            job.job_id.as_str(),
            group.variable(),
            group.selected_level(),
        ))
    }

    /// Reveal the current frame when a just-completed level is the one on
    /// screen.
    fn reveal_if_selected(&mut self, key: &FrameKey) {
        let Some(target) = self.target() else {
            return;
        };
        if target.variable != key.variable || target.level != key.level {
            return;
        }
        self.animation
            .reveal_current(Some(&target), &mut self.frames, &mut self.viewport);
    }

    /// Claim and spawn fetches for every missing frame of (variable, level).
    fn ensure_group_loaded(&mut self, job_id: &str, variable: &str, level: i32) -> usize {
        let times = self.catalog.group(variable).map(|g| g.times_at(level));
        let Some(times) = times else {
            return 0;
        };

        let keys = self.frames.ensure_loaded(job_id, variable, level, &times);
        let issued = keys.len();
        for key in keys {
            let source = Arc::clone(&self.source);
            let tx = self.completions_tx.clone();
            tokio::spawn(async move {
                let result = source.fetch_frame(&key).await;
                // Receiver outlives every fetch unless the session is gone
                let _ = tx.send(FetchCompletion { key, result });
            });
            self.in_flight += 1;
        }
        issued
    }
}
