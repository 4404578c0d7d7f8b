//! Layer-frame cache and animation controller.
//!
//! Turns the flat layer list of a forecast job into navigable groups, loads
//! per-frame geometry on demand with at most one fetch per frame, and steps a
//! cyclic timeline over the visible group.
//!
//! # Architecture
//!
//! ```text
//! JobListing ──► LayerCatalog::build ──► groups by variable, levels
//!                                             │
//! show_group(var, level) ──► FrameCache::ensure_loaded ──► DataSource::fetch_frame
//!                                                               │ (spawned)
//!                     FetchCompletion ◄─────────────────────────┘
//!                            │
//!                            ▼
//!                 FrameCache::on_fetched ──► decode, reduce vectors,
//!                            │               register Frame, bump progress
//!                            ▼
//!       group/level complete? ──► AnimationController::reveal_current
//! ```
//!
//! All state lives in one [`ViewerSession`] driven from a single task;
//! fetches are the only suspension points and report back over a channel,
//! so nothing here needs a lock.

pub mod animation;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod payload;
pub mod readiness;
pub mod session;
pub mod source;

pub use animation::{AnimationController, FrameTarget, PlaybackState};
pub use cache::{FetchOutcome, Frame, FrameCache, FrameContent, VectorFrame, ViewState};
pub use catalog::{LayerCatalog, LayerGroup, LoadProgress};
pub use config::ViewerConfig;
pub use error::{PayloadError, PayloadResult};
pub use payload::{ContourFeature, ContourShape, GeometryDocument};
pub use readiness::{Readiness, ReadySignal};
pub use session::{FetchCompletion, ViewerEvent, ViewerSession};
pub use source::{ApiResponse, DataSource, ErrorPresenter, FramePayload, Viewport};
