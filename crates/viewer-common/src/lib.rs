//! Common types shared across the forecast viewer crates.

pub mod bbox;
pub mod error;
pub mod job;
pub mod key;
pub mod layer;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{ViewerError, ViewerResult};
pub use job::{Job, JobListing};
pub use key::FrameKey;
pub use layer::{LayerDescriptor, PlotKind, SURFACE_LEVEL};
pub use time::ValidTime;
