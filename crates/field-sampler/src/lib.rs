//! Level-of-detail selection for dense vector fields.
//!
//! Wind fields arrive as one point per model grid cell, far more than can be
//! drawn legibly at regional zoom. This crate picks a display stride from the
//! current map resolution and reduces the field to a regular sub-grid:
//!
//! ```text
//! resolution (m/px) ──► spacing_for_resolution ──► spacing s
//!                                                     │
//! dense field (row-major, row_length) ──► reduce(field, s) ──► every s-th row
//!                                                               and column
//! ```
//!
//! `reduce` is pure: the same field and spacing always produce the same,
//! order-preserving output, which lets callers cache reductions per spacing.

pub mod field;
pub mod reduce;
pub mod spacing;

pub use field::{ProjectedPoint, VectorField, VectorPoint};
pub use reduce::{is_retained, reduce, within_extent};
pub use spacing::{
    magnitude_scale, spacing_for_resolution, SpacingPolicy, ARROW_PIXEL_BUDGET,
    CANDIDATE_SPACINGS, DEFAULT_SPACING,
};
