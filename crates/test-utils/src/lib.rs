//! Fixtures and generators shared by the viewer crates' tests.
//!
//! Payload generators produce bodies in the same wire encoding the forecast
//! API uses (gzip + base64 GeoJSON), so decoding is exercised end to end.
//!
//! ```ignore
//! use test_utils::{layer, wind_payload_json};
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert two numbers are within `epsilon` of each other.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        assert!(
            (left - right).abs() <= epsilon,
            "assertion failed: {} is not within {} of {}",
            left,
            epsilon,
            right
        );
    }};
}
