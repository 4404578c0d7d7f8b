//! Display stride selection from map resolution and zoom.

use serde::{Deserialize, Serialize};

/// Screen pixels reserved for each drawn arrow.
pub const ARROW_PIXEL_BUDGET: f64 = 40.0;

/// Spacing used while the map has not reported a resolution.
pub const DEFAULT_SPACING: u32 = 3;

/// Spacings precomputed for every vector frame as soon as it arrives.
pub const CANDIDATE_SPACINGS: [u32; 6] = [1, 2, 3, 5, 9, 13];

/// Stride for a vector field of the given native spacing at the given map
/// resolution (meters per pixel).
///
/// `floor(resolution * ARROW_PIXEL_BUDGET / native_spacing) + 1`, or
/// [`DEFAULT_SPACING`] when the resolution is unknown. Always at least 1.
pub fn spacing_for_resolution(resolution: Option<f64>, native_spacing: f64) -> u32 {
    SpacingPolicy::default().spacing_for(resolution, native_spacing)
}

/// Arrow size scale for a zoom level.
///
/// | zoom        | scale |
/// |-------------|-------|
/// | >= 4.8      | 1.0   |
/// | >= 4.3      | 0.9   |
/// | >= 4.0      | 0.8   |
/// | lower/none  | 0.7   |
pub fn magnitude_scale(zoom: Option<f64>) -> f64 {
    match zoom {
        Some(z) if z >= 4.8 => 1.0,
        Some(z) if z >= 4.3 => 0.9,
        Some(z) if z >= 4.0 => 0.8,
        _ => 0.7,
    }
}

/// Tunable form of the spacing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingPolicy {
    /// Screen pixels reserved for each drawn arrow
    pub pixel_budget: f64,
    /// Spacing used when resolution is unknown
    pub default_spacing: u32,
    /// Spacings reduced eagerly when a vector frame arrives
    pub candidates: Vec<u32>,
}

impl Default for SpacingPolicy {
    fn default() -> Self {
        Self {
            pixel_budget: ARROW_PIXEL_BUDGET,
            default_spacing: DEFAULT_SPACING,
            candidates: CANDIDATE_SPACINGS.to_vec(),
        }
    }
}

impl SpacingPolicy {
    pub fn spacing_for(&self, resolution: Option<f64>, native_spacing: f64) -> u32 {
        let resolution = match resolution {
            Some(r) if r.is_finite() => r,
            _ => return self.default_spacing.max(1),
        };
        if !(native_spacing.is_finite() && native_spacing > 0.0) {
            return self.default_spacing.max(1);
        }

        // float -> int casts saturate, so huge resolutions clamp to u32::MAX
        let stride = (resolution * self.pixel_budget / native_spacing).floor();
        let stride = if stride > 0.0 { stride as u32 } else { 0 };
        stride.saturating_add(1)
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.pixel_budget.is_finite() && self.pixel_budget > 0.0) {
            return Err("pixel_budget must be a positive number".to_string());
        }
        if self.default_spacing == 0 {
            return Err("default_spacing must be >= 1".to_string());
        }
        if self.candidates.iter().any(|&s| s == 0) {
            return Err("candidate spacings must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_formula() {
        // 100 m/px * 40 px / 2000 m = 2 -> 3
        assert_eq!(spacing_for_resolution(Some(100.0), 2000.0), 3);
        assert_eq!(spacing_for_resolution(Some(149.9), 2000.0), 3);
        assert_eq!(spacing_for_resolution(Some(150.0), 2000.0), 4);
        // Zoomed all the way in: full density
        assert_eq!(spacing_for_resolution(Some(1.0), 2000.0), 1);
        assert_eq!(spacing_for_resolution(Some(0.0), 2000.0), 1);
    }

    #[test]
    fn test_unknown_resolution_uses_default() {
        assert_eq!(spacing_for_resolution(None, 2000.0), DEFAULT_SPACING);
        assert_eq!(spacing_for_resolution(Some(f64::NAN), 2000.0), DEFAULT_SPACING);
    }

    #[test]
    fn test_degenerate_native_spacing() {
        assert_eq!(spacing_for_resolution(Some(100.0), 0.0), DEFAULT_SPACING);
        assert_eq!(spacing_for_resolution(Some(100.0), -5.0), DEFAULT_SPACING);
    }

    #[test]
    fn test_spacing_never_below_one() {
        assert_eq!(spacing_for_resolution(Some(-500.0), 2000.0), 1);
        assert!(spacing_for_resolution(Some(f64::MAX), 1.0) >= 1);
    }

    #[test]
    fn test_spacing_monotonic_in_resolution() {
        let mut last = 0;
        for step in 0..2000 {
            let resolution = step as f64 * 2.5;
            let spacing = spacing_for_resolution(Some(resolution), 3000.0);
            assert!(spacing >= last, "spacing decreased at resolution {}", resolution);
            last = spacing;
        }
    }

    #[test]
    fn test_magnitude_scale_bands() {
        assert_eq!(magnitude_scale(None), 0.7);
        assert_eq!(magnitude_scale(Some(0.0)), 0.7);
        assert_eq!(magnitude_scale(Some(3.99)), 0.7);
        assert_eq!(magnitude_scale(Some(4.0)), 0.8);
        assert_eq!(magnitude_scale(Some(4.29)), 0.8);
        assert_eq!(magnitude_scale(Some(4.3)), 0.9);
        assert_eq!(magnitude_scale(Some(4.79)), 0.9);
        assert_eq!(magnitude_scale(Some(4.8)), 1.0);
        assert_eq!(magnitude_scale(Some(18.0)), 1.0);
    }

    #[test]
    fn test_magnitude_scale_non_decreasing() {
        let mut last = 0.0;
        for step in 0..200 {
            let scale = magnitude_scale(Some(step as f64 * 0.05));
            assert!(scale >= last);
            last = scale;
        }
    }

    #[test]
    fn test_policy_validation() {
        assert!(SpacingPolicy::default().validate().is_ok());

        let mut policy = SpacingPolicy::default();
        policy.candidates.push(0);
        assert!(policy.validate().is_err());

        let policy = SpacingPolicy {
            pixel_budget: 0.0,
            ..SpacingPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
