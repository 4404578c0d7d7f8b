//! Viewer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use field_sampler::SpacingPolicy;

/// Default delay between animation steps.
pub const DEFAULT_FRAME_DELAY_MS: u64 = 1000;

/// Tunables for a viewer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vector level-of-detail rules
    pub spacing: SpacingPolicy,

    /// Delay between playback steps in milliseconds
    pub frame_delay_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            spacing: SpacingPolicy::default(),
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
        }
    }
}

impl ViewerConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// - `ARROW_PIXEL_BUDGET`: screen pixels per arrow
    /// - `DEFAULT_VECTOR_SPACING`: spacing while resolution is unknown
    /// - `VECTOR_SPACING_CANDIDATES`: comma-separated eager spacings
    /// - `FRAME_DELAY_MS`: playback step delay
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables that are set and parse.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("ARROW_PIXEL_BUDGET") {
            if let Ok(budget) = val.parse() {
                self.spacing.pixel_budget = budget;
            }
        }

        if let Ok(val) = std::env::var("DEFAULT_VECTOR_SPACING") {
            if let Ok(spacing) = val.parse() {
                self.spacing.default_spacing = spacing;
            }
        }

        if let Ok(val) = std::env::var("VECTOR_SPACING_CANDIDATES") {
            if let Some(candidates) = parse_spacing_list(&val) {
                self.spacing.candidates = candidates;
            }
        }

        if let Ok(val) = std::env::var("FRAME_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.frame_delay_ms = delay;
            }
        }
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.spacing.validate()?;
        if self.frame_delay_ms == 0 {
            return Err("frame_delay_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Parse "1,2,3" into spacings. `None` if any entry is not an integer.
fn parse_spacing_list(value: &str) -> Option<Vec<u32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}
