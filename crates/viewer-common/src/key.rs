//! Frame identity.

use serde::{Deserialize, Serialize};

use crate::ValidTime;

/// Composite key of one renderable frame: (job, valid time, variable, level).
///
/// Ordering is job, variable, level, then time, so a range over one
/// (variable, level) walks its frames in time order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameKey {
    pub job_id: String,
    pub variable: String,
    pub level: i32,
    pub valid_time: ValidTime,
}

impl FrameKey {
    pub fn new(
        job_id: impl Into<String>,
        valid_time: ValidTime,
        variable: impl Into<String>,
        level: i32,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            variable: variable.into(),
            level,
            valid_time,
        }
    }

    /// Whether this frame belongs to the given variable's group.
    pub fn in_group(&self, variable: &str) -> bool {
        self.variable == variable
    }
}

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.job_id,
            self.variable,
            self.level,
            self.valid_time.seconds()
        )
    }
}
