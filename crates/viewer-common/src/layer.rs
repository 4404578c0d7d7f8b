//! Layer descriptors as listed for a job.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ValidTime;

/// Level used for 2-D (surface) fields.
pub const SURFACE_LEVEL: i32 = 0;

/// How a layer is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    /// Filled contour polygons with an embedded fill color per feature
    Contour,
    /// Point field of direction/magnitude records (wind)
    Vector,
    /// Any kind this viewer does not know how to draw
    #[serde(other)]
    Unknown,
}

impl PlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotKind::Contour => "contour",
            PlotKind::Vector => "vector",
            PlotKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (variable, level, time) layer of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Variable name in the model output (e.g. "T2", "WIND")
    #[serde(alias = "variable_name")]
    pub variable: String,

    /// Vertical level; `null` upstream means a 2-D field
    #[serde(default, alias = "z_level", deserialize_with = "deserialize_level")]
    pub level: i32,

    /// Valid time in epoch seconds
    #[serde(alias = "time_step")]
    pub valid_time: ValidTime,

    #[serde(alias = "type")]
    pub plot_kind: PlotKind,

    #[serde(default)]
    pub palette: String,

    #[serde(default)]
    pub units: String,

    #[serde(default = "default_opacity")]
    pub opacity: f64,

    #[serde(default)]
    pub visible: bool,

    #[serde(default)]
    pub display_name: String,
}

fn default_opacity() -> f64 {
    1.0
}

/// Deserialize a vertical level, mapping `null` to [`SURFACE_LEVEL`].
pub fn deserialize_level<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or(SURFACE_LEVEL))
}
