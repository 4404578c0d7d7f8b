//! Job metadata returned by the job listing request.

use serde::{Deserialize, Serialize};

use crate::LayerDescriptor;

/// A completed model run the viewer can display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,

    /// Domain center latitude in degrees
    pub center_lat: f64,

    /// Domain center longitude in degrees
    pub center_lon: f64,

    /// East-west domain size in meters
    #[serde(alias = "domain_size_x")]
    pub domain_size_ew: f64,

    /// North-south domain size in meters
    #[serde(alias = "domain_size_y")]
    pub domain_size_ns: f64,
}

impl Job {
    /// Domain center as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        (self.center_lon, self.center_lat)
    }
}

/// Job metadata plus the flat list of its layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,

    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}
