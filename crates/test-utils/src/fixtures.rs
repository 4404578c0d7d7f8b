//! Common fixtures for viewer tests.
//!
//! Builders for layer descriptors, job listings and frame payload JSON that
//! mirror what the upstream API returns.

use serde_json::{json, Value};
use viewer_common::{Job, JobListing, LayerDescriptor, PlotKind, ValidTime};

use crate::generators::{contour_document, encode_geojson, vector_document};

/// Job id used across fixtures.
pub const JOB_ID: &str = "job-1";

/// Three hourly valid times starting at the epoch.
pub const HOURLY_TIMES: [i64; 3] = [0, 3600, 7200];

/// Native spacing of [`wind_payload_json`] fields, in meters.
pub const WIND_NATIVE_SPACING: f64 = 2000.0;

/// A layer descriptor with neutral styling.
pub fn layer(variable: &str, level: i32, valid_time: i64, plot_kind: PlotKind) -> LayerDescriptor {
    LayerDescriptor {
        variable: variable.to_string(),
        level,
        valid_time: ValidTime(valid_time),
        plot_kind,
        palette: "coolwarm".to_string(),
        units: "K".to_string(),
        opacity: 0.8,
        visible: false,
        display_name: variable.to_string(),
    }
}

/// One descriptor per time for (variable, level).
pub fn layers(variable: &str, level: i32, times: &[i64], plot_kind: PlotKind) -> Vec<LayerDescriptor> {
    times
        .iter()
        .map(|&t| layer(variable, level, t, plot_kind.clone()))
        .collect()
}

/// Job metadata centered on Colorado.
pub fn job(job_id: &str) -> Job {
    Job {
        job_id: job_id.to_string(),
        center_lat: 40.0,
        center_lon: -105.0,
        domain_size_ew: 500_000.0,
        domain_size_ns: 400_000.0,
    }
}

pub fn job_listing(job_id: &str, layers: Vec<LayerDescriptor>) -> JobListing {
    JobListing {
        job: job(job_id),
        layers,
    }
}

/// Listing with a surface contour group `T2` and a two-level vector group
/// `WIND`, both at [`HOURLY_TIMES`].
pub fn sample_listing() -> JobListing {
    let mut all = layers("T2", 0, &HOURLY_TIMES, PlotKind::Contour);
    all.extend(layers("WIND", 0, &HOURLY_TIMES, PlotKind::Vector));
    all.extend(layers("WIND", 5, &HOURLY_TIMES, PlotKind::Vector));
    job_listing(JOB_ID, all)
}

/// Frame payload JSON for a contour frame.
pub fn contour_payload_json(job_id: &str, variable: &str, level: i32, valid_time: i64) -> Value {
    json!({
        "job_id": job_id,
        "valid_time": valid_time,
        "variable": variable,
        "level": level,
        "geojson": encode_geojson(&contour_document(3)),
    })
}

/// Frame payload JSON for a 12 x 12 wind field.
pub fn wind_payload_json(job_id: &str, variable: &str, level: i32, valid_time: i64) -> Value {
    json!({
        "job_id": job_id,
        "valid_time": valid_time,
        "variable": variable,
        "level": level,
        "geojson": encode_geojson(&vector_document(12, 12, WIND_NATIVE_SPACING)),
    })
}
