//! Coordinate reference system transformations.
//!
//! Frames arrive in geographic coordinates (EPSG:4326) and are drawn in
//! Web Mercator (EPSG:3857).

pub mod mercator;

pub use mercator::{
    extent_to_wgs84, lonlat_to_mercator, mercator_to_lonlat, meters_per_pixel_at,
    zoom_for_meters_per_pixel,
    EARTH_RADIUS_M, MAX_MERCATOR_LAT, MERCATOR_HALF_WORLD_M,
};
