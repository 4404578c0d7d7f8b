//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::PI;

use viewer_common::BoundingBox;

/// Sphere radius used by EPSG:3857.
pub const EARTH_RADIUS_M: f64 = 6378137.0;

/// Half the width of the projected world, in meters.
pub const MERCATOR_HALF_WORLD_M: f64 = PI * EARTH_RADIUS_M;

/// Latitudes beyond this are clamped so the projection stays finite.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Resolution at zoom 0 for 256 px tiles.
const ZOOM0_METERS_PER_PIXEL: f64 = 2.0 * MERCATOR_HALF_WORLD_M / 256.0;

/// Convert longitude/latitude in degrees to Web Mercator meters.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = lon.to_radians() * EARTH_RADIUS_M;
    let y = ((PI / 4.0) + (lat.to_radians() / 2.0)).tan().ln() * EARTH_RADIUS_M;
    (x, y)
}

/// Convert Web Mercator meters back to longitude/latitude in degrees.
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Convert a Web Mercator extent into a geographic one.
pub fn extent_to_wgs84(extent: &BoundingBox) -> BoundingBox {
    let (min_lon, min_lat) = mercator_to_lonlat(extent.min_x, extent.min_y);
    let (max_lon, max_lat) = mercator_to_lonlat(extent.max_x, extent.max_y);
    BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
}

/// Map resolution (meters per pixel at the equator) for a fractional zoom.
pub fn meters_per_pixel_at(zoom: f64) -> f64 {
    ZOOM0_METERS_PER_PIXEL / 2f64.powf(zoom)
}

/// Inverse of [`meters_per_pixel_at`].
pub fn zoom_for_meters_per_pixel(resolution: f64) -> f64 {
    (ZOOM0_METERS_PER_PIXEL / resolution).log2()
}
