// src/map/tiles.rs
//! Web mercator tile math and raster tile sources

use crate::geo::{LatLng, LatLngBounds, MAX_MERCATOR_LAT};
use serde::{Deserialize, Serialize};

pub const TILE_SIZE: f64 = 256.0;

/// Default maximum zoom of the OpenStreetMap raster tiles.
pub const DEFAULT_MAX_ZOOM: u8 = 18;

/// Calculate tile coordinates from lat/lon and zoom level
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
    let (x, y) = project(lat, lon, zoom as f64);
    let max_index = 2_f64.powi(zoom as i32) - 1.0;
    let x = (x / TILE_SIZE).floor().clamp(0.0, max_index) as u32;
    let y = (y / TILE_SIZE).floor().clamp(0.0, max_index) as u32;
    (x, y)
}

/// Project lat/lon to world pixel coordinates at a (possibly fractional) zoom.
pub fn project(lat: f64, lon: f64, zoom: f64) -> (f64, f64) {
    let world = TILE_SIZE * 2_f64.powf(zoom);
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (lon + 180.0) / 360.0 * world;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * world;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> (f64, f64) {
    let world = TILE_SIZE * 2_f64.powf(zoom);
    let lon = x / world * 360.0 - 180.0;
    let lat = ((1.0 - 2.0 * y / world) * std::f64::consts::PI).sinh().atan().to_degrees();
    (lat, lon)
}

/// Largest whole zoom at which `bounds` fits in a `width` x `height` pixel surface.
pub fn zoom_to_fit(bounds: &LatLngBounds, width: f64, height: f64, max_zoom: u8) -> u8 {
    let sw = bounds.south_west;
    let ne = bounds.north_east;

    for zoom in (0..=max_zoom).rev() {
        let (x0, y0) = project(sw.lat, sw.lng, zoom as f64);
        let (x1, y1) = project(ne.lat, ne.lng, zoom as f64);
        if (x1 - x0).abs() <= width && (y0 - y1).abs() <= height {
            return zoom;
        }
    }
    0
}

/// Geographic center of a bounds in projected space.
pub fn projected_center(bounds: &LatLngBounds, zoom: u8) -> LatLng {
    let sw = bounds.south_west;
    let ne = bounds.north_east;
    let (x0, y0) = project(sw.lat, sw.lng, zoom as f64);
    let (x1, y1) = project(ne.lat, ne.lng, zoom as f64);
    let (lat, lng) = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, zoom as f64);
    LatLng::new(lat, lng)
}

/// A raster tile provider: URL template, attribution and zoom limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    /// Template with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

impl Default for TileSource {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

impl TileSource {
    pub fn openstreetmap() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
            max_zoom: DEFAULT_MAX_ZOOM,
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }

    /// Resolve the URL of one tile
    pub fn tile_url(&self, zoom: u8, x: u32, y: u32) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let index = (x as usize + y as usize) % self.subdomains.len();
            self.subdomains[index].as_str()
        };

        self.url_template
            .replace("{s}", subdomain)
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}
