// src/geo.rs
//! Geographic primitives: points, bounding boxes and circle extents

use serde::{Deserialize, Serialize};

/// WGS84 equatorial radius in meters (the spherical mercator radius).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude beyond which web mercator is undefined.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned geographic rectangle, south-west to north-east.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Degenerate bounds covering a single point.
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Smallest bounds covering every bounds in the iterator.
    pub fn covering<I>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLngBounds>,
    {
        items.into_iter().reduce(|mut acc, b| {
            acc.extend(&b);
            acc
        })
    }

    pub fn extend(&mut self, other: &LatLngBounds) {
        self.south_west.lat = self.south_west.lat.min(other.south_west.lat);
        self.south_west.lng = self.south_west.lng.min(other.south_west.lng);
        self.north_east.lat = self.north_east.lat.max(other.north_east.lat);
        self.north_east.lng = self.north_east.lng.max(other.north_east.lng);
    }

    /// Grow each side by `ratio` times the current span on that axis.
    pub fn pad(&self, ratio: f64) -> Self {
        let lat_buffer = self.lat_span() * ratio;
        let lng_buffer = self.lng_span() * ratio;
        Self {
            south_west: LatLng::new(
                self.south_west.lat - lat_buffer,
                self.south_west.lng - lng_buffer,
            ),
            north_east: LatLng::new(
                self.north_east.lat + lat_buffer,
                self.north_east.lng + lng_buffer,
            ),
        }
    }

    pub fn lat_span(&self) -> f64 {
        (self.north_east.lat - self.south_west.lat).abs()
    }

    pub fn lng_span(&self) -> f64 {
        (self.north_east.lng - self.south_west.lng).abs()
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    pub fn contains_bounds(&self, other: &LatLngBounds) -> bool {
        self.contains(other.south_west) && self.contains(other.north_east)
    }
}

/// Bounds of a circle of `radius_m` meters around `center`.
pub fn circle_bounds(center: LatLng, radius_m: f64) -> LatLngBounds {
    let radius_m = radius_m.max(0.0);
    let lat_delta = (radius_m / EARTH_RADIUS_M).to_degrees();
    let cos_lat = center.lat.to_radians().cos().abs().max(1e-12);
    let lng_delta = (lat_delta / cos_lat).min(180.0);

    LatLngBounds {
        south_west: LatLng::new(center.lat - lat_delta, center.lng - lng_delta),
        north_east: LatLng::new(center.lat + lat_delta, center.lng + lng_delta),
    }
}
