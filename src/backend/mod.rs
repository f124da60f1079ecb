// src/backend/mod.rs
//! The seam between the façade and the mapping library it wraps.
//!
//! A backend owns every map and layer object; the façade only ever holds
//! [`MapHandle`] and [`LayerHandle`] ids into the backend's arenas and never
//! looks inside them.

mod scene;

pub use scene::{Overlay, SceneBackend, SceneLayer, SceneMap, Surface};

use crate::error::Result;
use crate::geo::{LatLng, LatLngBounds};
use crate::map::TileSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerHandle(pub u64);

/// A point marker with an optional hover title and click popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, alias = "popupContent", skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

impl MarkerSpec {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            title: None,
            popup: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_popup(mut self, popup: impl Into<String>) -> Self {
        self.popup = Some(popup.into());
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// A circle overlay. `radius` is in meters; `fill_opacity` is passed through as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSpec {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    pub color: String,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl CircleSpec {
    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Current viewport of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct View {
    pub center: LatLng,
    pub zoom: f64,
    /// Bounds most recently applied through `fit_bounds`
    pub fitted: Option<LatLngBounds>,
}

pub trait MapBackend {
    /// Whether the rendering surface with this id is mounted
    fn surface_exists(&self, surface_id: &str) -> bool;

    fn create_map(&mut self, surface_id: &str, center: LatLng, zoom: f64) -> Result<MapHandle>;

    fn add_tile_layer(&mut self, map: MapHandle, source: &TileSource) -> Result<LayerHandle>;

    fn add_marker(&mut self, map: MapHandle, marker: &MarkerSpec) -> Result<LayerHandle>;

    fn add_circle(&mut self, map: MapHandle, circle: &CircleSpec) -> Result<LayerHandle>;

    /// Detach a layer from its map and drop it
    fn remove_layer(&mut self, map: MapHandle, layer: LayerHandle) -> Result<()>;

    /// Geographic extent of an overlay layer
    fn layer_bounds(&self, layer: LayerHandle) -> Option<LatLngBounds>;

    /// Apply `bounds` as the map's viewport
    fn fit_bounds(&mut self, map: MapHandle, bounds: LatLngBounds) -> Result<()>;

    fn remove_map(&mut self, map: MapHandle) -> Result<()>;

    fn view(&self, map: MapHandle) -> Option<View>;
}
