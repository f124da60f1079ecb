// src/backend/scene.rs
//! In-process backend that keeps maps and overlays in arenas.
//!
//! `SceneBackend` is what the viewer paints from and what the headless CLI
//! reports on. Surfaces are mounted and unmounted by the host.

use super::{CircleSpec, LayerHandle, MapBackend, MapHandle, MarkerSpec, View};
use crate::error::{MapError, Result};
use crate::geo::{circle_bounds, LatLng, LatLngBounds};
use crate::map::{projected_center, zoom_to_fit, TileSource, DEFAULT_MAX_ZOOM};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Marker(MarkerSpec),
    Circle(CircleSpec),
}

impl Overlay {
    pub fn bounds(&self) -> LatLngBounds {
        match self {
            Overlay::Marker(marker) => LatLngBounds::from_point(marker.position()),
            Overlay::Circle(circle) => circle_bounds(circle.center(), circle.radius),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneLayer {
    pub map: MapHandle,
    pub overlay: Overlay,
}

#[derive(Debug, Clone)]
pub struct SceneMap {
    pub surface_id: String,
    pub view: View,
    pub tile_layer: Option<(LayerHandle, TileSource)>,
    /// Overlays attached to this map, in attach order
    pub overlays: Vec<LayerHandle>,
}

impl SceneMap {
    fn max_zoom(&self) -> u8 {
        self.tile_layer
            .as_ref()
            .map(|(_, source)| source.max_zoom)
            .unwrap_or(DEFAULT_MAX_ZOOM)
    }
}

#[derive(Debug, Clone)]
pub struct SceneBackend {
    surfaces: HashMap<String, Surface>,
    maps: BTreeMap<MapHandle, SceneMap>,
    layers: BTreeMap<LayerHandle, SceneLayer>,
    default_surface: Surface,
    next_id: u64,
}

impl Default for SceneBackend {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl SceneBackend {
    /// Create a backend whose surfaces default to `width` x `height` pixels
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            surfaces: HashMap::new(),
            maps: BTreeMap::new(),
            layers: BTreeMap::new(),
            default_surface: Surface { width, height },
            next_id: 1,
        }
    }

    pub fn mount_surface(&mut self, surface_id: &str) {
        let surface = self.default_surface;
        self.surfaces.insert(surface_id.to_string(), surface);
    }

    pub fn mount_surface_sized(&mut self, surface_id: &str, width: f64, height: f64) {
        self.surfaces
            .insert(surface_id.to_string(), Surface { width, height });
    }

    pub fn unmount_surface(&mut self, surface_id: &str) {
        self.surfaces.remove(surface_id);
    }

    pub fn surface(&self, surface_id: &str) -> Option<Surface> {
        self.surfaces.get(surface_id).copied()
    }

    pub fn map(&self, map: MapHandle) -> Option<&SceneMap> {
        self.maps.get(&map)
    }

    pub fn maps(&self) -> impl Iterator<Item = (MapHandle, &SceneMap)> {
        self.maps.iter().map(|(handle, map)| (*handle, map))
    }

    /// Overlays currently attached to `map`, in attach order
    pub fn overlays(&self, map: MapHandle) -> Vec<(LayerHandle, &Overlay)> {
        self.maps
            .get(&map)
            .map(|scene_map| {
                scene_map
                    .overlays
                    .iter()
                    .filter_map(|handle| self.layers.get(handle).map(|l| (*handle, &l.overlay)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Change a map's center and zoom, as a user pan or zoom would
    pub fn set_view(&mut self, map: MapHandle, center: LatLng, zoom: f64) -> Result<()> {
        let scene_map = self.map_mut(map)?;
        scene_map.view.center = center;
        scene_map.view.zoom = zoom.clamp(0.0, scene_map.max_zoom() as f64);
        Ok(())
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn map_mut(&mut self, map: MapHandle) -> Result<&mut SceneMap> {
        self.maps
            .get_mut(&map)
            .ok_or_else(|| MapError::Other(format!("Unknown map handle {}", map.0)))
    }

    fn attach(&mut self, map: MapHandle, overlay: Overlay) -> Result<LayerHandle> {
        self.map_mut(map)?;
        let handle = LayerHandle(self.next_handle());
        self.layers.insert(handle, SceneLayer { map, overlay });
        self.map_mut(map)?.overlays.push(handle);
        Ok(handle)
    }
}

impl MapBackend for SceneBackend {
    fn surface_exists(&self, surface_id: &str) -> bool {
        self.surfaces.contains_key(surface_id)
    }

    fn create_map(&mut self, surface_id: &str, center: LatLng, zoom: f64) -> Result<MapHandle> {
        if !self.surface_exists(surface_id) {
            return Err(MapError::SurfaceNotFound(surface_id.to_string()));
        }

        let handle = MapHandle(self.next_handle());
        self.maps.insert(
            handle,
            SceneMap {
                surface_id: surface_id.to_string(),
                view: View {
                    center,
                    zoom,
                    fitted: None,
                },
                tile_layer: None,
                overlays: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn add_tile_layer(&mut self, map: MapHandle, source: &TileSource) -> Result<LayerHandle> {
        self.map_mut(map)?;
        let handle = LayerHandle(self.next_handle());
        self.map_mut(map)?.tile_layer = Some((handle, source.clone()));
        Ok(handle)
    }

    fn add_marker(&mut self, map: MapHandle, marker: &MarkerSpec) -> Result<LayerHandle> {
        self.attach(map, Overlay::Marker(marker.clone()))
    }

    fn add_circle(&mut self, map: MapHandle, circle: &CircleSpec) -> Result<LayerHandle> {
        self.attach(map, Overlay::Circle(circle.clone()))
    }

    fn remove_layer(&mut self, map: MapHandle, layer: LayerHandle) -> Result<()> {
        match self.layers.get(&layer) {
            Some(scene_layer) if scene_layer.map == map => {}
            Some(_) => {
                return Err(MapError::Other(format!(
                    "Layer {} is not attached to map {}",
                    layer.0, map.0
                )))
            }
            None => return Err(MapError::Other(format!("Unknown layer handle {}", layer.0))),
        }

        self.layers.remove(&layer);
        self.map_mut(map)?.overlays.retain(|h| *h != layer);
        Ok(())
    }

    fn layer_bounds(&self, layer: LayerHandle) -> Option<LatLngBounds> {
        self.layers.get(&layer).map(|l| l.overlay.bounds())
    }

    fn fit_bounds(&mut self, map: MapHandle, bounds: LatLngBounds) -> Result<()> {
        let surface_id = self.map_mut(map)?.surface_id.clone();
        let surface = self.surface(&surface_id).unwrap_or(self.default_surface);
        let scene_map = self.map_mut(map)?;
        let zoom = zoom_to_fit(&bounds, surface.width, surface.height, scene_map.max_zoom());

        scene_map.view = View {
            center: projected_center(&bounds, zoom),
            zoom: zoom as f64,
            fitted: Some(bounds),
        };
        Ok(())
    }

    fn remove_map(&mut self, map: MapHandle) -> Result<()> {
        let scene_map = self
            .maps
            .remove(&map)
            .ok_or_else(|| MapError::Other(format!("Unknown map handle {}", map.0)))?;
        for layer in scene_map.overlays {
            self.layers.remove(&layer);
        }
        Ok(())
    }

    fn view(&self, map: MapHandle) -> Option<View> {
        self.maps.get(&map).map(|m| m.view)
    }
}
