// src/bridge.rs
//! Map registry and interop façade.
//!
//! `MapBridge` owns one [`MapEntry`] per initialized map id and forwards
//! every call to its [`MapBackend`]. Calls against an unknown id are
//! reported to the diagnostic channel and return an error without touching
//! the registry or the backend.

use crate::{
    backend::{CircleSpec, LayerHandle, MapBackend, MapHandle, MarkerSpec, SceneBackend, View},
    config::BridgeConfig,
    diagnostics::{Diagnostics, TracingDiagnostics},
    error::{MapError, Result},
    geo::{LatLng, LatLngBounds},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry state of one initialized map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    map: MapHandle,
    layers: Vec<LayerHandle>,
}

impl MapEntry {
    pub fn map(&self) -> MapHandle {
        self.map
    }

    /// Overlay handles in the order they were added
    pub fn layers(&self) -> &[LayerHandle] {
        &self.layers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    /// An entry already existed; nothing changed
    AlreadyInitialized,
    /// The surface is not mounted yet; one attempt is pending
    Deferred,
}

#[derive(Debug, Clone, Copy)]
struct PendingInit {
    center: LatLng,
    zoom: f64,
}

pub struct MapBridge<B: MapBackend> {
    backend: B,
    maps: HashMap<String, MapEntry>,
    pending: HashMap<String, PendingInit>,
    config: BridgeConfig,
    diagnostics: Arc<dyn Diagnostics>,
}

fn report(diagnostics: &dyn Diagnostics, error: MapError) -> MapError {
    diagnostics.report(&error);
    error
}

impl<B: MapBackend> MapBridge<B> {
    pub fn new(backend: B, config: BridgeConfig) -> Self {
        Self::with_diagnostics(backend, config, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(
        backend: B,
        config: BridgeConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            backend,
            maps: HashMap::new(),
            pending: HashMap::new(),
            config,
            diagnostics,
        }
    }

    /// Create the map for surface `id`, or defer once if the surface is not mounted.
    ///
    /// Re-initializing an existing id is a no-op: the first center and zoom stay.
    pub fn initialize(&mut self, id: &str, lat: f64, lng: f64, zoom: f64) -> Result<InitOutcome> {
        if self.maps.contains_key(id) {
            self.diagnostics
                .debug(format_args!("Map '{}' already initialized, ignoring", id));
            return Ok(InitOutcome::AlreadyInitialized);
        }

        if self.backend.surface_exists(id) {
            // An earlier deferred request for this id takes precedence
            let request = self.pending.remove(id).unwrap_or(PendingInit {
                center: LatLng::new(lat, lng),
                zoom,
            });
            self.create_entry(id, request.center, request.zoom)?;
            return Ok(InitOutcome::Created);
        }

        if self.pending.contains_key(id) {
            self.diagnostics.warn(format_args!(
                "Map '{}' already has a pending initialization, ignoring",
                id
            ));
            return Ok(InitOutcome::Deferred);
        }

        let center = LatLng::new(lat, lng);
        self.pending
            .insert(id.to_string(), PendingInit { center, zoom });
        self.diagnostics.debug(format_args!(
            "Surface '{}' not mounted yet, deferring initialization",
            id
        ));
        Ok(InitOutcome::Deferred)
    }

    /// Like [`initialize`](Self::initialize), but waits `config.surface_wait` once
    /// for the surface and then makes the single deferred attempt.
    pub async fn initialize_with_delay(
        &mut self,
        id: &str,
        lat: f64,
        lng: f64,
        zoom: f64,
    ) -> Result<InitOutcome> {
        match self.initialize(id, lat, lng, zoom)? {
            InitOutcome::Deferred => {
                tokio::time::sleep(self.config.surface_wait()).await;
                Ok(self.fire_pending(id)?.unwrap_or(InitOutcome::AlreadyInitialized))
            }
            outcome => Ok(outcome),
        }
    }

    /// Host hook: surface `id` finished mounting.
    pub fn surface_mounted(&mut self, id: &str) -> Result<Option<InitOutcome>> {
        self.fire_pending(id)
    }

    /// Run the deferred initialization for `id`, if one is pending.
    ///
    /// The pending request is consumed whatever the outcome.
    pub fn fire_pending(&mut self, id: &str) -> Result<Option<InitOutcome>> {
        let Some(pending) = self.pending.remove(id) else {
            return Ok(None);
        };

        if self.maps.contains_key(id) {
            return Ok(Some(InitOutcome::AlreadyInitialized));
        }
        if !self.backend.surface_exists(id) {
            return Err(report(
                &*self.diagnostics,
                MapError::SurfaceNotFound(id.to_string()),
            ));
        }

        self.create_entry(id, pending.center, pending.zoom)?;
        Ok(Some(InitOutcome::Created))
    }

    /// Fire every pending initialization once, returning the ids that failed.
    pub fn fire_all_pending(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending.keys().cloned().collect();
        ids.sort();

        ids.into_iter()
            .filter(|id| self.fire_pending(id).is_err())
            .collect()
    }

    /// Host hook: surface `id` is going away; drop its map and layers.
    pub fn surface_unmounted(&mut self, id: &str) -> Result<()> {
        self.pending.remove(id);
        if let Some(entry) = self.maps.remove(id) {
            for layer in entry.layers {
                if let Err(e) = self.backend.remove_layer(entry.map, layer) {
                    self.diagnostics.report(&e);
                }
            }
            self.backend.remove_map(entry.map)?;
            self.diagnostics.info(format_args!("Map '{}' removed", id));
        }
        Ok(())
    }

    /// Remove every map; used when the owning component unmounts.
    pub fn teardown(&mut self) {
        let mut ids: Vec<String> = self.maps.keys().cloned().collect();
        ids.sort();
        for id in ids {
            if let Err(e) = self.surface_unmounted(&id) {
                self.diagnostics.report(&e);
            }
        }
        self.pending.clear();
    }

    fn create_entry(&mut self, id: &str, center: LatLng, zoom: f64) -> Result<()> {
        let map = self
            .backend
            .create_map(id, center, zoom)
            .map_err(|e| report(&*self.diagnostics, e))?;

        if let Err(e) = self.backend.add_tile_layer(map, &self.config.tile_source) {
            if let Err(cleanup) = self.backend.remove_map(map) {
                self.diagnostics.report(&cleanup);
            }
            return Err(report(&*self.diagnostics, e));
        }

        self.pending.remove(id);

        self.maps.insert(
            id.to_string(),
            MapEntry {
                map,
                layers: Vec::new(),
            },
        );
        self.diagnostics.info(format_args!(
            "Map '{}' initialized at ({}, {}) zoom {}",
            id, center.lat, center.lng, zoom
        ));
        Ok(())
    }

    pub fn add_marker(&mut self, id: &str, marker: MarkerSpec) -> Result<LayerHandle> {
        let Some(entry) = self.maps.get_mut(id) else {
            return Err(report(
                &*self.diagnostics,
                MapError::MapNotInitialized(id.to_string()),
            ));
        };

        let layer = self
            .backend
            .add_marker(entry.map, &marker)
            .map_err(|e| report(&*self.diagnostics, e))?;
        entry.layers.push(layer);
        Ok(layer)
    }

    /// Add markers in order. A marker the backend rejects is reported and
    /// skipped; markers already added stay.
    pub fn add_markers(&mut self, id: &str, markers: &[MarkerSpec]) -> Result<Vec<LayerHandle>> {
        let Some(entry) = self.maps.get_mut(id) else {
            return Err(report(
                &*self.diagnostics,
                MapError::MapNotInitialized(id.to_string()),
            ));
        };

        let mut added = Vec::with_capacity(markers.len());
        for marker in markers {
            match self.backend.add_marker(entry.map, marker) {
                Ok(layer) => {
                    entry.layers.push(layer);
                    added.push(layer);
                }
                Err(e) => self.diagnostics.report(&e),
            }
        }
        Ok(added)
    }

    pub fn add_circle(&mut self, id: &str, circle: CircleSpec) -> Result<LayerHandle> {
        let Some(entry) = self.maps.get_mut(id) else {
            return Err(report(
                &*self.diagnostics,
                MapError::MapNotInitialized(id.to_string()),
            ));
        };

        let layer = self
            .backend
            .add_circle(entry.map, &circle)
            .map_err(|e| report(&*self.diagnostics, e))?;
        entry.layers.push(layer);
        Ok(layer)
    }

    /// Detach every overlay of map `id`. Center, zoom and tile layer are kept.
    pub fn clear_map(&mut self, id: &str) -> Result<()> {
        let Some(entry) = self.maps.get_mut(id) else {
            return Err(report(
                &*self.diagnostics,
                MapError::MapNotInitialized(id.to_string()),
            ));
        };

        for layer in entry.layers.drain(..) {
            if let Err(e) = self.backend.remove_layer(entry.map, layer) {
                self.diagnostics.report(&e);
            }
        }
        Ok(())
    }

    /// Fit the view to all overlays of map `id`, padded by `config.fit_padding`.
    ///
    /// Returns the applied bounds, or `None` when the map has no overlays.
    pub fn fit_bounds(&mut self, id: &str) -> Result<Option<LatLngBounds>> {
        let Some(entry) = self.maps.get(id) else {
            return Err(report(
                &*self.diagnostics,
                MapError::MapNotInitialized(id.to_string()),
            ));
        };

        let covering = LatLngBounds::covering(
            entry
                .layers
                .iter()
                .filter_map(|layer| self.backend.layer_bounds(*layer)),
        );
        let Some(bounds) = covering else {
            return Ok(None);
        };

        let padded = bounds.pad(self.config.fit_padding);
        let map = entry.map;
        self.backend
            .fit_bounds(map, padded)
            .map_err(|e| report(&*self.diagnostics, e))?;
        Ok(Some(padded))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.maps.contains_key(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&MapEntry> {
        self.maps.get(id)
    }

    /// Initialized map ids, sorted
    pub fn map_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.maps.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn layer_count(&self, id: &str) -> Option<usize> {
        self.maps.get(id).map(|e| e.layers.len())
    }

    pub fn view(&self, id: &str) -> Option<View> {
        self.maps.get(id).and_then(|e| self.backend.view(e.map))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.diagnostics
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let maps = self
            .map_ids()
            .into_iter()
            .filter_map(|id| {
                let entry = self.maps.get(&id)?;
                let view = self.backend.view(entry.map)?;
                let layers = entry
                    .layers
                    .iter()
                    .map(|layer| LayerSnapshot {
                        handle: *layer,
                        bounds: self.backend.layer_bounds(*layer),
                    })
                    .collect();
                Some(MapSnapshot {
                    id,
                    handle: entry.map,
                    view,
                    layers,
                })
            })
            .collect();

        let mut pending: Vec<String> = self.pending.keys().cloned().collect();
        pending.sort();

        RegistrySnapshot { maps, pending }
    }
}

impl MapBridge<SceneBackend> {
    /// Bridge over a fresh [`SceneBackend`] sized from the config.
    pub fn with_scene(config: BridgeConfig) -> Self {
        let (width, height) = config.surface_size();
        Self::new(SceneBackend::new(width, height), config)
    }

    /// Mount surface `id` and fire its pending initialization, if any.
    pub fn mount_surface(&mut self, id: &str) -> Result<Option<InitOutcome>> {
        self.backend.mount_surface(id);
        self.surface_mounted(id)
    }

    /// Unmount surface `id`, dropping its map.
    pub fn unmount_surface(&mut self, id: &str) -> Result<()> {
        self.surface_unmounted(id)?;
        self.backend.unmount_surface(id);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub maps: Vec<MapSnapshot>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapSnapshot {
    pub id: String,
    pub handle: MapHandle,
    pub view: View,
    pub layers: Vec<LayerSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSnapshot {
    pub handle: LayerHandle,
    pub bounds: Option<LatLngBounds>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;

    fn bridge() -> (MapBridge<SceneBackend>, Arc<RecordingDiagnostics>) {
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let bridge = MapBridge::with_diagnostics(
            SceneBackend::default(),
            BridgeConfig::default(),
            diagnostics.clone(),
        );
        (bridge, diagnostics)
    }

    fn red_circle(lat: f64, lng: f64, radius: f64) -> CircleSpec {
        CircleSpec {
            lat,
            lng,
            radius,
            color: "red".to_string(),
            fill_color: "red".to_string(),
            fill_opacity: 0.3,
        }
    }

    #[test]
    fn test_uninitialized_id_reports_and_leaves_registry() {
        let (mut bridge, diagnostics) = bridge();

        assert!(matches!(
            bridge.add_marker("ghost", MarkerSpec::new(1.0, 2.0)),
            Err(MapError::MapNotInitialized(_))
        ));
        assert!(matches!(
            bridge.add_markers("ghost", &[MarkerSpec::new(1.0, 1.0)]),
            Err(MapError::MapNotInitialized(_))
        ));
        assert!(matches!(
            bridge.add_circle("ghost", red_circle(0.0, 0.0, 10.0)),
            Err(MapError::MapNotInitialized(_))
        ));
        assert!(matches!(bridge.clear_map("ghost"), Err(MapError::MapNotInitialized(_))));
        assert!(matches!(bridge.fit_bounds("ghost"), Err(MapError::MapNotInitialized(_))));

        assert!(bridge.is_empty());
        assert_eq!(bridge.backend().layer_count(), 0);
        assert_eq!(diagnostics.errors().len(), 5);
        assert!(diagnostics
            .errors()
            .iter()
            .all(|m| m == "Map 'ghost' not initialized"));
    }

    #[test]
    fn test_second_initialize_is_noop() {
        let (mut bridge, _) = bridge();
        bridge.backend_mut().mount_surface("m");

        assert_eq!(bridge.initialize("m", 10.0, 20.0, 5.0).unwrap(), InitOutcome::Created);
        assert_eq!(
            bridge.initialize("m", 99.0, 99.0, 1.0).unwrap(),
            InitOutcome::AlreadyInitialized
        );

        assert_eq!(bridge.len(), 1);
        let view = bridge.view("m").unwrap();
        assert_eq!(view.center, LatLng::new(10.0, 20.0));
        assert_eq!(view.zoom, 5.0);
    }

    #[test]
    fn test_initialize_attaches_tile_layer() {
        let (mut bridge, _) = bridge();
        bridge.backend_mut().mount_surface("m");
        bridge.initialize("m", 0.0, 0.0, 3.0).unwrap();

        let handle = bridge.entry("m").unwrap().map();
        let (_, source) = bridge.backend().map(handle).unwrap().tile_layer.clone().unwrap();
        assert_eq!(source.max_zoom, 18);
        assert!(bridge.entry("m").unwrap().layers().is_empty());
    }

    #[test]
    fn test_deferred_initialize_fires_once_on_mount() {
        let (mut bridge, diagnostics) = bridge();

        assert_eq!(bridge.initialize("late", 1.0, 2.0, 4.0).unwrap(), InitOutcome::Deferred);
        // A repeated call while pending keeps the first request
        assert_eq!(bridge.initialize("late", 5.0, 6.0, 7.0).unwrap(), InitOutcome::Deferred);
        assert!(!bridge.contains("late"));
        assert!(diagnostics
            .records()
            .iter()
            .any(|r| r.level == crate::diagnostics::Level::Warn));

        assert_eq!(bridge.mount_surface("late").unwrap(), Some(InitOutcome::Created));
        assert_eq!(bridge.view("late").unwrap().center, LatLng::new(1.0, 2.0));
        assert!(!bridge.is_pending("late"));

        // Nothing left to fire
        assert_eq!(bridge.surface_mounted("late").unwrap(), None);
    }

    #[test]
    fn test_deferred_initialize_without_surface_reports() {
        let (mut bridge, diagnostics) = bridge();
        bridge.initialize("never", 1.0, 2.0, 4.0).unwrap();

        let result = bridge.fire_pending("never");
        assert!(matches!(result, Err(MapError::SurfaceNotFound(id)) if id == "never"));
        assert!(!bridge.contains("never"));
        assert!(!bridge.is_pending("never"));
        assert_eq!(diagnostics.errors(), vec!["Map element 'never' not found".to_string()]);

        // One shot: a later mount does not resurrect the request
        assert_eq!(bridge.mount_surface("never").unwrap(), None);
        assert!(!bridge.contains("never"));
    }

    #[test]
    fn test_fire_all_pending_returns_failures() {
        let (mut bridge, _) = bridge();
        bridge.initialize("a", 0.0, 0.0, 1.0).unwrap();
        bridge.initialize("b", 0.0, 0.0, 1.0).unwrap();
        bridge.backend_mut().mount_surface("b");

        assert_eq!(bridge.fire_all_pending(), vec!["a".to_string()]);
        assert!(bridge.contains("b"));
        assert!(!bridge.contains("a"));
    }

    #[test]
    fn test_add_markers_in_order() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("m").unwrap();
        bridge.initialize("m", 0.0, 0.0, 2.0).unwrap();

        let added = bridge
            .add_markers("m", &[MarkerSpec::new(1.0, 1.0), MarkerSpec::new(2.0, 2.0)])
            .unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(bridge.entry("m").unwrap().layers(), added.as_slice());

        let overlays = bridge.backend().overlays(bridge.entry("m").unwrap().map());
        let lats: Vec<f64> = overlays.iter().map(|(_, o)| o.bounds().center().lat).collect();
        assert_eq!(lats, vec![1.0, 2.0]);
    }

    #[test]
    fn test_clear_then_fit_is_noop() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("m").unwrap();
        bridge.initialize("m", 0.0, 0.0, 2.0).unwrap();
        bridge
            .add_marker("m", MarkerSpec::new(1.0, 2.0).with_title("t").with_popup("p"))
            .unwrap();

        bridge.clear_map("m").unwrap();
        assert_eq!(bridge.layer_count("m"), Some(0));
        assert_eq!(bridge.backend().layer_count(), 0);

        let before = bridge.view("m").unwrap();
        assert_eq!(bridge.fit_bounds("m").unwrap(), None);
        assert_eq!(bridge.view("m").unwrap(), before);
    }

    #[test]
    fn test_fit_bounds_pads_and_applies() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("m").unwrap();
        bridge.initialize("m", 0.0, 0.0, 2.0).unwrap();
        bridge.add_marker("m", MarkerSpec::new(10.0, 20.0)).unwrap();
        bridge.add_marker("m", MarkerSpec::new(20.0, 40.0)).unwrap();

        let applied = bridge.fit_bounds("m").unwrap().unwrap();
        assert!((applied.south_west.lat - 9.0).abs() < 1e-9);
        assert!((applied.south_west.lng - 18.0).abs() < 1e-9);
        assert!((applied.north_east.lat - 21.0).abs() < 1e-9);
        assert!((applied.north_east.lng - 42.0).abs() < 1e-9);
        assert_eq!(bridge.view("m").unwrap().fitted, Some(applied));
    }

    #[test]
    fn test_fit_bounds_covers_circle_extent() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("m").unwrap();
        bridge.initialize("m", 51.5, -0.1, 13.0).unwrap();
        bridge.add_circle("m", red_circle(51.5, -0.1, 500.0)).unwrap();
        bridge.add_marker("m", MarkerSpec::new(51.5, -0.1)).unwrap();

        let applied = bridge.fit_bounds("m").unwrap().unwrap();
        let circle = crate::geo::circle_bounds(LatLng::new(51.5, -0.1), 500.0);
        assert!(applied.contains_bounds(&circle));
    }

    #[test]
    fn test_london_circle_scenario() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("m1").unwrap();
        bridge.initialize("m1", 51.5, -0.1, 13.0).unwrap();
        bridge.add_circle("m1", red_circle(51.5, -0.1, 500.0)).unwrap();
        bridge.clear_map("m1").unwrap();

        assert_eq!(bridge.layer_count("m1"), Some(0));
        let view = bridge.view("m1").unwrap();
        assert_eq!(view.center, LatLng::new(51.5, -0.1));
        assert_eq!(view.zoom, 13.0);
    }

    #[test]
    fn test_unmount_drops_map() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("m").unwrap();
        bridge.initialize("m", 0.0, 0.0, 2.0).unwrap();
        bridge.add_marker("m", MarkerSpec::new(1.0, 1.0)).unwrap();

        bridge.unmount_surface("m").unwrap();
        assert!(!bridge.contains("m"));
        assert_eq!(bridge.backend().maps().count(), 0);
        assert!(!bridge.backend().surface_exists("m"));
    }

    #[test]
    fn test_teardown_and_snapshot() {
        let (mut bridge, _) = bridge();
        bridge.mount_surface("b").unwrap();
        bridge.mount_surface("a").unwrap();
        bridge.initialize("b", 0.0, 0.0, 2.0).unwrap();
        bridge.initialize("a", 0.0, 0.0, 2.0).unwrap();
        bridge.add_marker("a", MarkerSpec::new(1.0, 1.0)).unwrap();
        bridge.initialize("later", 0.0, 0.0, 2.0).unwrap();

        let snapshot = bridge.snapshot();
        let ids: Vec<&str> = snapshot.maps.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(snapshot.maps[0].layers.len(), 1);
        assert_eq!(snapshot.pending, vec!["later".to_string()]);

        bridge.teardown();
        assert!(bridge.is_empty());
        assert!(bridge.snapshot().pending.is_empty());
    }

    /// Scene backend that rejects NaN markers and can fail map setup.
    #[derive(Default)]
    struct FlakyBackend {
        inner: SceneBackend,
        fail_tile_layer: bool,
        fail_remove_map: bool,
    }

    impl MapBackend for FlakyBackend {
        fn surface_exists(&self, surface_id: &str) -> bool {
            self.inner.surface_exists(surface_id)
        }

        fn create_map(&mut self, surface_id: &str, center: LatLng, zoom: f64) -> Result<MapHandle> {
            self.inner.create_map(surface_id, center, zoom)
        }

        fn add_tile_layer(
            &mut self,
            map: MapHandle,
            source: &crate::map::TileSource,
        ) -> Result<LayerHandle> {
            if self.fail_tile_layer {
                return Err(MapError::Other("tile layer refused".to_string()));
            }
            self.inner.add_tile_layer(map, source)
        }

        fn add_marker(&mut self, map: MapHandle, marker: &MarkerSpec) -> Result<LayerHandle> {
            if marker.lat.is_nan() || marker.lng.is_nan() {
                return Err(MapError::Other("invalid marker position".to_string()));
            }
            self.inner.add_marker(map, marker)
        }

        fn add_circle(&mut self, map: MapHandle, circle: &CircleSpec) -> Result<LayerHandle> {
            self.inner.add_circle(map, circle)
        }

        fn remove_layer(&mut self, map: MapHandle, layer: LayerHandle) -> Result<()> {
            self.inner.remove_layer(map, layer)
        }

        fn layer_bounds(&self, layer: LayerHandle) -> Option<LatLngBounds> {
            self.inner.layer_bounds(layer)
        }

        fn fit_bounds(&mut self, map: MapHandle, bounds: LatLngBounds) -> Result<()> {
            self.inner.fit_bounds(map, bounds)
        }

        fn remove_map(&mut self, map: MapHandle) -> Result<()> {
            if self.fail_remove_map {
                return Err(MapError::Other("map removal refused".to_string()));
            }
            self.inner.remove_map(map)
        }

        fn view(&self, map: MapHandle) -> Option<View> {
            self.inner.view(map)
        }
    }

    fn flaky_bridge(backend: FlakyBackend) -> (MapBridge<FlakyBackend>, Arc<RecordingDiagnostics>) {
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let mut bridge =
            MapBridge::with_diagnostics(backend, BridgeConfig::default(), diagnostics.clone());
        bridge.backend_mut().inner.mount_surface("m");
        (bridge, diagnostics)
    }

    #[test]
    fn test_add_markers_skips_rejected_marker_without_rollback() {
        let (mut bridge, diagnostics) = flaky_bridge(FlakyBackend::default());
        bridge.initialize("m", 0.0, 0.0, 2.0).unwrap();

        let added = bridge
            .add_markers(
                "m",
                &[
                    MarkerSpec::new(1.0, 1.0),
                    MarkerSpec::new(f64::NAN, 2.0),
                    MarkerSpec::new(3.0, 3.0),
                ],
            )
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_eq!(bridge.entry("m").unwrap().layers(), added.as_slice());
        let lats: Vec<f64> = added
            .iter()
            .map(|layer| bridge.backend().layer_bounds(*layer).unwrap().center().lat)
            .collect();
        assert_eq!(lats, vec![1.0, 3.0]);
        assert_eq!(diagnostics.errors(), vec!["Error: invalid marker position".to_string()]);
    }

    #[test]
    fn test_failed_tile_layer_reports_cleanup_failure() {
        let (mut bridge, diagnostics) = flaky_bridge(FlakyBackend {
            fail_tile_layer: true,
            fail_remove_map: true,
            ..FlakyBackend::default()
        });

        assert!(bridge.initialize("m", 0.0, 0.0, 2.0).is_err());
        assert!(!bridge.contains("m"));
        assert_eq!(
            diagnostics.errors(),
            vec![
                "Error: map removal refused".to_string(),
                "Error: tile layer refused".to_string(),
            ]
        );
    }

    #[test]
    fn test_initialize_after_silent_mount_uses_pending_request() {
        let (mut bridge, _) = bridge();
        assert_eq!(bridge.initialize("m", 1.0, 2.0, 3.0).unwrap(), InitOutcome::Deferred);

        // Surface appears without the mount signal
        bridge.backend_mut().mount_surface("m");
        assert_eq!(bridge.initialize("m", 5.0, 6.0, 7.0).unwrap(), InitOutcome::Created);

        let view = bridge.view("m").unwrap();
        assert_eq!(view.center, LatLng::new(1.0, 2.0));
        assert_eq!(view.zoom, 3.0);
        assert!(!bridge.is_pending("m"));
        assert!(bridge.snapshot().pending.is_empty());
        assert_eq!(bridge.fire_pending("m").unwrap(), None);
    }

    #[tokio::test]
    async fn test_initialize_with_delay_reports_missing_surface() {
        let (mut bridge, diagnostics) = bridge();
        let result = bridge.initialize_with_delay("gone", 0.0, 0.0, 3.0).await;
        assert!(matches!(result, Err(MapError::SurfaceNotFound(_))));
        assert!(!bridge.is_pending("gone"));
        assert_eq!(diagnostics.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_with_delay_mounted_surface() {
        let (mut bridge, _) = bridge();
        bridge.backend_mut().mount_surface("ready");
        let outcome = bridge.initialize_with_delay("ready", 0.0, 0.0, 3.0).await.unwrap();
        assert_eq!(outcome, InitOutcome::Created);
    }
}
