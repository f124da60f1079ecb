// src/display/gui/app.rs
//! Viewer application: map list, façade controls and the active map

use super::map_window::{MapInteraction, MapView};
use crate::{
    backend::{MarkerSpec, SceneBackend},
    bridge::MapBridge,
};
use eframe::egui;
use std::time::Duration;

pub struct MapBridgeApp {
    bridge: MapBridge<SceneBackend>,
    map_view: MapView,
    selected: Option<String>,
    add_on_click: bool,
    status: Option<String>,
}

impl MapBridgeApp {
    pub fn new(bridge: MapBridge<SceneBackend>, map_view: MapView) -> Self {
        let selected = bridge.map_ids().into_iter().next();
        Self {
            bridge,
            map_view,
            selected,
            add_on_click: false,
            status: None,
        }
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("maps_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Maps");
                ui.separator();

                if self.bridge.is_empty() {
                    ui.weak("No maps initialized");
                }

                for id in self.bridge.map_ids() {
                    let layers = self.bridge.layer_count(&id).unwrap_or(0);
                    let label = format!("{}  ({} layers)", id, layers);
                    let is_selected = self.selected.as_deref() == Some(id.as_str());
                    if ui.selectable_label(is_selected, label).clicked() {
                        self.selected = Some(id);
                    }
                }

                let pending = self.bridge.snapshot().pending;
                if !pending.is_empty() {
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("Pending: {}", pending.join(", ")),
                    );
                }

                ui.separator();
                let stats = self.map_view.tile_cache().get_stats();
                ui.label(format!(
                    "Tile cache: {} tiles ({:.1} MB)",
                    stats.disk_tiles, stats.disk_size_mb
                ));
                if ui.button("🗑 Clear Cache").clicked() {
                    if let Err(e) = self.map_view.tile_cache().clear_disk_cache() {
                        self.status = Some(e.to_string());
                    }
                    self.map_view.tile_cache().clear_memory_cache();
                    self.map_view.clear_textures();
                }
            });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, id: &str) {
        ui.horizontal(|ui| {
            ui.strong(id);
            ui.separator();

            if ui.button("Fit bounds").clicked() {
                match self.bridge.fit_bounds(id) {
                    Ok(Some(_)) => self.status = None,
                    Ok(None) => self.status = Some("No layers to fit".to_string()),
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
            if ui.button("Clear layers").clicked() {
                if let Err(e) = self.bridge.clear_map(id) {
                    self.status = Some(e.to_string());
                }
            }
            ui.checkbox(&mut self.add_on_click, "📍 Click adds marker");

            if let Some(view) = self.bridge.view(id) {
                ui.separator();
                ui.label(format!(
                    "Center: {:.6}, {:.6}  Zoom: {:.0}",
                    view.center.lat, view.center.lng, view.zoom
                ));
            }
        });
    }
}

impl eframe::App for MapBridgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Tiles arrive from background downloads
        ctx.request_repaint_after(Duration::from_millis(500));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.heading("🗺 Map Bridge");
                if let Some(ref status) = self.status {
                    ui.separator();
                    ui.colored_label(egui::Color32::RED, status);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("❌ Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        self.side_panel(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(id) = self.selected.clone() else {
                ui.centered_and_justified(|ui| ui.weak("Select a map"));
                return;
            };
            let Some(handle) = self.bridge.entry(&id).map(|e| e.map()) else {
                self.selected = None;
                return;
            };

            self.toolbar(ui, &id);
            ui.separator();

            match self.map_view.show(ui, self.bridge.backend(), handle) {
                MapInteraction::ViewChanged { center, zoom } => {
                    if let Err(e) = self.bridge.backend_mut().set_view(handle, center, zoom) {
                        self.status = Some(e.to_string());
                    }
                }
                MapInteraction::Clicked(at) if self.add_on_click => {
                    let marker = MarkerSpec::new(at.lat, at.lng)
                        .with_title(format!("{:.5}, {:.5}", at.lat, at.lng));
                    if let Err(e) = self.bridge.add_marker(&id, marker) {
                        self.status = Some(e.to_string());
                    }
                }
                _ => {}
            }
        });
    }
}
