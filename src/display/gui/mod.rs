// src/display/gui/mod.rs
//! Desktop viewer for the maps held by a bridge

mod app;
mod map_window;

pub use app::MapBridgeApp;
pub use map_window::{parse_color, MapInteraction, MapView};

use crate::{
    backend::SceneBackend,
    bridge::MapBridge,
    error::{MapError, Result},
    map::TileCache,
};

pub struct GuiDisplay;

impl GuiDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Open the viewer window; blocks until it is closed
    pub fn run(&self, bridge: MapBridge<SceneBackend>) -> Result<()> {
        let config = bridge.config().clone();
        let tile_cache = TileCache::new(
            config.tile_source.clone(),
            config.user_agent.clone(),
            config.resolved_tile_cache_dir()?,
        )?;

        let options = eframe::NativeOptions {
            viewport: eframe::egui::ViewportBuilder::default()
                .with_inner_size([1024.0, 768.0])
                .with_title("Map Bridge")
                .with_min_inner_size([640.0, 480.0]),
            ..Default::default()
        };

        let app = MapBridgeApp::new(bridge, MapView::new(tile_cache));
        eframe::run_native(
            "Map Bridge",
            options,
            Box::new(move |cc| {
                cc.egui_ctx.set_visuals(eframe::egui::Visuals::light());
                Ok(Box::new(app))
            }),
        )
        .map_err(|e| MapError::Other(format!("GUI error: {}", e)))
    }
}

impl Default for GuiDisplay {
    fn default() -> Self {
        Self::new()
    }
}
