// src/display/gui/map_window.rs
//! Paints one registered map: raster tiles, circles and markers

use crate::{
    backend::{CircleSpec, MapHandle, MarkerSpec, Overlay, SceneBackend},
    geo::{LatLng, EARTH_RADIUS_M},
    map::{lat_lon_to_tile, project, unproject, TileCache, TILE_SIZE},
};
use eframe::egui;
use std::collections::HashMap;

/// Marker hit radius in screen pixels
const MARKER_RADIUS: f32 = 7.0;

/// What the user did to the map during this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MapInteraction {
    None,
    /// Pan or zoom; the new view to apply
    ViewChanged { center: LatLng, zoom: f64 },
    /// Click on empty map area
    Clicked(LatLng),
}

pub struct MapView {
    tile_cache: TileCache,
    loaded_tiles: HashMap<(u8, u32, u32), egui::TextureHandle>,
}

impl MapView {
    pub fn new(tile_cache: TileCache) -> Self {
        Self {
            tile_cache,
            loaded_tiles: HashMap::new(),
        }
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tile_cache
    }

    pub fn clear_textures(&mut self) {
        self.loaded_tiles.clear();
    }

    /// Draw `map` into the remaining space of `ui`
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        backend: &SceneBackend,
        map: MapHandle,
    ) -> MapInteraction {
        let Some(scene_map) = backend.map(map) else {
            ui.weak("Map not available");
            return MapInteraction::None;
        };
        let max_zoom = self.tile_cache.source().max_zoom;
        let view = scene_map.view;
        let zoom = view.zoom.round().clamp(0.0, max_zoom as f64) as u8;

        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = response.rect;
        let (center_x, center_y) = project(view.center.lat, view.center.lng, zoom as f64);

        self.render_tiles(ui.ctx(), &painter, rect, zoom, center_x, center_y);

        let overlays = backend.overlays(map);
        let to_screen = |lat: f64, lng: f64| -> egui::Pos2 {
            let (x, y) = project(lat, lng, zoom as f64);
            egui::pos2(
                rect.center().x + (x - center_x) as f32,
                rect.center().y + (y - center_y) as f32,
            )
        };

        for (_, overlay) in &overlays {
            if let Overlay::Circle(circle) = overlay {
                self.render_circle(&painter, circle, to_screen(circle.lat, circle.lng), zoom);
            }
        }

        let mut hovered: Option<&MarkerSpec> = None;
        let pointer = response.hover_pos();
        for (_, overlay) in &overlays {
            if let Overlay::Marker(marker) = overlay {
                let pos = to_screen(marker.lat, marker.lng);
                self.render_marker(&painter, marker, pos);
                if pointer.is_some_and(|p| p.distance(pos) <= MARKER_RADIUS + 2.0) {
                    hovered = Some(marker);
                }
            }
        }

        painter.text(
            rect.right_bottom() - egui::vec2(4.0, 4.0),
            egui::Align2::RIGHT_BOTTOM,
            strip_html(&self.tile_cache.source().attribution),
            egui::FontId::proportional(10.0),
            egui::Color32::DARK_GRAY,
        );

        let interaction = Self::interaction(ui, &response, rect, zoom, max_zoom, center_x, center_y);

        if let Some(marker) = hovered {
            let text = match (&marker.title, &marker.popup) {
                (Some(title), Some(popup)) => format!("{}\n{}", title, strip_html(popup)),
                (Some(title), None) => title.clone(),
                (None, Some(popup)) => strip_html(popup),
                (None, None) => format!("{:.5}, {:.5}", marker.lat, marker.lng),
            };
            let _ = response.on_hover_text(text);
        }

        interaction
    }

    fn interaction(
        ui: &egui::Ui,
        response: &egui::Response,
        rect: egui::Rect,
        zoom: u8,
        max_zoom: u8,
        center_x: f64,
        center_y: f64,
    ) -> MapInteraction {
        if response.dragged() {
            let delta = response.drag_delta();
            let (lat, lng) = unproject(
                center_x - delta.x as f64,
                center_y - delta.y as f64,
                zoom as f64,
            );
            return MapInteraction::ViewChanged {
                center: LatLng::new(lat, lng),
                zoom: zoom as f64,
            };
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll.abs() > 1.0 {
                let new_zoom = if scroll > 0.0 {
                    zoom.saturating_add(1).min(max_zoom)
                } else {
                    zoom.saturating_sub(1)
                };
                let (lat, lng) = unproject(center_x, center_y, zoom as f64);
                return MapInteraction::ViewChanged {
                    center: LatLng::new(lat, lng),
                    zoom: new_zoom as f64,
                };
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let x = center_x + (pos.x - rect.center().x) as f64;
                let y = center_y + (pos.y - rect.center().y) as f64;
                let (lat, lng) = unproject(x, y, zoom as f64);
                return MapInteraction::Clicked(LatLng::new(lat, lng));
            }
        }

        MapInteraction::None
    }

    fn render_tiles(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        rect: egui::Rect,
        zoom: u8,
        center_x: f64,
        center_y: f64,
    ) {
        let tile_size = TILE_SIZE as f32;
        let (lat, lng) = unproject(center_x, center_y, zoom as f64);
        let (center_tile_x, center_tile_y) = lat_lon_to_tile(lat, lng, zoom);
        let offset_x = center_x.rem_euclid(TILE_SIZE) as f32;
        let offset_y = center_y.rem_euclid(TILE_SIZE) as f32;

        let tiles_x = (rect.width() / tile_size / 2.0).ceil() as i64 + 1;
        let tiles_y = (rect.height() / tile_size / 2.0).ceil() as i64 + 1;
        let max_index = (1i64 << zoom) - 1;

        let painter = painter.with_clip_rect(rect);
        for dy in -tiles_y..=tiles_y {
            for dx in -tiles_x..=tiles_x {
                let tile_x = center_tile_x as i64 + dx;
                let tile_y = center_tile_y as i64 + dy;
                if !(0..=max_index).contains(&tile_x) || !(0..=max_index).contains(&tile_y) {
                    continue;
                }

                let min = egui::pos2(
                    rect.center().x + dx as f32 * tile_size - offset_x,
                    rect.center().y + dy as f32 * tile_size - offset_y,
                );
                let tile_rect = egui::Rect::from_min_size(min, egui::vec2(tile_size, tile_size));
                self.render_tile(ctx, &painter, zoom, tile_x as u32, tile_y as u32, tile_rect);
            }
        }
    }

    fn render_tile(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        zoom: u8,
        x: u32,
        y: u32,
        rect: egui::Rect,
    ) {
        let key = (zoom, x, y);
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        if let Some(texture) = self.loaded_tiles.get(&key) {
            painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
            return;
        }

        match self.tile_cache.get_tile(zoom, x, y) {
            Ok(Some(tile_data)) => {
                if let Ok(image) = image::load_from_memory(&tile_data) {
                    let size = [image.width() as usize, image.height() as usize];
                    let rgba = image.to_rgba8();
                    let color_image =
                        egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                    let texture = ctx.load_texture(
                        format!("tile_{}_{}_{}", zoom, x, y),
                        color_image,
                        egui::TextureOptions::LINEAR,
                    );
                    painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
                    self.loaded_tiles.insert(key, texture);
                }
            }
            Ok(None) | Err(_) => {
                self.tile_cache.download_tile_async(zoom, x, y);
                painter.rect_filled(rect, 0.0, egui::Color32::from_gray(235));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Loading...",
                    egui::FontId::proportional(12.0),
                    egui::Color32::GRAY,
                );
            }
        }
    }

    fn render_circle(&self, painter: &egui::Painter, circle: &CircleSpec, pos: egui::Pos2, zoom: u8) {
        let meters_per_pixel = 2.0 * std::f64::consts::PI * EARTH_RADIUS_M
            * circle.lat.to_radians().cos()
            / (TILE_SIZE * 2_f64.powi(zoom as i32));
        let radius = (circle.radius / meters_per_pixel.max(f64::EPSILON)) as f32;

        let stroke = parse_color(&circle.color, 1.0);
        let fill = parse_color(&circle.fill_color, circle.fill_opacity.clamp(0.0, 1.0));
        painter.circle(pos, radius.max(1.0), fill, egui::Stroke::new(3.0, stroke));
    }

    fn render_marker(&self, painter: &egui::Painter, marker: &MarkerSpec, pos: egui::Pos2) {
        painter.circle_filled(pos, MARKER_RADIUS, egui::Color32::from_rgb(40, 120, 220));
        painter.circle_stroke(pos, MARKER_RADIUS, egui::Stroke::new(2.0, egui::Color32::WHITE));

        if let Some(ref title) = marker.title {
            painter.text(
                pos + egui::vec2(10.0, -10.0),
                egui::Align2::LEFT_BOTTOM,
                title,
                egui::FontId::proportional(12.0),
                egui::Color32::BLACK,
            );
        }
    }
}

/// CSS-style color: a handful of names or `#rgb` / `#rrggbb`.
pub fn parse_color(value: &str, opacity: f64) -> egui::Color32 {
    let alpha = (opacity * 255.0).round() as u8;
    let value = value.trim().to_ascii_lowercase();

    let rgb = match value.as_str() {
        "red" => Some((255, 0, 0)),
        "green" => Some((0, 128, 0)),
        "blue" => Some((0, 0, 255)),
        "orange" => Some((255, 165, 0)),
        "yellow" => Some((255, 255, 0)),
        "purple" => Some((128, 0, 128)),
        "black" => Some((0, 0, 0)),
        "white" => Some((255, 255, 255)),
        "gray" | "grey" => Some((128, 128, 128)),
        hex if hex.starts_with('#') => parse_hex(&hex[1..]),
        _ => None,
    };

    let (r, g, b) = rgb.unwrap_or((51, 136, 255));
    egui::Color32::from_rgba_unmultiplied(r, g, b, alpha)
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some((byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

/// Popup content may carry markup; the viewer shows plain text.
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&copy;", "©").replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("red", 1.0), egui::Color32::from_rgb(255, 0, 0));
        assert_eq!(parse_color("#00ff00", 1.0), egui::Color32::from_rgb(0, 255, 0));
        assert_eq!(parse_color("#fff", 1.0), egui::Color32::WHITE);
        assert_eq!(parse_color("#zz", 1.0), egui::Color32::from_rgb(51, 136, 255));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<b>Hi</b> there"), "Hi there");
        assert_eq!(strip_html("&copy; OSM"), "© OSM");
    }
}
