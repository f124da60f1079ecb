// src/map/mod.rs
//! Tile math, tile sources and tile caching

mod tiles;
#[cfg(feature = "gui")]
mod tile_cache;

pub use tiles::{
    lat_lon_to_tile, project, projected_center, unproject, zoom_to_fit,
    TileSource, DEFAULT_MAX_ZOOM, TILE_SIZE,
};
#[cfg(feature = "gui")]
pub use tile_cache::{CacheStats, TileCache};
