// src/map/tile_cache.rs
//! Raster tile downloading and caching for the map viewer

use super::tiles::{lat_lon_to_tile, TileSource};
use crate::error::{MapError, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type TileKey = (u8, u32, u32);

#[derive(Clone)]
pub struct TileCache {
    source: TileSource,
    user_agent: String,
    cache_dir: PathBuf,
    memory_cache: Arc<Mutex<HashMap<TileKey, Arc<Vec<u8>>>>>,
    downloading: Arc<Mutex<HashSet<TileKey>>>,
    max_memory_tiles: usize,
    max_concurrent_downloads: usize,
}

impl TileCache {
    pub fn new(source: TileSource, user_agent: String, cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| MapError::Other(format!("Failed to create cache directory: {}", e)))?;

        Ok(Self {
            source,
            user_agent,
            cache_dir,
            memory_cache: Arc::new(Mutex::new(HashMap::new())),
            downloading: Arc::new(Mutex::new(HashSet::new())),
            max_memory_tiles: 100,
            max_concurrent_downloads: 4,
        })
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    /// Get tile from memory or disk; `None` when it still has to be fetched
    pub fn get_tile(&self, zoom: u8, x: u32, y: u32) -> Result<Option<Arc<Vec<u8>>>> {
        let key = (zoom, x, y);

        if let Ok(cache) = self.memory_cache.lock() {
            if let Some(tile) = cache.get(&key) {
                return Ok(Some(Arc::clone(tile)));
            }
        }

        let path = self.get_tile_path(zoom, x, y);
        if path.exists() {
            let bytes = std::fs::read(&path)
                .map_err(|e| MapError::Other(format!("Failed to read cached tile: {}", e)))?;
            let tile = Arc::new(bytes);
            Self::insert_bounded(&self.memory_cache, self.max_memory_tiles, key, Arc::clone(&tile));
            return Ok(Some(tile));
        }

        Ok(None)
    }

    /// Download tile in background (non-blocking) with concurrency limit
    pub fn download_tile_async(&self, zoom: u8, x: u32, y: u32) {
        if zoom > self.source.max_zoom {
            return;
        }
        let key = (zoom, x, y);

        {
            let Ok(mut downloading) = self.downloading.lock() else {
                return;
            };
            if downloading.len() >= self.max_concurrent_downloads || downloading.contains(&key) {
                return;
            }
            downloading.insert(key);
        }

        let url = self.source.tile_url(zoom, x, y);
        let user_agent = self.user_agent.clone();
        let path = self.get_tile_path(zoom, x, y);
        let memory_cache = Arc::clone(&self.memory_cache);
        let downloading = Arc::clone(&self.downloading);
        let max_memory_tiles = self.max_memory_tiles;

        std::thread::spawn(move || {
            match Self::download_tile(&url, &user_agent) {
                Ok(bytes) => {
                    if let Some(parent) = path.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    if let Err(e) = std::fs::write(&path, &bytes) {
                        tracing::debug!("Failed to persist tile {}: {}", path.display(), e);
                    }
                    Self::insert_bounded(&memory_cache, max_memory_tiles, key, Arc::new(bytes));
                }
                Err(e) => tracing::debug!("Tile download failed for {}: {}", url, e),
            }

            if let Ok(mut downloading) = downloading.lock() {
                downloading.remove(&key);
            }
        });
    }

    fn download_tile(url: &str, user_agent: &str) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| MapError::Other(format!("HTTP client error: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| MapError::Other(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MapError::Other(format!("HTTP error: {}", response.status())));
        }

        let bytes = response
            .bytes()
            .map_err(|e| MapError::Other(format!("Failed to read response: {}", e)))?
            .to_vec();

        // OSM tile usage policy asks for polite request pacing
        std::thread::sleep(std::time::Duration::from_millis(100));

        Ok(bytes)
    }

    fn get_tile_path(&self, zoom: u8, x: u32, y: u32) -> PathBuf {
        Self::tile_path(&self.cache_dir, zoom, x, y)
    }

    fn tile_path(cache_dir: &Path, zoom: u8, x: u32, y: u32) -> PathBuf {
        cache_dir.join(format!("{}/{}/{}.png", zoom, x, y))
    }

    fn insert_bounded(
        cache: &Mutex<HashMap<TileKey, Arc<Vec<u8>>>>,
        capacity: usize,
        key: TileKey,
        tile: Arc<Vec<u8>>,
    ) {
        let Ok(mut cache) = cache.lock() else {
            return;
        };
        if cache.len() >= capacity {
            if let Some(evict) = cache.keys().next().cloned() {
                cache.remove(&evict);
            }
        }
        cache.insert(key, tile);
    }

    /// Queue downloads for the tiles around a location
    pub fn preload_area(&self, center_lat: f64, center_lon: f64, zoom: u8, radius: u32) {
        let (center_x, center_y) = lat_lon_to_tile(center_lat, center_lon, zoom);
        let radius = radius.min(2) as i64;
        let max_index = (1i64 << zoom) - 1;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let x = center_x as i64 + dx;
                let y = center_y as i64 + dy;
                if (0..=max_index).contains(&x) && (0..=max_index).contains(&y) {
                    self.download_tile_async(zoom, x as u32, y as u32);
                }
            }
        }
    }

    pub fn clear_memory_cache(&self) {
        if let Ok(mut cache) = self.memory_cache.lock() {
            cache.clear();
        }
    }

    pub fn get_stats(&self) -> CacheStats {
        let memory_tiles = self.memory_cache.lock().map(|c| c.len()).unwrap_or(0);

        let mut disk_tiles = 0;
        let mut disk_size = 0u64;

        fn walk_dir(path: &Path, count: &mut usize, size: &mut u64) {
            if let Ok(entries) = std::fs::read_dir(path) {
                for entry in entries.flatten() {
                    if let Ok(metadata) = entry.metadata() {
                        if metadata.is_file() {
                            *count += 1;
                            *size += metadata.len();
                        } else if metadata.is_dir() {
                            walk_dir(&entry.path(), count, size);
                        }
                    }
                }
            }
        }

        walk_dir(&self.cache_dir, &mut disk_tiles, &mut disk_size);

        CacheStats {
            memory_tiles,
            disk_tiles,
            disk_size_mb: disk_size as f64 / 1_048_576.0,
        }
    }

    pub fn clear_disk_cache(&self) -> Result<()> {
        std::fs::remove_dir_all(&self.cache_dir)
            .map_err(|e| MapError::Other(format!("Failed to clear cache: {}", e)))?;
        std::fs::create_dir_all(&self.cache_dir)
            .map_err(|e| MapError::Other(format!("Failed to recreate cache directory: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub memory_tiles: usize,
    pub disk_tiles: usize,
    pub disk_size_mb: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path() {
        let cache_dir = PathBuf::from("/tmp/tiles");
        let path = TileCache::tile_path(&cache_dir, 12, 1234, 5678);
        assert_eq!(path, PathBuf::from("/tmp/tiles/12/1234/5678.png"));
    }

    #[test]
    fn test_cached_tile_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(
            TileSource::openstreetmap(),
            "map-bridge-test".to_string(),
            dir.path().to_path_buf(),
        )
        .unwrap();

        assert!(cache.get_tile(3, 1, 2).unwrap().is_none());

        let path = TileCache::tile_path(dir.path(), 3, 1, 2);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"png").unwrap();

        let tile = cache.get_tile(3, 1, 2).unwrap().unwrap();
        assert_eq!(tile.as_slice(), b"png");
        assert_eq!(cache.get_stats().memory_tiles, 1);
        assert_eq!(cache.get_stats().disk_tiles, 1);

        cache.clear_memory_cache();
        cache.clear_disk_cache().unwrap();
        assert_eq!(cache.get_stats().disk_tiles, 0);
    }
}
