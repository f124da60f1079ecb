// src/error.rs
//! Error types for the map bridge

use std::fmt;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug)]
pub enum MapError {
    /// The rendering surface was still absent when initialization ran.
    SurfaceNotFound(String),
    /// An operation targeted a map id with no registry entry.
    MapNotInitialized(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(String),
    Other(String),
}

impl MapError {
    /// Map id the error refers to, for the two façade error kinds.
    pub fn map_id(&self) -> Option<&str> {
        match self {
            MapError::SurfaceNotFound(id) | MapError::MapNotInitialized(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::SurfaceNotFound(id) => write!(f, "Map element '{}' not found", id),
            MapError::MapNotInitialized(id) => write!(f, "Map '{}' not initialized", id),
            MapError::Io(e) => write!(f, "IO error: {}", e),
            MapError::Json(e) => write!(f, "JSON error: {}", e),
            MapError::Config(msg) => write!(f, "Config error: {}", msg),
            MapError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MapError {}

impl From<std::io::Error> for MapError {
    fn from(error: std::io::Error) -> Self {
        MapError::Io(error)
    }
}

impl From<serde_json::Error> for MapError {
    fn from(error: serde_json::Error) -> Self {
        MapError::Json(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_map() {
        let err = MapError::MapNotInitialized("m1".to_string());
        assert_eq!(err.to_string(), "Map 'm1' not initialized");

        let err = MapError::SurfaceNotFound("m2".to_string());
        assert_eq!(err.to_string(), "Map element 'm2' not found");
    }

    #[test]
    fn test_map_id() {
        assert_eq!(MapError::MapNotInitialized("a".into()).map_id(), Some("a"));
        assert_eq!(MapError::Other("x".into()).map_id(), None);
    }
}
