// src/lib.rs
//! Map Bridge Library
//!
//! A registry of slippy maps keyed by surface id, with a small interop
//! façade (initialize, add markers and circles, clear, fit bounds) that
//! forwards every call to a mapping backend.

pub mod backend;
pub mod bridge;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod geo;
pub mod interop;
pub mod map;

// Re-export main types for convenience
pub use backend::{CircleSpec, LayerHandle, MapBackend, MapHandle, MarkerSpec, SceneBackend, View};
pub use bridge::{InitOutcome, MapBridge, MapEntry, RegistrySnapshot};
pub use config::BridgeConfig;
pub use error::{MapError, Result};
pub use geo::{LatLng, LatLngBounds};
pub use interop::{CallReport, CallScript, InteropCall};

#[cfg(feature = "gui")]
pub use display::gui::MapBridgeApp;
