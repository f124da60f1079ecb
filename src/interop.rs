// src/interop.rs
//! Host-facing call surface.
//!
//! Calls arrive as JSON objects tagged by `call`, with the same camelCase
//! names and argument lists the host UI uses:
//!
//! ```json
//! { "call": "addCircle", "id": "m1", "lat": 51.5, "lng": -0.1,
//!   "radius": 500, "color": "red", "fillColor": "red", "fillOpacity": 0.3 }
//! ```

use crate::{
    backend::{CircleSpec, MapBackend, MarkerSpec, SceneBackend},
    bridge::MapBridge,
    error::{MapError, Result},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum InteropCall {
    #[serde(alias = "initializeMap")]
    Initialize {
        id: String,
        #[serde(alias = "latitude")]
        lat: f64,
        #[serde(alias = "longitude")]
        lng: f64,
        zoom: f64,
    },
    AddMarker {
        id: String,
        #[serde(flatten)]
        marker: MarkerSpec,
    },
    AddMarkers {
        id: String,
        markers: Vec<MarkerSpec>,
    },
    AddCircle {
        id: String,
        #[serde(flatten)]
        circle: CircleSpec,
    },
    ClearMap {
        id: String,
    },
    FitBounds {
        id: String,
    },
    /// Host lifecycle: the surface finished mounting
    MountSurface {
        id: String,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
    },
    UnmountSurface {
        id: String,
    },
    /// Let deferred initializations fire after `ms` milliseconds
    Wait {
        #[serde(default)]
        ms: Option<u64>,
    },
}

impl InteropCall {
    pub fn name(&self) -> &'static str {
        match self {
            InteropCall::Initialize { .. } => "initialize",
            InteropCall::AddMarker { .. } => "addMarker",
            InteropCall::AddMarkers { .. } => "addMarkers",
            InteropCall::AddCircle { .. } => "addCircle",
            InteropCall::ClearMap { .. } => "clearMap",
            InteropCall::FitBounds { .. } => "fitBounds",
            InteropCall::MountSurface { .. } => "mountSurface",
            InteropCall::UnmountSurface { .. } => "unmountSurface",
            InteropCall::Wait { .. } => "wait",
        }
    }
}

/// Result of one dispatched call, as reported back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReport {
    pub call: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallReport {
    fn from_result<T>(call: &'static str, result: Result<T>) -> Self {
        match result {
            Ok(_) => Self {
                call,
                ok: true,
                error: None,
            },
            Err(e) => Self {
                call,
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Route one call into the bridge. Errors are already on the diagnostic
/// channel; the report only echoes them.
pub async fn dispatch(bridge: &mut MapBridge<SceneBackend>, call: InteropCall) -> CallReport {
    let name = call.name();
    let result: Result<()> = match call {
        InteropCall::Initialize { id, lat, lng, zoom } => {
            bridge.initialize(&id, lat, lng, zoom).map(|_| ())
        }
        InteropCall::AddMarker { id, marker } => bridge.add_marker(&id, marker).map(|_| ()),
        InteropCall::AddMarkers { id, markers } => bridge.add_markers(&id, &markers).map(|_| ()),
        InteropCall::AddCircle { id, circle } => bridge.add_circle(&id, circle).map(|_| ()),
        InteropCall::ClearMap { id } => bridge.clear_map(&id),
        InteropCall::FitBounds { id } => bridge.fit_bounds(&id).map(|_| ()),
        InteropCall::MountSurface { id, width, height } => {
            let (default_width, default_height) = bridge.config().surface_size();
            bridge.backend_mut().mount_surface_sized(
                &id,
                width.unwrap_or(default_width),
                height.unwrap_or(default_height),
            );
            bridge.surface_mounted(&id).map(|_| ())
        }
        InteropCall::UnmountSurface { id } => bridge.unmount_surface(&id),
        InteropCall::Wait { ms } => {
            let wait = ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| bridge.config().surface_wait());
            tokio::time::sleep(wait).await;
            failures_to_result(bridge.fire_all_pending())
        }
    };

    CallReport::from_result(name, result)
}

// Each failed id is already on the diagnostic channel as its own
// `SurfaceNotFound`; the call report only summarizes.
fn failures_to_result(failed: Vec<String>) -> Result<()> {
    if failed.is_empty() {
        Ok(())
    } else {
        Err(MapError::Other(format!("Surfaces not found: {}", failed.join(", "))))
    }
}

/// Run each call in order, collecting one report per call.
///
/// Deferred initializations still pending afterwards get their single
/// attempt once `surface_wait` has elapsed.
pub async fn run_calls(
    bridge: &mut MapBridge<SceneBackend>,
    calls: Vec<InteropCall>,
) -> Vec<CallReport> {
    let mut reports = Vec::with_capacity(calls.len());
    for call in calls {
        reports.push(dispatch(bridge, call).await);
    }
    settle_pending(bridge).await;
    reports
}

/// Wait `surface_wait` once and fire whatever is still pending.
///
/// Returns the ids whose surface never appeared.
pub async fn settle_pending<B: MapBackend>(bridge: &mut MapBridge<B>) -> Vec<String> {
    if !bridge.has_pending() {
        return Vec::new();
    }
    tokio::time::sleep(bridge.config().surface_wait()).await;
    bridge.fire_all_pending()
}

/// An ordered list of calls loaded from a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallScript {
    pub calls: Vec<InteropCall>,
}

impl CallScript {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
