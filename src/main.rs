// src/main.rs
//! Map Bridge - replay host interop calls into a map registry

use anyhow::Context;
use clap::Parser;
use map_bridge::{
    config::BridgeConfig,
    diagnostics::RecordingDiagnostics,
    display::{self, terminal::TerminalDisplay},
    interop::{run_calls, CallScript},
    MapBridge, SceneBackend,
};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "map-bridge", version, about = "Replay map interop calls and inspect the resulting registry")]
struct Args {
    /// JSON array of interop calls to replay
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Config file (defaults to ~/.config/map-bridge/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the call reports and registry as JSON
    #[arg(long)]
    json: bool,

    /// Open the map viewer after replaying the script
    #[arg(long)]
    gui: bool,

    /// Write the effective config to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match args.config {
        Some(ref path) => BridgeConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BridgeConfig::load().unwrap_or_default(),
    };

    if args.save_config {
        config.save().context("saving config")?;
        tracing::info!("Config written to {}", BridgeConfig::get_config_path()?.display());
        return Ok(());
    }

    let script = match args.script {
        Some(ref path) => CallScript::load(path)
            .with_context(|| format!("loading script {}", path.display()))?,
        None => CallScript::default(),
    };
    tracing::debug!("Replaying {} calls", script.calls.len());

    let diagnostics = Arc::new(RecordingDiagnostics::forwarding());
    let (width, height) = config.surface_size();
    let mut bridge = MapBridge::with_diagnostics(
        SceneBackend::new(width, height),
        config,
        diagnostics.clone(),
    );

    let reports = run_calls(&mut bridge, script.calls).await;

    if args.json {
        let output = serde_json::json!({
            "calls": reports,
            "registry": bridge.snapshot(),
            "diagnostics": diagnostics.records(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        TerminalDisplay::new().show(&reports, &bridge.snapshot())?;
    }

    if args.gui {
        if !display::should_use_gui() {
            anyhow::bail!("The viewer needs the 'gui' feature and a display");
        }
        run_viewer(bridge)?;
    }

    Ok(())
}

#[cfg(feature = "gui")]
fn run_viewer(bridge: MapBridge<SceneBackend>) -> anyhow::Result<()> {
    display::gui::GuiDisplay::new().run(bridge)?;
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn run_viewer(_bridge: MapBridge<SceneBackend>) -> anyhow::Result<()> {
    anyhow::bail!("Build with: cargo build --features gui")
}
