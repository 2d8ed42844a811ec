use arc_swap::ArcSwap;
use composer::{ComposerApp, Config, LoadSequencer, spawn_bridge, spawn_engine};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::current_dir() {
        Ok(dir) => Config::load(&dir).unwrap_or_else(|e| {
            error!("{}; using defaults", e);
            Config::default()
        }),
        Err(e) => {
            error!("Failed to read working directory: {}; using defaults", e);
            Config::default()
        }
    };
    info!("Backend: {}", config.backend_url);

    let loads = LoadSequencer::new();
    let volume = Arc::new(ArcSwap::from_pointee(config.synth.volume));
    let engine = spawn_engine(&config, loads.clone(), volume.clone());
    let bridge = spawn_bridge(config, loads.clone(), engine.command_tx.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 520.0])
            .with_title("Composer"),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "Composer",
        options,
        Box::new(|_cc| Ok(Box::new(ComposerApp::new(engine, bridge, loads, volume)))),
    ) {
        error!("UI exited with error: {}", e);
    }
}
