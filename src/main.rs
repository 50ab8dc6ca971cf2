use std::sync::Arc;

use musync::config::ServerConfig;
use musync::models::Track;
use musync::server;
use musync::store::PlaybackStore;
use musync::utils::time::now_millis;

const APP_NAME: &str = "musync";
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Set RUST_LOG=debug for verbose output, RUST_LOG=info for normal logs
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("[Main] Starting {} v{}", APP_NAME, APP_VERSION);

    let config = ServerConfig::from_env();
    let store = Arc::new(PlaybackStore::new());
    seed_demo_channel(&store);

    server::run(&config, store)
}

/// Optional demo setup: MUSYNC_DEMO_CHANNEL boots one looping track so the
/// server is immediately pollable without any admin calls.
fn seed_demo_channel(store: &PlaybackStore) {
    let Ok(channel) = std::env::var("MUSYNC_DEMO_CHANNEL") else {
        return;
    };
    if channel.is_empty() {
        return;
    }

    let track = Track {
        id: "example_01".to_string(),
        url: std::env::var("MUSYNC_DEMO_TRACK_URL")
            .unwrap_or_else(|_| "https://cdn.example.com/audio/example_01.mp3".to_string()),
        duration: 120.0,
    };
    let now = now_millis();

    if let Err(e) = store.add_track(&channel, track.clone()) {
        log::error!("[Main] Failed to seed demo track: {}", e);
        return;
    }
    if let Err(e) = store.switch_track(&channel, &track.id, now) {
        log::error!("[Main] Failed to select demo track: {}", e);
        return;
    }
    store.set_playing(&channel, true, now);

    log::info!(
        "[Main] Demo channel {} looping track {} ({}s)",
        channel,
        track.id,
        track.duration
    );
}
