//! Headless listener: polls a channel's status and keeps a local rodio
//! player within drift tolerance. Play/pause and volume stay under local
//! control (stdin commands), exactly like the overlay's play button - the
//! poll only ever moves the playhead.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use musync::client::{PollEvent, ReconcileOutcome, Reconciler, SyncPoller};
use musync::config::ListenerConfig;
use musync::player::LocalPlayer;
use musync::utils::time::format_track_time;

const EVENT_WAIT_MILLIS: u64 = 200;

enum Command {
    TogglePlay,
    Volume(f32),
    Channel(String),
    Quit,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ListenerConfig::from_env();
    log::info!("[Listener] Syncing against {}", config.server_url);
    match &config.channel {
        Some(channel) => log::info!("[Listener] Channel: {}", channel),
        None => log::warn!("[Listener] MUSYNC_CHANNEL not set, waiting for identity"),
    }

    let mut player = LocalPlayer::new(config.volume)?;
    let mut reconciler = Reconciler::new();
    if let Some(channel) = config.channel.clone() {
        reconciler.set_channel(channel);
    }

    let (mut poller, events) = SyncPoller::spawn(config.server_url.clone(), config.channel.clone());
    let commands = spawn_stdin_reader();

    log::info!(
        "[Listener] Commands: p = play/pause, v <0-100> = volume, c <name> = channel, q = quit"
    );

    loop {
        match commands.try_recv() {
            Ok(Command::Quit) => break,
            Ok(Command::TogglePlay) => {
                if !player.has_source() {
                    log::info!("[Listener] Nothing loaded yet");
                } else if player.is_paused() {
                    player.resume();
                    log::info!("[Listener] Playback started");
                } else {
                    player.pause();
                    log::info!("[Listener] Playback paused");
                }
            }
            Ok(Command::Volume(volume)) => {
                player.set_volume(volume);
                log::info!("[Listener] Volume {:.0}%", volume * 100.0);
            }
            Ok(Command::Channel(channel)) => {
                // Identity can arrive (or change) while we're already
                // polling; the poller picks it up on its next tick.
                poller.set_channel(channel.clone());
                reconciler.set_channel(channel);
                if let Some(channel) = reconciler.channel() {
                    log::info!("[Listener] Following channel {}", channel);
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        match events.recv_timeout(Duration::from_millis(EVENT_WAIT_MILLIS)) {
            Ok(PollEvent::Status(status)) => {
                let had_status = reconciler.last_status().is_some();
                match reconciler.apply_status(status.clone(), &mut player) {
                    ReconcileOutcome::TrackChanged { track_id } => {
                        log::info!("[Listener] Now following track {}", track_id);
                    }
                    ReconcileOutcome::Corrected { drift } => {
                        log::info!(
                            "[Listener] Jumped to {} (drift was {:.2}s)",
                            format_track_time(status.timestamp),
                            drift
                        );
                    }
                    ReconcileOutcome::InSync { drift } => {
                        log::debug!(
                            "[Listener] In sync at {} (drift {:.2}s)",
                            format_track_time(status.timestamp),
                            drift
                        );
                    }
                }
                if !had_status {
                    log::info!("[Listener] Playing: {}", status.track_id);
                }
            }
            Ok(PollEvent::NoTrack) => {
                if reconciler.last_status().is_some() {
                    log::info!("[Listener] Nothing playing on this channel");
                }
                reconciler.mark_no_track();
            }
            Ok(PollEvent::Failed(error)) => {
                log::warn!("[Listener] Connection error: {}", error);
                reconciler.mark_poll_failed(error);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("[Listener] Poller stopped unexpectedly");
                break;
            }
        }
    }

    log::info!("[Listener] Shutting down");
    poller.shutdown();
    Ok(())
}

fn spawn_stdin_reader() -> std::sync::mpsc::Receiver<Command> {
    let (tx, rx) = channel();
    std::thread::spawn(move || read_commands(tx));
    rx
}

fn read_commands(tx: Sender<Command>) {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {
                let trimmed = line.trim();
                let command = if trimmed == "p" {
                    Some(Command::TogglePlay)
                } else if trimmed == "q" {
                    Some(Command::Quit)
                } else if let Some(raw) = trimmed.strip_prefix("c ") {
                    let name = raw.trim();
                    if name.is_empty() {
                        log::warn!("[Listener] Empty channel name");
                        None
                    } else {
                        Some(Command::Channel(name.to_string()))
                    }
                } else if let Some(raw) = trimmed.strip_prefix("v ") {
                    match raw.trim().parse::<f32>() {
                        Ok(percent) => Some(Command::Volume((percent / 100.0).clamp(0.0, 1.0))),
                        Err(_) => {
                            log::warn!("[Listener] Bad volume: {}", raw);
                            None
                        }
                    }
                } else if trimmed.is_empty() {
                    None
                } else {
                    log::warn!("[Listener] Unknown command: {}", trimmed);
                    None
                };
                if let Some(command) = command {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                log::error!("[Listener] Failed to read stdin: {}", e);
                break;
            }
        }
    }
}
