//! Environment-driven configuration. A `.env` file is honored when present
//! (loaded by the binaries before these readers run).

use crate::constants::{DEFAULT_PORT, DEFAULT_VOLUME, SERVER_WORKERS};

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("[Config] Ignoring unparseable {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parsed("PORT", DEFAULT_PORT),
            workers: env_parsed("MUSYNC_WORKERS", SERVER_WORKERS).max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub server_url: String,
    /// May be absent at startup; the host context can deliver it later.
    pub channel: Option<String>,
    pub volume: f32,
}

impl ListenerConfig {
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var("MUSYNC_SERVER_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", DEFAULT_PORT)),
            channel: std::env::var("MUSYNC_CHANNEL").ok().filter(|c| !c.is_empty()),
            volume: env_parsed("MUSYNC_VOLUME", DEFAULT_VOLUME).clamp(0.0, 1.0),
        }
    }
}
