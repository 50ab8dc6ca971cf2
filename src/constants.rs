//! Application constants and configuration values

// === Sync Protocol ===
pub const SYNC_INTERVAL_SECS: u64 = 3;
pub const DRIFT_TOLERANCE_SECS: f64 = 0.5;
// Must stay shorter than the poll interval so stalled requests can't pile up
pub const POLL_TIMEOUT_SECS: u64 = 2;
pub const POLL_LOOP_TICK_MILLIS: u64 = 100;

// === Server ===
pub const DEFAULT_PORT: u16 = 3000;
pub const SERVER_WORKERS: usize = 4;
pub const STORE_SHARDS: usize = 16;
// Track admission payloads are a few hundred bytes of JSON; anything close
// to this limit is garbage and gets rejected before buffering
pub const MAX_TRACK_BODY_BYTES: usize = 100 * 1024;

// === Listener Playback ===
pub const DEFAULT_VOLUME: f32 = 0.5;
pub const TRACK_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
