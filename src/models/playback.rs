use serde::{Deserialize, Serialize};

/// Per-channel playback state.
///
/// `start_time` (epoch milliseconds) marks when the current play segment
/// began. It is re-anchored to "now" whenever a new track is switched in,
/// playback resumes from pause, or a play call restarts the track. While
/// paused the broadcast position reads as zero; there is no accumulated
/// offset field (see `position::track_offset`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackRecord {
    pub current_track_id: Option<String>,
    pub start_time: u64,
    pub is_playing: bool,
}
