//! Playback position math.
//!
//! Pure functions over a playback record snapshot; the store calls these
//! under its per-channel lock, status reads never mutate anything.

/// Current offset within the track, in seconds.
///
/// While playing the offset is elapsed-since-anchor wrapped by the track
/// duration, so the broadcast loops forever. While paused it is exactly 0:
/// pausing resets the shared position to the top of the track rather than
/// freezing it, and resuming re-anchors `start_time`. Listeners rely on
/// this exact behavior, keep it.
///
/// `duration_secs` must be positive; the track library guarantees that
/// before a track can ever be selected.
pub fn track_offset(is_playing: bool, start_time_ms: u64, duration_secs: f64, now_ms: u64) -> f64 {
    if !is_playing {
        return 0.0;
    }
    let elapsed = now_ms.saturating_sub(start_time_ms) as f64 / 1000.0;
    elapsed % duration_secs
}

/// Round to 2 decimals for the wire. Presentation only, internal math keeps
/// full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
