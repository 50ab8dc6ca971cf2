//! Per-channel playback state and track library.
//!
//! Channels are fully independent, so the map is sharded: a status read on
//! one channel never waits on a track switch for another (different shards),
//! and racing operations on the same channel serialize on one shard lock so
//! a reader can't observe a torn `start_time`/`is_playing` pair.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::constants::STORE_SHARDS;
use crate::models::{PlaybackRecord, StatusResponse, Track};
use crate::position;
use crate::utils::error_handling::lock_or_recover;

#[derive(Debug, PartialEq)]
pub enum StoreError {
    /// No track selected for the channel (or the channel has never been seen).
    NoActiveTrack,
    /// Track id not present in the channel's library.
    UnknownTrack(String),
    /// Track rejected at admission time.
    InvalidTrack(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoActiveTrack => write!(f, "no active track"),
            StoreError::UnknownTrack(id) => write!(f, "unknown track: {}", id),
            StoreError::InvalidTrack(reason) => write!(f, "invalid track: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Default)]
struct ChannelState {
    tracks: HashMap<String, Track>,
    record: PlaybackRecord,
}

/// Sharded map of channel id -> playback state.
pub struct PlaybackStore {
    shards: Vec<Mutex<HashMap<String, ChannelState>>>,
}

impl Default for PlaybackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackStore {
    pub fn new() -> Self {
        Self {
            shards: (0..STORE_SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, channel: &str) -> &Mutex<HashMap<String, ChannelState>> {
        let mut hasher = DefaultHasher::new();
        channel.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Snapshot of "where the track is right now" for one channel.
    ///
    /// Pure read: two calls with the same `now_ms` return the same payload.
    pub fn status(&self, channel: &str, now_ms: u64) -> Result<StatusResponse, StoreError> {
        let guard = lock_or_recover(self.shard(channel), "PlaybackStore");
        let state = guard.get(channel).ok_or(StoreError::NoActiveTrack)?;
        let track_id = state
            .record
            .current_track_id
            .as_deref()
            .ok_or(StoreError::NoActiveTrack)?;
        let track = state.tracks.get(track_id).ok_or(StoreError::NoActiveTrack)?;

        let offset = position::track_offset(
            state.record.is_playing,
            state.record.start_time,
            track.duration,
            now_ms,
        );

        Ok(StatusResponse {
            track_id: track.id.clone(),
            track_url: track.url.clone(),
            timestamp: position::round2(offset),
            is_playing: state.record.is_playing,
            updated_at: now_ms / 1000,
        })
    }

    /// Select a track and restart the elapsed-time anchor.
    ///
    /// Switching never flips `is_playing`: an admin who wants the new track
    /// audible on a paused channel still has to call play separately.
    pub fn switch_track(&self, channel: &str, track_id: &str, now_ms: u64) -> Result<(), StoreError> {
        let mut guard = lock_or_recover(self.shard(channel), "PlaybackStore");
        let state = guard
            .get_mut(channel)
            .ok_or_else(|| StoreError::UnknownTrack(track_id.to_string()))?;
        if !state.tracks.contains_key(track_id) {
            return Err(StoreError::UnknownTrack(track_id.to_string()));
        }
        state.record.current_track_id = Some(track_id.to_string());
        state.record.start_time = now_ms;
        log::info!("[PlaybackStore] Channel {} switched to track {}", channel, track_id);
        Ok(())
    }

    /// Flip the broadcast play flag.
    ///
    /// Every play call re-anchors `start_time`, so play doubles as "restart
    /// from the top". Pause only clears the flag; the position the listeners
    /// see drops to zero by construction.
    pub fn set_playing(&self, channel: &str, playing: bool, now_ms: u64) {
        let mut guard = lock_or_recover(self.shard(channel), "PlaybackStore");
        let record = &mut guard.entry(channel.to_string()).or_default().record;
        if playing {
            record.start_time = now_ms;
        }
        record.is_playing = playing;
        log::info!(
            "[PlaybackStore] Channel {} {}",
            channel,
            if playing { "playing" } else { "paused" }
        );
    }

    /// Admit a track to the channel's library (upsert by id).
    pub fn add_track(&self, channel: &str, track: Track) -> Result<(), StoreError> {
        track.validate().map_err(StoreError::InvalidTrack)?;
        let mut guard = lock_or_recover(self.shard(channel), "PlaybackStore");
        let state = guard.entry(channel.to_string()).or_default();
        log::debug!(
            "[PlaybackStore] Channel {} admitted track {} ({}s)",
            channel,
            track.id,
            track.duration
        );
        state.tracks.insert(track.id.clone(), track);
        Ok(())
    }

    /// Drop a track from the library. If it was the selected track the
    /// channel goes back to "nothing playing".
    pub fn remove_track(&self, channel: &str, track_id: &str) -> Result<(), StoreError> {
        let mut guard = lock_or_recover(self.shard(channel), "PlaybackStore");
        let state = guard
            .get_mut(channel)
            .ok_or_else(|| StoreError::UnknownTrack(track_id.to_string()))?;
        state
            .tracks
            .remove(track_id)
            .ok_or_else(|| StoreError::UnknownTrack(track_id.to_string()))?;
        if state.record.current_track_id.as_deref() == Some(track_id) {
            state.record.current_track_id = None;
        }
        Ok(())
    }

    /// Library listing for the admin surface, sorted for stable output.
    pub fn list_tracks(&self, channel: &str) -> Vec<Track> {
        let guard = lock_or_recover(self.shard(channel), "PlaybackStore");
        let mut tracks: Vec<Track> = guard
            .get(channel)
            .map(|state| state.tracks.values().cloned().collect())
            .unwrap_or_default();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        tracks
    }
}
