//! rodio-backed player for the headless listener.
//!
//! Tracks its own playhead the same way the server tracks the broadcast: a
//! start instant plus a start offset. Seeking rebuilds the sink from the
//! cached track bytes and skips into the stream, which keeps the decoder
//! stack simple at the cost of a short decode burst on each hard correction.

use std::io::Cursor;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::constants::TRACK_DOWNLOAD_TIMEOUT_SECS;
use crate::player::PlayerCursor;

static HTTP: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(TRACK_DOWNLOAD_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("[LocalPlayer] Falling back to default HTTP client: {}", e);
            reqwest::blocking::Client::new()
        })
});

pub struct LocalPlayer {
    sink: Option<Sink>,
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    /// Raw bytes of the loaded track, kept so seek can rebuild the decoder.
    track_bytes: Option<Vec<u8>>,
    /// Decoded duration when the container reports one; used to wrap the
    /// local playhead the way the server wraps the broadcast position.
    track_duration: Option<f64>,
    start_instant: Instant,
    start_offset: f64,
    paused_at: Option<f64>,
    volume: f32,
}

impl LocalPlayer {
    pub fn new(volume: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let (_stream, stream_handle) = OutputStream::try_default()?;
        Ok(Self {
            sink: None,
            _stream,
            stream_handle,
            track_bytes: None,
            track_duration: None,
            start_instant: Instant::now(),
            start_offset: 0.0,
            // Playback starts paused; the poll never flips this, only the user does.
            paused_at: Some(0.0),
            volume,
        })
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn has_source(&self) -> bool {
        self.track_bytes.is_some()
    }

    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(self.position());
            if let Some(sink) = &self.sink {
                sink.pause();
            }
            log::debug!("[LocalPlayer] Paused at {:.2}s", self.paused_at.unwrap_or(0.0));
        }
    }

    pub fn resume(&mut self) {
        if let Some(at) = self.paused_at.take() {
            self.start_offset = at;
            self.start_instant = Instant::now();
            if let Some(sink) = &self.sink {
                sink.play();
            }
            log::debug!("[LocalPlayer] Resumed from {:.2}s", at);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    /// Build a fresh sink over the cached bytes, skipped to `offset` seconds.
    /// The source repeats forever because the broadcast loops server-side.
    fn rebuild_sink(&mut self, offset: f64) {
        let Some(bytes) = self.track_bytes.clone() else {
            return;
        };
        if let Some(old) = self.sink.take() {
            old.stop();
        }

        let decoder = match Decoder::new(Cursor::new(bytes)) {
            Ok(d) => d,
            Err(e) => {
                log::error!("[LocalPlayer] Failed to decode track: {}", e);
                self.track_bytes = None;
                return;
            }
        };
        self.track_duration = decoder.total_duration().map(|d| d.as_secs_f64());

        let sink = match Sink::try_new(&self.stream_handle) {
            Ok(s) => s,
            Err(e) => {
                log::error!("[LocalPlayer] Failed to create audio sink: {}", e);
                return;
            }
        };
        sink.set_volume(self.volume);
        sink.append(
            decoder
                .repeat_infinite()
                .skip_duration(Duration::from_secs_f64(offset.max(0.0))),
        );

        let was_paused = self.paused_at.is_some();
        if was_paused {
            sink.pause();
            self.paused_at = Some(offset);
        } else {
            self.start_offset = offset;
            self.start_instant = Instant::now();
        }
        self.sink = Some(sink);
    }
}

impl PlayerCursor for LocalPlayer {
    fn load(&mut self, url: &str) {
        log::info!("[LocalPlayer] Loading track from {}", url);
        let bytes = match HTTP.get(url).send().and_then(|r| r.error_for_status()) {
            Ok(response) => match response.bytes() {
                Ok(b) => b.to_vec(),
                Err(e) => {
                    log::error!("[LocalPlayer] Failed to read track body: {}", e);
                    return;
                }
            },
            Err(e) => {
                log::error!("[LocalPlayer] Failed to download track: {}", e);
                return;
            }
        };
        log::debug!("[LocalPlayer] Downloaded {} bytes", bytes.len());

        self.track_bytes = Some(bytes);
        if self.paused_at.is_some() {
            self.paused_at = Some(0.0);
        }
        self.rebuild_sink(0.0);
    }

    fn position(&self) -> f64 {
        let raw = match self.paused_at {
            Some(at) => at,
            None => self.start_offset + self.start_instant.elapsed().as_secs_f64(),
        };
        match self.track_duration {
            Some(duration) if duration > 0.0 => raw % duration,
            _ => raw,
        }
    }

    fn seek(&mut self, seconds: f64) {
        if self.track_bytes.is_none() {
            return;
        }
        log::debug!("[LocalPlayer] Seeking to {:.2}s", seconds);
        self.rebuild_sink(seconds);
        if self.paused_at.is_some() {
            self.paused_at = Some(seconds);
        }
    }
}
