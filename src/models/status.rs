use serde::{Deserialize, Serialize};

/// Payload of `GET /status/:channel`, the one message listeners poll.
///
/// `timestamp` is the current offset within the track in seconds, already
/// rounded to 2 decimals for the wire. `updated_at` is epoch seconds of the
/// read instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub track_id: String,
    pub track_url: String,
    pub timestamp: f64,
    pub is_playing: bool,
    pub updated_at: u64,
}
