//! Drift reconciliation: apply one poll result to the local player.
//!
//! The server's answer is only ever "where the track should be", never
//! "whether your speaker should be on": play/pause stays under local user
//! control, and the reconciler limits itself to three moves - load a new
//! track, jump a badly drifted playhead, or leave a slightly drifted one
//! alone so network jitter doesn't turn into constant micro-corrections.

use crate::constants::DRIFT_TOLERANCE_SECS;
use crate::models::StatusResponse;
use crate::player::PlayerCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No channel identity yet; polls are no-ops.
    Unsynced,
    /// Identity known, nothing received yet.
    Idle,
    /// Last poll landed and was applied.
    Synced,
    /// Last poll failed; previous track/offset data retained for display.
    Error,
}

#[derive(Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// Different track reported: source reloaded, hard cut.
    TrackChanged { track_id: String },
    /// Drift beyond tolerance: playhead jumped to the reported offset.
    Corrected { drift: f64 },
    /// Within tolerance: local clock keeps running untouched.
    InSync { drift: f64 },
}

pub struct Reconciler {
    phase: SyncPhase,
    channel: Option<String>,
    current_track_id: Option<String>,
    last_status: Option<StatusResponse>,
    last_error: Option<String>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            phase: SyncPhase::Unsynced,
            channel: None,
            current_track_id: None,
            last_status: None,
            last_error: None,
        }
    }

    /// Identity arrives asynchronously from the host; until then the poller
    /// skips ticks and we stay `Unsynced`.
    pub fn set_channel(&mut self, channel: String) {
        log::info!("[Reconciler] Channel identity: {}", channel);
        self.channel = Some(channel);
        if self.phase == SyncPhase::Unsynced {
            self.phase = SyncPhase::Idle;
        }
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track_id.as_deref()
    }

    /// Last good payload, retained across poll failures for display.
    pub fn last_status(&self) -> Option<&StatusResponse> {
        self.last_status.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one successful poll to the local cursor.
    pub fn apply_status(
        &mut self,
        status: StatusResponse,
        cursor: &mut dyn PlayerCursor,
    ) -> ReconcileOutcome {
        let outcome = if self.current_track_id.as_deref() != Some(status.track_id.as_str()) {
            log::info!("[Reconciler] Loading new track: {}", status.track_id);
            cursor.load(&status.track_url);
            self.current_track_id = Some(status.track_id.clone());
            ReconcileOutcome::TrackChanged {
                track_id: status.track_id.clone(),
            }
        } else {
            let drift = (cursor.position() - status.timestamp).abs();
            if drift > DRIFT_TOLERANCE_SECS {
                log::info!("[Reconciler] Correcting drift: {:.2}s", drift);
                cursor.seek(status.timestamp);
                ReconcileOutcome::Corrected { drift }
            } else {
                ReconcileOutcome::InSync { drift }
            }
        };

        self.phase = SyncPhase::Synced;
        self.last_error = None;
        self.last_status = Some(status);
        outcome
    }

    /// The channel exists but has no track selected. Neutral state, no
    /// faster retry, the loaded source (if any) is left alone.
    pub fn mark_no_track(&mut self) {
        self.phase = SyncPhase::Synced;
        self.last_status = None;
        self.last_error = None;
    }

    /// A poll failed. Sync state is untouched; only the visible indicator
    /// changes, and the next good poll recovers on its own.
    pub fn mark_poll_failed(&mut self, error: impl Into<String>) {
        self.phase = SyncPhase::Error;
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCursor {
        position: f64,
        loads: Vec<String>,
        seeks: Vec<f64>,
    }

    impl FakeCursor {
        fn at(position: f64) -> Self {
            Self {
                position,
                loads: Vec::new(),
                seeks: Vec::new(),
            }
        }
    }

    impl PlayerCursor for FakeCursor {
        fn load(&mut self, url: &str) {
            self.loads.push(url.to_string());
            self.position = 0.0;
        }

        fn position(&self) -> f64 {
            self.position
        }

        fn seek(&mut self, seconds: f64) {
            self.seeks.push(seconds);
            self.position = seconds;
        }
    }

    fn status(track_id: &str, timestamp: f64) -> StatusResponse {
        StatusResponse {
            track_id: track_id.to_string(),
            track_url: format!("https://cdn.example.com/audio/{}.mp3", track_id),
            timestamp,
            is_playing: true,
            updated_at: 1_700_000_000,
        }
    }

    fn synced_reconciler(track_id: &str) -> (Reconciler, FakeCursor) {
        let mut reconciler = Reconciler::new();
        reconciler.set_channel("chan".to_string());
        let mut cursor = FakeCursor::at(0.0);
        reconciler.apply_status(status(track_id, 0.0), &mut cursor);
        (reconciler, cursor)
    }

    #[test]
    fn test_small_drift_is_left_alone() {
        let (mut reconciler, mut cursor) = synced_reconciler("a");
        cursor.position = 10.0;
        let outcome = reconciler.apply_status(status("a", 10.3), &mut cursor);
        match outcome {
            ReconcileOutcome::InSync { drift } => assert!((drift - 0.3).abs() < 1e-9),
            other => panic!("expected InSync, got {:?}", other),
        }
        assert!(cursor.seeks.is_empty());
        assert_eq!(cursor.position, 10.0);
    }

    #[test]
    fn test_large_drift_is_hard_corrected() {
        let (mut reconciler, mut cursor) = synced_reconciler("a");
        cursor.position = 10.0;
        let outcome = reconciler.apply_status(status("a", 12.0), &mut cursor);
        match outcome {
            ReconcileOutcome::Corrected { drift } => assert!((drift - 2.0).abs() < 1e-9),
            other => panic!("expected Corrected, got {:?}", other),
        }
        assert_eq!(cursor.seeks, vec![12.0]);
        assert_eq!(cursor.position, 12.0);
    }

    #[test]
    fn test_track_change_reloads_regardless_of_drift() {
        let (mut reconciler, mut cursor) = synced_reconciler("a");
        cursor.position = 10.0;
        // offset happens to match exactly, the reload must still happen
        let outcome = reconciler.apply_status(status("b", 10.0), &mut cursor);
        assert_eq!(
            outcome,
            ReconcileOutcome::TrackChanged {
                track_id: "b".to_string()
            }
        );
        assert_eq!(cursor.loads.len(), 2);
        assert_eq!(reconciler.current_track_id(), Some("b"));
    }

    #[test]
    fn test_first_status_loads_track() {
        let mut reconciler = Reconciler::new();
        reconciler.set_channel("chan".to_string());
        assert_eq!(reconciler.phase(), SyncPhase::Idle);
        let mut cursor = FakeCursor::at(0.0);
        reconciler.apply_status(status("a", 33.0), &mut cursor);
        assert_eq!(cursor.loads, vec!["https://cdn.example.com/audio/a.mp3".to_string()]);
        assert_eq!(reconciler.phase(), SyncPhase::Synced);
    }

    #[test]
    fn test_poll_failure_preserves_sync_state() {
        let (mut reconciler, _cursor) = synced_reconciler("a");
        let status_before = reconciler.last_status().cloned();
        reconciler.mark_poll_failed("HTTP 502");
        assert_eq!(reconciler.phase(), SyncPhase::Error);
        assert_eq!(reconciler.last_error(), Some("HTTP 502"));
        assert_eq!(reconciler.last_status().cloned(), status_before);
        assert_eq!(reconciler.current_track_id(), Some("a"));
    }

    #[test]
    fn test_recovery_after_failure_needs_no_special_step() {
        let (mut reconciler, mut cursor) = synced_reconciler("a");
        reconciler.mark_poll_failed("connection refused");
        cursor.position = 20.0;
        let outcome = reconciler.apply_status(status("a", 20.1), &mut cursor);
        assert!(matches!(outcome, ReconcileOutcome::InSync { .. }));
        assert_eq!(reconciler.phase(), SyncPhase::Synced);
        assert_eq!(reconciler.last_error(), None);
    }

    #[test]
    fn test_no_track_is_neutral() {
        let (mut reconciler, cursor) = synced_reconciler("a");
        reconciler.mark_no_track();
        assert_eq!(reconciler.phase(), SyncPhase::Synced);
        assert_eq!(reconciler.last_status(), None);
        // the loaded source is left alone
        assert_eq!(cursor.loads.len(), 1);
        assert_eq!(reconciler.current_track_id(), Some("a"));
    }

    #[test]
    fn test_identity_promotes_unsynced_to_idle_once() {
        let mut reconciler = Reconciler::new();
        assert_eq!(reconciler.phase(), SyncPhase::Unsynced);
        assert_eq!(reconciler.channel(), None);
        reconciler.set_channel("chan".to_string());
        assert_eq!(reconciler.phase(), SyncPhase::Idle);
        assert_eq!(reconciler.channel(), Some("chan"));
        let mut cursor = FakeCursor::at(0.0);
        reconciler.apply_status(status("a", 0.0), &mut cursor);
        reconciler.set_channel("chan".to_string());
        // a repeated identity callback must not drop us back to Idle
        assert_eq!(reconciler.phase(), SyncPhase::Synced);
    }
}
