// Local audio playback for the listener

pub mod local;

pub use local::LocalPlayer;

/// The reconciler's view of the local audio element.
///
/// Mirrors the handful of things a browser `<audio>` tag offers: swap the
/// source, read the playhead, jump the playhead. Implementations absorb
/// their own I/O failures (an overlay player has no one to report them to
/// beyond the log), so the interface stays infallible.
pub trait PlayerCursor {
    /// Hard-cut to a new source URL. The playhead restarts at zero.
    fn load(&mut self, url: &str);

    /// Local playhead in seconds, advancing on its own while playing.
    fn position(&self) -> f64;

    /// Jump the playhead to `seconds` into the track.
    fn seek(&mut self, seconds: f64);
}
