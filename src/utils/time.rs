use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock time in epoch milliseconds.
///
/// Playback math only ever subtracts instants recorded by this same server
/// process, so wall clock (rather than monotonic) time is fine here and
/// matches what goes out on the wire in `updated_at`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Format seconds as M:SS for the listener display.
pub fn format_track_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_zero() {
        assert_eq!(format_track_time(0.0), "0:00");
    }

    #[test]
    fn test_format_with_fraction() {
        assert_eq!(format_track_time(65.7), "1:05");
    }

    #[test]
    fn test_format_long_track() {
        assert_eq!(format_track_time(3600.0), "60:00");
    }

    #[test]
    fn test_format_negative_clamps() {
        assert_eq!(format_track_time(-3.0), "0:00");
    }
}
