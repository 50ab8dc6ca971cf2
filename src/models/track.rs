use serde::{Deserialize, Serialize};

/// One entry in a channel's track library.
///
/// `duration` is the loop modulus for position math, so it has to be a
/// positive finite number of seconds. That gets checked once, when the track
/// is admitted to the library, never at status time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub url: String,
    pub duration: f64,
}

impl Track {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("track id must not be empty".to_string());
        }
        if self.url.trim().is_empty() {
            return Err("track url must not be empty".to_string());
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(format!(
                "track duration must be a positive number of seconds, got {}",
                self.duration
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(duration: f64) -> Track {
        Track {
            id: "example_01".to_string(),
            url: "https://cdn.example.com/audio/example_01.mp3".to_string(),
            duration,
        }
    }

    #[test]
    fn test_valid_track() {
        assert!(track(120.0).validate().is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(track(0.0).validate().is_err());
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(track(-10.0).validate().is_err());
    }

    #[test]
    fn test_nan_duration_rejected() {
        assert!(track(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut t = track(120.0);
        t.id = "  ".to_string();
        assert!(t.validate().is_err());
    }
}
