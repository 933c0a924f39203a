use super::runtime_error::{ErrorKind, RuntimeError};
use std::cell::Cell;
use std::rc::Rc;

/// Tempo shared between the scheduler and the commands that convert beats.
pub type SharedTempo = Rc<Cell<Tempo>>;

/// Conversion between beats, the unit of virtual time, and wall-clock or
/// audio-sample time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: f64,
    pub sample_rate: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            bpm: 120.0,
            sample_rate: 44_100.0,
        }
    }
}

impl Tempo {
    pub fn new(bpm: f64, sample_rate: f64) -> Self {
        Tempo { bpm, sample_rate }
    }

    /// Reject tempos that would stall or reverse virtual time.
    pub fn validate(self) -> Result<Self, RuntimeError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(RuntimeError::new(
                ErrorKind::Config,
                format!("bpm must be a positive number, got {}", self.bpm),
            ));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(RuntimeError::new(
                ErrorKind::Config,
                format!("sample rate must be a positive number, got {}", self.sample_rate),
            ));
        }
        Ok(self)
    }

    /// How far virtual time moves per audio sample.
    pub fn beats_per_sample(&self) -> f64 {
        self.bpm / (60.0 * self.sample_rate)
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.sample_rate * self.seconds_per_beat()
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.seconds_per_beat()
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.bpm / 60.0
    }

    pub fn samples_to_beats(&self, samples: f64) -> f64 {
        samples * self.beats_per_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_beats_per_sample() {
        let tempo = Tempo::new(120.0, 48_000.0);
        assert!(close(tempo.beats_per_sample(), 120.0 / (60.0 * 48_000.0)));
        assert!(close(tempo.samples_to_beats(24_000.0), 1.0));
    }

    #[test]
    fn test_seconds_and_beats() {
        let tempo = Tempo::default();
        assert!(close(tempo.seconds_per_beat(), 0.5));
        assert!(close(tempo.beats_to_seconds(4.0), 2.0));
        assert!(close(tempo.seconds_to_beats(2.0), 4.0));
        assert!(close(tempo.samples_per_beat(), 22_050.0));
    }

    #[test]
    fn test_validate_rejects_stalled_clock() {
        assert!(Tempo::default().validate().is_ok());
        for (bpm, sr) in [(0.0, 44_100.0), (-60.0, 44_100.0), (f64::NAN, 44_100.0), (120.0, 0.0)] {
            let err = Tempo::new(bpm, sr).validate().unwrap_err();
            assert_eq!(err.kind, ErrorKind::Config);
        }
    }
}
