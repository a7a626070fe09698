//! End-of-utterance detection
//!
//! Decides when a capture session has heard a complete utterance using
//! RMS energy: speech starts when energy crosses a threshold and ends after
//! a stretch of trailing silence.

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the utterance detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating
    Speaking,
    /// Speech followed by enough silence
    Complete,
}

/// Accumulates one utterance from a stream of audio chunks
pub struct UtteranceDetector {
    state: DetectorState,
    speech_buffer: Vec<f32>,
    speech_samples: usize,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    /// Create a detector in the idle state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DetectorState::Idle,
            speech_buffer: Vec::new(),
            speech_samples: 0,
            silence_counter: 0,
        }
    }

    /// Process audio samples
    ///
    /// Returns true once the utterance is complete
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            DetectorState::Idle => {
                if is_speech {
                    self.state = DetectorState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.speech_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
            }
            DetectorState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.speech_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES
                    && self.speech_samples > MIN_SPEECH_SAMPLES
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    self.state = DetectorState::Complete;
                } else if self.silence_counter > SILENCE_SAMPLES * 2 {
                    // A click or cough, not speech
                    tracing::trace!("speech too short, resetting");
                    self.reset();
                }
            }
            DetectorState::Complete => {}
        }

        self.state == DetectorState::Complete
    }

    /// Whether any speech has been heard since the last reset
    #[must_use]
    pub const fn heard_speech(&self) -> bool {
        !matches!(self.state, DetectorState::Idle)
    }

    /// Check if the utterance is complete
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == DetectorState::Complete
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the speech buffer, resetting the detector
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        let buffer = std::mem::take(&mut self.speech_buffer);
        self.reset();
        buffer
    }

    /// Reset detector to idle state
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.speech_buffer.clear();
        self.speech_samples = 0;
        self.silence_counter = 0;
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);

        assert!(calculate_energy(&[]) < f32::EPSILON);
    }

    #[test]
    fn test_short_noise_resets() {
        let mut detector = UtteranceDetector::new();

        // 0.1s click, then a full second of silence
        detector.process(&[0.5f32; 1600]);
        assert_eq!(detector.state(), DetectorState::Speaking);

        for _ in 0..11 {
            assert!(!detector.process(&[0.0f32; 1600]));
        }
        assert_eq!(detector.state(), DetectorState::Idle);
        assert!(detector.speech_buffer().is_empty());
    }
}
