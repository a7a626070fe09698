//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;

use genie_voice::voice::{DetectorState, SAMPLE_RATE, UtteranceDetector, samples_to_wav};
use genie_voice::{Voice, select_voice};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

#[test]
fn test_detector_starts_idle() {
    let detector = UtteranceDetector::new();

    assert_eq!(detector.state(), DetectorState::Idle);
    assert!(!detector.heard_speech());
    assert!(!detector.is_complete());
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_speech_activity_detection() {
    let mut detector = UtteranceDetector::new();

    // Silent samples - should not trigger
    let silence = generate_silence(0.1);
    assert!(!detector.process(&silence));
    assert_eq!(detector.state(), DetectorState::Idle);

    // Loud samples - should start accumulating
    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert!(!detector.process(&speech));
    assert_eq!(detector.state(), DetectorState::Speaking);
    assert!(detector.heard_speech());

    // Trailing silence completes the utterance
    let silence = generate_silence(0.6);
    assert!(detector.process(&silence));
    assert!(detector.is_complete());
}

#[test]
fn test_short_pause_does_not_complete() {
    let mut detector = UtteranceDetector::new();

    detector.process(&generate_sine_samples(440.0, 0.5, 0.3));
    assert!(!detector.process(&generate_silence(0.2)));
    assert!(!detector.process(&generate_sine_samples(440.0, 0.3, 0.3)));
    assert_eq!(detector.state(), DetectorState::Speaking);
}

#[test]
fn test_speech_buffer_accumulation() {
    let mut detector = UtteranceDetector::new();

    let chunk1 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk1);

    let chunk2 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk2);

    // Buffer should contain both chunks
    let buffer = detector.speech_buffer();
    assert_eq!(buffer.len(), chunk1.len() + chunk2.len());
}

#[test]
fn test_take_speech_buffer() {
    let mut detector = UtteranceDetector::new();

    let speech = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&speech);

    let taken = detector.take_speech_buffer();
    assert_eq!(taken.len(), speech.len());

    // Buffer should be empty after take
    assert!(detector.speech_buffer().is_empty());
    assert_eq!(detector.state(), DetectorState::Idle);
}

#[test]
fn test_completed_detector_ignores_more_audio() {
    let mut detector = UtteranceDetector::new();

    detector.process(&generate_sine_samples(440.0, 0.5, 0.3));
    detector.process(&generate_silence(0.6));
    let len = detector.speech_buffer().len();

    assert!(detector.process(&generate_sine_samples(440.0, 0.2, 0.3)));
    assert_eq!(detector.speech_buffer().len(), len);
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    // Read WAV back
    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    // Read samples back
    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
    assert_eq!(read_samples[0], 0);
    assert!(read_samples[3] > 32000);
}

#[test]
fn test_voice_selection_uses_language_prefix() {
    let voices = vec![
        Voice::new("lea", "fr-FR"),
        Voice::new("nova", "en-US"),
        Voice::new("priya", "en-IN"),
    ];

    assert_eq!(select_voice(&voices, "en").map(|v| v.name.as_str()), Some("nova"));
    assert_eq!(select_voice(&voices, "en-IN").map(|v| v.name.as_str()), Some("priya"));
    assert_eq!(select_voice(&voices, "de").map(|v| v.name.as_str()), Some("lea"));
}
