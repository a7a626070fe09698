//! Microphone input stream
//!
//! Opens the default input device as a 16 kHz mono stream and hands its
//! audio over as raw chunks. How chunks are framed and when to stop listening
//! is up to the consumer.

use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Capture sample rate, what the STT backends expect
pub const SAMPLE_RATE: u32 = 16000;

fn default_input() -> Option<Device> {
    cpal::default_host().default_input_device()
}

/// Whether the host exposes a default input device
#[must_use]
pub fn input_device_available() -> bool {
    default_input().is_some()
}

/// First mono input config that can run at [`SAMPLE_RATE`]
fn mono_config(device: &Device) -> Result<StreamConfig> {
    let rate = SampleRate(SAMPLE_RATE);

    device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| c.channels() == 1 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
        .map(|c| c.with_sample_rate(rate).config())
        .ok_or_else(|| Error::Audio("input device has no 16 kHz mono mode".to_string()))
}

/// A running microphone stream
///
/// Recording stops when the value is dropped. The underlying `cpal::Stream`
/// is not `Send`, so open and consume it on one thread.
pub struct AudioCapture {
    _stream: Stream,
    chunks: Receiver<Vec<f32>>,
}

impl AudioCapture {
    /// Open the default input device and start recording
    ///
    /// # Errors
    ///
    /// Returns error if there is no usable input device or the stream fails to start
    pub fn open() -> Result<Self> {
        let device =
            default_input().ok_or_else(|| Error::Audio("no input device available".to_string()))?;
        let config = mono_config(&device)?;

        let (tx, chunks) = mpsc::channel();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Receiver gone means the capture is being torn down
                    let _ = tx.send(data.to_vec());
                },
                |err| tracing::error!(error = %err, "audio capture error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone open"
        );

        Ok(Self {
            _stream: stream,
            chunks,
        })
    }

    /// Wait up to `timeout` for the next chunk from the device
    #[must_use]
    pub fn next_chunk(&self, timeout: Duration) -> Option<Vec<f32>> {
        match self.chunks.recv_timeout(timeout) {
            Ok(chunk) => Some(chunk),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("microphone stream closed");
                None
            }
        }
    }

    /// Record for `window` and return everything heard
    #[must_use]
    pub fn record_for(&self, window: Duration) -> Vec<f32> {
        let deadline = Instant::now() + window;
        let mut samples = Vec::new();

        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            if let Some(chunk) = self.next_chunk(left) {
                samples.extend_from_slice(&chunk);
            }
        }

        samples
    }
}

/// Scale a float sample to 16-bit PCM, clipping out-of-range input
#[allow(clippy::cast_possible_truncation)]
fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Encode mono samples as a 16-bit PCM WAV file, the upload format for STT
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut wav, spec)?;
    for &sample in samples {
        writer.write_sample(to_pcm16(sample))?;
    }
    writer.finalize()?;

    Ok(wav.into_inner())
}
