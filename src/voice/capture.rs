//! Microphone capture
//!
//! One capture session per start/stop cycle: the device stream is acquired on
//! `start`, chunks accumulate while recording, and `stop` assembles them into
//! a single WAV artifact and releases the device on every path.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for microphone capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// A finished recording, ready for submission
#[derive(Debug, Clone)]
pub struct RecordedAudio {
    /// WAV-encoded audio (16-bit PCM mono)
    pub wav: Vec<u8>,

    /// Recording length in seconds
    pub duration_secs: u64,
}

/// Live capture state; owns the device stream for exactly one cycle
struct CaptureSession {
    stream: Stream,
    buffer: Arc<Mutex<Vec<f32>>>,
    started: Instant,
}

/// Records audio from the default input device
#[derive(Default)]
pub struct AudioRecorder {
    session: Option<CaptureSession>,
}

impl AudioRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording. A no-op if already recording.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if no input device is available or the stream
    /// cannot be opened; the recorder stays idle in that case.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let callback_buffer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = callback_buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "recording started"
        );

        self.session = Some(CaptureSession {
            stream,
            buffer,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Stop recording and assemble the artifact.
    ///
    /// Releases the device stream unconditionally, even if WAV assembly
    /// fails. Returns `None` when called while idle.
    pub fn stop(&mut self) -> Option<Result<RecordedAudio>> {
        let session = self.session.take()?;

        // dropping the stream releases the device
        drop(session.stream);

        let samples = session
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();
        let duration_secs = session.started.elapsed().as_secs();

        tracing::debug!(samples = samples.len(), duration_secs, "recording stopped");

        Some(samples_to_wav(&samples, SAMPLE_RATE).map(|wav| RecordedAudio { wav, duration_secs }))
    }

    /// Whether a recording is in progress
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Copy of the samples captured so far (empty while idle). Used by the
    /// microphone diagnostic meter.
    #[must_use]
    pub fn peek_samples(&self) -> Vec<f32> {
        self.session
            .as_ref()
            .and_then(|s| s.buffer.lock().ok().map(|buf| buf.clone()))
            .unwrap_or_default()
    }

    /// Seconds elapsed since recording started, `None` while idle
    #[must_use]
    pub fn elapsed_secs(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.started.elapsed().as_secs())
    }
}

/// Convert f32 samples to WAV bytes for submission
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

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_while_idle_is_a_noop() {
        let mut recorder = AudioRecorder::new();
        assert!(!recorder.is_recording());
        assert!(recorder.stop().is_none());
        assert!(recorder.elapsed_secs().is_none());
    }

    #[test]
    fn wav_assembly_roundtrip() {
        let samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.channels, 1);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read.len(), samples.len());
    }

    #[test]
    fn wav_clamps_out_of_range_samples() {
        let wav = samples_to_wav(&[2.0, -2.0], SAMPLE_RATE).unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![i16::MAX, i16::MIN]);
    }
}
