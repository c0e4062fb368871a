//! Assistant speech playback
//!
//! Holds at most one "latest" speech artifact. A newer artifact always
//! supersedes and interrupts the previous one. Playback failures (missing
//! output device, blocked autoplay) are swallowed: the artifact stays
//! available for manual replay and nothing reaches the conversation log.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Generation value meaning "nobody is speaking"
const NOT_SPEAKING: u64 = 0;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use crate::{Error, Result};

/// Sample rate of synthesized speech (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Poll interval while waiting for playback to end
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays the most recent assistant speech artifact
#[derive(Default)]
pub struct SpeechPlayer {
    latest: Mutex<Option<Arc<Vec<u8>>>>,
    generation: Arc<AtomicU64>,
    /// Generation currently speaking, or [`NOT_SPEAKING`]
    speaking: Arc<AtomicU64>,
}

impl SpeechPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest artifact and start playing it, interrupting any
    /// playback already in progress.
    pub fn set_latest(&self, mp3: Vec<u8>) {
        let data = Arc::new(mp3);
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(Arc::clone(&data));
        }
        self.spawn_playback(data);
    }

    /// Replay the latest artifact. A no-op if none has arrived yet.
    pub fn replay(&self) {
        let data = self.latest.lock().ok().and_then(|l| l.clone());
        if let Some(data) = data {
            self.spawn_playback(data);
        }
    }

    /// Whether an artifact is available for replay
    #[must_use]
    pub fn has_latest(&self) -> bool {
        self.latest.lock().map(|l| l.is_some()).unwrap_or(false)
    }

    /// Whether speech is audibly playing right now
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst) != NOT_SPEAKING
    }

    fn spawn_playback(&self, data: Arc<Vec<u8>>) {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let speaking = Arc::clone(&self.speaking);

        std::thread::spawn(move || {
            if let Err(e) = play_mp3_blocking(&data, my_generation, &generation, &speaking) {
                // playback problems are never surfaced to the conversation
                tracing::debug!(error = %e, "speech playback unavailable, skipping");
            }
        });
    }
}

/// Clears the speaking slot on every exit path, but only while it still
/// belongs to this playback. A superseded thread must not wipe the newer
/// playback's indicator.
struct SpeakingGuard {
    mine: u64,
    slot: Arc<AtomicU64>,
}

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        let _ = self.slot.compare_exchange(
            self.mine,
            NOT_SPEAKING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

fn play_mp3_blocking(
    mp3: &[u8],
    my_generation: u64,
    generation: &AtomicU64,
    speaking: &Arc<AtomicU64>,
) -> Result<()> {
    let samples = decode_mp3(mp3)?;
    run_output_stream(
        samples,
        Some((my_generation, generation)),
        Some((my_generation, speaking)),
    )
}

/// Play raw f32 samples to the default output device, blocking until done.
/// Used by the speaker diagnostic.
///
/// # Errors
///
/// Returns error if no output device is available or the stream fails.
pub fn play_samples(samples: Vec<f32>) -> Result<()> {
    run_output_stream(samples, None, None)
}

fn run_output_stream(
    samples: Vec<f32>,
    supersede: Option<(u64, &AtomicU64)>,
    speaking: Option<(u64, &Arc<AtomicU64>)>,
) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .or_else(|| {
            // fallback: stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
        })
        .ok_or_else(|| Error::Playback("no suitable output config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    let sample_count = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(AtomicBool::new(false));

    let samples_cb = Arc::clone(&samples);
    let position_cb = Arc::clone(&position);
    let finished_cb = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut pos) = position_cb.lock() else {
                    return;
                };
                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples_cb.len() {
                        samples_cb[*pos]
                    } else {
                        finished_cb.store(true, Ordering::SeqCst);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                    if *pos < samples_cb.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::debug!(error = %err, "speech playback stream error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    let _guard = speaking.map(|(mine, slot)| {
        slot.store(mine, Ordering::SeqCst);
        SpeakingGuard {
            mine,
            slot: Arc::clone(slot),
        }
    });

    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let timeout = Duration::from_millis(duration_ms + 500);
    let start = std::time::Instant::now();

    while !finished.load(Ordering::SeqCst) {
        // a newer artifact supersedes this playback
        if let Some((mine, current)) = supersede {
            if current.load(Ordering::SeqCst) != mine {
                tracing::debug!("speech playback superseded");
                return Ok(());
            }
        }
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    drop(stream);
    tracing::debug!(samples = sample_count, "speech playback complete");
    Ok(())
}

/// Decode MP3 bytes to f32 samples (stereo averaged to mono)
fn decode_mp3(mp3: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();
    let mut any_frame = false;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                any_frame = true;
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        (left + right) / 2.0
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if !any_frame {
        return Err(Error::Playback("no decodable MP3 frames".to_string()));
    }
    Ok(samples)
}
