//! Voice processing module
//!
//! Microphone capture for spoken answers and playback of synthesized
//! assistant speech. Transcription happens on the session service.

mod capture;
mod playback;

pub use capture::{samples_to_wav, AudioRecorder, RecordedAudio, SAMPLE_RATE};
pub use playback::{play_samples, SpeechPlayer};
