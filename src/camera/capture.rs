//! Camera capture lifecycle
//!
//! `Closed -> Live -> Captured -> {Closed (confirm) | Live (retake)}`. The
//! live stream is kept across `capture` so a retake costs nothing; `confirm`
//! and `close` release it.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use super::{CameraBackend, CameraFacing, CameraStream};
use crate::{Error, Result};

/// Capture lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Closed,
    Live,
    Captured,
}

/// A confirmed still image, ready for upload
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    /// Generated filename for the upload part
    pub filename: String,

    /// JPEG-encoded image
    pub jpeg: Vec<u8>,

    pub width: u32,
    pub height: u32,
}

/// Owns the camera stream across one open/close cycle
pub struct VideoCapture {
    backend: Box<dyn CameraBackend>,
    jpeg_quality: u8,
    stream: Option<Box<dyn CameraStream>>,
    shot: Option<CapturedPhoto>,
    shot_seq: u32,
}

impl VideoCapture {
    #[must_use]
    pub fn new(backend: Box<dyn CameraBackend>, jpeg_quality: u8) -> Self {
        Self {
            backend,
            jpeg_quality,
            stream: None,
            shot: None,
            shot_seq: 0,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> CameraState {
        if self.shot.is_some() {
            CameraState::Captured
        } else if self.stream.is_some() {
            CameraState::Live
        } else {
            CameraState::Closed
        }
    }

    /// Facing mode of the live stream, if any
    #[must_use]
    pub fn facing(&self) -> Option<CameraFacing> {
        self.stream.as_ref().map(|s| s.facing())
    }

    /// Acquire the camera and go live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Camera`] if acquisition fails; the manager stays
    /// `Closed` so the caller can show a dismissible notice.
    pub fn open(&mut self, facing: CameraFacing) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::Camera("camera already open".to_string()));
        }
        let stream = self.backend.open(facing)?;
        tracing::debug!(backend = self.backend.name(), %facing, "camera live");
        self.stream = Some(stream);
        Ok(())
    }

    /// Switch between front and back cameras.
    ///
    /// The current stream is released before the alternate one is requested;
    /// if the new acquisition fails the manager reports the error and ends up
    /// `Closed` rather than silently keeping the old stream.
    ///
    /// # Errors
    ///
    /// Returns error if not live, or if the alternate camera is unavailable.
    pub fn switch_facing(&mut self) -> Result<()> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| Error::Camera("camera is not live".to_string()))?;
        let target = stream.facing().toggled();
        drop(stream);

        let new_stream = self.backend.open(target)?;
        tracing::debug!(%target, "camera facing switched");
        self.stream = Some(new_stream);
        Ok(())
    }

    /// Snapshot the current frame as a JPEG still. The stream stays live so
    /// a retake is cheap.
    ///
    /// # Errors
    ///
    /// Returns error if not live, if a shot is already pending, or if the
    /// grab/encode fails.
    pub fn capture(&mut self) -> Result<()> {
        if self.shot.is_some() {
            return Err(Error::Camera("a capture is already pending".to_string()));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::Camera("camera is not live".to_string()))?;

        let frame = stream.grab()?;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality)
            .encode(
                &frame.pixels,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| Error::Camera(format!("JPEG encode failed: {e}")))?;

        self.shot_seq += 1;
        self.shot = Some(CapturedPhoto {
            filename: format!("capture-{:03}.jpg", self.shot_seq),
            jpeg,
            width: frame.width,
            height: frame.height,
        });
        Ok(())
    }

    /// Discard the pending shot and return to live preview.
    ///
    /// # Errors
    ///
    /// Returns error if no shot is pending.
    pub fn retake(&mut self) -> Result<()> {
        if self.shot.take().is_none() {
            return Err(Error::Camera("nothing captured".to_string()));
        }
        Ok(())
    }

    /// Emit the captured image and release the camera.
    ///
    /// # Errors
    ///
    /// Returns error if no shot is pending.
    pub fn confirm(&mut self) -> Result<CapturedPhoto> {
        let shot = self
            .shot
            .take()
            .ok_or_else(|| Error::Camera("nothing captured".to_string()))?;
        self.stream = None;
        tracing::debug!(filename = %shot.filename, "capture confirmed, camera released");
        Ok(shot)
    }

    /// Release the stream and any pending shot, from any state.
    pub fn close(&mut self) {
        self.shot = None;
        if self.stream.take().is_some() {
            tracing::debug!("camera closed");
        }
    }
}

impl Drop for VideoCapture {
    fn drop(&mut self) {
        self.close();
    }
}
