//! Camera device backends
//!
//! Two built-in sources: a synthetic test pattern (always available) and a
//! directory of image files standing in for camera frames on machines without
//! capture hardware.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    /// User-facing camera
    Front,
    /// Environment-facing camera
    Back,
}

impl CameraFacing {
    /// The opposite facing mode
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

/// One video frame (RGB8, row-major)
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A live camera stream. Dropping it releases the device.
pub trait CameraStream: Send {
    /// Grab the current frame
    ///
    /// # Errors
    ///
    /// Returns error if the device fails mid-stream.
    fn grab(&mut self) -> Result<CameraFrame>;

    /// The facing mode this stream was opened with
    fn facing(&self) -> CameraFacing;
}

/// Factory for camera streams
pub trait CameraBackend: Send {
    /// Acquire a stream for the requested facing mode
    ///
    /// # Errors
    ///
    /// Returns [`Error::Camera`] if the device is unavailable.
    fn open(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Synthetic gradient source, used when no camera hardware is configured
pub struct TestPatternBackend;

impl CameraBackend for TestPatternBackend {
    fn open(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>> {
        tracing::debug!(%facing, "opening test pattern stream");
        Ok(Box::new(TestPatternStream { facing, tick: 0 }))
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}

struct TestPatternStream {
    facing: CameraFacing,
    tick: u8,
}

impl CameraStream for TestPatternStream {
    fn grab(&mut self) -> Result<CameraFrame> {
        const WIDTH: u32 = 640;
        const HEIGHT: u32 = 480;

        self.tick = self.tick.wrapping_add(16);
        let base = match self.facing {
            CameraFacing::Front => 64,
            CameraFacing::Back => 192,
        };

        let mut pixels = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                #[allow(clippy::cast_possible_truncation)]
                {
                    pixels.push((x * 255 / WIDTH) as u8);
                    pixels.push((y * 255 / HEIGHT) as u8);
                    pixels.push(base ^ self.tick);
                }
            }
        }

        Ok(CameraFrame {
            width: WIDTH,
            height: HEIGHT,
            pixels,
        })
    }

    fn facing(&self) -> CameraFacing {
        self.facing
    }
}

/// Reads frames from a directory of image files, cycling through them in
/// name order. Useful for demos and machines without capture hardware.
pub struct FileCameraBackend {
    dir: PathBuf,
}

impl FileCameraBackend {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| Error::Camera(format!("cannot read {}: {e}", dir.display())))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("jpg" | "jpeg" | "png" | "webp")
                )
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(Error::Camera(format!(
                "no image files in {}",
                dir.display()
            )));
        }
        Ok(files)
    }
}

impl CameraBackend for FileCameraBackend {
    fn open(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>> {
        let files = Self::list_images(&self.dir)?;
        tracing::debug!(%facing, frames = files.len(), "opening file-backed camera stream");
        Ok(Box::new(FileCameraStream {
            facing,
            files,
            next: 0,
        }))
    }

    fn name(&self) -> &str {
        "file"
    }
}

struct FileCameraStream {
    facing: CameraFacing,
    files: Vec<PathBuf>,
    next: usize,
}

impl CameraStream for FileCameraStream {
    fn grab(&mut self) -> Result<CameraFrame> {
        let path = &self.files[self.next % self.files.len()];
        self.next = self.next.wrapping_add(1);

        let image = image::open(path)
            .map_err(|e| Error::Camera(format!("cannot decode {}: {e}", path.display())))?
            .into_rgb8();

        Ok(CameraFrame {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        })
    }

    fn facing(&self) -> CameraFacing {
        self.facing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_toggles() {
        assert_eq!(CameraFacing::Front.toggled(), CameraFacing::Back);
        assert_eq!(CameraFacing::Back.toggled(), CameraFacing::Front);
    }

    #[test]
    fn test_pattern_produces_frames() {
        let backend = TestPatternBackend;
        let mut stream = backend.open(CameraFacing::Back).unwrap();
        let frame = stream.grab().unwrap();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(frame.pixels.len(), 640 * 480 * 3);
        assert_eq!(stream.facing(), CameraFacing::Back);
    }

    #[test]
    fn file_backend_requires_images() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileCameraBackend::new(dir.path());
        assert!(backend.open(CameraFacing::Back).is_err());
    }
}
