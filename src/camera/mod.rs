//! Camera capture module
//!
//! Still-image capture for document uploads. The device itself sits behind
//! [`CameraBackend`] so platform sources (or test doubles) plug in without
//! touching the capture lifecycle; dropping a [`CameraStream`] releases the
//! underlying device.

mod backend;
mod capture;

pub use backend::{
    CameraBackend, CameraFacing, CameraFrame, CameraStream, FileCameraBackend, TestPatternBackend,
};
pub use capture::{CameraState, CapturedPhoto, VideoCapture};
