//! Configuration for the intake console
//!
//! Defaults are overlaid with an optional `intake.toml` file and a handful of
//! environment variables. All file fields are optional - the file is a partial
//! overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::camera::CameraFacing;
use crate::{Error, Result};

/// Environment variable overriding the session service base URL
const SERVICE_URL_ENV: &str = "INTAKE_SERVICE_URL";

/// Intake console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Session service configuration
    pub service: ServiceConfig,

    /// Voice capture/playback configuration
    pub voice: VoiceConfig,

    /// Camera configuration
    pub camera: CameraConfig,
}

/// Session service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the onboarding session service
    pub base_url: String,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone capture and speech playback
    pub enabled: bool,
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Facing mode requested when the camera is first opened
    pub default_facing: CameraFacing,

    /// JPEG quality for captured stills (1-100)
    pub jpeg_quality: u8,

    /// Optional directory of image files serving as the camera source.
    /// When unset, a synthetic test-pattern source is used.
    pub source_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:8000".to_string(),
            },
            voice: VoiceConfig { enabled: true },
            camera: CameraConfig {
                default_facing: CameraFacing::Back,
                jpeg_quality: 85,
                source_dir: None,
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file overlay (if present),
    /// then environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let candidate = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("intake.toml"));

        if candidate.exists() {
            let raw = std::fs::read_to_string(&candidate)?;
            let file: ConfigFile = toml::from_str(&raw)?;
            config.apply_file(file)?;
            tracing::debug!(path = %candidate.display(), "loaded config file");
        } else if path.is_some() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                candidate.display()
            )));
        }

        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.is_empty() {
                config.service.base_url = url;
            }
        }

        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(url) = file.service.base_url {
            self.service.base_url = url;
        }
        if let Some(enabled) = file.voice.enabled {
            self.voice.enabled = enabled;
        }
        if let Some(facing) = file.camera.default_facing {
            self.camera.default_facing = match facing.as_str() {
                "front" => CameraFacing::Front,
                "back" => CameraFacing::Back,
                other => {
                    return Err(Error::Config(format!(
                        "unknown camera facing: {other} (expected \"front\" or \"back\")"
                    )));
                }
            };
        }
        if let Some(quality) = file.camera.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err(Error::Config(format!(
                    "jpeg_quality out of range: {quality}"
                )));
            }
            self.camera.jpeg_quality = quality;
        }
        if let Some(dir) = file.camera.source_dir {
            self.camera.source_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    service: ServiceFileConfig,

    #[serde(default)]
    voice: VoiceFileConfig,

    #[serde(default)]
    camera: CameraFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceFileConfig {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceFileConfig {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CameraFileConfig {
    default_facing: Option<String>,
    jpeg_quality: Option<u8>,
    source_dir: Option<String>,
}
