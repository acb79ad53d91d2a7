use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::camera::discovery::{DiscoverySession, DEFAULT_DEVICE_TYPES};
use crate::camera::types::{CameraPosition, DeviceType, SessionPreset};
use crate::capture::output::DEFAULT_QUEUE_LABEL;
use crate::capture::preview::DEFAULT_PREVIEW_FRAMES;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Capture controller settings. Every field has a default, so an empty
/// JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    pub preset: SessionPreset,
    pub position: CameraPosition,
    /// Acceptable camera kinds, most preferred first.
    pub device_types: Vec<DeviceType>,
    pub always_discards_late_frames: bool,
    /// Frames that may wait for the frame callback.
    pub queue_depth: usize,
    /// Thread name for frame callbacks.
    pub sample_queue_label: String,
    /// Frames kept by the preview layer.
    pub preview_frames: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preset: SessionPreset::High,
            position: CameraPosition::Back,
            device_types: DEFAULT_DEVICE_TYPES.to_vec(),
            always_discards_late_frames: true,
            queue_depth: 1,
            sample_queue_label: DEFAULT_QUEUE_LABEL.to_string(),
            preview_frames: DEFAULT_PREVIEW_FRAMES,
        }
    }
}

impl CaptureConfig {
    /// Load from a JSON file, returning defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// `load` for an optional path; `None` yields defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid("queueDepth must be at least 1".into()));
        }
        if self.device_types.is_empty() {
            return Err(ConfigError::Invalid(
                "deviceTypes must name at least one camera type".into(),
            ));
        }
        if self.sample_queue_label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sampleQueueLabel must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The device query this config describes.
    pub fn discovery(&self) -> DiscoverySession {
        DiscoverySession::new(self.device_types.clone(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_back_camera_capture() {
        let config = CaptureConfig::default();
        assert_eq!(config.preset, SessionPreset::High);
        assert!(config.always_discards_late_frames);
        assert_eq!(config.queue_depth, 1);
        assert_eq!(config.discovery(), DiscoverySession::back_camera());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_returns_default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let config = CaptureConfig::load(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn load_or_default_without_path() {
        assert_eq!(
            CaptureConfig::load_or_default(None).unwrap(),
            CaptureConfig::default()
        );
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(
            &path,
            r#"{"preset":"low","position":"unspecified","deviceTypes":["external"]}"#,
        )
        .unwrap();

        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config.preset, SessionPreset::Low);
        assert_eq!(config.position, CameraPosition::Unspecified);
        assert_eq!(config.device_types, vec![DeviceType::External]);
        assert_eq!(config.queue_depth, 1);
        assert_eq!(config.sample_queue_label, DEFAULT_QUEUE_LABEL);
    }

    #[test]
    fn load_returns_error_for_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, "not valid json!!!").unwrap();

        let err = CaptureConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_rejects_zero_queue_depth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, r#"{"queueDepth":0}"#).unwrap();

        let err = CaptureConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validate_rejects_empty_device_types() {
        let config = CaptureConfig {
            device_types: vec![],
            ..CaptureConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn serialises_to_camelcase() {
        let json = serde_json::to_value(CaptureConfig::default()).unwrap();
        assert_eq!(json["alwaysDiscardsLateFrames"], true);
        assert_eq!(json["sampleQueueLabel"], "sample-buffer-queue");
        assert_eq!(json["deviceTypes"][0], "builtInDualCamera");
    }
}
