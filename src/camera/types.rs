use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable camera identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new `DeviceId` from a raw string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the inner string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical kind of a capture device.
///
/// Built-in kinds mirror the lens modules found on phones; everything else
/// (USB webcams, capture cards) reports `External`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    BuiltInDualCamera,
    BuiltInTelephotoCamera,
    BuiltInWideAngleCamera,
    BuiltInUltraWideCamera,
    External,
}

impl DeviceType {
    /// Human-readable display name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::BuiltInDualCamera => "Dual Camera",
            Self::BuiltInTelephotoCamera => "Telephoto Camera",
            Self::BuiltInWideAngleCamera => "Wide Angle Camera",
            Self::BuiltInUltraWideCamera => "Ultra Wide Camera",
            Self::External => "External Camera",
        }
    }

    /// Short string identifier, matching the serde representation.
    pub fn as_id_str(self) -> &'static str {
        match self {
            Self::BuiltInDualCamera => "builtInDualCamera",
            Self::BuiltInTelephotoCamera => "builtInTelephotoCamera",
            Self::BuiltInWideAngleCamera => "builtInWideAngleCamera",
            Self::BuiltInUltraWideCamera => "builtInUltraWideCamera",
            Self::External => "external",
        }
    }

    /// Parse a string identifier into a `DeviceType`.
    ///
    /// Returns `None` if the string does not match any known type.
    pub fn from_str_id(s: &str) -> Option<Self> {
        match s {
            "builtInDualCamera" => Some(Self::BuiltInDualCamera),
            "builtInTelephotoCamera" => Some(Self::BuiltInTelephotoCamera),
            "builtInWideAngleCamera" => Some(Self::BuiltInWideAngleCamera),
            "builtInUltraWideCamera" => Some(Self::BuiltInUltraWideCamera),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

/// Which way a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraPosition {
    #[default]
    Back,
    Front,
    /// Position unknown. As a discovery filter it matches every position.
    Unspecified,
}

/// Discovered camera device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    pub position: CameraPosition,
    pub is_connected: bool,
}

/// Camera authorization as reported by the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access is blocked by policy and cannot be granted by the user.
    Restricted,
    Denied,
    Authorized,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        self == Self::Authorized
    }
}

/// Session quality preset. Backends map it to a requested resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPreset {
    #[default]
    High,
    Medium,
    Low,
}

impl SessionPreset {
    /// Target `(width, height)` for this preset.
    pub fn target_resolution(self) -> (u32, u32) {
        match self {
            Self::High => (1920, 1080),
            Self::Medium => (1280, 720),
            Self::Low => (640, 480),
        }
    }
}

/// Video format an opened input produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub pixel_format: String,
}
