use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attribute marking an element for auto-discovery.
pub const VIEWER_ATTRIBUTE: &str = "data-crystal-viewer";
pub const USER_ID_ATTRIBUTE: &str = "data-user-id";
pub const AUTO_ROTATE_ATTRIBUTE: &str = "data-auto-rotate";
pub const ROTATION_SPEED_ATTRIBUTE: &str = "data-rotation-speed";
pub const CAMERA_DISTANCE_ATTRIBUTE: &str = "data-camera-distance";
pub const SHOW_STATS_ATTRIBUTE: &str = "data-show-stats";
pub const SIZE_ATTRIBUTE: &str = "data-size";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid viewer options")]
    Json(#[from] serde_json::Error),
    #[error("unknown crystal size '{0}', expected small, medium or large")]
    UnknownSize(String),
}

/// Nominal display size of a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrystalSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl CrystalSize {
    /// Pixel size used when the container itself reports no area.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Small => (200, 200),
            Self::Medium => (400, 400),
            Self::Large => (600, 600),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl FromStr for CrystalSize {
    type Err = OptionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(OptionsError::UnknownSize(value.to_string())),
        }
    }
}

/// Display options of a single viewer. Absent fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    pub auto_rotate: bool,
    /// Radians added to the crystal's yaw every frame while auto-rotating.
    pub rotation_speed: f32,
    pub camera_distance: f32,
    pub show_stats: bool,
    pub size: CrystalSize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            rotation_speed: 0.005,
            camera_distance: 5.0,
            show_stats: false,
            size: CrystalSize::default(),
        }
    }
}

impl ViewerOptions {
    /// Reads options from the `data-*` attributes of a container element.
    ///
    /// Values that fail to parse keep their default.
    pub fn from_attributes<F>(attribute: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            auto_rotate: parse_flag(attribute(AUTO_ROTATE_ATTRIBUTE), defaults.auto_rotate),
            rotation_speed: parse_number(
                attribute(ROTATION_SPEED_ATTRIBUTE),
                defaults.rotation_speed,
            ),
            camera_distance: parse_number(
                attribute(CAMERA_DISTANCE_ATTRIBUTE),
                defaults.camera_distance,
            ),
            show_stats: parse_flag(attribute(SHOW_STATS_ATTRIBUTE), defaults.show_stats),
            size: attribute(SIZE_ATTRIBUTE)
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.size),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("true") || value == "1" => true,
        Some(value) if value.eq_ignore_ascii_case("false") || value == "0" => false,
        _ => default,
    }
}

fn parse_number(value: Option<String>, default: f32) -> f32 {
    value
        .and_then(|value| value.trim().parse::<f32>().ok())
        .filter(|number| number.is_finite())
        .unwrap_or(default)
}

/// Everything needed to mount one viewer found in a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerMount {
    pub container_id: String,
    pub user_id: String,
    pub options: ViewerOptions,
}

impl ViewerMount {
    /// Builds a mount from an element's attributes; `None` unless the element
    /// carries the viewer marker, a non-empty `id` and a user id.
    pub fn from_attributes<F>(attribute: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        attribute(VIEWER_ATTRIBUTE)?;
        let container_id = attribute("id").filter(|id| !id.is_empty())?;
        let user_id = attribute(USER_ID_ATTRIBUTE).filter(|id| !id.is_empty())?;
        Some(Self {
            container_id,
            user_id,
            options: ViewerOptions::from_attributes(&attribute),
        })
    }
}
