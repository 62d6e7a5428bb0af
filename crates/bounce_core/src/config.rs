use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "BOUNCE_CONFIG";
/// Settings file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "bounce.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What the normal/world-position/flux buffers return outside the light's view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeBorder {
    /// Zero normal, position and flux: no indirect contribution.
    #[default]
    Zero,
    /// Same border as the depth buffer (all ones).
    OpaqueWhite,
}

impl AttributeBorder {
    /// The per-channel border value.
    pub fn value(self) -> f32 {
        match self {
            AttributeBorder::Zero => 0.0,
            AttributeBorder::OpaqueWhite => 1.0,
        }
    }
}

/// Capture buffer shown full-screen instead of the shaded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugView {
    Depth,
    Normal,
    WorldPos,
    Flux,
}

impl DebugView {
    /// Selector understood by the debug fragment shader.
    pub fn shader_index(self) -> i32 {
        match self {
            DebugView::Depth => 0,
            DebugView::Normal => 1,
            DebugView::WorldPos => 2,
            DebugView::Flux => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub window_width: u32,
    pub window_height: u32,
    /// Width and height of every capture attachment.
    pub capture_resolution: u32,
    pub sample_num: u32,
    /// Sampling disk radius, in capture texture coordinates.
    pub sample_radius: f32,
    /// Linear-depth bias (world units) for the shadow test.
    pub shadow_bias: f32,
    /// Seed for the sample set. `None` seeds from the clock.
    pub seed: Option<u64>,
    pub attribute_border: AttributeBorder,
    pub debug_view: Option<DebugView>,
    /// Read `<name>.vert.wgsl` / `<name>.frag.wgsl` from here instead of the
    /// embedded copies.
    pub shader_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            capture_resolution: 1024,
            sample_num: 512,
            sample_radius: 0.3,
            shadow_bias: 0.05,
            seed: None,
            attribute_border: AttributeBorder::default(),
            debug_view: None,
            shader_dir: None,
        }
    }
}

impl Settings {
    /// Resolves settings from `BOUNCE_CONFIG`, then `./bounce.json`, then defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }

        log::debug!("No settings file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Settings =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;

        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            }
        }

        if self.window_width == 0 || self.window_height == 0 {
            return Err(invalid("window_width/window_height", "must be non-zero"));
        }
        if self.capture_resolution == 0 {
            return Err(invalid("capture_resolution", "must be non-zero"));
        }
        if self.sample_num == 0 {
            return Err(invalid("sample_num", "at least one sample is required"));
        }
        if !(self.sample_radius.is_finite() && self.sample_radius >= 0.0) {
            return Err(invalid("sample_radius", "must be a non-negative number"));
        }
        if !self.shadow_bias.is_finite() {
            return Err(invalid("shadow_bias", "must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sample_num, 512);
        assert_eq!(settings.capture_resolution, 1024);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_override() {
        let settings: Settings = serde_json::from_str(
            r#"{ "sample_num": 64, "seed": 7, "attribute_border": "opaque_white", "debug_view": "world_pos" }"#,
        )
        .unwrap();
        assert_eq!(settings.sample_num, 64);
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.attribute_border, AttributeBorder::OpaqueWhite);
        assert_eq!(settings.debug_view, Some(DebugView::WorldPos));
        assert_eq!(settings.window_width, 800);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Settings>(r#"{ "sample_count": 3 }"#).is_err());
    }

    #[test]
    fn zero_samples_is_invalid() {
        let settings = Settings {
            sample_num: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "sample_num", .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Settings::from_file(Path::new("definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("here.json"));
    }

    #[test]
    fn border_values() {
        assert_eq!(AttributeBorder::Zero.value(), 0.0);
        assert_eq!(AttributeBorder::OpaqueWhite.value(), 1.0);
    }
}
