use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::biome::Biome;
use crate::terrain::JitterMode;

pub const DEFAULT_SETTINGS_PATH: &str = "landscape.toml";
pub const MIN_TREES: u32 = 0;
pub const MAX_TREES: u32 = 1000;
pub const MIN_RAIN_SPEED: f32 = 0.1;
pub const MAX_RAIN_SPEED: f32 = 1.0;
pub const MIN_CLOUD_SPEED: f32 = 0.01;
pub const MAX_CLOUD_SPEED: f32 = 0.05;
const MAX_PARTICLES: usize = 200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeSettings {
    #[serde(default)]
    pub biome: Biome,
    #[serde(default = "default_trees")]
    pub trees: u32,
    #[serde(default = "default_rain_speed")]
    pub rain_speed: f32,
    #[serde(default = "default_cloud_speed")]
    pub cloud_speed: f32,
    #[serde(default)]
    pub rain: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub jitter: JitterMode,
    #[serde(default = "default_cloud_particles")]
    pub cloud_particles: usize,
    #[serde(default = "default_snow_particles")]
    pub snow_particles: usize,
    #[serde(default = "default_rain_particles")]
    pub rain_particles: usize,
}

impl Default for LandscapeSettings {
    fn default() -> Self {
        Self {
            biome: Biome::default(),
            trees: default_trees(),
            rain_speed: default_rain_speed(),
            cloud_speed: default_cloud_speed(),
            rain: false,
            seed: default_seed(),
            jitter: JitterMode::default(),
            cloud_particles: default_cloud_particles(),
            snow_particles: default_snow_particles(),
            rain_particles: default_rain_particles(),
        }
    }
}

impl LandscapeSettings {
    pub fn sanitize(mut self) -> Self {
        self.trees = self.trees.clamp(MIN_TREES, MAX_TREES);
        self.rain_speed = clamp_or_default(self.rain_speed, MIN_RAIN_SPEED, MAX_RAIN_SPEED, default_rain_speed());
        self.cloud_speed =
            clamp_or_default(self.cloud_speed, MIN_CLOUD_SPEED, MAX_CLOUD_SPEED, default_cloud_speed());
        self.cloud_particles = self.cloud_particles.min(MAX_PARTICLES);
        self.snow_particles = self.snow_particles.min(MAX_PARTICLES);
        self.rain_particles = self.rain_particles.min(MAX_PARTICLES);
        self
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Self>(contents).map(Self::sanitize)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let settings = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&settings).map_err(SettingsError::Serialize)?;
        fs::write(path, serialized).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, change: SettingChange) {
        match change {
            SettingChange::Biome(biome) => self.biome = biome,
            SettingChange::Trees(trees) => self.trees = trees.clamp(MIN_TREES, MAX_TREES),
            SettingChange::RainSpeed(speed) => {
                self.rain_speed = clamp_or_default(speed, MIN_RAIN_SPEED, MAX_RAIN_SPEED, self.rain_speed);
            }
            SettingChange::CloudSpeed(speed) => {
                self.cloud_speed = clamp_or_default(speed, MIN_CLOUD_SPEED, MAX_CLOUD_SPEED, self.cloud_speed);
            }
            SettingChange::Rain(enabled) => self.rain = enabled,
        }
    }
}

fn clamp_or_default(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Loads `path`, falling back to defaults when the file is missing or invalid.
pub fn load_or_default(path: &Path) -> LandscapeSettings {
    match LandscapeSettings::load(path) {
        Ok(settings) => {
            info!("Loaded settings from {}", path.display());
            settings
        }
        Err(SettingsError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            info!("No settings at {}, using defaults", path.display());
            LandscapeSettings::default()
        }
        Err(err) => {
            warn!("{err}; using defaults");
            LandscapeSettings::default()
        }
    }
}

/// One user-driven edit, produced by the settings panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingChange {
    Biome(Biome),
    Trees(u32),
    RainSpeed(f32),
    CloudSpeed(f32),
    Rain(bool),
}

#[derive(Debug)]
pub enum SettingsError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Serialize(toml::ser::Error),
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read settings from {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse settings in {}: {source}", path.display())
            }
            Self::Serialize(source) => write!(f, "failed to serialize settings: {source}"),
            Self::Write { path, source } => {
                write!(f, "failed to write settings to {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Serialize(source) => Some(source),
        }
    }
}

fn default_trees() -> u32 {
    100
}

fn default_rain_speed() -> f32 {
    0.3
}

fn default_cloud_speed() -> f32 {
    0.01
}

fn default_seed() -> u64 {
    0xC0FFEE
}

fn default_cloud_particles() -> usize {
    50_000
}

fn default_snow_particles() -> usize {
    10_000
}

fn default_rain_particles() -> usize {
    15_000
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{load_or_default, LandscapeSettings, SettingChange, SettingsError};
    use crate::biome::Biome;
    use crate::terrain::JitterMode;

    #[test]
    fn partial_file_fills_defaults() {
        let settings = LandscapeSettings::from_toml("biome = \"snow\"\nrain = true\n")
            .expect("partial settings parse");
        assert_eq!(settings.biome, Biome::Snow);
        assert!(settings.rain);
        assert_eq!(settings.trees, 100);
        assert_eq!(settings.rain_speed, 0.3);
        assert_eq!(settings.cloud_speed, 0.01);
        assert_eq!(settings.seed, 0xC0FFEE);
        assert_eq!(settings.jitter, JitterMode::Fixed);
        assert_eq!(settings.cloud_particles, 50_000);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let settings = LandscapeSettings {
            trees: 5_000,
            rain_speed: 4.0,
            cloud_speed: f32::NAN,
            cloud_particles: usize::MAX,
            ..LandscapeSettings::default()
        }
        .sanitize();
        assert_eq!(settings.trees, 1000);
        assert_eq!(settings.rain_speed, 1.0);
        assert_eq!(settings.cloud_speed, 0.01);
        assert_eq!(settings.cloud_particles, 200_000);
    }

    #[test]
    fn jitter_mode_parses_snake_case() {
        let settings = LandscapeSettings::from_toml("jitter = \"per_sample\"").expect("parse");
        assert_eq!(settings.jitter, JitterMode::PerSample);
        assert!(LandscapeSettings::from_toml("biome = \"tundra\"").is_err());
    }

    #[test]
    fn changes_respect_slider_bounds() {
        let mut settings = LandscapeSettings::default();
        settings.apply(SettingChange::Trees(2_000));
        settings.apply(SettingChange::RainSpeed(0.0));
        settings.apply(SettingChange::CloudSpeed(0.03));
        settings.apply(SettingChange::Biome(Biome::Desert));
        assert_eq!(settings.trees, 1000);
        assert_eq!(settings.rain_speed, 0.1);
        assert_eq!(settings.cloud_speed, 0.03);
        assert_eq!(settings.biome, Biome::Desert);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("landscape-settings-{nanos}.toml"));
        let settings = LandscapeSettings {
            biome: Biome::Snow,
            trees: 250,
            rain: true,
            ..LandscapeSettings::default()
        };
        settings.save(&path).expect("save settings");
        let loaded = LandscapeSettings::load(&path).expect("load settings");
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reports_read_error_and_defaults() {
        let path = std::env::temp_dir().join("landscape-settings-does-not-exist.toml");
        assert!(matches!(
            LandscapeSettings::load(&path),
            Err(SettingsError::Read { .. })
        ));
        assert_eq!(load_or_default(&path), LandscapeSettings::default());
    }
}
