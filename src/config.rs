use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Output device settings for the buffered mixer backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerSettings {
    /// Requested sample rate in Hz
    pub sample_rate: u32,

    /// Requested output channel count (2 = stereo)
    pub output_channels: u16,

    /// Requested buffer size in frames, clamped to the device's range
    pub buffer_size: u32,

    /// Number of concurrent effect mix slots allocated at startup
    pub mix_slots: usize,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            output_channels: 2,
            buffer_size: 4096,
            mix_slots: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub mixer: MixerSettings,

    /// Highest valid logical channel index (channel 0 means "no channel")
    pub max_channels: u8,

    /// Initial master volume (0.0-1.0)
    pub master_volume: f32,

    /// Device level gain handed to the backend after startup (0.0-1.0)
    pub output_gain: f32,

    /// Start with all music muted
    #[serde(default)]
    pub music_muted: bool,

    /// Start with all effects muted
    #[serde(default)]
    pub effects_muted: bool,

    /// Volume presets for logical channels, applied when a channel is first used
    #[serde(default)]
    pub channel_volumes: BTreeMap<u8, f32>,

    /// Directory that relative sound paths are resolved against
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mixer: MixerSettings::default(),
            max_channels: 16,
            master_volume: 1.0,
            output_gain: 1.0,
            music_muted: false,
            effects_muted: false,
            channel_volumes: BTreeMap::new(),
            asset_root: None,
        }
    }
}

impl AudioConfig {
    /// Load configuration from the platform-specific config directory.
    /// Creates default config if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let config = Self::load_from(&config_path)?;
            tracing::info!("Loaded audio config from: {}", config_path.display());
            Ok(config)
        } else {
            let config = AudioConfig::default();
            config.save_to(&config_path)?;
            tracing::info!("Created default audio config at: {}", config_path.display());
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: AudioConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    /// Reject settings no backend can open
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mixer.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.mixer.output_channels == 0 {
            return Err(ConfigError::Invalid("output_channels must be positive".into()));
        }
        if self.mixer.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be positive".into()));
        }
        if self.mixer.mix_slots == 0 {
            return Err(ConfigError::Invalid("mix_slots must be positive".into()));
        }
        if let Some(index) = self
            .channel_volumes
            .keys()
            .find(|&&index| index == 0 || index > self.max_channels)
        {
            return Err(ConfigError::Invalid(format!(
                "channel preset {} outside 1..={}",
                index, self.max_channels
            )));
        }
        Ok(())
    }

    /// Get the config file path (in the user's config folder)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("StarAudio").join("audio.json"))
    }

    /// Get the config file path for display purposes
    pub fn config_path_display() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
