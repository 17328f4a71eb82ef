use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ffmpeg::DEFAULT_FFMPEG;
use crate::recording::{RotationPolicy, SegmentConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub account: String,
    pub pattern: String,
    /// 0 = unlimited
    pub max_filesize_mb: u64,
    /// 0 = unlimited
    pub max_duration_min: u64,
    pub initial_sequence: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            pattern: "videos/{account}_{year}-{month}-{day}_{hour}-{minute}-{second}_{sequence}"
                .to_string(),
            max_filesize_mb: 0,
            max_duration_min: 0,
            initial_sequence: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub enabled: bool,
    pub ffmpeg_path: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg_path: DEFAULT_FFMPEG.to_string(),
        }
    }
}

impl Config {
    /// Load `path` (any extension the `config` crate understands, optional)
    /// overlaid with `SEGREC__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SEGREC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::from_limits(self.recording.max_filesize_mb, self.recording.max_duration_min)
    }

    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            account: self.recording.account.clone(),
            pattern: shellexpand::tilde(&self.recording.pattern).into_owned(),
            policy: self.rotation_policy(),
            initial_sequence: self.recording.initial_sequence,
            convert: self.conversion.enabled,
        }
    }
}
