use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::audio::CaptureConfig;
use crate::store::{DEFAULT_RECORDS_KEY, DEFAULT_VIEWER_KEY};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub recording: RecordingConfig,
    pub discovery: DiscoveryConfig,
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "soulcast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub records_key: String,
    pub viewer_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            records_key: DEFAULT_RECORDS_KEY.to_string(),
            viewer_key: DEFAULT_VIEWER_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub buffer_duration_ms: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            buffer_duration_ms: CaptureConfig::default().buffer_duration_ms,
        }
    }
}

impl RecordingConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            buffer_duration_ms: self.buffer_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Radius for the discovery feed
    pub default_radius_km: f64,
    /// Radius for the map view
    pub map_radius_km: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 2.0,
            map_radius_km: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load `path` (any format the `config` crate understands, extension
    /// optional) overlaid with `SOULCAST__SECTION__KEY` environment variables
    ///
    /// A missing file is not an error; every setting has a default.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SOULCAST").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
