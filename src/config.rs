//! Layered settings.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML file: `--config <path>` or `<config dir>/carta.toml`
//! 3. Environment variables: `CARTA_*` prefix

use crate::error::{AstrologyError, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://astralapiproxy.onrender.com/calculate";
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// Observer location sent with every calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            latitude: -33.45,
            longitude: -70.6667,
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub fallback_api_url: Option<String>,
    pub geonames_username: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    /// Days requested concurrently while building a calendar year.
    pub batch_size: usize,
    pub cache_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let location = Location::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            fallback_api_url: None,
            geonames_username: None,
            latitude: location.latitude,
            longitude: location.longitude,
            timezone: location.timezone,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_dir: default_cache_dir(),
            request_timeout_secs: 30,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "carta")
}

fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".carta-cache"))
}

/// `<config dir>/carta.toml`, when the platform has a config dir.
pub fn global_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("carta.toml"))
}

impl Settings {
    /// Loads defaults, then the TOML file, then `CARTA_*` variables.
    ///
    /// An explicit `path` must exist; the global file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("api_url", defaults.api_url.clone())?
            .set_default("latitude", defaults.latitude)?
            .set_default("longitude", defaults.longitude)?
            .set_default("timezone", defaults.timezone.clone())?
            .set_default("batch_size", defaults.batch_size as u64)?
            .set_default("cache_dir", defaults.cache_dir.to_string_lossy().to_string())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?;

        match path {
            Some(explicit) => {
                debug!("loading settings from {}", explicit.display());
                builder = builder.add_source(File::from(explicit).required(true));
            }
            None => {
                if let Some(global) = global_config_path() {
                    debug!("looking for settings in {}", global.display());
                    builder = builder.add_source(File::from(global).required(false));
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("CARTA"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AstrologyError::InvalidInput(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AstrologyError::InvalidInput(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AstrologyError::InvalidInput(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    pub fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
            timezone: self.timezone.clone(),
        }
    }
}
