use serde::{Deserialize, Serialize};
use sombra_consistency::CheckOptions;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings file of the checker. Every key is optional; command line flags
/// override whatever the file sets.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    /// Loads `explicit`, or the default config file when it exists.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Missing { path });
            }
            let data = read_file(&path)?;
            return Ok(Self {
                path: Some(path),
                data,
            });
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                let data = read_file(&path)?;
                Ok(Self {
                    path: Some(path),
                    data,
                })
            }
            _ => Ok(Self::default()),
        }
    }

    /// File the settings came from, if any was read.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Engine options the file asks for.
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions::from_flags(
            self.data.consistency_check_property_owners.unwrap_or(false),
            self.data.consistency_check_single_threaded.unwrap_or(false),
            self.data.consistency_check_multiple_passes.unwrap_or(false),
        )
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    consistency_check_property_owners: Option<bool>,
    #[serde(default)]
    consistency_check_single_threaded: Option<bool>,
    #[serde(default)]
    consistency_check_multiple_passes: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    Missing { path: PathBuf },
    #[error("failed to read checker config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse checker config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("sombra").join("check.toml"))
}
