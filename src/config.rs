//! Server configuration
//!
//! Read from `compact_crafting.toml` in the working directory, or from the
//! path in `COMPACT_CRAFTING_CONFIG`. Every key is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;
use crate::field::FieldSettings;

pub const DEFAULT_CONFIG_FILE: &str = "compact_crafting.toml";
pub const CONFIG_ENV_VAR: &str = "COMPACT_CRAFTING_CONFIG";

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_tick_interval_ms() -> u64 {
    50 // 20 Hz
}

fn default_hot_reload() -> bool {
    true
}

fn default_log_filter() -> String {
    "compact_crafting=info".to_string()
}

fn default_projector_block() -> String {
    "compactcrafting:field_projector".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    /// Directory holding `recipes/*.toml`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Watch the recipe directory and reload on change
    #[serde(default = "default_hot_reload")]
    pub hot_reload: bool,
    /// Directive added on top of `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_projector_block")]
    pub projector_block: String,
    /// Optional JSON block snapshot loaded into the overworld at startup
    #[serde(default)]
    pub world_file: Option<PathBuf>,
    #[serde(default)]
    pub field: FieldSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_interval_ms: default_tick_interval_ms(),
            hot_reload: default_hot_reload(),
            log_filter: default_log_filter(),
            projector_block: default_projector_block(),
            world_file: None,
            field: FieldSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the env override or the default file. A missing default file
    /// yields the defaults; a missing override file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load_from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
