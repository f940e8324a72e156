//! Error types for recipe loading, field lifecycle, config and world snapshots

use std::path::PathBuf;
use thiserror::Error;

use crate::block::ItemStack;
use crate::pos::BlockPos;
use crate::world::DimensionId;

/// Errors raised while loading or validating recipe definitions
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A layer references a component key the recipe never declares
    #[error("Recipe '{recipe}' references undeclared component '{key}'")]
    MissingComponent { recipe: String, key: String },

    #[error("Recipe '{recipe}' declares component '{key}' more than once")]
    DuplicateComponent { recipe: String, key: String },

    #[error("Recipe '{0}' has no outputs")]
    NoOutputs(String),

    #[error("Recipe '{0}' has no layers")]
    NoLayers(String),

    #[error("File watcher error: {0}")]
    Watcher(String),
}

/// Errors raised by field registration and crafting
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("A field is already active at {0}")]
    AlreadyActive(BlockPos),

    #[error("No active field at {0}")]
    NotFound(BlockPos),

    #[error("Field at {0} has no matched recipe")]
    NotMatched(BlockPos),

    #[error("Wrong catalyst: expected {expected}, got {found}")]
    WrongCatalyst { expected: ItemStack, found: ItemStack },

    #[error("Unknown dimension: {0}")]
    UnknownDimension(DimensionId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Failed to read world snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse world snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}
