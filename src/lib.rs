//! Miniaturization field recipe matching.
//!
//! A field is a cubic volume bounded by four projector blocks. Every loaded
//! tick it compares its contents against layered block recipes and, once a
//! catalyst confirms the match, replaces them with the recipe outputs.

pub mod block;
pub mod config;
pub mod error;
pub mod field;
pub mod host;
pub mod pos;
pub mod recipe;
pub mod world;

pub use block::{BlockState, ItemStack};
pub use config::ServerConfig;
pub use error::{ConfigError, FieldError, RecipeError, WorldError};
pub use field::{ActiveWorldFields, FieldEvent, FieldRef, FieldSize, MiniaturizationField};
pub use host::FieldHost;
pub use pos::{BlockPos, BlockRegion, ChunkPos};
pub use recipe::{MiniaturizationRecipe, RecipeRegistry};
pub use world::{BlockWorld, DimensionId, WorldEdit, WorldView};
