//! Miniaturization Recipes
//!
//! Layer templates, recipe definitions and the registry that supplies
//! candidate recipes to fields.

pub mod definition;
pub mod layer;
pub mod miniaturization;
pub mod registry;

pub use definition::{RawComponent, RawLayer, RawRecipeDefinition};
pub use layer::{ComponentLayer, MatchMode, MixedLayer, RecipeLayer};
pub use miniaturization::MiniaturizationRecipe;
pub use registry::{HotReloadEvent, RecipeRegistry, RecipeSource};
