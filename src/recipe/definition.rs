//! Recipe Definitions
//!
//! TOML deserialization structures (Raw*) and their conversion into
//! validated [`MiniaturizationRecipe`]s.

use serde::Deserialize;
use std::collections::HashSet;

use super::layer::{ComponentLayer, MixedLayer, RecipeLayer};
use super::miniaturization::MiniaturizationRecipe;
use crate::block::{BlockState, ItemStack};
use crate::error::RecipeError;
use crate::pos::BlockPos;

/// Characters treated as an empty cell in a layer pattern
const EMPTY_CELLS: [char; 3] = ['-', '_', ' '];

// ============================================================================
// Raw TOML Structures
// ============================================================================

/// Raw component entry: a key and the block state it stands for
#[derive(Debug, Clone, Deserialize)]
pub struct RawComponent {
    pub key: String,
    pub block: String,
}

/// Raw layer entry, listed bottom to top
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawLayer {
    /// One component at explicit `[x, z]` positions
    Component {
        component: String,
        #[serde(default)]
        filled: Vec<[i32; 2]>,
    },
    /// Rows along z, one character per x; each character is a component key
    Mixed { pattern: Vec<String> },
}

/// Raw recipe definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecipeDefinition {
    pub catalyst: ItemStack,
    #[serde(default)]
    pub components: Vec<RawComponent>,
    #[serde(default)]
    pub layers: Vec<RawLayer>,
    #[serde(default)]
    pub outputs: Vec<ItemStack>,
}

// ============================================================================
// Conversion
// ============================================================================

impl RawLayer {
    fn into_layer(self) -> RecipeLayer {
        match self {
            RawLayer::Component { component, filled } => RecipeLayer::Component(
                ComponentLayer::new(component, filled.into_iter().map(|[x, z]| BlockPos::new(x, 0, z))),
            ),
            RawLayer::Mixed { pattern } => {
                let mut positions = Vec::new();
                for (z, row) in pattern.iter().enumerate() {
                    for (x, cell) in row.chars().enumerate() {
                        if EMPTY_CELLS.contains(&cell) {
                            continue;
                        }
                        positions.push((BlockPos::new(x as i32, 0, z as i32), cell.to_string()));
                    }
                }
                RecipeLayer::Mixed(MixedLayer::new(positions))
            }
        }
    }
}

impl RawRecipeDefinition {
    /// Resolve into a recipe, enforcing the recipe invariants
    pub fn into_recipe(self, id: &str) -> Result<MiniaturizationRecipe, RecipeError> {
        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.key.as_str()) {
                return Err(RecipeError::DuplicateComponent {
                    recipe: id.to_string(),
                    key: component.key.clone(),
                });
            }
        }

        let components = self
            .components
            .into_iter()
            .map(|c| (c.key, BlockState::new(c.block)))
            .collect();
        let layers = self.layers.into_iter().map(RawLayer::into_layer).collect();

        let recipe = MiniaturizationRecipe::new(id, layers, components, self.catalyst, self.outputs);
        recipe.validate()?;
        Ok(recipe)
    }
}
