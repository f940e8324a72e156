//! Miniaturization Fields
//!
//! A single active field anchored at a center position. Each loaded tick the
//! field re-scans its volume against the candidate recipes, or advances an
//! in-progress craft.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::events::FieldEvent;
use super::size::FieldSize;
use crate::block::ItemStack;
use crate::error::FieldError;
use crate::pos::{BlockPos, BlockRegion};
use crate::recipe::{MatchMode, MiniaturizationRecipe, RecipeSource};
use crate::world::{DimensionId, WorldEdit, WorldView};

fn default_craft_duration() -> u32 {
    100
}

/// Per-field behaviour, normally taken from the server config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSettings {
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Ticks between catalyst confirmation and output
    #[serde(default = "default_craft_duration")]
    pub craft_duration_ticks: u32,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            craft_duration_ticks: default_craft_duration(),
        }
    }
}

/// Lifecycle of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldState {
    /// Shell present, no recipe matched
    Empty,
    /// Contents are being evaluated this tick
    Scanning,
    /// Contents satisfy the cached recipe
    Matched,
    /// Catalyst accepted, waiting for the craft to finish
    Crafting,
    /// Shell broken; terminal
    Invalid,
}

impl FieldState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldState::Empty => "empty",
            FieldState::Scanning => "scanning",
            FieldState::Matched => "matched",
            FieldState::Crafting => "crafting",
            FieldState::Invalid => "invalid",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MiniaturizationField {
    center: BlockPos,
    size: FieldSize,
    region: BlockRegion,
    dimension: Option<DimensionId>,
    loaded: bool,
    state: FieldState,
    matched: Option<Arc<MiniaturizationRecipe>>,
    craft_progress: u32,
    settings: FieldSettings,
}

impl MiniaturizationField {
    /// A new, empty field. Fields are created by a scan in a loaded chunk, so
    /// they start out loaded.
    pub fn new(center: BlockPos, size: FieldSize) -> Self {
        Self {
            center,
            size,
            region: size.region_around(center),
            dimension: None,
            loaded: true,
            state: FieldState::Empty,
            matched: None,
            craft_progress: 0,
            settings: FieldSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FieldSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn center(&self) -> BlockPos {
        self.center
    }

    pub fn size(&self) -> FieldSize {
        self.size
    }

    pub fn region(&self) -> &BlockRegion {
        &self.region
    }

    pub fn dimension(&self) -> Option<&DimensionId> {
        self.dimension.as_ref()
    }

    pub(crate) fn set_dimension(&mut self, dimension: DimensionId) {
        self.dimension = Some(dimension);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn matched_recipe(&self) -> Option<&Arc<MiniaturizationRecipe>> {
        self.matched.as_ref()
    }

    pub fn craft_progress(&self) -> u32 {
        self.craft_progress
    }

    pub fn is_invalid(&self) -> bool {
        self.state == FieldState::Invalid
    }

    /// Advance the field by one simulation step.
    ///
    /// No-op while the backing chunk is unloaded or the field is invalid.
    pub fn tick<W, R>(&mut self, world: &mut W, recipes: &R) -> Option<FieldEvent>
    where
        W: WorldEdit + ?Sized,
        R: RecipeSource + ?Sized,
    {
        if !self.loaded {
            return None;
        }

        match self.state {
            FieldState::Invalid => None,
            FieldState::Crafting => {
                if let Some(event) = self.check_crafting_contents(&*world) {
                    return Some(event);
                }
                self.craft_progress += 1;
                if self.craft_progress >= self.settings.craft_duration_ticks {
                    self.complete_craft(world)
                } else {
                    None
                }
            }
            FieldState::Empty | FieldState::Scanning | FieldState::Matched => {
                self.scan(&*world, recipes)
            }
        }
    }

    fn scan<W, R>(&mut self, world: &W, recipes: &R) -> Option<FieldEvent>
    where
        W: WorldView + ?Sized,
        R: RecipeSource + ?Sized,
    {
        let previous = self.matched.take();
        self.state = FieldState::Scanning;

        let found = self.find_match(world, recipes);
        self.state = if found.is_some() {
            FieldState::Matched
        } else {
            FieldState::Empty
        };
        self.matched = found;

        match (previous, &self.matched) {
            (Some(old), Some(new)) if old.id() == new.id() => None,
            (_, Some(new)) => {
                debug!("Field {} matched recipe '{}'", self.center, new.id());
                Some(FieldEvent::RecipeMatched {
                    center: self.center,
                    recipe_id: new.id().to_string(),
                })
            }
            (Some(old), None) => {
                debug!("Field {} lost recipe '{}'", self.center, old.id());
                Some(FieldEvent::MatchLost {
                    center: self.center,
                    recipe_id: old.id().to_string(),
                })
            }
            (None, None) => None,
        }
    }

    /// First candidate recipe the current contents satisfy
    pub fn find_match<W, R>(&self, world: &W, recipes: &R) -> Option<Arc<MiniaturizationRecipe>>
    where
        W: WorldView + ?Sized,
        R: RecipeSource + ?Sized,
    {
        if world.non_air_positions(&self.region).is_empty() {
            return None;
        }

        recipes
            .candidates()
            .iter()
            .find(|recipe| self.matches_recipe(world, recipe))
            .cloned()
    }

    /// Check every field layer bottom-up, stopping at the first mismatch.
    ///
    /// Each recipe layer is matched against the recipe footprint centered in
    /// the field slice; blocks outside that footprint, or in field layers
    /// above the recipe, fail the match.
    pub fn matches_recipe<W: WorldView + ?Sized>(
        &self,
        world: &W,
        recipe: &MiniaturizationRecipe,
    ) -> bool {
        let footprint = recipe.dimensions();
        if footprint.x > self.region.size_x()
            || footprint.z > self.region.size_z()
            || footprint.y > self.region.size_y()
        {
            return false;
        }

        for y in 0..self.region.size_y() {
            let Some(slice) = self.region.layer(y) else {
                return false;
            };

            let Some(layer) = recipe.layer(y) else {
                if !world.non_air_positions(&slice).is_empty() {
                    return false;
                }
                continue;
            };

            let Some(candidate) = slice.centered_footprint(footprint.x, footprint.z) else {
                return false;
            };

            let stray = world
                .non_air_positions(&slice)
                .into_iter()
                .any(|p| !candidate.contains(p));
            if stray {
                return false;
            }

            if !layer.matches(world, recipe, &candidate, self.settings.match_mode) {
                return false;
            }
        }

        true
    }

    /// Confirm the craft with a catalyst: `Matched -> Crafting`
    pub fn begin_craft(&mut self, catalyst: &ItemStack) -> Result<(), FieldError> {
        let recipe = match (&self.state, &self.matched) {
            (FieldState::Matched, Some(recipe)) => recipe,
            _ => return Err(FieldError::NotMatched(self.center)),
        };

        if !catalyst.satisfies(recipe.catalyst()) {
            return Err(FieldError::WrongCatalyst {
                expected: recipe.catalyst().clone(),
                found: catalyst.clone(),
            });
        }

        debug!("Field {} crafting '{}'", self.center, recipe.id());
        self.state = FieldState::Crafting;
        self.craft_progress = 0;
        Ok(())
    }

    /// Cancel the craft if the field no longer holds the matched recipe.
    /// Returns the `MatchLost` event when it does.
    fn check_crafting_contents<W: WorldView + ?Sized>(&mut self, world: &W) -> Option<FieldEvent> {
        let recipe = self.matched.clone()?;
        if self.matches_recipe(world, &recipe) {
            return None;
        }

        info!(
            "Field {} contents changed, cancelling craft of '{}'",
            self.center,
            recipe.id()
        );
        self.state = FieldState::Empty;
        self.matched = None;
        self.craft_progress = 0;

        Some(FieldEvent::MatchLost {
            center: self.center,
            recipe_id: recipe.id().to_string(),
        })
    }

    /// Replace the field contents with the recipe outputs and return to `Empty`.
    /// Returns `None` if nothing is being crafted. If the contents no longer
    /// match, the craft is cancelled instead and `MatchLost` is returned.
    pub fn complete_craft<W: WorldEdit + ?Sized>(&mut self, world: &mut W) -> Option<FieldEvent> {
        if self.state != FieldState::Crafting {
            return None;
        }
        if let Some(cancelled) = self.check_crafting_contents(&*world) {
            return Some(cancelled);
        }
        let recipe = self.matched.take()?;

        for pos in world.non_air_positions(&self.region) {
            world.remove_block(pos);
        }
        world.drop_items(self.center, recipe.outputs());

        self.state = FieldState::Empty;
        self.craft_progress = 0;

        info!(
            "Field {} crafted '{}' -> {} output stack(s)",
            self.center,
            recipe.id(),
            recipe.outputs().len()
        );

        Some(FieldEvent::CraftCompleted {
            center: self.center,
            recipe_id: recipe.id().to_string(),
            outputs: recipe.outputs().to_vec(),
        })
    }

    /// Mark the shell as broken. Terminal.
    pub fn invalidate(&mut self) {
        self.state = FieldState::Invalid;
        self.matched = None;
        self.craft_progress = 0;
    }
}
