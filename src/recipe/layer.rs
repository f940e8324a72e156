//! Recipe Layers
//!
//! One horizontal slice of a recipe template and the predicate that checks a
//! slice of the world against it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use super::miniaturization::MiniaturizationRecipe;
use crate::block::BlockState;
use crate::pos::{BlockPos, BlockRegion, Dimensions};
use crate::world::WorldView;

/// How a layer compares the blocks it finds against its template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Non-air positions must be exactly the template positions
    #[default]
    Exact,
    /// Non-air positions must all be template positions; template positions may be empty
    Subset,
}

/// A single-component layer: every filled position holds the same component.
///
/// ```text
///   X ----->
/// Z   X-X
/// |   -X-
/// |   X-X
/// ```
/// = [0, 0], [2, 0], [1, 1], [0, 2], [2, 2]
#[derive(Debug, Clone)]
pub struct ComponentLayer {
    component: String,
    filled: HashSet<BlockPos>,
    dimensions: Dimensions,
    offset: BlockPos,
}

/// A layer mixing several components, one key per filled position
#[derive(Debug, Clone)]
pub struct MixedLayer {
    positions: HashMap<BlockPos, String>,
    dimensions: Dimensions,
    offset: BlockPos,
}

#[derive(Debug, Clone)]
pub enum RecipeLayer {
    Component(ComponentLayer),
    Mixed(MixedLayer),
}

/// Bounding box of a set of positions as (dimensions, minimum corner).
/// Only x/z are considered since a layer is one block high.
fn normalize<'a>(
    positions: impl Iterator<Item = &'a BlockPos> + Clone,
) -> (Dimensions, BlockPos) {
    let mut iter = positions.clone().peekable();
    if iter.peek().is_none() {
        return (Dimensions::new(0, 1, 0), BlockPos::ORIGIN);
    }

    let (mut min_x, mut min_z) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_z) = (i32::MIN, i32::MIN);
    for p in positions {
        min_x = min_x.min(p.x);
        min_z = min_z.min(p.z);
        max_x = max_x.max(p.x);
        max_z = max_z.max(p.z);
    }

    (
        Dimensions::new(max_x - min_x + 1, 1, max_z - min_z + 1),
        BlockPos::new(min_x, 0, min_z),
    )
}

fn flatten(pos: BlockPos, offset: BlockPos) -> BlockPos {
    BlockPos::new(pos.x - offset.x, 0, pos.z - offset.z)
}

impl ComponentLayer {
    pub fn new(component: impl Into<String>, filled: impl IntoIterator<Item = BlockPos>) -> Self {
        let raw: Vec<BlockPos> = filled.into_iter().collect();
        let (dimensions, offset) = normalize(raw.iter());
        Self {
            component: component.into(),
            filled: raw.into_iter().map(|p| flatten(p, offset)).collect(),
            dimensions,
            offset,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Zero-based filled positions
    pub fn filled_positions(&self) -> &HashSet<BlockPos> {
        &self.filled
    }
}

impl MixedLayer {
    pub fn new(positions: impl IntoIterator<Item = (BlockPos, String)>) -> Self {
        let raw: Vec<(BlockPos, String)> = positions.into_iter().collect();
        let (dimensions, offset) = normalize(raw.iter().map(|(p, _)| p));
        Self {
            positions: raw
                .into_iter()
                .map(|(p, key)| (flatten(p, offset), key))
                .collect(),
            dimensions,
            offset,
        }
    }

    /// Zero-based position -> component key
    pub fn positions(&self) -> &HashMap<BlockPos, String> {
        &self.positions
    }

    pub fn component_at(&self, relative: BlockPos) -> Option<&str> {
        self.positions.get(&relative).map(String::as_str)
    }
}

impl RecipeLayer {
    /// Bounding box of the filled positions (y is always 1)
    pub fn dimensions(&self) -> Dimensions {
        match self {
            RecipeLayer::Component(layer) => layer.dimensions,
            RecipeLayer::Mixed(layer) => layer.dimensions,
        }
    }

    /// Minimum corner of the filled positions as written in the definition
    pub fn offset(&self) -> BlockPos {
        match self {
            RecipeLayer::Component(layer) => layer.offset,
            RecipeLayer::Mixed(layer) => layer.offset,
        }
    }

    /// Distinct component keys this layer uses
    pub fn component_keys(&self) -> Vec<&str> {
        match self {
            RecipeLayer::Component(layer) => vec![layer.component.as_str()],
            RecipeLayer::Mixed(layer) => {
                let mut keys: Vec<&str> = layer.positions.values().map(String::as_str).collect();
                keys.sort_unstable();
                keys.dedup();
                keys
            }
        }
    }

    /// Number of filled positions per component key
    pub fn component_totals(&self) -> HashMap<String, u32> {
        let mut totals = HashMap::new();
        match self {
            RecipeLayer::Component(layer) => {
                totals.insert(layer.component.clone(), layer.filled.len() as u32);
            }
            RecipeLayer::Mixed(layer) => {
                for key in layer.positions.values() {
                    *totals.entry(key.clone()).or_insert(0) += 1;
                }
            }
        }
        totals
    }

    pub fn filled_count(&self) -> usize {
        match self {
            RecipeLayer::Component(layer) => layer.filled.len(),
            RecipeLayer::Mixed(layer) => layer.positions.len(),
        }
    }

    /// Check a one-block-high slice of the world against this layer.
    ///
    /// Positions are normalized against the region's minimum corner, so the
    /// template is anchored to that corner.
    pub fn matches<W: WorldView + ?Sized>(
        &self,
        world: &W,
        recipe: &MiniaturizationRecipe,
        region: &BlockRegion,
        mode: MatchMode,
    ) -> bool {
        match self {
            RecipeLayer::Component(layer) => layer.matches(world, recipe, region, mode),
            RecipeLayer::Mixed(layer) => layer.matches(world, recipe, region, mode),
        }
    }
}

/// Resolve a component key, logging when the recipe is corrupt
fn resolve_component<'r>(recipe: &'r MiniaturizationRecipe, key: &str) -> Option<&'r BlockState> {
    let component = recipe.component(key);
    if component.is_none() {
        warn!(
            "Attempted to find component with key '{}' in recipe '{}' but no component was found",
            key,
            recipe.id()
        );
    }
    component
}

fn too_small(dimensions: Dimensions, region: &BlockRegion) -> bool {
    dimensions.x > region.size_x() || dimensions.z > region.size_z()
}

impl ComponentLayer {
    fn matches<W: WorldView + ?Sized>(
        &self,
        world: &W,
        recipe: &MiniaturizationRecipe,
        region: &BlockRegion,
        mode: MatchMode,
    ) -> bool {
        let Some(component) = resolve_component(recipe, &self.component) else {
            return false;
        };

        if too_small(self.dimensions, region) {
            return false;
        }

        let field_positions = world.non_air_positions(region);

        // Any other block type in the slice rules the layer out
        let invalid_block = field_positions
            .iter()
            .filter_map(|p| world.block_state(*p))
            .any(|state| state != component);
        if invalid_block {
            return false;
        }

        let contained = field_positions
            .iter()
            .map(|p| flatten(*p - region.min, self.offset))
            .all(|np| self.filled.contains(&np));

        match mode {
            MatchMode::Subset => contained,
            MatchMode::Exact => contained && field_positions.len() == self.filled.len(),
        }
    }
}

impl MixedLayer {
    fn matches<W: WorldView + ?Sized>(
        &self,
        world: &W,
        recipe: &MiniaturizationRecipe,
        region: &BlockRegion,
        mode: MatchMode,
    ) -> bool {
        // Every key must resolve, even ones not present in the world right now
        let mut required: HashMap<&str, &BlockState> = HashMap::new();
        for key in self.positions.values() {
            if required.contains_key(key.as_str()) {
                continue;
            }
            match resolve_component(recipe, key) {
                Some(state) => {
                    required.insert(key.as_str(), state);
                }
                None => return false,
            }
        }

        if too_small(self.dimensions, region) {
            return false;
        }

        let field_positions = world.non_air_positions(region);

        for pos in &field_positions {
            let relative = flatten(*pos - region.min, self.offset);
            let Some(key) = self.positions.get(&relative) else {
                return false;
            };
            let Some(state) = world.block_state(*pos) else {
                return false;
            };
            if required.get(key.as_str()) != Some(&state) {
                return false;
            }
        }

        match mode {
            MatchMode::Subset => true,
            MatchMode::Exact => field_positions.len() == self.positions.len(),
        }
    }
}
