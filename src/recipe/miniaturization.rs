//! Miniaturization Recipes
//!
//! A stack of layers (bottom to top), the component key -> block state
//! dictionary, the catalyst and the craft outputs.

use std::collections::{HashMap, HashSet};

use super::layer::RecipeLayer;
use crate::block::{BlockState, ItemStack};
use crate::error::RecipeError;
use crate::pos::Dimensions;

#[derive(Debug, Clone)]
pub struct MiniaturizationRecipe {
    id: String,
    layers: Vec<RecipeLayer>,
    /// Component keys in declaration order
    component_keys: Vec<String>,
    components: HashMap<String, BlockState>,
    catalyst: ItemStack,
    outputs: Vec<ItemStack>,
    dimensions: Dimensions,
}

impl MiniaturizationRecipe {
    /// Build a recipe. Does not validate; see [`MiniaturizationRecipe::validate`].
    pub fn new(
        id: impl Into<String>,
        layers: Vec<RecipeLayer>,
        components: Vec<(String, BlockState)>,
        catalyst: ItemStack,
        outputs: Vec<ItemStack>,
    ) -> Self {
        let mut component_keys = Vec::with_capacity(components.len());
        let mut component_map = HashMap::with_capacity(components.len());
        for (key, state) in components {
            if !component_map.contains_key(&key) {
                component_keys.push(key.clone());
            }
            component_map.insert(key, state);
        }

        let dimensions = Self::compute_dimensions(&layers);

        Self {
            id: id.into(),
            layers,
            component_keys,
            components: component_map,
            catalyst,
            outputs,
            dimensions,
        }
    }

    fn compute_dimensions(layers: &[RecipeLayer]) -> Dimensions {
        let (mut x, mut z) = (0, 0);
        for layer in layers {
            if layer.filled_count() == 0 {
                continue;
            }
            let dims = layer.dimensions();
            let offset = layer.offset();
            x = x.max(offset.x + dims.x);
            z = z.max(offset.z + dims.z);
        }
        Dimensions::new(x, layers.len() as i32, z)
    }

    /// Check the structural invariants a loaded recipe must hold
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.layers.is_empty() {
            return Err(RecipeError::NoLayers(self.id.clone()));
        }
        if self.outputs.iter().all(ItemStack::is_empty) {
            return Err(RecipeError::NoOutputs(self.id.clone()));
        }
        for layer in &self.layers {
            for key in layer.component_keys() {
                if !self.components.contains_key(key) {
                    return Err(RecipeError::MissingComponent {
                        recipe: self.id.clone(),
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Component keys in declaration order
    pub fn component_keys(&self) -> &[String] {
        &self.component_keys
    }

    pub fn component(&self, key: &str) -> Option<&BlockState> {
        self.components.get(key)
    }

    /// Required block count per component, summed over all layers.
    ///
    /// Sorted by total, largest first; equal totals keep declaration order.
    /// Declared but unused components appear with a total of 0.
    pub fn component_totals(&self) -> Vec<(String, u32)> {
        let mut sums: HashMap<String, u32> = HashMap::new();
        for layer in &self.layers {
            for (key, count) in layer.component_totals() {
                *sums.entry(key).or_insert(0) += count;
            }
        }

        let mut seen = HashSet::new();
        let mut totals: Vec<(String, u32)> = Vec::new();
        for key in &self.component_keys {
            seen.insert(key.as_str());
            totals.push((key.clone(), sums.get(key).copied().unwrap_or(0)));
        }
        // Keys used by layers but never declared (corrupt recipes) still count
        let mut undeclared: Vec<(&String, &u32)> =
            sums.iter().filter(|(k, _)| !seen.contains(k.as_str())).collect();
        undeclared.sort();
        totals.extend(undeclared.into_iter().map(|(k, v)| (k.clone(), *v)));

        totals.sort_by(|a, b| b.1.cmp(&a.1));
        totals
    }

    pub fn component_total(&self, key: &str) -> u32 {
        self.layers
            .iter()
            .filter_map(|layer| layer.component_totals().get(key).copied())
            .sum()
    }

    pub fn catalyst(&self) -> &ItemStack {
        &self.catalyst
    }

    pub fn outputs(&self) -> &[ItemStack] {
        &self.outputs
    }

    /// Overall bounding box: x/z cover every layer, y is the layer count
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Layer at relative height `y`, `None` when out of range
    pub fn layer(&self, y: i32) -> Option<&RecipeLayer> {
        usize::try_from(y).ok().and_then(|idx| self.layers.get(idx))
    }

    pub fn layers(&self) -> &[RecipeLayer] {
        &self.layers
    }

    pub fn height(&self) -> i32 {
        self.layers.len() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::BlockPos;
    use crate::recipe::layer::{ComponentLayer, MixedLayer};

    fn two_layer_recipe() -> MiniaturizationRecipe {
        MiniaturizationRecipe::new(
            "two_layer",
            vec![
                RecipeLayer::Component(ComponentLayer::new(
                    "A",
                    [BlockPos::new(0, 0, 0), BlockPos::new(1, 0, 0)],
                )),
                RecipeLayer::Component(ComponentLayer::new("B", [BlockPos::new(0, 0, 0)])),
            ],
            vec![
                ("A".to_string(), BlockState::new("minecraft:iron_block")),
                ("B".to_string(), BlockState::new("minecraft:gold_block")),
            ],
            ItemStack::new("minecraft:redstone", 1),
            vec![ItemStack::new("minecraft:diamond", 1)],
        )
    }

    #[test]
    fn test_dimensions() {
        let recipe = two_layer_recipe();
        assert_eq!(recipe.dimensions(), Dimensions::new(2, 2, 1));
        assert_eq!(recipe.height(), 2);
    }

    #[test]
    fn test_dimensions_include_layer_offset() {
        let recipe = MiniaturizationRecipe::new(
            "offset",
            vec![RecipeLayer::Component(ComponentLayer::new(
                "A",
                [BlockPos::new(2, 0, 1)],
            ))],
            vec![("A".to_string(), BlockState::new("minecraft:stone"))],
            ItemStack::new("minecraft:redstone", 1),
            vec![ItemStack::new("minecraft:diamond", 1)],
        );
        assert_eq!(recipe.dimensions(), Dimensions::new(3, 1, 2));
    }

    #[test]
    fn test_layer_lookup_out_of_range() {
        let recipe = two_layer_recipe();
        assert!(recipe.layer(0).is_some());
        assert!(recipe.layer(1).is_some());
        assert!(recipe.layer(2).is_none());
        assert!(recipe.layer(-1).is_none());
    }

    #[test]
    fn test_component_totals_sum_layers() {
        let recipe = MiniaturizationRecipe::new(
            "sum",
            vec![
                RecipeLayer::Component(ComponentLayer::new(
                    "A",
                    [BlockPos::new(0, 0, 0), BlockPos::new(1, 0, 0)],
                )),
                RecipeLayer::Mixed(MixedLayer::new([
                    (BlockPos::new(0, 0, 0), "A".to_string()),
                    (BlockPos::new(1, 0, 0), "B".to_string()),
                ])),
            ],
            vec![
                ("A".to_string(), BlockState::new("minecraft:iron_block")),
                ("B".to_string(), BlockState::new("minecraft:gold_block")),
            ],
            ItemStack::new("minecraft:redstone", 1),
            vec![ItemStack::new("minecraft:diamond", 1)],
        );

        for (key, total) in recipe.component_totals() {
            let per_layer: u32 = recipe
                .layers()
                .iter()
                .map(|l| l.component_totals().get(&key).copied().unwrap_or(0))
                .sum();
            assert_eq!(total, per_layer);
            assert_eq!(recipe.component_total(&key), per_layer);
        }
        assert_eq!(recipe.component_totals()[0], ("A".to_string(), 3));
    }

    #[test]
    fn test_component_totals_ties_keep_declaration_order() {
        let recipe = MiniaturizationRecipe::new(
            "ties",
            vec![RecipeLayer::Mixed(MixedLayer::new([
                (BlockPos::new(0, 0, 0), "Z".to_string()),
                (BlockPos::new(1, 0, 0), "A".to_string()),
            ]))],
            vec![
                ("Z".to_string(), BlockState::new("minecraft:stone")),
                ("A".to_string(), BlockState::new("minecraft:dirt")),
                ("U".to_string(), BlockState::new("minecraft:sand")),
            ],
            ItemStack::new("minecraft:redstone", 1),
            vec![ItemStack::new("minecraft:diamond", 1)],
        );

        let keys: Vec<String> = recipe.component_totals().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Z", "A", "U"]);
    }

    #[test]
    fn test_validate() {
        assert!(two_layer_recipe().validate().is_ok());

        let missing = MiniaturizationRecipe::new(
            "missing",
            vec![RecipeLayer::Component(ComponentLayer::new("X", [BlockPos::ORIGIN]))],
            vec![("A".to_string(), BlockState::new("minecraft:stone"))],
            ItemStack::new("minecraft:redstone", 1),
            vec![ItemStack::new("minecraft:diamond", 1)],
        );
        assert!(matches!(
            missing.validate(),
            Err(RecipeError::MissingComponent { ref key, .. }) if key == "X"
        ));

        let no_outputs = MiniaturizationRecipe::new(
            "no_outputs",
            vec![RecipeLayer::Component(ComponentLayer::new("A", [BlockPos::ORIGIN]))],
            vec![("A".to_string(), BlockState::new("minecraft:stone"))],
            ItemStack::new("minecraft:redstone", 1),
            vec![],
        );
        assert!(matches!(no_outputs.validate(), Err(RecipeError::NoOutputs(_))));

        let no_layers = MiniaturizationRecipe::new(
            "no_layers",
            vec![],
            vec![],
            ItemStack::new("minecraft:redstone", 1),
            vec![ItemStack::new("minecraft:diamond", 1)],
        );
        assert!(matches!(no_layers.validate(), Err(RecipeError::NoLayers(_))));
    }
}
