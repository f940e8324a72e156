use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::block::{BlockState, ItemStack};
use crate::error::WorldError;
use crate::pos::{BlockPos, BlockRegion};

/// Identifies a world/dimension, e.g. `minecraft:overworld`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(String);

impl DimensionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn overworld() -> Self {
        Self::new("minecraft:overworld")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DimensionId {
    fn default() -> Self {
        Self::overworld()
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read access to block data.
///
/// This lets the matching engine query the world without depending on a
/// specific storage implementation. Positions with no stored state are air.
pub trait WorldView {
    /// The block state at a position, `None` when nothing is stored there
    fn block_state(&self, pos: BlockPos) -> Option<&BlockState>;

    fn is_air(&self, pos: BlockPos) -> bool {
        self.block_state(pos).map_or(true, BlockState::is_air)
    }

    /// All non-air positions inside a region, in region iteration order
    fn non_air_positions(&self, region: &BlockRegion) -> Vec<BlockPos> {
        region.positions().filter(|p| !self.is_air(*p)).collect()
    }
}

/// Write access used when a craft completes
pub trait WorldEdit: WorldView {
    fn set_block(&mut self, pos: BlockPos, state: BlockState);

    /// Replace the block with air, returning what was there
    fn remove_block(&mut self, pos: BlockPos) -> Option<BlockState>;

    /// Spawn item stacks into the world at a position
    fn drop_items(&mut self, pos: BlockPos, items: &[ItemStack]);
}

/// Block entry in a JSON world snapshot
#[derive(Debug, Clone, Deserialize)]
struct SnapshotBlock {
    x: i32,
    y: i32,
    z: i32,
    state: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WorldSnapshot {
    #[serde(default)]
    blocks: Vec<SnapshotBlock>,
}

/// In-memory block storage
#[derive(Debug, Default)]
pub struct BlockWorld {
    blocks: HashMap<BlockPos, BlockState>,
    /// Items dropped by completed crafts, oldest first
    dropped: Vec<(BlockPos, ItemStack)>,
}

impl BlockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load blocks from a JSON snapshot file
    pub fn load_from_file(path: &Path) -> Result<Self, WorldError> {
        let json = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let world = Self::from_json(&json)?;
        info!("Loaded {} blocks from {:?}", world.block_count(), path);
        Ok(world)
    }

    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let snapshot: WorldSnapshot = serde_json::from_str(json)?;
        let mut world = Self::new();
        for block in snapshot.blocks {
            world.set_block(
                BlockPos::new(block.x, block.y, block.z),
                BlockState::new(block.state),
            );
        }
        Ok(world)
    }

    /// Set every position in a region to the same state
    pub fn fill(&mut self, region: &BlockRegion, state: &BlockState) {
        for pos in region.positions() {
            self.set_block(pos, state.clone());
        }
    }

    /// Positions of every block with the given id, sorted
    pub fn positions_of(&self, block_id: &str) -> Vec<BlockPos> {
        let mut positions: Vec<BlockPos> = self
            .blocks
            .iter()
            .filter(|(_, state)| state.block_id() == block_id)
            .map(|(pos, _)| *pos)
            .collect();
        positions.sort();
        positions
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn dropped_items(&self) -> &[(BlockPos, ItemStack)] {
        &self.dropped
    }

    /// Drain dropped items (e.g. once a player has collected them)
    pub fn take_dropped_items(&mut self) -> Vec<(BlockPos, ItemStack)> {
        std::mem::take(&mut self.dropped)
    }
}

impl WorldView for BlockWorld {
    fn block_state(&self, pos: BlockPos) -> Option<&BlockState> {
        self.blocks.get(&pos)
    }
}

impl WorldEdit for BlockWorld {
    fn set_block(&mut self, pos: BlockPos, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    fn remove_block(&mut self, pos: BlockPos) -> Option<BlockState> {
        self.blocks.remove(&pos)
    }

    fn drop_items(&mut self, pos: BlockPos, items: &[ItemStack]) {
        self.dropped
            .extend(items.iter().filter(|i| !i.is_empty()).map(|i| (pos, i.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_is_not_stored() {
        let mut world = BlockWorld::new();
        let pos = BlockPos::new(1, 2, 3);
        world.set_block(pos, BlockState::new("minecraft:stone"));
        assert!(!world.is_air(pos));

        world.set_block(pos, BlockState::air());
        assert!(world.is_air(pos));
        assert_eq!(world.block_count(), 0);
    }

    #[test]
    fn test_non_air_positions() {
        let mut world = BlockWorld::new();
        world.set_block(BlockPos::new(0, 0, 0), BlockState::new("minecraft:stone"));
        world.set_block(BlockPos::new(2, 0, 1), BlockState::new("minecraft:dirt"));
        world.set_block(BlockPos::new(5, 0, 5), BlockState::new("minecraft:dirt"));

        let region = BlockRegion::new(BlockPos::ORIGIN, BlockPos::new(3, 1, 3));
        assert_eq!(
            world.non_air_positions(&region),
            vec![BlockPos::new(0, 0, 0), BlockPos::new(2, 0, 1)]
        );
    }

    #[test]
    fn test_load_snapshot_json() {
        let json = r#"{
            "blocks": [
                { "x": 0, "y": 64, "z": 0, "state": "minecraft:iron_block" },
                { "x": 1, "y": 64, "z": 0, "state": "minecraft:air" }
            ]
        }"#;
        let world = BlockWorld::from_json(json).unwrap();
        assert_eq!(world.block_count(), 1);
        assert_eq!(
            world.block_state(BlockPos::new(0, 64, 0)),
            Some(&BlockState::new("minecraft:iron_block"))
        );
    }

    #[test]
    fn test_load_snapshot_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("world.json");
        std::fs::write(
            &path,
            r#"{ "blocks": [ { "x": 3, "y": 0, "z": -2, "state": "minecraft:stone" } ] }"#,
        )
        .unwrap();

        let world = BlockWorld::load_from_file(&path).unwrap();
        assert!(!world.is_air(BlockPos::new(3, 0, -2)));

        let missing = BlockWorld::load_from_file(&temp_dir.path().join("missing.json"));
        assert!(matches!(missing, Err(WorldError::Io { .. })));
    }

    #[test]
    fn test_positions_of_ignores_properties() {
        let mut world = BlockWorld::new();
        world.set_block(
            BlockPos::new(4, 0, 0),
            BlockState::new("compactcrafting:field_projector[facing=west]"),
        );
        world.set_block(
            BlockPos::new(-4, 0, 0),
            BlockState::new("compactcrafting:field_projector[facing=east]"),
        );
        world.set_block(BlockPos::new(0, 0, 0), BlockState::new("minecraft:stone"));

        assert_eq!(
            world.positions_of("compactcrafting:field_projector"),
            vec![BlockPos::new(-4, 0, 0), BlockPos::new(4, 0, 0)]
        );
    }

    #[test]
    fn test_drop_items_skips_empty_stacks() {
        let mut world = BlockWorld::new();
        world.drop_items(
            BlockPos::ORIGIN,
            &[ItemStack::new("minecraft:diamond", 1), ItemStack::new("minecraft:dirt", 0)],
        );
        assert_eq!(world.dropped_items().len(), 1);
        assert_eq!(world.take_dropped_items().len(), 1);
        assert!(world.dropped_items().is_empty());
    }
}
