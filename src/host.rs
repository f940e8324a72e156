//! Field Host
//!
//! Owns per-dimension state: block data and the active field registry, paired
//! under one lock so registry updates and ticks never interleave. Dimensions
//! are created when a world loads and destroyed when it unloads.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::block::ItemStack;
use crate::config::ServerConfig;
use crate::error::FieldError;
use crate::field::{
    ActiveWorldFields, FieldEvent, FieldRef, FieldSettings, MiniaturizationField, find_field,
    is_shell_intact,
};
use crate::pos::{BlockPos, ChunkPos, Direction};
use crate::recipe::RecipeRegistry;
use crate::world::{DimensionId, WorldEdit, WorldView};

/// World data and its fields
pub struct Dimension<W> {
    pub world: W,
    pub fields: ActiveWorldFields,
}

pub struct FieldHost<W> {
    dimensions: DashMap<DimensionId, Arc<Mutex<Dimension<W>>>>,
    recipes: Arc<RwLock<RecipeRegistry>>,
    settings: FieldSettings,
    projector_block: String,
}

impl<W: WorldEdit> FieldHost<W> {
    pub fn new(
        recipes: Arc<RwLock<RecipeRegistry>>,
        settings: FieldSettings,
        projector_block: impl Into<String>,
    ) -> Self {
        Self {
            dimensions: DashMap::new(),
            recipes,
            settings,
            projector_block: projector_block.into(),
        }
    }

    pub fn from_config(recipes: Arc<RwLock<RecipeRegistry>>, config: &ServerConfig) -> Self {
        Self::new(recipes, config.field, config.projector_block.clone())
    }

    pub fn recipes(&self) -> &Arc<RwLock<RecipeRegistry>> {
        &self.recipes
    }

    /// Start tracking a world. Returns false if the dimension already exists.
    pub fn create_dimension(&self, id: DimensionId, world: W) -> bool {
        if self.dimensions.contains_key(&id) {
            warn!("Dimension {} already exists", id);
            return false;
        }
        info!("Created dimension {}", id);
        let fields = ActiveWorldFields::new(id.clone());
        self.dimensions
            .insert(id, Arc::new(Mutex::new(Dimension { world, fields })));
        true
    }

    /// Stop tracking a world, unregistering all of its fields
    pub async fn destroy_dimension(&self, id: &DimensionId) -> Result<usize, FieldError> {
        let (_, dimension) = self
            .dimensions
            .remove(id)
            .ok_or_else(|| FieldError::UnknownDimension(id.clone()))?;

        let removed = dimension.lock().await.fields.clear();
        info!("Destroyed dimension {} ({} fields)", id, removed);
        Ok(removed)
    }

    pub fn dimension(&self, id: &DimensionId) -> Result<Arc<Mutex<Dimension<W>>>, FieldError> {
        self.dimensions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FieldError::UnknownDimension(id.clone()))
    }

    pub fn dimension_ids(&self) -> Vec<DimensionId> {
        let mut ids: Vec<_> = self.dimensions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Re-derive fields from projector blocks.
    ///
    /// Each position is checked for a projector; a complete shell registers a
    /// field at its center unless one is already active there.
    pub async fn discover_fields(
        &self,
        id: &DimensionId,
        projector_positions: &[BlockPos],
    ) -> Result<Vec<FieldRef>, FieldError> {
        let dimension = self.dimension(id)?;
        let mut guard = dimension.lock().await;
        let Dimension { world, fields } = &mut *guard;

        let mut registered = Vec::new();
        for pos in projector_positions {
            let Some(facing) = world
                .block_state(*pos)
                .and_then(|state| state.property("facing"))
                .and_then(|facing| facing.parse::<Direction>().ok())
            else {
                continue;
            };

            let Some((center, size)) = find_field(&*world, *pos, facing, &self.projector_block)
            else {
                continue;
            };
            if fields.has_active_field(center) {
                continue;
            }

            let field = MiniaturizationField::new(center, size).with_settings(self.settings);
            registered.push(fields.register_field(field)?);
        }

        if !registered.is_empty() {
            info!("Discovered {} field(s) in {}", registered.len(), id);
        }
        Ok(registered)
    }

    pub async fn chunk_loaded(&self, id: &DimensionId, chunk: ChunkPos) -> Result<(), FieldError> {
        let dimension = self.dimension(id)?;
        dimension.lock().await.fields.on_chunk_loaded(chunk);
        debug!("Chunk {} loaded in {}", chunk, id);
        Ok(())
    }

    pub async fn chunk_unloaded(
        &self,
        id: &DimensionId,
        chunk: ChunkPos,
    ) -> Result<(), FieldError> {
        let dimension = self.dimension(id)?;
        dimension.lock().await.fields.on_chunk_unloaded(chunk);
        debug!("Chunk {} unloaded in {}", chunk, id);
        Ok(())
    }

    /// Catalyst used on a field: start crafting its matched recipe
    pub async fn begin_craft(
        &self,
        id: &DimensionId,
        center: BlockPos,
        catalyst: &ItemStack,
    ) -> Result<(), FieldError> {
        let dimension = self.dimension(id)?;
        let mut guard = dimension.lock().await;
        let field = guard
            .fields
            .get_mut(center)
            .ok_or(FieldError::NotFound(center))?;
        field.begin_craft(catalyst)
    }

    /// Run one simulation step over every dimension, in id order
    pub async fn tick(&self) -> Vec<(DimensionId, FieldEvent)> {
        let recipes = self.recipes.read().await;

        let mut dimensions: Vec<(DimensionId, Arc<Mutex<Dimension<W>>>)> = self
            .dimensions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        dimensions.sort_by(|a, b| a.0.cmp(&b.0));

        let mut events = Vec::new();
        for (id, dimension) in dimensions {
            let mut guard = dimension.lock().await;
            let Dimension { world, fields } = &mut *guard;

            let broken: Vec<BlockPos> = fields
                .fields()
                .into_iter()
                .filter(|f| f.is_loaded() && !f.is_invalid())
                .filter(|f| !is_shell_intact(&*world, f.center(), f.size(), &self.projector_block))
                .map(|f| f.center())
                .collect();
            for center in broken {
                debug!("Projector shell broken at {} in {}", center, id);
                // Listed above, so the field exists
                let _ = fields.invalidate_field(center);
            }

            for event in fields.tick_fields(world, &*recipes) {
                events.push((id.clone(), event));
            }
        }
        events
    }
}
