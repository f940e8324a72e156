//! Active World Fields
//!
//! Per-world registry of miniaturization fields keyed by center position.
//! Each registered field has a matching [`FieldRef`]; the two maps always hold
//! the same key set.

use std::collections::HashMap;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, trace};

use super::events::FieldEvent;
use super::handle::{Discard, FieldRef};
use super::instance::MiniaturizationField;
use crate::error::FieldError;
use crate::pos::{BlockPos, ChunkPos};
use crate::recipe::RecipeSource;
use crate::world::{DimensionId, WorldEdit};

pub struct ActiveWorldFields {
    dimension: DimensionId,
    fields: HashMap<BlockPos, MiniaturizationField>,
    refs: HashMap<BlockPos, FieldRef>,
    next_serial: u64,
    discard_tx: UnboundedSender<Discard>,
    discard_rx: UnboundedReceiver<Discard>,
}

impl ActiveWorldFields {
    pub fn new(dimension: DimensionId) -> Self {
        let (discard_tx, discard_rx) = unbounded_channel();
        Self {
            dimension,
            fields: HashMap::new(),
            refs: HashMap::new(),
            next_serial: 0,
            discard_tx,
            discard_rx,
        }
    }

    pub fn dimension(&self) -> &DimensionId {
        &self.dimension
    }

    /// Register a field at its center. Fails if a field is already active there.
    pub fn register_field(
        &mut self,
        field: MiniaturizationField,
    ) -> Result<FieldRef, FieldError> {
        self.process_discards();

        let center = field.center();
        if self.fields.contains_key(&center) {
            return Err(FieldError::AlreadyActive(center));
        }
        Ok(self.insert(field))
    }

    /// Register a field, unregistering any field already at its center
    pub fn replace_field(&mut self, field: MiniaturizationField) -> FieldRef {
        self.process_discards();
        self.unregister_field(field.center());
        self.insert(field)
    }

    fn insert(&mut self, mut field: MiniaturizationField) -> FieldRef {
        let center = field.center();
        field.set_dimension(self.dimension.clone());

        self.next_serial += 1;
        let field_ref = FieldRef::new(center, self.next_serial, self.discard_tx.clone());

        debug!(
            "Registered {} field at {} in {}",
            field.size().as_str(),
            center,
            self.dimension
        );
        self.fields.insert(center, field);
        self.refs.insert(center, field_ref.clone());
        field_ref
    }

    /// Remove the field at `center`. Removing an absent field is a no-op.
    pub fn unregister_field(&mut self, center: BlockPos) -> Option<MiniaturizationField> {
        let removed = self.fields.remove(&center);
        if let Some(field_ref) = self.refs.remove(&center) {
            field_ref.clear();
        }
        if removed.is_some() {
            debug!("Unregistered field at {} in {}", center, self.dimension);
        }
        removed
    }

    /// Remove a field by value; same as unregistering its center
    pub fn unregister(&mut self, field: &MiniaturizationField) -> Option<MiniaturizationField> {
        self.unregister_field(field.center())
    }

    /// Unregister every field, clearing all outstanding references
    pub fn clear(&mut self) -> usize {
        let centers: Vec<BlockPos> = self.fields.keys().copied().collect();
        for center in &centers {
            self.unregister_field(*center);
        }
        // Pending discards now refer to nothing
        while self.discard_rx.try_recv().is_ok() {}
        centers.len()
    }

    /// Apply pending discards from references handed out earlier
    fn process_discards(&mut self) {
        while let Ok(Discard { center, serial }) = self.discard_rx.try_recv() {
            // A newer field may have been registered at the same center since
            let current = self.refs.get(&center).and_then(FieldRef::serial);
            if current == Some(serial) {
                self.unregister_field(center);
            }
        }
    }

    /// Whether `center` holds a field whose reference is still live
    fn is_live(&self, center: &BlockPos) -> bool {
        self.refs.get(center).is_some_and(FieldRef::is_present)
    }

    pub fn get(&self, center: BlockPos) -> Option<&MiniaturizationField> {
        if !self.is_live(&center) {
            return None;
        }
        self.fields.get(&center)
    }

    pub fn get_mut(&mut self, center: BlockPos) -> Option<&mut MiniaturizationField> {
        self.process_discards();
        self.fields.get_mut(&center)
    }

    /// Reference for the field at `center`, or an empty reference
    pub fn get_ref(&self, center: BlockPos) -> FieldRef {
        match self.refs.get(&center) {
            Some(field_ref) if field_ref.is_present() => field_ref.clone(),
            _ => FieldRef::empty(),
        }
    }

    pub fn has_active_field(&self, center: BlockPos) -> bool {
        self.is_live(&center)
    }

    /// All live fields, in center order
    pub fn fields(&self) -> Vec<&MiniaturizationField> {
        let mut fields: Vec<_> = self
            .fields
            .values()
            .filter(|field| self.is_live(&field.center()))
            .collect();
        fields.sort_by_key(|field| field.center());
        fields
    }

    /// Fields whose center lies in `chunk`
    pub fn fields_in_chunk(&self, chunk: ChunkPos) -> Vec<&MiniaturizationField> {
        self.fields()
            .into_iter()
            .filter(|field| chunk.contains(field.center()))
            .collect()
    }

    pub fn on_chunk_loaded(&mut self, chunk: ChunkPos) {
        self.set_chunk_loaded(chunk, true);
    }

    pub fn on_chunk_unloaded(&mut self, chunk: ChunkPos) {
        self.set_chunk_loaded(chunk, false);
    }

    fn set_chunk_loaded(&mut self, chunk: ChunkPos, loaded: bool) {
        self.process_discards();
        for field in self.fields.values_mut() {
            if chunk.contains(field.center()) {
                field.set_loaded(loaded);
            }
        }
    }

    /// Mark a field invalid; it is unregistered on its next loaded tick
    pub fn invalidate_field(&mut self, center: BlockPos) -> Result<(), FieldError> {
        self.process_discards();
        let field = self
            .fields
            .get_mut(&center)
            .ok_or(FieldError::NotFound(center))?;
        field.invalidate();
        Ok(())
    }

    /// Number of live fields. Discarded fields are not counted.
    pub fn len(&self) -> usize {
        self.refs.values().filter(|r| r.is_present()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loaded_count(&self) -> usize {
        self.fields
            .values()
            .filter(|f| f.is_loaded() && self.is_live(&f.center()))
            .count()
    }

    /// Tick every loaded field once, in center order
    pub fn tick_fields<W, R>(&mut self, world: &mut W, recipes: &R) -> Vec<FieldEvent>
    where
        W: WorldEdit + ?Sized,
        R: RecipeSource + ?Sized,
    {
        self.process_discards();

        let mut loaded: Vec<BlockPos> = self
            .fields
            .values()
            .filter(|f| f.is_loaded())
            .map(|f| f.center())
            .collect();
        if loaded.is_empty() {
            return Vec::new();
        }
        loaded.sort();

        // Invalid fields are removed on their next loaded tick
        let mut events = Vec::new();
        loaded.retain(|center| {
            let invalid = self.fields.get(center).is_some_and(|f| f.is_invalid());
            if invalid {
                events.push(FieldEvent::FieldInvalidated { center: *center });
            }
            !invalid
        });
        for event in &events {
            let center = event.center();
            self.unregister_field(center);
            info!("Field at {} in {} invalidated", center, self.dimension);
        }

        trace!("Ticking {} loaded fields in {}", loaded.len(), self.dimension);
        for center in loaded {
            if let Some(field) = self.fields.get_mut(&center) {
                if let Some(event) = field.tick(world, recipes) {
                    events.push(event);
                }
            }
        }

        events
    }

    #[cfg(test)]
    fn maps_in_lock_step(&self) -> bool {
        self.fields.len() == self.refs.len()
            && self.fields.keys().all(|k| self.refs.contains_key(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockState, ItemStack};
    use crate::field::{FieldSize, FieldState};
    use crate::recipe::{ComponentLayer, MiniaturizationRecipe, RecipeLayer};
    use crate::world::BlockWorld;
    use std::sync::Arc;

    fn registry() -> ActiveWorldFields {
        ActiveWorldFields::new(DimensionId::overworld())
    }

    fn field_at(x: i32, y: i32, z: i32) -> MiniaturizationField {
        MiniaturizationField::new(BlockPos::new(x, y, z), FieldSize::Small)
    }

    fn single_block_recipe() -> Vec<Arc<MiniaturizationRecipe>> {
        vec![Arc::new(MiniaturizationRecipe::new(
            "single",
            vec![RecipeLayer::Component(ComponentLayer::new(
                "A",
                [BlockPos::ORIGIN],
            ))],
            vec![("A".to_string(), BlockState::new("minecraft:diamond_block"))],
            ItemStack::new("minecraft:ender_pearl", 1),
            vec![ItemStack::new("minecraft:diamond", 9)],
        ))]
    }

    #[test]
    fn test_register_then_get() {
        let mut fields = registry();
        let center = BlockPos::new(0, 64, 0);

        let field_ref = fields.register_field(field_at(0, 64, 0)).unwrap();
        let field = fields.get(center).unwrap();
        assert_eq!(field.center(), center);
        assert_eq!(field.dimension(), Some(&DimensionId::overworld()));
        assert!(field_ref.is_present());
        assert!(fields.has_active_field(center));

        assert!(fields.unregister_field(center).is_some());
        assert!(fields.get(center).is_none());
        assert!(!field_ref.is_present());
        assert!(fields.maps_in_lock_step());
    }

    #[test]
    fn test_double_registration_rejected() {
        let mut fields = registry();
        fields.register_field(field_at(0, 64, 0)).unwrap();

        let err = fields.register_field(field_at(0, 64, 0)).unwrap_err();
        assert!(matches!(err, FieldError::AlreadyActive(_)));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_replace_field_clears_old_ref() {
        let mut fields = registry();
        let old = fields.register_field(field_at(0, 64, 0)).unwrap();
        let new = fields.replace_field(field_at(0, 64, 0));

        assert!(!old.is_present());
        assert!(new.is_present());
        assert_eq!(fields.len(), 1);
        assert!(fields.maps_in_lock_step());
    }

    #[test]
    fn test_unregister_by_field() {
        let mut fields = registry();
        let field_ref = fields.register_field(field_at(0, 64, 0)).unwrap();
        let copy = fields.get(BlockPos::new(0, 64, 0)).unwrap().clone();

        assert!(fields.unregister(&copy).is_some());
        assert!(fields.unregister(&copy).is_none());
        assert!(!field_ref.is_present());
        assert!(fields.is_empty());
        assert!(fields.maps_in_lock_step());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut fields = registry();
        fields.register_field(field_at(0, 64, 0)).unwrap();
        fields.register_field(field_at(20, 64, 0)).unwrap();

        assert!(fields.unregister_field(BlockPos::new(0, 64, 0)).is_some());
        assert!(fields.unregister_field(BlockPos::new(0, 64, 0)).is_none());
        assert_eq!(fields.len(), 1);
        assert!(fields.maps_in_lock_step());
    }

    #[test]
    fn test_discard_unregisters() {
        let mut fields = registry();
        let center = BlockPos::new(0, 64, 0);
        let field_ref = fields.register_field(field_at(0, 64, 0)).unwrap();

        field_ref.discard();
        // Lookups and counters see the discard before the registry processes it
        assert!(fields.get(center).is_none());
        assert!(!fields.get_ref(center).is_present());
        assert_eq!(fields.len(), 0);
        assert!(fields.is_empty());
        assert_eq!(fields.loaded_count(), 0);

        let mut world = BlockWorld::new();
        fields.tick_fields(&mut world, &single_block_recipe());
        assert!(fields.is_empty());
        assert!(fields.maps_in_lock_step());
    }

    #[test]
    fn test_stale_discard_keeps_newer_field() {
        let mut fields = registry();
        let center = BlockPos::new(0, 64, 0);
        let stale = fields.register_field(field_at(0, 64, 0)).unwrap();
        let stale_clone = stale.clone();

        fields.unregister_field(center);
        let fresh = fields.register_field(field_at(0, 64, 0)).unwrap();

        // Already cleared by the registry, so this sends nothing
        stale_clone.discard();
        fields.tick_fields(&mut BlockWorld::new(), &single_block_recipe());

        assert!(fresh.is_present());
        assert!(fields.get(center).is_some());
    }

    #[test]
    fn test_tick_with_no_loaded_fields() {
        let mut fields = registry();
        let mut world = BlockWorld::new();
        world.set_block(BlockPos::new(0, 63, 0), BlockState::new("minecraft:diamond_block"));
        let recipes = single_block_recipe();

        assert!(fields.tick_fields(&mut world, &recipes).is_empty());

        fields.register_field(field_at(0, 64, 0)).unwrap();
        fields.on_chunk_unloaded(ChunkPos::new(0, 0));
        assert_eq!(fields.loaded_count(), 0);

        assert!(fields.tick_fields(&mut world, &recipes).is_empty());
        assert_eq!(
            fields.get(BlockPos::new(0, 64, 0)).unwrap().state(),
            FieldState::Empty
        );
        assert_eq!(world.block_count(), 1);
    }

    #[test]
    fn test_tick_loaded_fields() {
        let mut fields = registry();
        let mut world = BlockWorld::new();
        world.set_block(BlockPos::new(0, 63, 0), BlockState::new("minecraft:diamond_block"));
        world.set_block(BlockPos::new(40, 63, 0), BlockState::new("minecraft:diamond_block"));
        let recipes = single_block_recipe();

        fields.register_field(field_at(40, 64, 0)).unwrap();
        fields.register_field(field_at(0, 64, 0)).unwrap();
        fields.on_chunk_unloaded(ChunkPos::new(2, 0));

        let events = fields.tick_fields(&mut world, &recipes);
        assert_eq!(
            events,
            vec![FieldEvent::RecipeMatched {
                center: BlockPos::new(0, 64, 0),
                recipe_id: "single".to_string(),
            }]
        );

        fields.on_chunk_loaded(ChunkPos::new(2, 0));
        let events = fields.tick_fields(&mut world, &recipes);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].center(), BlockPos::new(40, 64, 0));
    }

    #[test]
    fn test_invalid_fields_removed_on_tick() {
        let mut fields = registry();
        let center = BlockPos::new(0, 64, 0);
        let field_ref = fields.register_field(field_at(0, 64, 0)).unwrap();

        fields.invalidate_field(center).unwrap();
        assert!(matches!(
            fields.invalidate_field(BlockPos::new(5, 5, 5)),
            Err(FieldError::NotFound(_))
        ));

        let events = fields.tick_fields(&mut BlockWorld::new(), &single_block_recipe());
        assert_eq!(events, vec![FieldEvent::FieldInvalidated { center }]);
        assert!(fields.is_empty());
        assert!(!field_ref.is_present());
    }

    #[test]
    fn test_unloaded_invalid_field_kept_until_loaded() {
        let mut fields = registry();
        let center = BlockPos::new(0, 64, 0);
        fields.register_field(field_at(0, 64, 0)).unwrap();
        fields.invalidate_field(center).unwrap();
        fields.on_chunk_unloaded(ChunkPos::new(0, 0));

        let recipes = single_block_recipe();
        assert!(fields.tick_fields(&mut BlockWorld::new(), &recipes).is_empty());
        assert_eq!(fields.len(), 1);

        fields.on_chunk_loaded(ChunkPos::new(0, 0));
        let events = fields.tick_fields(&mut BlockWorld::new(), &recipes);
        assert_eq!(events, vec![FieldEvent::FieldInvalidated { center }]);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_fields_in_chunk() {
        let mut fields = registry();
        fields.register_field(field_at(1, 64, 1)).unwrap();
        fields.register_field(field_at(15, 70, 15)).unwrap();
        fields.register_field(field_at(16, 64, 0)).unwrap();
        fields.register_field(field_at(-1, 64, 0)).unwrap();

        let centers: Vec<_> = fields
            .fields_in_chunk(ChunkPos::new(0, 0))
            .iter()
            .map(|f| f.center())
            .collect();
        assert_eq!(centers, vec![BlockPos::new(1, 64, 1), BlockPos::new(15, 70, 15)]);

        assert_eq!(fields.fields_in_chunk(ChunkPos::new(-1, 0)).len(), 1);
        assert_eq!(fields.fields().len(), 4);
    }
}
