//! Field Event Types
//!
//! Events emitted by field ticks for external collaborators (craft completion
//! handlers, UI, logging).

use serde::{Deserialize, Serialize};

use crate::block::ItemStack;
use crate::pos::BlockPos;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldEvent {
    /// Field contents now satisfy a recipe
    RecipeMatched { center: BlockPos, recipe_id: String },

    /// A previously matched recipe no longer matches
    MatchLost { center: BlockPos, recipe_id: String },

    /// Crafting finished; the field contents were replaced by the outputs
    CraftCompleted {
        center: BlockPos,
        recipe_id: String,
        outputs: Vec<ItemStack>,
    },

    /// Field was invalidated and removed from its registry
    FieldInvalidated { center: BlockPos },
}

impl FieldEvent {
    pub fn center(&self) -> BlockPos {
        match self {
            FieldEvent::RecipeMatched { center, .. } => *center,
            FieldEvent::MatchLost { center, .. } => *center,
            FieldEvent::CraftCompleted { center, .. } => *center,
            FieldEvent::FieldInvalidated { center } => *center,
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            FieldEvent::RecipeMatched { .. } => "recipe_matched",
            FieldEvent::MatchLost { .. } => "match_lost",
            FieldEvent::CraftCompleted { .. } => "craft_completed",
            FieldEvent::FieldInvalidated { .. } => "field_invalidated",
        }
    }
}
