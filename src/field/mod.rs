//! Miniaturization Fields
//!
//! Field sizes and projector detection, the per-field state machine, and the
//! per-world registry that ticks loaded fields.

pub mod active;
pub mod events;
pub mod handle;
pub mod instance;
pub mod size;

pub use active::ActiveWorldFields;
pub use events::FieldEvent;
pub use handle::FieldRef;
pub use instance::{FieldSettings, FieldState, MiniaturizationField};
pub use size::{FieldSize, find_field, is_shell_intact};
