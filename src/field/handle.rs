//! Deferred field references
//!
//! A [`FieldRef`] lets other systems hold on to a registered field without
//! borrowing the registry. Discarding a reference asks the owning registry to
//! unregister the field; removing the field from the registry clears every
//! clone of its reference.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;

use crate::pos::BlockPos;

/// Discard notice sent from a reference to its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Discard {
    pub center: BlockPos,
    /// Registration serial, so a stale notice never removes a newer field
    pub serial: u64,
}

#[derive(Debug)]
struct FieldRefInner {
    center: BlockPos,
    serial: u64,
    present: AtomicBool,
    discards: UnboundedSender<Discard>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldRef {
    inner: Option<Arc<FieldRefInner>>,
}

impl FieldRef {
    /// A reference to nothing
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub(crate) fn new(center: BlockPos, serial: u64, discards: UnboundedSender<Discard>) -> Self {
        Self {
            inner: Some(Arc::new(FieldRefInner {
                center,
                serial,
                present: AtomicBool::new(true),
                discards,
            })),
        }
    }

    pub fn is_present(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.present.load(Ordering::Acquire))
    }

    /// Center of the referenced field while it is still registered
    pub fn center(&self) -> Option<BlockPos> {
        self.inner
            .as_ref()
            .filter(|inner| inner.present.load(Ordering::Acquire))
            .map(|inner| inner.center)
    }

    /// Give up the field. The owning registry unregisters it before its next
    /// tick. Only the first call on any clone has an effect.
    pub fn discard(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        if inner.present.swap(false, Ordering::AcqRel) {
            // A closed channel means the registry is gone along with the field
            let _ = inner.discards.send(Discard {
                center: inner.center,
                serial: inner.serial,
            });
        }
    }

    /// Mark absent without notifying the registry (registry-side removal)
    pub(crate) fn clear(&self) {
        if let Some(inner) = &self.inner {
            inner.present.store(false, Ordering::Release);
        }
    }

    pub(crate) fn serial(&self) -> Option<u64> {
        self.inner.as_ref().map(|inner| inner.serial)
    }
}
