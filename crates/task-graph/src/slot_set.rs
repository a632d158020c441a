//! Ordered collection of the slots one task uses
//!
//! A task registers every slot it reads or writes while it is being
//! constructed, then freezes the set. After that the list of slots never
//! changes, though each slot still goes through its own
//! assign/read/release cycle on every activation.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskGraphError};
use crate::slot::TypedSlot;

/// Options for a [`SlotSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSetOptions {
    /// Reject adding the same slot instance twice
    pub check_duplicates: bool,
}

impl Default for SlotSetOptions {
    fn default() -> Self {
        Self {
            check_duplicates: true,
        }
    }
}

#[derive(Default)]
struct SlotSetInner {
    frozen: bool,
    slots: Vec<Arc<TypedSlot>>,
}

/// Append-then-freeze list of slots owned by one task
#[derive(Default)]
pub struct SlotSet {
    options: SlotSetOptions,
    inner: Mutex<SlotSetInner>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SlotSetOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(SlotSetInner::default()),
        }
    }

    /// Register a slot at the next position
    ///
    /// Identity is by instance: two distinct slots may share a name.
    pub fn add(&self, slot: Arc<TypedSlot>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.frozen {
            return Err(TaskGraphError::Frozen(slot.name().to_string()));
        }
        if self.options.check_duplicates
            && inner.slots.iter().any(|existing| Arc::ptr_eq(existing, &slot))
        {
            return Err(TaskGraphError::DuplicateSlot(slot.name().to_string()));
        }
        inner.slots.push(slot);
        Ok(())
    }

    /// Disallow further `add` calls. Calling it again has no effect.
    pub fn freeze(&self) {
        let mut inner = self.inner.lock();
        if !inner.frozen {
            inner.frozen = true;
            log::debug!("Slot set frozen with {} slots", inner.slots.len());
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.lock().frozen
    }

    /// Slot at a zero-based insertion position
    pub fn at(&self, index: usize) -> Result<Arc<TypedSlot>> {
        let inner = self.inner.lock();
        inner
            .slots
            .get(index)
            .cloned()
            .ok_or(TaskGraphError::SlotIndexOutOfRange {
                index,
                count: inner.slots.len(),
            })
    }

    /// Fill `out` with every slot in insertion order
    ///
    /// `out` must be empty so repeated calls never accumulate.
    pub fn all(&self, out: &mut Vec<Arc<TypedSlot>>) -> Result<()> {
        if !out.is_empty() {
            return Err(TaskGraphError::invalid(format!(
                "destination for slot listing must be empty, has {} entries",
                out.len()
            )));
        }
        out.extend(self.inner.lock().slots.iter().cloned());
        Ok(())
    }

    /// First slot registered under `name`
    pub fn find(&self, name: &str) -> Option<Arc<TypedSlot>> {
        self.inner
            .lock()
            .slots
            .iter()
            .find(|slot| slot.name() == name)
            .cloned()
    }

    /// Slots the executor must populate before the task runs
    pub fn inputs(&self) -> Vec<Arc<TypedSlot>> {
        self.filter(|slot| slot.role().is_input())
    }

    /// Slots the executor harvests after the task runs
    pub fn outputs(&self) -> Vec<Arc<TypedSlot>> {
        self.filter(|slot| !slot.role().is_input())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().slots.is_empty()
    }

    /// Release every slot, ending the current activation
    pub fn release_all(&self) {
        // Clone the list so slot locks are never taken under the set lock.
        let slots: Vec<Arc<TypedSlot>> = self.inner.lock().slots.clone();
        for slot in &slots {
            slot.release();
        }
    }

    fn filter(&self, keep: impl Fn(&TypedSlot) -> bool) -> Vec<Arc<TypedSlot>> {
        self.inner
            .lock()
            .slots
            .iter()
            .filter(|slot| keep(slot.as_ref()))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for SlotSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SlotSet")
            .field("frozen", &inner.frozen)
            .field("slots", &inner.slots)
            .finish()
    }
}
