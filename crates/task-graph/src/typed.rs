//! Typed handles over erased slots
//!
//! Tasks declare their data through [`Input`] and [`Output`]. Each handle
//! owns an `Arc<TypedSlot>` declared with `T`; the same `Arc` is registered
//! in the task's [`SlotSet`](crate::slot_set::SlotSet) so the executor sees
//! the slot by position while the task sees it by type.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Result, TaskGraphError};
use crate::slot::{SlotRole, TypedSlot};
use crate::value::{SlotValue, TypeTag};

/// Read-only typed view of an input slot
pub struct Input<T> {
    slot: Arc<TypedSlot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync + Clone> Input<T> {
    /// Create an input slot accepting only `T`
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_role(name, SlotRole::Input)
    }

    /// Create an input the task takes destructively
    pub fn consuming(name: impl Into<String>) -> Result<Self> {
        Self::with_role(name, SlotRole::Consume)
    }

    fn with_role(name: impl Into<String>, role: SlotRole) -> Result<Self> {
        let slot = TypedSlot::typed::<T>(name)?.with_role(role);
        Ok(Self {
            slot: Arc::new(slot),
            _marker: PhantomData,
        })
    }

    /// The underlying slot, for registration in a slot set
    pub fn slot(&self) -> &Arc<TypedSlot> {
        &self.slot
    }

    /// Take the value out of the slot
    pub fn take(&self) -> Result<T> {
        let value = self
            .slot
            .consume()
            .ok_or_else(|| TaskGraphError::EmptySlot(self.slot.name().to_string()))?;
        // The slot only admits `T`, so the downcast cannot miss.
        value
            .downcast::<T>()
            .map_err(|value| TaskGraphError::TypeMismatch {
                name: self.slot.name().to_string(),
                expected: TypeTag::of::<T>(),
                actual: value.tag(),
            })
    }

    /// Copy the current value out; the slot lock is released on return
    pub fn get(&self) -> Result<T> {
        self.slot
            .read_cloned::<T>()?
            .ok_or_else(|| TaskGraphError::EmptySlot(self.slot.name().to_string()))
    }
}

/// Write handle for an output slot
pub struct Output<T> {
    slot: Arc<TypedSlot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync + Clone> Output<T> {
    /// Create an output slot accepting only `T`
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let slot = TypedSlot::typed::<T>(name)?.with_role(SlotRole::Output);
        Ok(Self {
            slot: Arc::new(slot),
            _marker: PhantomData,
        })
    }

    pub fn slot(&self) -> &Arc<TypedSlot> {
        &self.slot
    }

    /// Store the task's result
    ///
    /// Fails with `AlreadyAssigned` if this activation already produced one.
    pub fn emplace(&self, value: T) -> Result<()> {
        if self.slot.assign(SlotValue::new(value))? {
            Ok(())
        } else {
            Err(TaskGraphError::AlreadyAssigned(self.slot.name().to_string()))
        }
    }
}
