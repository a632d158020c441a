//! Single-assignment typed data slots
//!
//! A [`TypedSlot`] holds at most one value per task activation. It cycles
//! through empty → assigned → (read any number of times) → consumed or
//! released → empty. Each slot has its own lock, held only for the
//! in-memory update and never while caller code runs; no slot operation
//! waits on another slot.

use std::any::Any;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskGraphError};
use crate::value::{SlotValue, TypeTag};

/// How a task uses a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    /// Populated by the executor before the task runs
    #[default]
    Input,
    /// Produced by the task, harvested by the executor afterwards
    Output,
    /// An input the task takes destructively; it is not handed back
    Consume,
}

impl SlotRole {
    /// Input or Consume
    pub fn is_input(self) -> bool {
        matches!(self, SlotRole::Input | SlotRole::Consume)
    }
}

/// A named, lock-guarded, single-assignment value cell
pub struct TypedSlot {
    name: String,
    declared: Option<TypeTag>,
    role: SlotRole,
    value: Mutex<Option<SlotValue>>,
}

impl TypedSlot {
    /// Create a slot, optionally fixing the type every write must carry
    pub fn new(name: impl Into<String>, declared: Option<TypeTag>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TaskGraphError::invalid("slot name cannot be empty"));
        }
        if let Some(tag) = declared.filter(|t| t.is_void()) {
            return Err(TaskGraphError::UnspecifiedType(format!("{} (declared {})", name, tag)));
        }
        Ok(Self {
            name,
            declared,
            role: SlotRole::default(),
            value: Mutex::new(None),
        })
    }

    /// Create a slot that only accepts values of type `T`
    pub fn typed<T: Any>(name: impl Into<String>) -> Result<Self> {
        Self::new(name, Some(TypeTag::of::<T>()))
    }

    /// Create a slot that accepts a value of any type
    pub fn untyped(name: impl Into<String>) -> Result<Self> {
        Self::new(name, None)
    }

    /// Set the role this slot plays for its task
    pub fn with_role(mut self, role: SlotRole) -> Self {
        self.role = role;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<TypeTag> {
        self.declared
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    /// Store `value` if the slot is empty
    ///
    /// Returns `Ok(false)` without touching the slot when it already holds
    /// a value. A type error leaves the slot empty.
    pub fn assign(&self, value: SlotValue) -> Result<bool> {
        let mut guard = self.value.lock();
        if guard.is_some() {
            return Ok(false);
        }

        let actual = value.tag();
        if actual.is_void() {
            return Err(TaskGraphError::UnspecifiedType(self.name.clone()));
        }
        if let Some(expected) = self.declared {
            if expected != actual {
                return Err(TaskGraphError::TypeMismatch {
                    name: self.name.clone(),
                    expected,
                    actual,
                });
            }
        }

        *guard = Some(value);
        log::trace!("Slot '{}' assigned {}", self.name, actual);
        Ok(true)
    }

    /// Copy of the current value and its tag, if any
    ///
    /// The slot stays assigned and the caller owns the copy.
    pub fn read(&self) -> Option<SlotValue> {
        self.value.lock().clone()
    }

    /// Clone the current value out as `T`
    ///
    /// `Ok(None)` when the slot is empty, `TypeMismatch` when it holds
    /// another type.
    pub fn read_cloned<T: Any + Clone>(&self) -> Result<Option<T>> {
        let guard = self.value.lock();
        let Some(value) = guard.as_ref() else {
            return Ok(None);
        };
        value
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or_else(|| TaskGraphError::TypeMismatch {
                name: self.name.clone(),
                expected: TypeTag::of::<T>(),
                actual: value.tag(),
            })
    }

    /// Tag of the held value, if any
    pub fn actual_type(&self) -> Option<TypeTag> {
        self.value.lock().as_ref().map(SlotValue::tag)
    }

    pub fn is_assigned(&self) -> bool {
        self.value.lock().is_some()
    }

    /// Take the value out, leaving the slot empty
    ///
    /// Returns each assigned value exactly once.
    pub fn consume(&self) -> Option<SlotValue> {
        let taken = self.value.lock().take();
        if taken.is_some() {
            log::trace!("Slot '{}' consumed", self.name);
        }
        taken
    }

    /// Drop any held value
    pub fn release(&self) {
        let dropped = self.value.lock().take();
        if dropped.is_some() {
            log::trace!("Slot '{}' released", self.name);
        }
    }
}

impl std::fmt::Debug for TypedSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedSlot")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("role", &self.role)
            .field("actual", &self.actual_type())
            .finish()
    }
}
