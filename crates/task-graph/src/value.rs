//! Type-erased values exchanged between tasks
//!
//! A [`SlotValue`] owns its payload exclusively. Cloning one makes an
//! independent deep copy, so reading a slot or a context entry hands the
//! caller its own value and no lock outlives the read. The only way a
//! held value leaves its slot unchanged is by being consumed. The
//! [`TypeTag`] travelling with it is the only way to recover the concrete
//! type.

use std::any::{Any, TypeId};
use std::fmt;

/// Runtime tag naming the concrete type of an erased payload
///
/// Two tags are equal when they describe the same Rust type; the name is
/// carried along for error messages only.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The unspecified tag, which no value may be written with
    pub fn void() -> Self {
        Self::of::<()>()
    }

    pub fn is_void(&self) -> bool {
        self.id == TypeId::of::<()>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl std::hash::Hash for TypeTag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Erased payload that can copy itself
trait Payload: Any + Send + Sync {
    fn copy_boxed(&self) -> Box<dyn Payload>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + Send + Sync + Clone> Payload for T {
    fn copy_boxed(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An owned, type-erased payload together with its type tag
pub struct SlotValue {
    tag: TypeTag,
    payload: Box<dyn Payload>,
}

impl SlotValue {
    /// Wrap a value, tagging it with its own type
    pub fn new<T: Any + Send + Sync + Clone>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            payload: Box::new(value),
        }
    }

    /// Tag of the wrapped value
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is<T: Any>(&self) -> bool {
        self.tag.is::<T>()
    }

    /// Borrow the payload as `T`, or `None` if it is another type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref()
    }

    /// Unwrap into `T`, handing the value back unchanged on a type mismatch
    pub fn downcast<T: Any>(self) -> std::result::Result<T, SlotValue> {
        if !self.tag.is::<T>() {
            return Err(self);
        }
        match self.payload.into_any().downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            // The tag matched, so the payload is a `T`.
            Err(_) => unreachable!("payload type disagrees with its tag"),
        }
    }
}

impl Clone for SlotValue {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag,
            payload: self.payload.copy_boxed(),
        }
    }
}

impl fmt::Debug for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotValue")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}
