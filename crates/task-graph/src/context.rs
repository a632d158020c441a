//! Shared, name-indexed value store for one run
//!
//! The set of names is fixed when the context is built; nothing can be
//! registered afterwards. Writes are last-writer-wins. Every operation
//! takes the one context-wide lock, so reads and writes never interleave.
//! Reads hand back an owned copy and release the lock before returning,
//! so caller code never runs while the context is locked.
//!
//! # Example
//!
//! ```ignore
//! use task_graph::SharedContext;
//!
//! let context = SharedContext::builder()
//!     .declare_typed::<Mat>("input_image")
//!     .declare("scratch")
//!     .build()?;
//!
//! context.set("input_image", load())?;
//! let image: Mat = context.get("input_image")?;
//! ```

use std::any::Any;
use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Result, TaskGraphError};
use crate::value::{SlotValue, TypeTag};

struct Entry {
    declared: Option<TypeTag>,
    value: Option<SlotValue>,
}

/// Builder fixing the names a [`SharedContext`] will accept
#[derive(Default)]
pub struct ContextBuilder {
    names: Vec<(String, Option<TypeTag>)>,
}

impl ContextBuilder {
    /// Accept values of any type under `name`
    pub fn declare(mut self, name: impl Into<String>) -> Self {
        self.names.push((name.into(), None));
        self
    }

    /// Accept only values of type `T` under `name`
    pub fn declare_typed<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.names.push((name.into(), Some(TypeTag::of::<T>())));
        self
    }

    /// Build the context; names must be non-empty and unique
    pub fn build(self) -> Result<SharedContext> {
        let mut index = HashMap::with_capacity(self.names.len());
        let mut entries = Vec::with_capacity(self.names.len());
        for (name, declared) in self.names {
            if name.is_empty() {
                return Err(TaskGraphError::invalid("context name cannot be empty"));
            }
            if declared.is_some_and(|tag| tag.is_void()) {
                return Err(TaskGraphError::UnspecifiedType(name));
            }
            if index.contains_key(&name) {
                return Err(TaskGraphError::invalid(format!(
                    "context name '{}' declared twice",
                    name
                )));
            }
            index.insert(name, entries.len());
            entries.push(Entry {
                declared,
                value: None,
            });
        }

        let run_id = Uuid::new_v4();
        log::debug!("Created context {} with {} names", run_id, entries.len());
        Ok(SharedContext {
            run_id,
            index,
            entries: Mutex::new(entries),
        })
    }
}

/// Fixed-namespace value store shared by every task activation of a run
pub struct SharedContext {
    run_id: Uuid,
    index: HashMap<String, usize>,
    entries: Mutex<Vec<Entry>>,
}

impl SharedContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Identifier of the run this context belongs to
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Whether `name` was declared
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.index.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether a value of type `tag` may be written under `name`
    ///
    /// Runs the same check as [`set_data`](Self::set_data): the name must
    /// be declared, and a typed name only accepts its declared type.
    pub fn can_write(&self, name: &str, tag: TypeTag) -> Result<bool> {
        let position = self.position(name)?;
        let entries = self.entries.lock();
        Ok(Self::write_check(name, &entries[position], tag).is_ok())
    }

    /// Copy of the value stored under `name`, checking it has type `tag`
    pub fn get_data(&self, name: &str, tag: TypeTag) -> Result<SlotValue> {
        let position = self.position(name)?;
        let entries = self.entries.lock();
        Self::read_check(name, &entries[position], tag).cloned()
    }

    /// Clone out the value stored under `name` as `T`
    pub fn get<T: Any + Clone>(&self, name: &str) -> Result<T> {
        let position = self.position(name)?;
        let entries = self.entries.lock();
        let value = Self::read_check(name, &entries[position], TypeTag::of::<T>())?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| TaskGraphError::NullData(name.to_string()))
    }

    /// Remove and return the value stored under `name`
    ///
    /// Used for inputs a task consumes; the name reads as unwritten
    /// afterwards.
    pub fn take_data(&self, name: &str, tag: TypeTag) -> Result<SlotValue> {
        let position = self.position(name)?;
        let mut entries = self.entries.lock();
        let entry = &mut entries[position];
        Self::read_check(name, entry, tag)?;
        entry
            .value
            .take()
            .ok_or_else(|| TaskGraphError::NullData(name.to_string()))
    }

    /// Store `value` under `name`, replacing whatever was there
    pub fn set_data(&self, name: &str, value: SlotValue) -> Result<()> {
        let position = self.position(name)?;
        let mut entries = self.entries.lock();
        let entry = &mut entries[position];
        Self::write_check(name, entry, value.tag())?;
        log::debug!("Context {}: '{}' <- {}", self.run_id, name, value.tag());
        entry.value = Some(value);
        Ok(())
    }

    /// Store a typed value under `name`
    pub fn set<T: Any + Send + Sync + Clone>(&self, name: &str, value: T) -> Result<()> {
        self.set_data(name, SlotValue::new(value))
    }

    /// Whether a value is currently stored under `name`
    pub fn is_set(&self, name: &str) -> Result<bool> {
        let position = self.position(name)?;
        Ok(self.entries.lock()[position].value.is_some())
    }

    /// Type of the value stored under `name`, if any
    pub fn stored_type(&self, name: &str) -> Result<Option<TypeTag>> {
        let position = self.position(name)?;
        Ok(self.entries.lock()[position].value.as_ref().map(SlotValue::tag))
    }

    /// Drop the value stored under `name`
    pub fn clear(&self, name: &str) -> Result<()> {
        let position = self.position(name)?;
        self.entries.lock()[position].value = None;
        Ok(())
    }

    // The builder never registers "", so an empty name is simply unknown.
    fn position(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TaskGraphError::UnknownName(name.to_string()))
    }

    fn write_check(name: &str, entry: &Entry, tag: TypeTag) -> Result<()> {
        if tag.is_void() {
            return Err(TaskGraphError::UnspecifiedType(name.to_string()));
        }
        match entry.declared {
            Some(expected) if expected != tag => Err(TaskGraphError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual: tag,
            }),
            _ => Ok(()),
        }
    }

    fn read_check<'a>(name: &str, entry: &'a Entry, tag: TypeTag) -> Result<&'a SlotValue> {
        if let Some(expected) = entry.declared.filter(|expected| *expected != tag) {
            return Err(TaskGraphError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual: tag,
            });
        }
        let value = entry
            .value
            .as_ref()
            .ok_or_else(|| TaskGraphError::NullData(name.to_string()))?;
        if value.tag() != tag {
            return Err(TaskGraphError::TypeMismatch {
                name: name.to_string(),
                expected: tag,
                actual: value.tag(),
            });
        }
        Ok(value)
    }
}

impl std::fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedContext")
            .field("run_id", &self.run_id)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Mat(Vec<u8>);

    fn context() -> SharedContext {
        SharedContext::builder()
            .declare_typed::<Mat>("image")
            .declare("scratch")
            .build()
            .unwrap()
    }

    #[test]
    fn test_unknown_name() {
        let ctx = context();
        assert!(matches!(
            ctx.get::<Mat>("nope"),
            Err(TaskGraphError::UnknownName(_))
        ));
        assert_eq!(
            ctx.set("nope", 1u8).unwrap_err().kind(),
            ErrorKind::Lookup
        );
        assert!(ctx.can_write("nope", TypeTag::of::<u8>()).is_err());
    }

    #[test]
    fn test_empty_name_is_unknown() {
        let ctx = context();
        let err = ctx.get::<u32>("").unwrap_err();
        assert!(matches!(err, TaskGraphError::UnknownName(_)));
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(ctx.set("", 1u8).unwrap_err().kind(), ErrorKind::Lookup);
        assert_eq!(
            ctx.can_write("", TypeTag::of::<u8>()).unwrap_err().kind(),
            ErrorKind::Lookup
        );
    }

    #[test]
    fn test_get_before_write_is_null() {
        let ctx = context();
        assert!(matches!(
            ctx.get::<Mat>("image"),
            Err(TaskGraphError::NullData(_))
        ));
        assert!(!ctx.is_set("image").unwrap());
    }

    #[test]
    fn test_set_and_get() {
        let ctx = context();
        ctx.set("image", Mat(vec![1, 2])).unwrap();
        assert_eq!(ctx.get::<Mat>("image").unwrap(), Mat(vec![1, 2]));
        assert_eq!(ctx.stored_type("image").unwrap(), Some(TypeTag::of::<Mat>()));
        let value = ctx.get_data("image", TypeTag::of::<Mat>()).unwrap();
        assert_eq!(value.tag(), TypeTag::of::<Mat>());
        assert_eq!(value.downcast_ref::<Mat>().map(|m| m.0.len()), Some(2));
    }

    #[test]
    fn test_context_usable_while_read_value_held() {
        let ctx = Arc::new(context());
        ctx.set("image", Mat(vec![3])).unwrap();
        let held = ctx.get_data("image", TypeTag::of::<Mat>()).unwrap();

        // Other operations, on this thread or another, proceed while held
        assert!(!ctx.is_set("scratch").unwrap());
        let (tx, rx) = std::sync::mpsc::channel();
        let other = ctx.clone();
        std::thread::spawn(move || {
            other.set("image", Mat(vec![4])).unwrap();
            tx.send(other.get::<Mat>("image").unwrap()).unwrap();
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), Mat(vec![4]));
        assert_eq!(held.downcast_ref::<Mat>(), Some(&Mat(vec![3])));
    }

    #[test]
    fn test_get_with_wrong_type() {
        let ctx = context();
        ctx.set("scratch", 5u32).unwrap();
        assert!(matches!(
            ctx.get::<String>("scratch"),
            Err(TaskGraphError::TypeMismatch { .. })
        ));
        // Declared type is checked even before anything is written
        assert!(matches!(
            ctx.get::<String>("image"),
            Err(TaskGraphError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_last_writer_wins() {
        let ctx = context();
        ctx.set("scratch", 1u32).unwrap();
        ctx.set("scratch", 2u32).unwrap();
        assert_eq!(ctx.get::<u32>("scratch").unwrap(), 2);

        // Untyped names may change type between writes
        ctx.set("scratch", "text".to_string()).unwrap();
        assert_eq!(ctx.get::<String>("scratch").unwrap(), "text");
    }

    #[test]
    fn test_can_write_matches_set_data() {
        let ctx = context();
        assert!(ctx.can_write("image", TypeTag::of::<Mat>()).unwrap());
        assert!(!ctx.can_write("image", TypeTag::of::<u8>()).unwrap());
        assert!(ctx.can_write("scratch", TypeTag::of::<u8>()).unwrap());
        assert!(!ctx.can_write("scratch", TypeTag::void()).unwrap());

        let err = ctx.set("image", 1u8).unwrap_err();
        assert!(matches!(err, TaskGraphError::TypeMismatch { .. }));
        assert!(!ctx.is_set("image").unwrap());
    }

    #[test]
    fn test_take_data_empties_name() {
        let ctx = context();
        ctx.set("image", Mat(vec![7])).unwrap();
        let value = ctx.take_data("image", TypeTag::of::<Mat>()).unwrap();
        assert_eq!(value.downcast::<Mat>().unwrap(), Mat(vec![7]));
        assert!(matches!(
            ctx.take_data("image", TypeTag::of::<Mat>()),
            Err(TaskGraphError::NullData(_))
        ));
    }

    #[test]
    fn test_clear() {
        let ctx = context();
        ctx.set("scratch", 1i32).unwrap();
        ctx.clear("scratch").unwrap();
        assert!(!ctx.is_set("scratch").unwrap());
    }

    #[test]
    fn test_builder_rejects_bad_names() {
        assert!(SharedContext::builder().declare("").build().is_err());
        assert!(SharedContext::builder()
            .declare("a")
            .declare_typed::<u8>("a")
            .build()
            .is_err());
        assert!(SharedContext::builder()
            .declare_typed::<()>("void")
            .build()
            .is_err());
    }

    #[test]
    fn test_names_and_run_ids() {
        let a = context();
        let b = context();
        assert_eq!(a.names(), vec!["image", "scratch"]);
        assert!(a.contains("scratch"));
        assert_ne!(a.run_id(), b.run_id());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers() {
        let ctx = Arc::new(
            SharedContext::builder()
                .declare_typed::<usize>("counter")
                .build()
                .unwrap(),
        );
        let mut handles = Vec::new();
        for i in 0..32usize {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                ctx.set("counter", i).unwrap();
                ctx.get::<usize>("counter").unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap() < 32);
        }
        assert!(ctx.get::<usize>("counter").unwrap() < 32);
    }
}
