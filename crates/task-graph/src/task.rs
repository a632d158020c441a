//! Task abstraction driven by an external executor
//!
//! A task owns a frozen [`SlotSet`] describing its data. For each
//! activation the executor:
//!
//! 1. enumerates the slots with [`SlotSet::all`],
//! 2. assigns every input slot from the [`SharedContext`](crate::SharedContext),
//! 3. calls [`Task::execute`],
//! 4. reads or consumes every output slot and writes it back to the context,
//! 5. calls [`SlotSet::release_all`].
//!
//! Slot locks are never held while `execute` runs.

use crate::error::Result;
use crate::slot_set::SlotSet;

/// A unit of work with declared inputs and outputs
pub trait Task: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// The slots this task reads and writes, frozen after construction
    fn slots(&self) -> &SlotSet;

    /// Run the task against its currently assigned slots
    fn execute(&self) -> Result<()>;
}
