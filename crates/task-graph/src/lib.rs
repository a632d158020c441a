//! Task Graph - topology and typed data exchange for task-graph pipelines
//!
//! This crate is the substrate an executor runs on. It provides:
//!
//! - A node registry of typed nodes (boundaries, data, tasks, barriers)
//!   with a self-auditing dual edge representation
//! - Single-assignment, type-checked data slots grouped per task
//! - A fixed-namespace shared context that carries values between
//!   task activations
//!
//! Scheduling is not part of this crate. An executor drives tasks through
//! the [`Task`] trait and moves values between [`SharedContext`] and each
//! task's [`SlotSet`].
//!
//! # Example
//!
//! ```ignore
//! use task_graph::{NodeIndex, NodeKind, NodeRegistry};
//!
//! let mut registry = NodeRegistry::new();
//! let input = registry.add_node(NodeKind::GlobalInput)?;
//! let blur = registry.add_node(NodeKind::Task)?;
//! registry.link(NodeIndex::GLOBAL_START, input)?;
//! registry.link(input, blur)?;
//!
//! let report = registry.validate();
//! for issue in report.issues() {
//!     println!("{}", issue);
//! }
//! ```

pub mod context;
pub mod edge_rules;
pub mod error;
pub mod registry;
pub mod slot;
pub mod slot_set;
pub mod task;
pub mod typed;
pub mod types;
pub mod validation;
pub mod value;

// Re-export key types
pub use context::{ContextBuilder, SharedContext};
pub use edge_rules::EdgeTypeRules;
pub use error::{ErrorKind, Result, TaskGraphError};
pub use registry::NodeRegistry;
pub use slot::{SlotRole, TypedSlot};
pub use slot_set::{SlotSet, SlotSetOptions};
pub use task::Task;
pub use typed::{Input, Output};
pub use types::{Edge, GraphSnapshot, Node, NodeIndex, NodeKind, RegistryConfig};
pub use validation::{Severity, ValidationCheck, ValidationIssue, ValidationReport};
pub use value::{SlotValue, TypeTag};
