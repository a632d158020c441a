//! Core types for task graphs
//!
//! These types define the structure of a task graph: node indices,
//! node kinds, edges, and the per-node adjacency records owned by
//! [`NodeRegistry`](crate::registry::NodeRegistry).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable index of a node, assigned once in creation order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Index of the GlobalStart node in every registry
    pub const GLOBAL_START: NodeIndex = NodeIndex(0);
    /// Index of the GlobalStop node in every registry
    pub const GLOBAL_STOP: NodeIndex = NodeIndex(1);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index value
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Storage position this index refers to
    pub fn position(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// The kind of a node
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// No kind assigned; always reported by validation
    #[default]
    Unspecified,
    /// Entry boundary of the whole graph (index 0)
    GlobalStart,
    /// Exit boundary of the whole graph (index 1)
    GlobalStop,
    /// Data supplied from outside the graph
    GlobalInput,
    /// Data handed back outside the graph
    GlobalOutput,
    /// Control-only synchronization point between tasks
    Barrier,
    /// A named piece of data
    Data,
    /// Data provided by a plugin
    DataPlugin,
    /// A unit of executable work
    Task,
    /// Work provided by a plugin
    TaskPlugin,
}

impl NodeKind {
    /// Every kind a node may legitimately carry
    pub const ALL: [NodeKind; 9] = [
        NodeKind::GlobalStart,
        NodeKind::GlobalStop,
        NodeKind::GlobalInput,
        NodeKind::GlobalOutput,
        NodeKind::Barrier,
        NodeKind::Data,
        NodeKind::DataPlugin,
        NodeKind::Task,
        NodeKind::TaskPlugin,
    ];

    /// Task or TaskPlugin
    pub fn is_task_like(self) -> bool {
        matches!(self, NodeKind::Task | NodeKind::TaskPlugin)
    }

    /// Data or DataPlugin
    pub fn is_data_like(self) -> bool {
        matches!(self, NodeKind::Data | NodeKind::DataPlugin)
    }

    /// Kinds a task may read from
    pub fn is_input_like(self) -> bool {
        self.is_data_like() || self == NodeKind::GlobalInput
    }

    /// Kinds a task may write to
    pub fn is_output_like(self) -> bool {
        self.is_data_like() || self == NodeKind::GlobalOutput
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Unspecified => "Unspecified",
            NodeKind::GlobalStart => "GlobalStart",
            NodeKind::GlobalStop => "GlobalStop",
            NodeKind::GlobalInput => "GlobalInput",
            NodeKind::GlobalOutput => "GlobalOutput",
            NodeKind::Barrier => "Barrier",
            NodeKind::Data => "Data",
            NodeKind::DataPlugin => "DataPlugin",
            NodeKind::Task => "Task",
            NodeKind::TaskPlugin => "TaskPlugin",
        };
        f.write_str(name)
    }
}

/// A node together with its adjacency sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub(crate) index: NodeIndex,
    pub(crate) kind: NodeKind,
    pub(crate) inflows: BTreeSet<NodeIndex>,
    pub(crate) outflows: BTreeSet<NodeIndex>,
}

impl Node {
    pub(crate) fn new(index: NodeIndex, kind: NodeKind) -> Self {
        Self {
            index,
            kind,
            inflows: BTreeSet::new(),
            outflows: BTreeSet::new(),
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Indices of nodes with an edge into this node
    pub fn inflows(&self) -> &BTreeSet<NodeIndex> {
        &self.inflows
    }

    /// Indices of nodes this node has an edge to
    pub fn outflows(&self) -> &BTreeSet<NodeIndex> {
        &self.outflows
    }
}

/// A directed edge between two nodes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Edge {
    pub from: NodeIndex,
    pub to: NodeIndex,
}

impl Edge {
    pub fn new(from: NodeIndex, to: NodeIndex) -> Self {
        Self { from, to }
    }

    /// The same pair in the opposite direction
    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.from, self.to)
    }
}

/// Owned copy of a registry's topology, sorted by index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Limits applied when building a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Maximum number of nodes, including the two global boundaries
    pub max_nodes: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_nodes: u32::MAX as usize,
        }
    }
}
