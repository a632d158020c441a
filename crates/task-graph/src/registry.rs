//! Node registry owning the graph topology
//!
//! Every edge is stored twice: once in the registry-wide edge set and once
//! in the adjacency sets of both endpoints. Neighbor queries read the
//! adjacency sets directly; [`NodeRegistry::validate`] audits that the two
//! representations agree.
//!
//! # Usage
//!
//! ```ignore
//! use task_graph::{NodeKind, NodeRegistry};
//!
//! let mut registry = NodeRegistry::new();
//! let input = registry.add_node(NodeKind::GlobalInput)?;
//! let blur = registry.add_node(NodeKind::Task)?;
//! registry.link(registry.global_start().index(), input)?;
//! registry.link(input, blur)?;
//!
//! let report = registry.validate();
//! ```
//!
//! The registry does no internal locking. Build it on one thread, then
//! share it read-only.

use std::collections::HashSet;

use crate::error::{Result, TaskGraphError};
use crate::types::{Edge, GraphSnapshot, Node, NodeIndex, NodeKind, RegistryConfig};
use crate::validation::{self, ValidationIssue, ValidationReport};

/// Owner of all nodes and edges of one task graph
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: HashSet<Edge>,
    config: RegistryConfig,
}

impl NodeRegistry {
    /// Create a registry holding only GlobalStart (index 0) and GlobalStop (index 1)
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with explicit limits
    ///
    /// The two global boundaries are always created, even when
    /// `max_nodes` is smaller than two.
    pub fn with_config(config: RegistryConfig) -> Self {
        let nodes = vec![
            Node::new(NodeIndex::GLOBAL_START, NodeKind::GlobalStart),
            Node::new(NodeIndex::GLOBAL_STOP, NodeKind::GlobalStop),
        ];
        Self {
            nodes,
            edges: HashSet::new(),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Append a node with empty adjacency and return its index
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeIndex> {
        let position = self.nodes.len();
        let limit = self.config.max_nodes.min(u32::MAX as usize);
        if position >= limit {
            return Err(TaskGraphError::Capacity { limit });
        }
        let raw = u32::try_from(position).map_err(|_| TaskGraphError::Capacity { limit })?;
        let index = NodeIndex::new(raw);

        self.nodes.push(Node::new(index, kind));
        log::debug!("Added {} node {}", kind, index);
        Ok(index)
    }

    /// Record a directed edge `from -> to`
    ///
    /// Re-adding an existing edge is a no-op. The reverse of an existing
    /// edge is rejected rather than replacing it.
    pub fn link(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Err(TaskGraphError::SelfLoop(from));
        }

        let edge = Edge::new(from, to);
        if self.edges.contains(&edge) {
            return Ok(());
        }
        if self.edges.contains(&edge.reversed()) {
            log::warn!("Rejected link {} -> {}: reverse edge exists", from, to);
            return Err(TaskGraphError::DirectionConflict { from, to });
        }

        // Both indices were checked above, so all three inserts happen together.
        self.edges.insert(edge);
        self.nodes[from.position()].outflows.insert(to);
        self.nodes[to.position()].inflows.insert(from);
        log::debug!("Linked {} -> {}", from, to);
        Ok(())
    }

    /// Nodes with an edge into `index`
    pub fn inflows(&self, index: NodeIndex) -> Result<Vec<&Node>> {
        let node = self.node(index)?;
        Ok(node.inflows.iter().map(|i| &self.nodes[i.position()]).collect())
    }

    /// Nodes that `index` has an edge to
    pub fn outflows(&self, index: NodeIndex) -> Result<Vec<&Node>> {
        let node = self.node(index)?;
        Ok(node.outflows.iter().map(|i| &self.nodes[i.position()]).collect())
    }

    /// Look up a node by index
    pub fn node(&self, index: NodeIndex) -> Result<&Node> {
        self.nodes
            .get(index.position())
            .ok_or(TaskGraphError::NodeNotFound {
                index,
                count: self.nodes.len(),
            })
    }

    pub fn global_start(&self) -> &Node {
        &self.nodes[NodeIndex::GLOBAL_START.position()]
    }

    pub fn global_stop(&self) -> &Node {
        &self.nodes[NodeIndex::GLOBAL_STOP.position()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the directed edge `from -> to` is recorded
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.edges.contains(&Edge::new(from, to))
    }

    /// All nodes in index order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All recorded edges, sorted
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self.edges.iter().copied().collect();
        edges.sort();
        edges
    }

    /// Nodes of one kind, in index order
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.kind == kind).collect()
    }

    /// Owned copy of the current topology
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges(),
        }
    }

    /// Run every structural and type-shape check and collect all issues
    pub fn validate(&self) -> ValidationReport {
        validation::validate_registry(self)
    }

    /// Run every check, handing each issue to `reporter` as it is found
    ///
    /// Returns `true` when no error-severity issue was reported.
    pub fn validate_with(&self, reporter: impl FnMut(&ValidationIssue)) -> bool {
        validation::validate_registry_with(self, reporter)
    }

    fn check_index(&self, index: NodeIndex) -> Result<()> {
        self.node(index).map(|_| ())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ids(nodes: &[&Node]) -> Vec<NodeIndex> {
        nodes.iter().map(|n| n.index()).collect()
    }

    #[test]
    fn test_new_has_global_boundaries() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.node_count(), 2);
        assert_eq!(registry.edge_count(), 0);

        let start = registry.global_start();
        assert_eq!(start.index(), NodeIndex::new(0));
        assert_eq!(start.kind(), NodeKind::GlobalStart);
        assert!(start.inflows().is_empty());

        let stop = registry.global_stop();
        assert_eq!(stop.index(), NodeIndex::new(1));
        assert_eq!(stop.kind(), NodeKind::GlobalStop);
        assert!(stop.outflows().is_empty());
    }

    #[test]
    fn test_add_node_assigns_increasing_indices() {
        let mut registry = NodeRegistry::new();
        let a = registry.add_node(NodeKind::Task).unwrap();
        let b = registry.add_node(NodeKind::Data).unwrap();
        assert_eq!(a, NodeIndex::new(2));
        assert_eq!(b, NodeIndex::new(3));
        assert_eq!(registry.node(b).unwrap().kind(), NodeKind::Data);
        assert!(registry.node(b).unwrap().inflows().is_empty());
    }

    #[test]
    fn test_add_node_capacity() {
        let mut registry = NodeRegistry::with_config(RegistryConfig { max_nodes: 3 });
        registry.add_node(NodeKind::Task).unwrap();
        let err = registry.add_node(NodeKind::Task).unwrap_err();
        assert!(matches!(err, TaskGraphError::Capacity { limit: 3 }));
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(registry.node_count(), 3);
    }

    #[test]
    fn test_link_unknown_index() {
        let mut registry = NodeRegistry::new();
        let err = registry
            .link(NodeIndex::GLOBAL_START, NodeIndex::new(7))
            .unwrap_err();
        assert!(matches!(err, TaskGraphError::NodeNotFound { count: 2, .. }));
        assert_eq!(registry.edge_count(), 0);
    }

    #[test]
    fn test_link_self_loop() {
        let mut registry = NodeRegistry::new();
        let a = registry.add_node(NodeKind::Task).unwrap();
        let err = registry.link(a, a).unwrap_err();
        assert!(matches!(err, TaskGraphError::SelfLoop(i) if i == a));
        assert!(registry.node(a).unwrap().outflows().is_empty());
    }

    #[test]
    fn test_link_records_both_representations() {
        let mut registry = NodeRegistry::new();
        let data = registry.add_node(NodeKind::Data).unwrap();
        let task = registry.add_node(NodeKind::Task).unwrap();
        registry.link(data, task).unwrap();

        assert!(registry.contains_edge(data, task));
        assert_eq!(ids(&registry.outflows(data).unwrap()), vec![task]);
        assert_eq!(ids(&registry.inflows(task).unwrap()), vec![data]);
        assert!(registry.inflows(data).unwrap().is_empty());
    }

    #[test]
    fn test_relink_is_idempotent() {
        let mut registry = NodeRegistry::new();
        let data = registry.add_node(NodeKind::Data).unwrap();
        let task = registry.add_node(NodeKind::Task).unwrap();
        registry.link(data, task).unwrap();
        let before = registry.snapshot();

        registry.link(data, task).unwrap();
        assert_eq!(registry.snapshot(), before);
        assert_eq!(registry.edge_count(), 1);
    }

    #[test]
    fn test_reverse_link_conflicts_and_leaves_graph_unchanged() {
        let mut registry = NodeRegistry::new();
        let a = registry.add_node(NodeKind::Task).unwrap();
        let b = registry.add_node(NodeKind::Data).unwrap();
        registry.link(a, b).unwrap();
        let before = registry.snapshot();

        let err = registry.link(b, a).unwrap_err();
        assert!(matches!(
            err,
            TaskGraphError::DirectionConflict { from, to } if from == b && to == a
        ));
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_flows_on_invalid_index() {
        let registry = NodeRegistry::new();
        assert!(registry.inflows(NodeIndex::new(2)).is_err());
        assert!(registry.outflows(NodeIndex::new(99)).is_err());
    }

    #[test]
    fn test_plugin_cycle_scenario() {
        let mut registry = NodeRegistry::new();
        let task = registry.add_node(NodeKind::Task).unwrap();
        let task_plugin = registry.add_node(NodeKind::TaskPlugin).unwrap();
        let data = registry.add_node(NodeKind::Data).unwrap();
        let data_plugin = registry.add_node(NodeKind::DataPlugin).unwrap();
        registry.link(task, task_plugin).unwrap();
        registry.link(task_plugin, data).unwrap();
        registry.link(data, data_plugin).unwrap();
        registry.link(data_plugin, task).unwrap();

        assert_eq!(ids(&registry.outflows(data_plugin).unwrap()), vec![task]);
        assert_eq!(ids(&registry.inflows(data_plugin).unwrap()), vec![data]);

        let report = registry.validate();
        assert!(report.is_structurally_sound());
        assert!(!report.is_valid());
        let flagged = report.flagged_nodes();
        for index in [task, task_plugin, data, data_plugin] {
            assert!(flagged.contains(&index), "node {} not flagged", index);
        }
    }

    #[test]
    fn test_nodes_of_kind_and_snapshot_order() {
        let mut registry = NodeRegistry::new();
        let d1 = registry.add_node(NodeKind::Data).unwrap();
        registry.add_node(NodeKind::Task).unwrap();
        let d2 = registry.add_node(NodeKind::Data).unwrap();

        assert_eq!(ids(&registry.nodes_of_kind(NodeKind::Data)), vec![d1, d2]);

        let snapshot = registry.snapshot();
        let positions: Vec<u32> = snapshot.nodes.iter().map(|n| n.index().get()).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut registry = NodeRegistry::new();
        let input = registry.add_node(NodeKind::GlobalInput).unwrap();
        registry.link(NodeIndex::GLOBAL_START, input).unwrap();

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["edges"][0]["from"], 0);
        assert_eq!(json["edges"][0]["to"], 2);
        assert_eq!(json["nodes"][2]["kind"], "global_input");
    }
}
