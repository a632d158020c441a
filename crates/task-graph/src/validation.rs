//! Graph validation for node registries
//!
//! Four checks run in order, and every check keeps going after a failure
//! so a single pass produces the complete list of issues:
//!
//! 1. node identity: stored index equals storage position, kind is set
//! 2. edges imply flows: each edge appears in both endpoints' adjacency sets
//! 3. flows imply edges: each adjacency entry has an edge record, in range
//! 4. type shape: global boundaries sit where they must and every edge
//!    connects a permitted pair of kinds (see [`EdgeTypeRules`])

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::edge_rules::EdgeTypeRules;
use crate::registry::NodeRegistry;
use crate::types::{Edge, NodeIndex, NodeKind};

/// Which of the four checks produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCheck {
    NodeIdentity,
    EdgesImplyFlows,
    FlowsImplyEdges,
    TypeShape,
}

/// How much an issue matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fails validation
    Error,
    /// Reported but does not fail validation
    Warning,
}

/// A single validation finding with location context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Stored index differs from storage position
    IndexMismatch { position: usize, stored: NodeIndex },
    /// Node kind was never set
    UnspecifiedKind { node: NodeIndex },
    /// Edge not mirrored in its source's outflows
    EdgeMissingOutflow { edge: Edge },
    /// Edge not mirrored in its target's inflows
    EdgeMissingInflow { edge: Edge },
    /// Edge record refers to a node that does not exist
    EdgeOutOfRange { edge: Edge, node_count: usize },
    /// Outflow entry without an edge record
    OutflowWithoutEdge { node: NodeIndex, target: NodeIndex },
    /// Inflow entry without an edge record
    InflowWithoutEdge { node: NodeIndex, source: NodeIndex },
    /// Adjacency entry refers to a node that does not exist
    FlowOutOfRange {
        node: NodeIndex,
        neighbor: NodeIndex,
        node_count: usize,
    },
    /// GlobalStart stored somewhere other than index 0
    GlobalStartMisplaced { node: NodeIndex },
    /// GlobalStart has an inflow
    GlobalStartHasInflow { node: NodeIndex, source: NodeIndex },
    /// GlobalStart feeds something other than GlobalInput
    GlobalStartBadOutflow {
        node: NodeIndex,
        target: NodeIndex,
        kind: NodeKind,
    },
    /// GlobalStart has no outflow, the graph is likely disconnected
    GlobalStartDisconnected { node: NodeIndex },
    /// GlobalStop stored somewhere other than index 1
    GlobalStopMisplaced { node: NodeIndex },
    /// GlobalStop has an outflow
    GlobalStopHasOutflow { node: NodeIndex, target: NodeIndex },
    /// GlobalStop is fed by something other than GlobalOutput
    GlobalStopBadInflow {
        node: NodeIndex,
        source: NodeIndex,
        kind: NodeKind,
    },
    /// GlobalStop has no inflow, the graph is likely disconnected
    GlobalStopDisconnected { node: NodeIndex },
    /// Edge between two kinds that may not be linked
    ForbiddenEdge {
        edge: Edge,
        from_kind: NodeKind,
        to_kind: NodeKind,
    },
}

impl ValidationIssue {
    pub fn check(&self) -> ValidationCheck {
        match self {
            Self::IndexMismatch { .. } | Self::UnspecifiedKind { .. } => {
                ValidationCheck::NodeIdentity
            }
            Self::EdgeMissingOutflow { .. }
            | Self::EdgeMissingInflow { .. }
            | Self::EdgeOutOfRange { .. } => ValidationCheck::EdgesImplyFlows,
            Self::OutflowWithoutEdge { .. }
            | Self::InflowWithoutEdge { .. }
            | Self::FlowOutOfRange { .. } => ValidationCheck::FlowsImplyEdges,
            Self::GlobalStartMisplaced { .. }
            | Self::GlobalStartHasInflow { .. }
            | Self::GlobalStartBadOutflow { .. }
            | Self::GlobalStartDisconnected { .. }
            | Self::GlobalStopMisplaced { .. }
            | Self::GlobalStopHasOutflow { .. }
            | Self::GlobalStopBadInflow { .. }
            | Self::GlobalStopDisconnected { .. }
            | Self::ForbiddenEdge { .. } => ValidationCheck::TypeShape,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::GlobalStartDisconnected { .. } | Self::GlobalStopDisconnected { .. } => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Nodes this issue points at
    pub fn nodes(&self) -> Vec<NodeIndex> {
        match self {
            Self::IndexMismatch { position, .. } => {
                u32::try_from(*position).map(NodeIndex::new).into_iter().collect()
            }
            Self::UnspecifiedKind { node }
            | Self::GlobalStartMisplaced { node }
            | Self::GlobalStartDisconnected { node }
            | Self::GlobalStopMisplaced { node }
            | Self::GlobalStopDisconnected { node } => vec![*node],
            Self::EdgeMissingOutflow { edge }
            | Self::EdgeMissingInflow { edge }
            | Self::EdgeOutOfRange { edge, .. }
            | Self::ForbiddenEdge { edge, .. } => vec![edge.from, edge.to],
            Self::OutflowWithoutEdge { node, target }
            | Self::GlobalStopHasOutflow { node, target }
            | Self::GlobalStartBadOutflow { node, target, .. } => vec![*node, *target],
            Self::InflowWithoutEdge { node, source }
            | Self::GlobalStartHasInflow { node, source }
            | Self::GlobalStopBadInflow { node, source, .. } => vec![*node, *source],
            Self::FlowOutOfRange { node, .. } => vec![*node],
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexMismatch { position, stored } => {
                write!(f, "Node at position {} has stored index {}", position, stored)
            }
            Self::UnspecifiedKind { node } => write!(f, "Node {} has no kind set", node),
            Self::EdgeMissingOutflow { edge } => {
                write!(f, "Edge {} not found in outflows of node {}", edge, edge.from)
            }
            Self::EdgeMissingInflow { edge } => {
                write!(f, "Edge {} not found in inflows of node {}", edge, edge.to)
            }
            Self::EdgeOutOfRange { edge, node_count } => write!(
                f,
                "Edge {} refers to a missing node, node count is {}",
                edge, node_count
            ),
            Self::OutflowWithoutEdge { node, target } => {
                write!(f, "At node {}, outflow {} not found in edges", node, target)
            }
            Self::InflowWithoutEdge { node, source } => {
                write!(f, "At node {}, inflow {} not found in edges", node, source)
            }
            Self::FlowOutOfRange {
                node,
                neighbor,
                node_count,
            } => write!(
                f,
                "At node {}, neighbor {} is out of range, node count is {}",
                node, neighbor, node_count
            ),
            Self::GlobalStartMisplaced { node } => write!(
                f,
                "GlobalStart node only allowed at index 0, found at {}",
                node
            ),
            Self::GlobalStartHasInflow { node, source } => write!(
                f,
                "GlobalStart node {} cannot have inflows, found one from {}",
                node, source
            ),
            Self::GlobalStartBadOutflow { node, target, kind } => write!(
                f,
                "GlobalStart node {} has outflow to node {} which is {}, not GlobalInput",
                node, target, kind
            ),
            Self::GlobalStartDisconnected { node } => write!(
                f,
                "GlobalStart node {} has no outflow, graph is likely disconnected",
                node
            ),
            Self::GlobalStopMisplaced { node } => write!(
                f,
                "GlobalStop node only allowed at index 1, found at {}",
                node
            ),
            Self::GlobalStopHasOutflow { node, target } => write!(
                f,
                "GlobalStop node {} cannot have outflows, found one to {}",
                node, target
            ),
            Self::GlobalStopBadInflow { node, source, kind } => write!(
                f,
                "GlobalStop node {} has inflow from node {} which is {}, not GlobalOutput",
                node, source, kind
            ),
            Self::GlobalStopDisconnected { node } => write!(
                f,
                "GlobalStop node {} has no inflow, graph is likely disconnected",
                node
            ),
            Self::ForbiddenEdge {
                edge,
                from_kind,
                to_kind,
            } => write!(
                f,
                "Edge {} links {} to {}, which is not a permitted pair",
                edge, from_kind, to_kind
            ),
        }
    }
}

/// All issues found by one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// No error-severity issue was found
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// The first three checks found no error
    ///
    /// Always true for a registry built only through its public API.
    pub fn is_structurally_sound(&self) -> bool {
        self.errors()
            .all(|issue| issue.check() == ValidationCheck::TypeShape)
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Warning)
    }

    /// Issues produced by one check
    pub fn by_check(&self, check: ValidationCheck) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.check() == check)
    }

    /// Every node implicated by an error-severity issue
    pub fn flagged_nodes(&self) -> BTreeSet<NodeIndex> {
        self.errors().flat_map(|issue| issue.nodes()).collect()
    }
}

/// Validate a registry and collect the full report
pub fn validate_registry(registry: &NodeRegistry) -> ValidationReport {
    let mut issues = Vec::new();
    validate_registry_with(registry, |issue| issues.push(issue.clone()));
    ValidationReport { issues }
}

/// Validate a registry, streaming issues to `reporter`
///
/// Returns `true` when no error-severity issue was reported.
pub fn validate_registry_with(
    registry: &NodeRegistry,
    mut reporter: impl FnMut(&ValidationIssue),
) -> bool {
    let mut valid = true;
    let mut report = |issue: ValidationIssue| {
        match issue.severity() {
            Severity::Error => {
                log::warn!("Graph validation: {}", issue);
                valid = false;
            }
            Severity::Warning => log::debug!("Graph validation: {}", issue),
        }
        reporter(&issue);
    };

    validate_node_identity(registry, &mut report);
    validate_edges_imply_flows(registry, &mut report);
    validate_flows_imply_edges(registry, &mut report);
    validate_type_shape(registry, &mut report);

    valid
}

fn validate_node_identity(registry: &NodeRegistry, report: &mut impl FnMut(ValidationIssue)) {
    for (position, node) in registry.nodes.iter().enumerate() {
        if node.index.position() != position {
            report(ValidationIssue::IndexMismatch {
                position,
                stored: node.index,
            });
        }
        if node.kind == NodeKind::Unspecified {
            report(ValidationIssue::UnspecifiedKind { node: node.index });
        }
    }
}

fn validate_edges_imply_flows(registry: &NodeRegistry, report: &mut impl FnMut(ValidationIssue)) {
    let node_count = registry.nodes.len();
    for edge in registry.edges() {
        let from = registry.nodes.get(edge.from.position());
        let to = registry.nodes.get(edge.to.position());
        let (Some(from), Some(to)) = (from, to) else {
            report(ValidationIssue::EdgeOutOfRange { edge, node_count });
            continue;
        };
        if !from.outflows.contains(&edge.to) {
            report(ValidationIssue::EdgeMissingOutflow { edge });
        }
        if !to.inflows.contains(&edge.from) {
            report(ValidationIssue::EdgeMissingInflow { edge });
        }
    }
}

fn validate_flows_imply_edges(registry: &NodeRegistry, report: &mut impl FnMut(ValidationIssue)) {
    let node_count = registry.nodes.len();
    for node in &registry.nodes {
        for &target in &node.outflows {
            if target.position() >= node_count {
                report(ValidationIssue::FlowOutOfRange {
                    node: node.index,
                    neighbor: target,
                    node_count,
                });
            } else if !registry.edges.contains(&Edge::new(node.index, target)) {
                report(ValidationIssue::OutflowWithoutEdge {
                    node: node.index,
                    target,
                });
            }
        }
        for &source in &node.inflows {
            if source.position() >= node_count {
                report(ValidationIssue::FlowOutOfRange {
                    node: node.index,
                    neighbor: source,
                    node_count,
                });
            } else if !registry.edges.contains(&Edge::new(source, node.index)) {
                report(ValidationIssue::InflowWithoutEdge {
                    node: node.index,
                    source,
                });
            }
        }
    }
}

fn validate_type_shape(registry: &NodeRegistry, report: &mut impl FnMut(ValidationIssue)) {
    let kind_of = |index: NodeIndex| {
        registry
            .nodes
            .get(index.position())
            .map(|n| n.kind)
            .unwrap_or_default()
    };

    for node in &registry.nodes {
        let index = node.index;
        match node.kind {
            NodeKind::GlobalStart => {
                if index != NodeIndex::GLOBAL_START {
                    report(ValidationIssue::GlobalStartMisplaced { node: index });
                }
                for &source in &node.inflows {
                    report(ValidationIssue::GlobalStartHasInflow {
                        node: index,
                        source,
                    });
                }
                if node.outflows.is_empty() {
                    report(ValidationIssue::GlobalStartDisconnected { node: index });
                }
                for &target in &node.outflows {
                    let kind = kind_of(target);
                    if kind != NodeKind::GlobalInput {
                        report(ValidationIssue::GlobalStartBadOutflow {
                            node: index,
                            target,
                            kind,
                        });
                    }
                }
            }
            NodeKind::GlobalStop => {
                if index != NodeIndex::GLOBAL_STOP {
                    report(ValidationIssue::GlobalStopMisplaced { node: index });
                }
                for &target in &node.outflows {
                    report(ValidationIssue::GlobalStopHasOutflow {
                        node: index,
                        target,
                    });
                }
                if node.inflows.is_empty() {
                    report(ValidationIssue::GlobalStopDisconnected { node: index });
                }
                for &source in &node.inflows {
                    let kind = kind_of(source);
                    if kind != NodeKind::GlobalOutput {
                        report(ValidationIssue::GlobalStopBadInflow {
                            node: index,
                            source,
                            kind,
                        });
                    }
                }
            }
            from_kind => {
                // Edges into either boundary are judged by its own rule above.
                for &target in &node.outflows {
                    let to_kind = kind_of(target);
                    let into_boundary =
                        matches!(to_kind, NodeKind::GlobalStart | NodeKind::GlobalStop);
                    if !into_boundary && !EdgeTypeRules::permits(from_kind, to_kind)
                    {
                        report(ValidationIssue::ForbiddenEdge {
                            edge: Edge::new(index, target),
                            from_kind,
                            to_kind,
                        });
                    }
                }
            }
        }
    }
}
