//! Permitted node-kind pairs for edges
//!
//! The table is fixed: boundaries connect only to their global data nodes,
//! and tasks sit between data-like nodes or barriers. Two data nodes are
//! never linked directly, and neither are two tasks.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::types::NodeKind;

static PERMITTED: LazyLock<BTreeSet<(NodeKind, NodeKind)>> = LazyLock::new(|| {
    let mut pairs = BTreeSet::new();
    pairs.insert((NodeKind::GlobalStart, NodeKind::GlobalInput));
    pairs.insert((NodeKind::GlobalOutput, NodeKind::GlobalStop));

    for task in NodeKind::ALL.into_iter().filter(|k| k.is_task_like()) {
        for input in NodeKind::ALL.into_iter().filter(|k| k.is_input_like()) {
            pairs.insert((input, task));
        }
        for output in NodeKind::ALL.into_iter().filter(|k| k.is_output_like()) {
            pairs.insert((task, output));
        }
        pairs.insert((task, NodeKind::Barrier));
        pairs.insert((NodeKind::Barrier, task));
    }
    pairs
});

/// Static table of permitted `(from, to)` node-kind pairs
pub struct EdgeTypeRules;

impl EdgeTypeRules {
    /// Whether an edge from a `from` node to a `to` node is allowed
    pub fn permits(from: NodeKind, to: NodeKind) -> bool {
        PERMITTED.contains(&(from, to))
    }

    /// All permitted pairs, in kind order
    pub fn pairs() -> impl Iterator<Item = (NodeKind, NodeKind)> {
        PERMITTED.iter().copied()
    }
}
