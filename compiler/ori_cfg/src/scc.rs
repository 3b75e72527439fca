//! Strongly-connected components of a CFG.
//!
//! Used to order forward dataflow work: facts are settled one SCC at a
//! time, sources of the condensation first.
//!
//! # Algorithm
//!
//! Kosaraju's two passes:
//!
//! 1. Iterative DFS over successors, recording nodes in postorder. Nodes
//!    the start cannot reach root their own searches first; the start is
//!    the last root, so it finishes last.
//! 2. Walk the nodes in reverse postorder; each node not yet assigned
//!    roots a DFS over *predecessors* restricted to unassigned nodes.
//!    Everything that DFS reaches is one component.
//!
//! Components come out in a topological order of the condensation, so
//! every cross-component edge points from a lower [`SccId`] to a higher
//! one, and the start's component is always number 0. Within a
//! component, nodes are listed in reverse postorder.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{Edge, NodeId};
use crate::CfgGraph;

/// Index of a component in an [`SccGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SccId(u32);

impl SccId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SccId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scc{}", self.0)
    }
}

/// One strongly-connected component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scc {
    pub id: SccId,
    /// Member nodes in reverse postorder.
    pub nodes: Vec<NodeId>,
    /// Edges with both endpoints in this component (the induced subgraph).
    pub edges: Vec<Edge>,
}

impl Scc {
    /// A component is cyclic if it has more than one node or a self-edge.
    pub fn is_cyclic(&self) -> bool {
        self.nodes.len() > 1 || !self.edges.is_empty()
    }
}

/// Condensation of a CFG into its strongly-connected components.
#[derive(Clone, Debug)]
pub struct SccGraph {
    sccs: Vec<Scc>,
    scc_of: FxHashMap<NodeId, SccId>,
    /// Per component: one edge to each distinct successor component.
    cross_edges: Vec<Vec<Edge>>,
    start: SccId,
}

impl SccGraph {
    /// Decompose `cfg`. Every node lands in exactly one component.
    pub fn build(cfg: &CfgGraph) -> Self {
        let order = postorder(cfg);
        let rpo_index: FxHashMap<NodeId, usize> = order
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &node)| (node, i))
            .collect();

        let mut scc_of: FxHashMap<NodeId, SccId> = FxHashMap::default();
        let mut members: Vec<Vec<NodeId>> = Vec::new();
        for &root in order.iter().rev() {
            if scc_of.contains_key(&root) {
                continue;
            }
            #[expect(
                clippy::cast_possible_truncation,
                reason = "component count is bounded by the u32 node count"
            )]
            let id = SccId::new(members.len() as u32);
            let mut nodes = vec![root];
            scc_of.insert(root, id);
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                for pred in cfg.incoming(node) {
                    if !scc_of.contains_key(&pred) {
                        scc_of.insert(pred, id);
                        nodes.push(pred);
                        stack.push(pred);
                    }
                }
            }
            nodes.sort_by_key(|node| rpo_index[node]);
            members.push(nodes);
        }

        let mut sccs: Vec<Scc> = members
            .into_iter()
            .enumerate()
            .map(|(i, nodes)| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "component count is bounded by the u32 node count"
                )]
                let id = SccId::new(i as u32);
                Scc {
                    id,
                    nodes,
                    edges: Vec::new(),
                }
            })
            .collect();
        let mut cross_edges: Vec<Vec<Edge>> = vec![Vec::new(); sccs.len()];
        let mut seen_targets: Vec<FxHashSet<SccId>> = vec![FxHashSet::default(); sccs.len()];

        for edge in cfg.edges() {
            let from = scc_of[&edge.from];
            let to = scc_of[&edge.to];
            if from == to {
                sccs[from.index()].edges.push(edge);
            } else if seen_targets[from.index()].insert(to) {
                debug_assert!(from < to, "cross edge {edge:?} runs against topological order");
                cross_edges[from.index()].push(edge);
            }
        }

        let start = scc_of[&cfg.start()];
        tracing::trace!(
            sccs = sccs.len(),
            cyclic = sccs.iter().filter(|scc| scc.is_cyclic()).count(),
            "built scc graph"
        );
        SccGraph {
            sccs,
            scc_of,
            cross_edges,
            start,
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.sccs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sccs.is_empty()
    }

    /// The component holding the CFG's start node.
    pub fn start(&self) -> SccId {
        self.start
    }

    pub fn scc(&self, id: SccId) -> &Scc {
        &self.sccs[id.index()]
    }

    /// Components in topological order.
    pub fn sccs(&self) -> &[Scc] {
        &self.sccs
    }

    /// The component `node` belongs to.
    ///
    /// # Panics
    /// Panics if `node` was not in the graph this was built from.
    pub fn scc_of(&self, node: NodeId) -> SccId {
        self.scc_of[&node]
    }

    /// Edges leaving `id`, one per distinct target component, labels kept.
    pub fn cross_edges(&self, id: SccId) -> &[Edge] {
        &self.cross_edges[id.index()]
    }

    /// Distinct successor components of `id`.
    pub fn successors(&self, id: SccId) -> impl Iterator<Item = SccId> + '_ {
        self.cross_edges(id).iter().map(|edge| self.scc_of(edge.to))
    }
}

/// Postorder over successors. Nodes unreachable from the start are roots
/// first (in insertion order), the start node last.
pub(crate) fn postorder(cfg: &CfgGraph) -> Vec<NodeId> {
    let start = cfg.start();
    let reachable = cfg.graph().reachable_from(start);
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut order = Vec::with_capacity(cfg.len());
    let roots = cfg
        .nodes()
        .filter(|node| !reachable.contains(node))
        .chain(std::iter::once(start));

    for root in roots {
        if !visited.insert(root) {
            continue;
        }
        // (node, index of the next successor to try)
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        while let Some((node, next)) = stack.last_mut() {
            let succs = cfg.outgoing(*node);
            if let Some(&succ) = succs.get(*next) {
                *next += 1;
                if visited.insert(succ) {
                    stack.push((succ, 0));
                }
            } else {
                order.push(*node);
                stack.pop();
            }
        }
    }
    order
}
