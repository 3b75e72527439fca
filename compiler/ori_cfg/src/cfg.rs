//! Control-flow graph of a single function.

use ori_lir::Span;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::graph::{Edge, Graph, GraphError, Label, NodeId};
use crate::node::{CfgNode, CfgNodeKind};

/// A function's control-flow graph: a [`Graph`] of [`CfgNode`]s plus the
/// designated start node.
///
/// Passes other than construction, SSA conversion and the surgery
/// methods treat the graph as read-only and keep their own side tables
/// keyed by [`NodeId`].
#[derive(Clone, Debug)]
pub struct CfgGraph {
    graph: Graph<CfgNode>,
    start: NodeId,
}

impl CfgGraph {
    /// A graph holding only a start node.
    pub fn new(span: Span) -> Self {
        let mut graph = Graph::new();
        let start = graph.insert(CfgNode::new(CfgNodeKind::Start, span));
        CfgGraph { graph, start }
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub(crate) fn set_start(&mut self, start: NodeId) {
        self.start = start;
    }

    pub fn graph(&self) -> &Graph<CfgNode> {
        &self.graph
    }

    pub fn insert(&mut self, node: CfgNode) -> NodeId {
        self.graph.insert(node)
    }

    pub fn remove(&mut self, id: NodeId) -> Result<CfgNode, GraphError> {
        debug_assert_ne!(id, self.start, "removing the start node");
        self.graph.remove(id)
    }

    pub fn join(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.graph.join(from, to)
    }

    pub fn join_with(&mut self, from: NodeId, to: NodeId, label: Label) -> Result<(), GraphError> {
        self.graph.join_with(from, to, label)
    }

    pub fn unlink(&mut self, from: NodeId, to: NodeId) -> Result<SmallVec<[Label; 2]>, GraphError> {
        self.graph.unlink(from, to)
    }

    pub fn unlink_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        self.graph.unlink_edge(edge)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains(id)
    }

    pub fn node(&self, id: NodeId) -> &CfgNode {
        self.graph.node(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut CfgNode {
        self.graph.node_mut(id)
    }

    pub fn outgoing(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
        self.graph.outgoing(id)
    }

    pub fn incoming(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
        self.graph.incoming(id)
    }

    pub fn outgoing_edges(&self, id: NodeId) -> &[(NodeId, Label)] {
        self.graph.outgoing_edges(id)
    }

    pub fn incoming_edges(&self, id: NodeId) -> &[(NodeId, Label)] {
        self.graph.incoming_edges(id)
    }

    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.graph.contains_edge(from, to)
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.graph.in_degree(id)
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.graph.out_degree(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.nodes()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edges()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Remove every node unreachable from the start node.
    ///
    /// Returns the number of nodes removed.
    pub fn clean(&mut self) -> Result<usize, GraphError> {
        let reachable: FxHashSet<NodeId> = self.graph.reachable_from(self.start);
        let unreachable: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|id| !reachable.contains(id))
            .collect();
        for &id in &unreachable {
            self.graph.remove(id)?;
        }
        if !unreachable.is_empty() {
            tracing::trace!(removed = unreachable.len(), "removed unreachable nodes");
        }
        Ok(unreachable.len())
    }
}
