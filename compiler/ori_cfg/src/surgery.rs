//! Graph surgery: splicing straight-line chains into a CFG.
//!
//! Every method inserts its payloads as a linear chain (each joined to the
//! next by an unlabelled edge) and then redirects existing edges onto the
//! chain. Redirected edges keep their labels, so a branch whose true edge
//! is moved still reports `[true, false]`. A node's own self-edge is
//! redirected like any other edge, except on a
//! [`SelfLoop`](CfgNodeKind::SelfLoop), which always keeps it.
//!
//! Each method returns the `(first, last)` handles of the inserted chain,
//! or `None` when the chain is empty (in which case the graph is untouched).

use crate::graph::{Edge, GraphError, NodeId};
use crate::node::{CfgNode, CfgNodeKind};
use crate::CfgGraph;

impl CfgGraph {
    /// Insert `chain` immediately before `node`.
    ///
    /// Every edge that entered `node` now enters the chain's head (in the
    /// same order), so a self-edge becomes `node -> head`; the chain's tail
    /// falls into `node`.
    pub fn prepend_node(
        &mut self,
        node: NodeId,
        chain: Vec<CfgNode>,
    ) -> Result<Option<(NodeId, NodeId)>, GraphError> {
        if !self.contains(node) {
            return Err(GraphError::MissingNode(node));
        }
        let Some((first, last)) = self.insert_chain(chain)? else {
            return Ok(None);
        };

        let keep_self = self.keeps_self_edge(node);
        let incoming: Vec<_> = self.incoming_edges(node).to_vec();
        for (pred, label) in incoming {
            if keep_self && pred == node {
                continue;
            }
            self.unlink_edge(Edge {
                from: pred,
                to: node,
                label,
            })?;
            self.join_with(pred, first, label)?;
        }
        self.join(last, node)?;
        Ok(Some((first, last)))
    }

    /// Insert `chain` immediately after `node`.
    ///
    /// Every edge that left `node` now leaves the chain's tail instead, so
    /// a self-edge becomes `tail -> node`; `node` falls into the chain's
    /// head.
    pub fn postpend_node(
        &mut self,
        node: NodeId,
        chain: Vec<CfgNode>,
    ) -> Result<Option<(NodeId, NodeId)>, GraphError> {
        if !self.contains(node) {
            return Err(GraphError::MissingNode(node));
        }
        let Some((first, last)) = self.insert_chain(chain)? else {
            return Ok(None);
        };

        let keep_self = self.keeps_self_edge(node);
        let outgoing: Vec<_> = self.outgoing_edges(node).to_vec();
        for (succ, label) in outgoing {
            if keep_self && succ == node {
                continue;
            }
            self.unlink_edge(Edge {
                from: node,
                to: succ,
                label,
            })?;
            self.join_with(last, succ, label)?;
        }
        self.join(node, first)?;
        Ok(Some((first, last)))
    }

    /// Insert `chain` on `edge`, which must exist.
    ///
    /// The source keeps the edge's label towards the chain's head.
    pub fn inner_insert(
        &mut self,
        edge: Edge,
        chain: Vec<CfgNode>,
    ) -> Result<Option<(NodeId, NodeId)>, GraphError> {
        if !self.graph().contains_labeled_edge(edge) {
            return Err(GraphError::MissingEdge {
                from: edge.from,
                to: edge.to,
                label: Some(edge.label),
            });
        }
        let Some((first, last)) = self.insert_chain(chain)? else {
            return Ok(None);
        };

        self.unlink_edge(edge)?;
        self.join_with(edge.from, first, edge.label)?;
        self.join(last, edge.to)?;
        Ok(Some((first, last)))
    }

    /// Substitute `old` with a fresh node holding `replacement`.
    ///
    /// All incident edges, self-edges included, are re-pointed at the new
    /// node with their labels, and `old` is removed. If `old` was the
    /// start node the new node becomes the start.
    pub fn replace_node(&mut self, old: NodeId, replacement: CfgNode) -> Result<NodeId, GraphError> {
        if !self.contains(old) {
            return Err(GraphError::MissingNode(old));
        }
        let incoming: Vec<_> = self.incoming_edges(old).to_vec();
        let outgoing: Vec<_> = self.outgoing_edges(old).to_vec();
        let new = self.insert(replacement);

        for &(pred, label) in &incoming {
            let pred = if pred == old { new } else { pred };
            self.join_with(pred, new, label)?;
        }
        for &(succ, label) in &outgoing {
            if succ != old {
                self.join_with(new, succ, label)?;
            }
        }

        if old == self.start() {
            self.set_start(new);
        }
        self.remove(old)?;
        Ok(new)
    }

    /// Whether surgery around `node` leaves its self-edge in place.
    pub(crate) fn keeps_self_edge(&self, node: NodeId) -> bool {
        matches!(self.node(node).kind, CfgNodeKind::SelfLoop)
    }

    fn insert_chain(&mut self, chain: Vec<CfgNode>) -> Result<Option<(NodeId, NodeId)>, GraphError> {
        let ids = chain.into_iter().map(|node| self.insert(node)).collect::<Vec<_>>();
        let (Some(&first), Some(&last)) = (ids.first(), ids.last()) else {
            return Ok(None);
        };
        for pair in ids.windows(2) {
            self.join(pair[0], pair[1])?;
        }
        Ok(Some((first, last)))
    }
}

#[cfg(test)]
mod tests;
