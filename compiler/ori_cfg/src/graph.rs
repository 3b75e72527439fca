//! Generic directed graph with optionally labelled edges.
//!
//! Nodes live in an arena and are addressed by [`NodeId`] handles. Two
//! nodes with identical payloads are still distinct graph elements:
//! equality and hashing only ever look at the handle. Handles are never
//! reused; removing a node tombstones its slot.
//!
//! Edges carry a [`Label`] (`Option<bool>`). Labels exist only to tell the
//! true and false successors of a conditional apart, and the adjacency
//! order encodes them: joining a `Some(true)` edge puts it at the head of
//! the source's outgoing list, any other edge goes to the tail. A branch
//! node therefore always reports `[true_target, false_target]`, whatever
//! order its edges were joined in.
//!
//! The graph owns no compiler semantics; the CFG wraps it in
//! [`CfgGraph`](crate::CfgGraph).

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

// ── Handles ─────────────────────────────────────────────────────────

/// Stable handle to a node in a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Edge label. `Some(true)`/`Some(false)` mark branch edges.
pub type Label = Option<bool>;

/// Ordered adjacency list: `(neighbor, label)` pairs.
pub type Adjacency = SmallVec<[(NodeId, Label); 2]>;

/// A directed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: Label,
}

impl Edge {
    /// Unlabelled edge.
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Edge {
            from,
            to,
            label: None,
        }
    }

    /// Branch edge.
    pub fn labeled(from: NodeId, to: NodeId, label: bool) -> Self {
        Edge {
            from,
            to,
            label: Some(label),
        }
    }
}

/// Lookup failure on a [`Graph`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} is not in the graph")]
    MissingNode(NodeId),
    /// `label` is `None` when any label would have matched.
    #[error("no edge {from} -> {to} (label {label:?})")]
    MissingEdge {
        from: NodeId,
        to: NodeId,
        label: Option<Label>,
    },
}

// ── Graph ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Slot<N> {
    payload: N,
    incoming: Adjacency,
    outgoing: Adjacency,
}

/// Arena-backed directed graph.
#[derive(Clone, Debug)]
pub struct Graph<N> {
    slots: Vec<Option<Slot<N>>>,
    live: usize,
}

impl<N> Default for Graph<N> {
    fn default() -> Self {
        Graph {
            slots: Vec::new(),
            live: 0,
        }
    }
}

impl<N> Graph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Add a node and return its handle.
    pub fn insert(&mut self, payload: N) -> NodeId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "graphs never approach u32::MAX nodes"
        )]
        let id = NodeId::new(self.slots.len() as u32);
        self.slots.push(Some(Slot {
            payload,
            incoming: Adjacency::new(),
            outgoing: Adjacency::new(),
        }));
        self.live += 1;
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub fn get(&self, id: NodeId) -> Option<&N> {
        self.slot(id).ok().map(|slot| &slot.payload)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.slot_mut(id).ok().map(|slot| &mut slot.payload)
    }

    /// Payload of a node known to be live.
    ///
    /// # Panics
    /// Panics if `id` was removed or never inserted.
    pub fn node(&self, id: NodeId) -> &N {
        &self.live_slot(id).payload
    }

    /// Mutable payload of a node known to be live.
    ///
    /// # Panics
    /// Panics if `id` was removed or never inserted.
    pub fn node_mut(&mut self, id: NodeId) -> &mut N {
        match self.slot_mut(id) {
            Ok(slot) => &mut slot.payload,
            Err(err) => panic!("{err}"),
        }
    }

    /// Remove a node together with all incident edges.
    ///
    /// Self-loops go first, then incoming edges, then outgoing edges.
    pub fn remove(&mut self, id: NodeId) -> Result<N, GraphError> {
        if self.contains_edge(id, id) {
            self.unlink(id, id)?;
        }

        let incoming = self.slot(id)?.incoming.clone();
        for (pred, label) in incoming {
            self.unlink_edge(Edge {
                from: pred,
                to: id,
                label,
            })?;
        }

        let outgoing = self.slot(id)?.outgoing.clone();
        for (succ, label) in outgoing {
            self.unlink_edge(Edge {
                from: id,
                to: succ,
                label,
            })?;
        }

        let Some(slot) = self.slots.get_mut(id.index()).and_then(Option::take) else {
            return Err(GraphError::MissingNode(id));
        };
        self.live -= 1;
        Ok(slot.payload)
    }

    /// Join `from -> to` with no label.
    pub fn join(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.join_with(from, to, None)
    }

    /// Join `from -> to` with `label`.
    ///
    /// True edges are placed at the head of `from`'s outgoing list, all
    /// others at the tail. Joining an edge that already exists with the
    /// same label is a no-op.
    pub fn join_with(&mut self, from: NodeId, to: NodeId, label: Label) -> Result<(), GraphError> {
        self.slot(to)?;
        let out = &mut self.slot_mut(from)?.outgoing;
        if out.contains(&(to, label)) {
            return Ok(());
        }
        if label == Some(true) {
            out.insert(0, (to, label));
        } else {
            out.push((to, label));
        }
        self.slot_mut(to)?.incoming.push((from, label));
        Ok(())
    }

    pub fn join_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        self.join_with(edge.from, edge.to, edge.label)
    }

    /// Remove every edge `from -> to`, whatever its label.
    ///
    /// Returns the labels of the removed edges.
    pub fn unlink(&mut self, from: NodeId, to: NodeId) -> Result<SmallVec<[Label; 2]>, GraphError> {
        let labels: SmallVec<[Label; 2]> = self
            .slot(from)?
            .outgoing
            .iter()
            .filter(|&&(succ, _)| succ == to)
            .map(|&(_, label)| label)
            .collect();
        if labels.is_empty() {
            return Err(GraphError::MissingEdge {
                from,
                to,
                label: None,
            });
        }
        for &label in &labels {
            self.unlink_edge(Edge { from, to, label })?;
        }
        Ok(labels)
    }

    /// Remove exactly the edge `edge`, label included.
    pub fn unlink_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let missing = GraphError::MissingEdge {
            from: edge.from,
            to: edge.to,
            label: Some(edge.label),
        };
        let out = &mut self.slot_mut(edge.from)?.outgoing;
        let Some(pos) = out.iter().position(|&e| e == (edge.to, edge.label)) else {
            return Err(missing);
        };
        out.remove(pos);

        let inc = &mut self.slot_mut(edge.to)?.incoming;
        let Some(pos) = inc.iter().position(|&e| e == (edge.from, edge.label)) else {
            return Err(missing);
        };
        inc.remove(pos);
        Ok(())
    }

    /// Successors in edge order (true branch first).
    ///
    /// # Panics
    /// Panics if `id` is not live.
    pub fn outgoing(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
        self.live_slot(id).outgoing.iter().map(|&(n, _)| n).collect()
    }

    /// Predecessors in the order their edges were joined.
    ///
    /// # Panics
    /// Panics if `id` is not live.
    pub fn incoming(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
        self.live_slot(id).incoming.iter().map(|&(n, _)| n).collect()
    }

    pub fn outgoing_edges(&self, id: NodeId) -> &[(NodeId, Label)] {
        &self.live_slot(id).outgoing
    }

    pub fn incoming_edges(&self, id: NodeId) -> &[(NodeId, Label)] {
        &self.live_slot(id).incoming
    }

    /// Whether any edge `from -> to` exists.
    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.slot(from)
            .is_ok_and(|slot| slot.outgoing.iter().any(|&(succ, _)| succ == to))
    }

    /// Whether `edge` exists with exactly its label.
    pub fn contains_labeled_edge(&self, edge: Edge) -> bool {
        self.slot(edge.from)
            .is_ok_and(|slot| slot.outgoing.contains(&(edge.to, edge.label)))
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.live_slot(id).incoming.len()
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.live_slot(id).outgoing.len()
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot indices originate from u32 ids"
                )]
                let raw = i as u32;
                NodeId::new(raw)
            })
    }

    /// All edges, grouped by source in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes().flat_map(move |from| {
            self.outgoing_edges(from)
                .iter()
                .map(move |&(to, label)| Edge { from, to, label })
        })
    }

    /// Nodes reachable from `start` (including `start`).
    pub fn reachable_from(&self, start: NodeId) -> FxHashSet<NodeId> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !self.contains(id) || !seen.insert(id) {
                continue;
            }
            stack.extend(self.outgoing(id).into_iter().filter(|s| !seen.contains(s)));
        }
        seen
    }

    /// Reachable nodes in breadth-first order from `start`.
    pub fn breadth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for succ in self.outgoing(id) {
                if seen.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
        order
    }

    fn slot(&self, id: NodeId) -> Result<&Slot<N>, GraphError> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(GraphError::MissingNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot<N>, GraphError> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GraphError::MissingNode(id))
    }

    fn live_slot(&self, id: NodeId) -> &Slot<N> {
        match self.slot(id) {
            Ok(slot) => slot,
            Err(err) => panic!("{err}"),
        }
    }
}
