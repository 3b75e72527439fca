//! Generic worklist dataflow engine.
//!
//! Analyses describe a lattice ([`Lattice`]) and per-node transfer
//! functions ([`ForwardAnalysis`] or [`BackwardAnalysis`]); the engine owns
//! the match over node kinds and the fixpoint iteration.
//!
//! # Algorithm
//!
//! **Forward.** Facts live on edges: every outgoing edge of a processed
//! node stores one fact, in `outgoing_edges` order (true before false for
//! a branch). Work is ordered by the CFG's strongly-connected components:
//! an outer worklist of SCCs, lowest (topologically earliest) first, and
//! an inner FIFO of nodes seeded with every node of the current SCC.
//!
//! - `in(n)` is the meet of the facts stored on `n`'s incoming edges.
//!   Edges whose source has not been processed yet contribute nothing;
//!   with no stored facts at all, `in(n)` is top.
//! - When an edge fact changes (including its first write), its target is
//!   requeued if it is in the current SCC, otherwise its SCC is queued.
//!
//! **Backward.** A single FIFO over all nodes, seeded in postorder.
//! `out(n)` is the meet of the successors' `in` facts (top when there are
//! none); when `in(n)` changes every predecessor is requeued.
//!
//! Termination requires a finite-height lattice and monotone transfer
//! functions. The engine does not check either.
//!
//! # References
//!
//! - Kildall: "A Unified Approach to Global Program Optimization" (POPL 1973)
//! - Appel: "Modern Compiler Implementation" §17.4 (worklist algorithms)

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::graph::{Edge, NodeId};
use crate::node::{CfgNode, CfgNodeKind};
use crate::scc::{postorder, SccGraph};
use crate::CfgGraph;

/// The meet semilattice an analysis computes over.
pub trait Lattice {
    type Fact: Clone + PartialEq + fmt::Debug;

    /// Identity of [`meet`](Lattice::meet); the fact at a node with no
    /// incoming information.
    fn top(&self) -> Self::Fact;

    fn meet(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact;
}

/// Transfer functions for a forward analysis.
pub trait ForwardAnalysis: Lattice {
    /// Assignments, stores, calls and each statement inside a block.
    fn statement(&self, node: &CfgNode, input: &Self::Fact) -> Self::Fact;

    /// Facts for the `(true, false)` successors of a branch.
    fn branch(&self, node: &CfgNode, input: &Self::Fact) -> (Self::Fact, Self::Fact) {
        let _ = node;
        (input.clone(), input.clone())
    }

    /// Fact leaving the start node. `input` is always top.
    fn start(&self, node: &CfgNode, input: &Self::Fact) -> Self::Fact {
        let _ = node;
        input.clone()
    }

    fn self_loop(&self, node: &CfgNode, input: &Self::Fact) -> Self::Fact {
        let _ = node;
        input.clone()
    }
}

/// Transfer functions for a backward analysis. The start node is the
/// identity.
pub trait BackwardAnalysis: Lattice {
    /// Assignments, stores, calls and each statement inside a block.
    fn statement(&self, node: &CfgNode, output: &Self::Fact) -> Self::Fact;

    fn branch(&self, node: &CfgNode, output: &Self::Fact) -> Self::Fact {
        self.statement(node, output)
    }

    /// Fact entering a return. `output` is always top.
    fn ret(&self, node: &CfgNode, output: &Self::Fact) -> Self::Fact {
        let _ = node;
        output.clone()
    }

    fn self_loop(&self, node: &CfgNode, output: &Self::Fact) -> Self::Fact {
        let _ = node;
        output.clone()
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// Fixpoint of a forward analysis. Unreachable nodes have no facts.
#[derive(Clone, Debug)]
pub struct ForwardFacts<F> {
    input: FxHashMap<NodeId, F>,
    /// Per node: one fact per outgoing edge, in `outgoing_edges` order.
    output: FxHashMap<NodeId, SmallVec<[F; 2]>>,
}

impl<F> ForwardFacts<F> {
    pub fn input(&self, node: NodeId) -> Option<&F> {
        self.input.get(&node)
    }

    /// Facts on `node`'s outgoing edges, in edge order.
    pub fn outputs(&self, node: NodeId) -> &[F] {
        self.output.get(&node).map_or(&[][..], SmallVec::as_slice)
    }

    /// Fact on a specific edge.
    pub fn on_edge(&self, cfg: &CfgGraph, edge: Edge) -> Option<&F> {
        let index = cfg
            .outgoing_edges(edge.from)
            .iter()
            .position(|&(to, label)| to == edge.to && label == edge.label)?;
        self.outputs(edge.from).get(index)
    }
}

/// Fixpoint of a backward analysis.
#[derive(Clone, Debug)]
pub struct BackwardFacts<F> {
    input: FxHashMap<NodeId, F>,
    output: FxHashMap<NodeId, F>,
}

impl<F> BackwardFacts<F> {
    /// Fact on entry to `node`.
    pub fn input(&self, node: NodeId) -> Option<&F> {
        self.input.get(&node)
    }

    /// Fact on exit from `node`.
    pub fn output(&self, node: NodeId) -> Option<&F> {
        self.output.get(&node)
    }
}

// ── Forward ─────────────────────────────────────────────────────────

/// Run `analysis` forward over `cfg` to a fixpoint.
pub fn forward<A: ForwardAnalysis>(cfg: &CfgGraph, analysis: &A) -> ForwardFacts<A::Fact> {
    let sccs = SccGraph::build(cfg);
    let mut facts = ForwardFacts {
        input: FxHashMap::default(),
        output: FxHashMap::default(),
    };
    let mut outer: BTreeSet<_> = BTreeSet::from([sccs.start()]);
    let mut steps = 0usize;

    while let Some(current) = outer.pop_first() {
        let mut inner: VecDeque<NodeId> = sccs.scc(current).nodes.iter().copied().collect();
        let mut queued: FxHashSet<NodeId> = inner.iter().copied().collect();

        while let Some(node) = inner.pop_front() {
            queued.remove(&node);
            steps += 1;

            let input = forward_input(cfg, analysis, &facts, node);
            let outputs = forward_transfer(cfg, analysis, node, &input);
            debug_assert_eq!(outputs.len(), cfg.out_degree(node));
            facts.input.insert(node, input);

            let previous = facts.output.get(&node);
            let changed: SmallVec<[NodeId; 2]> = cfg
                .outgoing(node)
                .into_iter()
                .enumerate()
                .filter(|&(i, _)| previous.and_then(|prev| prev.get(i)) != outputs.get(i))
                .map(|(_, succ)| succ)
                .collect();
            facts.output.insert(node, outputs);

            for succ in changed {
                let target = sccs.scc_of(succ);
                if target == current {
                    if queued.insert(succ) {
                        inner.push_back(succ);
                    }
                } else {
                    outer.insert(target);
                }
            }
        }
    }

    tracing::debug!(steps, sccs = sccs.len(), "forward analysis converged");
    facts
}

fn forward_input<A: ForwardAnalysis>(
    cfg: &CfgGraph,
    analysis: &A,
    facts: &ForwardFacts<A::Fact>,
    node: NodeId,
) -> A::Fact {
    let mut input: Option<A::Fact> = None;
    for &(pred, label) in cfg.incoming_edges(node) {
        let Some(fact) = facts.on_edge(cfg, Edge { from: pred, to: node, label }) else {
            continue;
        };
        input = Some(match input {
            Some(acc) => analysis.meet(&acc, fact),
            None => fact.clone(),
        });
    }
    input.unwrap_or_else(|| analysis.top())
}

fn forward_transfer<A: ForwardAnalysis>(
    cfg: &CfgGraph,
    analysis: &A,
    node: NodeId,
    input: &A::Fact,
) -> SmallVec<[A::Fact; 2]> {
    let payload = cfg.node(node);
    let single = match &payload.kind {
        CfgNodeKind::Start => analysis.start(payload, input),
        CfgNodeKind::Return => return SmallVec::new(),
        CfgNodeKind::VarAssign { .. } | CfgNodeKind::MemAssign { .. } | CfgNodeKind::Call { .. } => {
            analysis.statement(payload, input)
        }
        CfgNodeKind::If { .. } => {
            let (on_true, on_false) = analysis.branch(payload, input);
            let mut out = SmallVec::new();
            out.push(on_true);
            out.push(on_false);
            return out;
        }
        CfgNodeKind::SelfLoop => analysis.self_loop(payload, input),
        CfgNodeKind::Block(children) => children.iter().fold(input.clone(), |fact, child| {
            check_block_child(node, child);
            analysis.statement(child, &fact)
        }),
        CfgNodeKind::Phi(_) | CfgNodeKind::Stub => unsupported(node, payload),
    };
    std::iter::repeat(single).take(cfg.out_degree(node)).collect()
}

// ── Backward ────────────────────────────────────────────────────────

/// Run `analysis` backward over `cfg` to a fixpoint.
pub fn backward<A: BackwardAnalysis>(cfg: &CfgGraph, analysis: &A) -> BackwardFacts<A::Fact> {
    let mut facts = BackwardFacts {
        input: FxHashMap::default(),
        output: FxHashMap::default(),
    };
    let mut queue: VecDeque<NodeId> = postorder(cfg).into();
    let mut queued: FxHashSet<NodeId> = queue.iter().copied().collect();
    let mut steps = 0usize;

    while let Some(node) = queue.pop_front() {
        queued.remove(&node);
        steps += 1;

        let mut output: Option<A::Fact> = None;
        for succ in cfg.outgoing(node) {
            let Some(fact) = facts.input.get(&succ) else {
                continue;
            };
            output = Some(match output {
                Some(acc) => analysis.meet(&acc, fact),
                None => fact.clone(),
            });
        }
        let output = output.unwrap_or_else(|| analysis.top());
        let input = backward_transfer(cfg, analysis, node, &output);
        facts.output.insert(node, output);

        if facts.input.get(&node) != Some(&input) {
            facts.input.insert(node, input);
            for pred in cfg.incoming(node) {
                if queued.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }
    }

    tracing::debug!(steps, nodes = cfg.len(), "backward analysis converged");
    facts
}

fn backward_transfer<A: BackwardAnalysis>(
    cfg: &CfgGraph,
    analysis: &A,
    node: NodeId,
    output: &A::Fact,
) -> A::Fact {
    let payload = cfg.node(node);
    match &payload.kind {
        CfgNodeKind::Start => output.clone(),
        CfgNodeKind::Return => analysis.ret(payload, output),
        CfgNodeKind::VarAssign { .. } | CfgNodeKind::MemAssign { .. } | CfgNodeKind::Call { .. } => {
            analysis.statement(payload, output)
        }
        CfgNodeKind::If { .. } => analysis.branch(payload, output),
        CfgNodeKind::SelfLoop => analysis.self_loop(payload, output),
        CfgNodeKind::Block(children) => children.iter().rev().fold(output.clone(), |fact, child| {
            check_block_child(node, child);
            analysis.statement(child, &fact)
        }),
        CfgNodeKind::Phi(_) | CfgNodeKind::Stub => unsupported(node, payload),
    }
}

fn check_block_child(block: NodeId, child: &CfgNode) {
    debug_assert!(
        matches!(
            child.kind,
            CfgNodeKind::VarAssign { .. } | CfgNodeKind::MemAssign { .. } | CfgNodeKind::Call { .. }
        ),
        "block {block} holds a {} node",
        child.kind.name()
    );
}

fn unsupported(node: NodeId, payload: &CfgNode) -> ! {
    panic!(
        "{} node {node} reached the dataflow engine; phi blocks and stubs have no transfer function",
        payload.kind.name()
    )
}
