//! Shared test utilities for the CFG passes.
//!
//! Only compiled in test builds.

#![allow(clippy::unwrap_used, reason = "test fixtures panic on malformed setup")]

use ori_lir::{Expr, Span, TempSet};

use crate::graph::{Label, NodeId};
use crate::node::CfgNode;
use crate::CfgGraph;

/// Shorthand for `Expr::temp(name)`.
pub(crate) fn t(name: &str) -> Expr {
    Expr::temp(name)
}

/// Build a [`TempSet`] from string literals.
pub(crate) fn set(names: &[&str]) -> TempSet {
    names.iter().map(|n| (*n).to_string()).collect()
}

/// Builder for hand-made CFGs in tests.
pub(crate) struct CfgBuilder {
    pub cfg: CfgGraph,
}

impl CfgBuilder {
    pub fn new() -> Self {
        CfgBuilder {
            cfg: CfgGraph::new(Span::DUMMY),
        }
    }

    pub fn start(&self) -> NodeId {
        self.cfg.start()
    }

    pub fn add(&mut self, node: CfgNode) -> NodeId {
        self.cfg.insert(node)
    }

    pub fn edge(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.cfg.join(from, to).unwrap();
        self
    }

    pub fn branch(&mut self, from: NodeId, on_true: NodeId, on_false: NodeId) -> &mut Self {
        self.cfg.join_with(from, on_true, Some(true)).unwrap();
        self.cfg.join_with(from, on_false, Some(false)).unwrap();
        self
    }

    pub fn labeled(&mut self, from: NodeId, to: NodeId, label: Label) -> &mut Self {
        self.cfg.join_with(from, to, label).unwrap();
        self
    }
}

/// `start -> if(c) -{true}-> a:=1 -> ret`, `-{false}-> a:=2 -> ret`.
///
/// Returns the graph and `[branch, then, else, ret]`.
pub(crate) fn diamond() -> (CfgGraph, [NodeId; 4]) {
    let mut b = CfgBuilder::new();
    let branch = b.add(CfgNode::branch(t("c")));
    let then = b.add(CfgNode::var_assign("a", Expr::Const(1)));
    let els = b.add(CfgNode::var_assign("a", Expr::Const(2)));
    let ret = b.add(CfgNode::ret());
    let start = b.start();
    b.edge(start, branch)
        .branch(branch, then, els)
        .edge(then, ret)
        .edge(els, ret);
    (b.cfg, [branch, then, els, ret])
}

/// Graph of `size` assignment nodes wired by `edges` (pairs of indices
/// into those nodes, taken modulo `size`); the start falls into node 0.
///
/// Used by property tests; the result need not be rep-ok.
pub(crate) fn arbitrary_cfg(size: usize, edges: &[(usize, usize)]) -> (CfgGraph, Vec<NodeId>) {
    let mut b = CfgBuilder::new();
    let ids: Vec<NodeId> = (0..size.max(1))
        .map(|i| b.add(CfgNode::var_assign(format!("v{i}"), Expr::Const(0))))
        .collect();
    let start = b.start();
    b.edge(start, ids[0]);
    for &(from, to) in edges {
        b.edge(ids[from % ids.len()], ids[to % ids.len()]);
    }
    (b.cfg, ids)
}

/// `start -> i:=0 -> head: if(i<n) -{true}-> i:=i+1 -> head`, `-{false}-> ret`.
///
/// Returns the graph and `[init, head, body, ret]`.
pub(crate) fn simple_loop() -> (CfgGraph, [NodeId; 4]) {
    use ori_lir::BinaryOp;

    let mut b = CfgBuilder::new();
    let init = b.add(CfgNode::var_assign("i", Expr::Const(0)));
    let head = b.add(CfgNode::branch(Expr::op(BinaryOp::Lt, t("i"), t("n"))));
    let body = b.add(CfgNode::var_assign(
        "i",
        Expr::op(BinaryOp::Add, t("i"), Expr::Const(1)),
    ));
    let ret = b.add(CfgNode::ret());
    let start = b.start();
    b.edge(start, init)
        .edge(init, head)
        .branch(head, body, ret)
        .edge(body, head);
    (b.cfg, [init, head, body, ret])
}
