#![allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]

use ori_lir::Expr;
use pretty_assertions::assert_eq;

use crate::node::CfgNodeKind;
use crate::test_helpers::{diamond, t, CfgBuilder};

use super::*;

fn copy(target: &str, source: &str) -> CfgNode {
    CfgNode::var_assign(target, t(source))
}

/// Prepending in front of a merge node moves both branch edges onto the
/// chain head and keeps their labels.
#[test]
fn prepend_keeps_branch_labels() {
    let mut b = CfgBuilder::new();
    let branch = b.add(CfgNode::branch(t("c")));
    let join = b.add(CfgNode::ret());
    let start = b.start();
    b.edge(start, branch).branch(branch, join, join);
    let mut cfg = b.cfg;

    let (first, last) = cfg
        .prepend_node(join, vec![copy("a", "b"), copy("c", "d")])
        .unwrap()
        .unwrap();

    assert_eq!(
        cfg.outgoing_edges(branch),
        &[(first, Some(true)), (first, Some(false))]
    );
    assert_eq!(cfg.outgoing(first).as_slice(), &[last]);
    assert_eq!(cfg.incoming(join).as_slice(), &[last]);
}

/// A self-loop keeps its self-edge when prepending.
#[test]
fn prepend_skips_self_loop_edge() {
    let mut b = CfgBuilder::new();
    let spin = b.add(CfgNode::self_loop());
    let start = b.start();
    b.edge(start, spin).edge(spin, spin);
    let mut cfg = b.cfg;

    let (first, _) = cfg.prepend_node(spin, vec![copy("x", "y")]).unwrap().unwrap();
    assert_eq!(cfg.outgoing(start).as_slice(), &[first]);
    assert_eq!(cfg.incoming(spin).as_slice(), &[spin, first]);
    assert_eq!(cfg.outgoing(spin).as_slice(), &[spin]);
}

/// Any other node's self-edge is redirected onto the chain head.
#[test]
fn prepend_moves_self_edge() {
    let mut b = CfgBuilder::new();
    let step = b.add(copy("x", "x"));
    let start = b.start();
    b.edge(start, step).edge(step, step);
    let mut cfg = b.cfg;

    let (first, last) = cfg.prepend_node(step, vec![copy("y", "x")]).unwrap().unwrap();
    assert_eq!(cfg.incoming(first).as_slice(), &[start, step]);
    assert_eq!(cfg.outgoing(step).as_slice(), &[first]);
    assert_eq!(cfg.incoming(step).as_slice(), &[last]);
    assert!(!cfg.contains_edge(step, step));
}

/// Postpending after a node with a self-edge runs the chain on every
/// iteration.
#[test]
fn postpend_moves_self_edge() {
    let mut b = CfgBuilder::new();
    let step = b.add(copy("x", "x"));
    let start = b.start();
    b.edge(start, step).edge(step, step);
    let mut cfg = b.cfg;

    let (first, last) = cfg.postpend_node(step, vec![copy("y", "x")]).unwrap().unwrap();
    assert_eq!(cfg.outgoing(step).as_slice(), &[first]);
    assert_eq!(cfg.outgoing(last).as_slice(), &[step]);
    assert_eq!(cfg.incoming(step).as_slice(), &[start, last]);
}

/// Postpending after a branch moves its labelled out-edges to the chain tail.
#[test]
fn postpend_moves_outgoing() {
    let (mut cfg, [branch, then, els, _]) = diamond();
    let (first, last) = cfg
        .postpend_node(branch, vec![copy("p", "q")])
        .unwrap()
        .unwrap();
    assert_eq!(first, last);
    assert_eq!(cfg.outgoing(branch).as_slice(), &[first]);
    assert_eq!(
        cfg.outgoing_edges(last),
        &[(then, Some(true)), (els, Some(false))]
    );
}

/// Inserting on the false edge of a branch keeps the branch order.
#[test]
fn inner_insert_on_false_edge() {
    let (mut cfg, [branch, then, els, _]) = diamond();
    let (first, last) = cfg
        .inner_insert(Edge::labeled(branch, els, false), vec![copy("x", "y"), copy("y", "z")])
        .unwrap()
        .unwrap();

    assert_eq!(cfg.outgoing(branch).as_slice(), &[then, first]);
    assert_eq!(cfg.outgoing(last).as_slice(), &[els]);
    assert_eq!(cfg.in_degree(els), 1);
}

/// Inserting on a missing edge fails before touching the graph.
#[test]
fn inner_insert_missing_edge() {
    let (mut cfg, [branch, then, _, _]) = diamond();
    let before = cfg.len();
    let err = cfg
        .inner_insert(Edge::labeled(branch, then, false), vec![copy("x", "y")])
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::MissingEdge {
            from: branch,
            to: then,
            label: Some(Some(false)),
        }
    );
    assert_eq!(cfg.len(), before);
}

/// Empty chains leave the graph alone.
#[test]
fn empty_chain_is_noop() {
    let (mut cfg, [branch, _, _, ret]) = diamond();
    let before: Vec<_> = cfg.edges().collect();
    assert_eq!(cfg.prepend_node(ret, vec![]).unwrap(), None);
    assert_eq!(cfg.postpend_node(branch, vec![]).unwrap(), None);
    assert_eq!(cfg.edges().collect::<Vec<_>>(), before);
}

/// Replacement re-points every edge, including the start designation.
#[test]
fn replace_node_rewires() {
    let (mut cfg, [branch, then, els, _]) = diamond();
    let start = cfg.start();
    let new = cfg
        .replace_node(branch, CfgNode::branch(Expr::Const(1)))
        .unwrap();
    assert!(!cfg.contains(branch));
    assert_eq!(cfg.outgoing(start).as_slice(), &[new]);
    assert_eq!(
        cfg.outgoing_edges(new),
        &[(then, Some(true)), (els, Some(false))]
    );

    let new_start = cfg.replace_node(start, CfgNode::start()).unwrap();
    assert_eq!(cfg.start(), new_start);
    assert!(matches!(cfg.node(cfg.start()).kind, CfgNodeKind::Start));
    assert_eq!(cfg.outgoing(new_start).as_slice(), &[new]);
}

/// Replacing a self-looping node keeps the loop on the new node.
#[test]
fn replace_self_loop() {
    let mut b = CfgBuilder::new();
    let spin = b.add(CfgNode::self_loop());
    let start = b.start();
    b.edge(start, spin).edge(spin, spin);
    let mut cfg = b.cfg;

    let new = cfg.replace_node(spin, CfgNode::self_loop()).unwrap();
    assert_eq!(cfg.outgoing(new).as_slice(), &[new]);
    assert_eq!(cfg.incoming(new).as_slice(), &[start, new]);
}
