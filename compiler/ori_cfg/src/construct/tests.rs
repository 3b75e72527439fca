#![allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]

use ori_lir::{BinaryOp, FuncDecl, Span};
use pretty_assertions::assert_eq;

use crate::test_helpers::t;

use super::*;

fn body(stmts: Vec<Stmt>) -> Stmt {
    Stmt::seq(stmts)
}

fn only_successor(cfg: &CfgGraph, id: NodeId) -> NodeId {
    let succs = cfg.outgoing(id);
    assert_eq!(succs.len(), 1, "{} should have one successor", cfg.node(id));
    succs[0]
}

/// Straight-line code chains in program order and falls into a return.
#[test]
fn straight_line() {
    let cfg = construct_cfg(&body(vec![
        Stmt::mov(t("x"), Expr::Const(1)),
        Stmt::mov(t("y"), Expr::op(BinaryOp::Add, t("x"), Expr::Const(2))),
    ]))
    .unwrap();

    let first = only_successor(&cfg, cfg.start());
    assert_eq!(cfg.node(first).to_string(), "x := 1");
    let second = only_successor(&cfg, first);
    assert_eq!(cfg.node(second).to_string(), "y := (x + 2)");
    let ret = only_successor(&cfg, second);
    assert!(matches!(cfg.node(ret).kind, CfgNodeKind::Return));
    assert_eq!(cfg.len(), 4);
}

/// An empty body is `start -> return`.
#[test]
fn empty_body() {
    let cfg = construct_cfg(&body(vec![])).unwrap();
    let ret = only_successor(&cfg, cfg.start());
    assert!(matches!(cfg.node(ret).kind, CfgNodeKind::Return));
    assert_eq!(cfg.len(), 2);
}

/// A conditional jump yields `[true, false]` edges and both arms merge.
#[test]
fn if_else() {
    let cfg = construct_cfg(&body(vec![
        Stmt::cjump(t("c"), "then"),
        Stmt::mov(t("x"), Expr::Const(2)),
        Stmt::jump("end"),
        Stmt::label("then"),
        Stmt::mov(t("x"), Expr::Const(1)),
        Stmt::label("end"),
        Stmt::ret(),
    ]))
    .unwrap();

    let branch = only_successor(&cfg, cfg.start());
    assert!(matches!(cfg.node(branch).kind, CfgNodeKind::If { .. }));
    let edges = cfg.outgoing_edges(branch);
    assert_eq!(edges.len(), 2);
    let (on_true, true_label) = edges[0];
    let (on_false, false_label) = edges[1];
    assert_eq!((true_label, false_label), (Some(true), Some(false)));
    assert_eq!(cfg.node(on_true).to_string(), "x := 1");
    assert_eq!(cfg.node(on_false).to_string(), "x := 2");

    let merge = only_successor(&cfg, on_true);
    assert_eq!(only_successor(&cfg, on_false), merge);
    assert!(matches!(cfg.node(merge).kind, CfgNodeKind::Return));
    // The synthetic trailing return is unreachable and cleaned away.
    assert_eq!(cfg.len(), 5);
}

/// A backward jump is backpatched onto the loop header.
#[test]
fn while_loop_back_edge() {
    let cfg = construct_cfg(&body(vec![
        Stmt::mov(t("i"), Expr::Const(0)),
        Stmt::label("head"),
        Stmt::cjump(Expr::op(BinaryOp::Ge, t("i"), t("n")), "exit"),
        Stmt::mov(t("i"), Expr::op(BinaryOp::Add, t("i"), Expr::Const(1))),
        Stmt::jump("head"),
        Stmt::label("exit"),
    ]))
    .unwrap();

    let init = only_successor(&cfg, cfg.start());
    let head = only_successor(&cfg, init);
    let [exit, body_node] = cfg.outgoing(head).into_inner().unwrap();
    assert!(matches!(cfg.node(exit).kind, CfgNodeKind::Return));
    assert_eq!(cfg.node(body_node).to_string(), "i := (i + 1)");
    assert_eq!(only_successor(&cfg, body_node), head);
    assert_eq!(cfg.incoming(head).as_slice(), &[init, body_node]);
    assert!(cfg.nodes().all(|id| !cfg.node(id).is_stub()));
    assert_eq!(cfg.len(), 5);
}

/// `L: jump L` is an empty infinite loop.
#[test]
fn jump_to_self_is_self_loop() {
    let cfg = construct_cfg(&body(vec![Stmt::label("spin"), Stmt::jump("spin")])).unwrap();
    let spin = only_successor(&cfg, cfg.start());
    assert!(matches!(cfg.node(spin).kind, CfgNodeKind::SelfLoop));
    assert_eq!(cfg.outgoing(spin).as_slice(), &[spin]);
    assert_eq!(cfg.len(), 2);
}

/// Jumps that only reach each other collapse into a single self-loop.
#[test]
fn jump_cycle_is_one_self_loop() {
    let cfg = construct_cfg(&body(vec![
        Stmt::jump("a"),
        Stmt::label("a"),
        Stmt::jump("b"),
        Stmt::label("b"),
        Stmt::jump("a"),
    ]))
    .unwrap();
    let spin = only_successor(&cfg, cfg.start());
    assert!(matches!(cfg.node(spin).kind, CfgNodeKind::SelfLoop));
    assert_eq!(cfg.len(), 2);
}

/// Code after a return is dropped.
#[test]
fn unreachable_code_removed() {
    let cfg = construct_cfg(&body(vec![
        Stmt::ret(),
        Stmt::mov(t("x"), Expr::Const(1)),
    ]))
    .unwrap();
    let ret = only_successor(&cfg, cfg.start());
    assert!(matches!(cfg.node(ret).kind, CfgNodeKind::Return));
    assert_eq!(cfg.len(), 2);
}

/// Calls and memory stores become their own node kinds.
#[test]
fn call_and_store() {
    let cfg = construct_cfg(&body(vec![
        Stmt::call(vec!["q".into(), "r".into()], "divmod", vec![t("a"), Expr::Const(3)]),
        Stmt::mov(Expr::mem(t("p")), t("q")),
    ]))
    .unwrap();
    let call = only_successor(&cfg, cfg.start());
    assert_eq!(cfg.node(call).to_string(), "q, r := call divmod(a, 3)");
    let store = only_successor(&cfg, call);
    assert_eq!(cfg.node(store).to_string(), "MEM[p] := q");
}

/// Nodes keep the span of the statement they came from.
#[test]
fn spans_carried() {
    let span = Span::new(4, 11);
    let cfg = construct_cfg(&body(vec![Stmt::mov(t("x"), Expr::Const(1)).with_span(span)])).unwrap();
    let assign = only_successor(&cfg, cfg.start());
    assert_eq!(cfg.node(assign).span, span);
}

/// A jump to a label that is never defined is rejected.
#[test]
fn undefined_label() {
    let err = construct_cfg(&body(vec![Stmt::jump("nowhere")])).unwrap_err();
    assert_eq!(err, CfgError::UndefinedLabel("nowhere".into()));
}

/// Only one level of sequencing is accepted.
#[test]
fn nested_sequence() {
    let err = construct_cfg(&body(vec![body(vec![Stmt::ret()])])).unwrap_err();
    assert_eq!(err, CfgError::NestedSequence);
}

/// Constants are not assignable.
#[test]
fn invalid_move_target() {
    let err = construct_cfg(&body(vec![Stmt::mov(Expr::Const(1), Expr::Const(2))])).unwrap_err();
    assert_eq!(err, CfgError::InvalidMoveTarget(Expr::Const(1)));
}

/// Every function of a unit gets its own graph.
#[test]
fn whole_unit() {
    let unit = CompUnit::new("m")
        .with_function(FuncDecl::new("main", body(vec![Stmt::ret()])))
        .with_function(FuncDecl::new("helper", body(vec![Stmt::mov(t("x"), t("y"))])));
    let cfgs = construct_unit(&unit).unwrap();
    assert_eq!(cfgs.keys().collect::<Vec<_>>(), vec!["helper", "main"]);
    assert_eq!(cfgs["helper"].len(), 3);
}
