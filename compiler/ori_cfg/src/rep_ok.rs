//! Structural well-formedness of a CFG.
//!
//! Every node kind constrains its degree and edge labels:
//!
//! | kind                         | in      | out | notes                          |
//! |------------------------------|---------|-----|--------------------------------|
//! | `Start`                      | 0       | 1   | the designated start, no loop  |
//! | `Return`                     | >= 1    | 0   | no loop                        |
//! | `If`                         | >= 1    | 2   | labels `[true, false]`         |
//! | assignments, calls, blocks   | >= 1    | 1   |                                |
//! | `SelfLoop`                   | >= 2    | 1   | the out edge is its self-edge  |
//! | `Phi`                        | = arity | 1   | no loop                        |
//! | `Stub`                       | never valid                                    |
//!
//! Any other kind may jump to itself (`L: x := f(x); JUMP L`), and that
//! edge counts towards its in-degree.
//!
//! In addition each edge must be recorded on both endpoints with the same
//! label and multiplicity. Passes call [`assert_rep_ok`] in debug builds;
//! [`check_rep`] and [`collect_violations`] are the non-panicking forms.

use rustc_hash::FxHashMap;

use crate::graph::{Label, NodeId};
use crate::node::CfgNodeKind;
use crate::CfgGraph;

/// A broken structural rule.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RepViolation {
    #[error("{kind} node {node} has in-degree {actual}, expected {expected}")]
    InDegree {
        node: NodeId,
        kind: &'static str,
        expected: &'static str,
        actual: usize,
    },
    #[error("{kind} node {node} has out-degree {actual}, expected {expected}")]
    OutDegree {
        node: NodeId,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("branch {node} has edge labels {actual:?}, expected [true, false]")]
    BranchLabels { node: NodeId, actual: Vec<Label> },
    #[error("{kind} node {node} has an unexpected self-edge")]
    UnexpectedSelfEdge { node: NodeId, kind: &'static str },
    #[error("self-loop {0} does not point at itself")]
    MissingSelfEdge(NodeId),
    #[error("start node {found} is not the designated start {designated}")]
    ForeignStart { found: NodeId, designated: NodeId },
    #[error("stub {0} survived construction")]
    Stub(NodeId),
    #[error("edge {from} -> {to} ({label:?}) is not mirrored on both endpoints")]
    Asymmetric {
        from: NodeId,
        to: NodeId,
        label: Label,
    },
}

/// First violation found, if any.
pub fn check_rep(cfg: &CfgGraph) -> Result<(), RepViolation> {
    match collect_violations(cfg).into_iter().next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

/// Panic with every violation if `cfg` is malformed.
///
/// # Panics
/// Panics if any structural rule is broken.
pub fn assert_rep_ok(cfg: &CfgGraph) {
    let violations = collect_violations(cfg);
    if !violations.is_empty() {
        let lines: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("malformed cfg:\n  {}", lines.join("\n  "));
    }
}

/// Every violation in `cfg`, in node order.
pub fn collect_violations(cfg: &CfgGraph) -> Vec<RepViolation> {
    let mut out = Vec::new();
    for id in cfg.nodes() {
        check_node(cfg, id, &mut out);
    }
    check_symmetry(cfg, &mut out);
    out
}

fn check_node(cfg: &CfgGraph, id: NodeId, out: &mut Vec<RepViolation>) {
    let node = cfg.node(id);
    let kind = node.kind.name();
    let in_degree = cfg.in_degree(id);
    let self_edge = cfg.contains_edge(id, id);

    let mut expect_out = |expected: usize| {
        let actual = cfg.out_degree(id);
        if actual != expected {
            out.push(RepViolation::OutDegree {
                node: id,
                kind,
                expected,
                actual,
            });
        }
    };

    let (min_in, exact_in): (usize, Option<usize>) = match &node.kind {
        CfgNodeKind::Start => {
            expect_out(1);
            if id != cfg.start() {
                out.push(RepViolation::ForeignStart {
                    found: id,
                    designated: cfg.start(),
                });
            }
            (0, Some(0))
        }
        CfgNodeKind::Return => {
            expect_out(0);
            (1, None)
        }
        CfgNodeKind::If { .. } => {
            let labels: Vec<Label> = cfg.outgoing_edges(id).iter().map(|&(_, l)| l).collect();
            if labels != [Some(true), Some(false)] {
                out.push(RepViolation::BranchLabels {
                    node: id,
                    actual: labels,
                });
            }
            (1, None)
        }
        CfgNodeKind::VarAssign { .. }
        | CfgNodeKind::MemAssign { .. }
        | CfgNodeKind::Call { .. }
        | CfgNodeKind::Block(_) => {
            expect_out(1);
            (1, None)
        }
        CfgNodeKind::SelfLoop => {
            expect_out(1);
            if !self_edge {
                out.push(RepViolation::MissingSelfEdge(id));
            }
            (2, None)
        }
        CfgNodeKind::Phi(phi) => {
            expect_out(1);
            (0, Some(phi.arity()))
        }
        CfgNodeKind::Stub => {
            out.push(RepViolation::Stub(id));
            return;
        }
    };

    if self_edge
        && matches!(
            node.kind,
            CfgNodeKind::Start | CfgNodeKind::Return | CfgNodeKind::Phi(_)
        )
    {
        out.push(RepViolation::UnexpectedSelfEdge { node: id, kind });
    }

    match exact_in {
        Some(expected) if in_degree != expected => out.push(RepViolation::InDegree {
            node: id,
            kind,
            expected: if expected == 0 { "0" } else { "the phi arity" },
            actual: in_degree,
        }),
        None if in_degree < min_in => out.push(RepViolation::InDegree {
            node: id,
            kind,
            expected: if min_in == 1 { "at least 1" } else { "at least 2" },
            actual: in_degree,
        }),
        _ => {}
    }
}

/// Each `(from, to, label)` must occur as often in `from`'s outgoing list
/// as in `to`'s incoming list.
fn check_symmetry(cfg: &CfgGraph, out: &mut Vec<RepViolation>) {
    let mut balance: FxHashMap<(NodeId, NodeId, Label), i64> = FxHashMap::default();
    for id in cfg.nodes() {
        for &(to, label) in cfg.outgoing_edges(id) {
            *balance.entry((id, to, label)).or_default() += 1;
        }
        for &(from, label) in cfg.incoming_edges(id) {
            *balance.entry((from, id, label)).or_default() -= 1;
        }
    }
    let mut broken: Vec<_> = balance
        .into_iter()
        .filter(|&(_, count)| count != 0)
        .map(|((from, to, label), _)| (from, to, label))
        .collect();
    broken.sort_unstable();
    out.extend(
        broken
            .into_iter()
            .map(|(from, to, label)| RepViolation::Asymmetric { from, to, label }),
    );
}
