//! CFG construction from canonical IR.
//!
//! # Algorithm
//!
//! The body is a single top-level sequence, walked once in reverse while
//! threading a `successor`: visiting a statement links it in front of the
//! current successor and yields the node that whatever precedes it should
//! fall into. The initial successor is a synthetic trailing `Return`, so
//! a body that falls off its end still returns.
//!
//! Walking backwards means labels *after* a statement are already known.
//! A jump to a label that has not been seen yet (a backward jump in
//! program order) produces a [`Stub`](CfgNodeKind::Stub) placeholder and a
//! backpatch entry. Once the walk is done, each stub's incoming edges are
//! rewired onto the node its label resolved to. A stub whose label
//! resolves back to itself (`L: jump L`) is an empty infinite loop and
//! becomes a [`SelfLoop`](CfgNodeKind::SelfLoop).
//!
//! Finally nodes unreachable from the start (dead code after jumps, an
//! unused trailing return) are removed.

use std::collections::BTreeMap;

use ori_lir::{CompUnit, Expr, Stmt, StmtKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::NodeId;
use crate::node::{CfgNode, CfgNodeKind};
use crate::{CfgError, CfgGraph};

/// Build a CFG for every function of `unit`, keyed by function name.
pub fn construct_unit(unit: &CompUnit) -> Result<BTreeMap<String, CfgGraph>, CfgError> {
    unit.functions
        .values()
        .map(|func| {
            tracing::debug!(function = %func.name, "constructing cfg");
            Ok((func.name.clone(), construct_cfg(&func.body)?))
        })
        .collect()
}

/// Build the CFG of one function body.
///
/// `body` must be a [`StmtKind::Seq`]; any other statement is treated as
/// a one-statement body.
pub fn construct_cfg(body: &Stmt) -> Result<CfgGraph, CfgError> {
    let stmts = match &body.kind {
        StmtKind::Seq(stmts) => stmts.as_slice(),
        _ => std::slice::from_ref(body),
    };

    let mut builder = Builder::new(body);
    let trailing = builder.cfg.insert(CfgNode::new(CfgNodeKind::Return, body.span));
    let mut successor = trailing;
    for stmt in stmts.iter().rev() {
        successor = builder.visit(stmt, successor)?;
    }
    let start = builder.cfg.start();
    builder.cfg.join(start, successor)?;

    builder.backpatch()?;
    let mut cfg = builder.cfg;
    cfg.clean()?;

    debug_assert!(
        cfg.nodes().all(|id| !cfg.node(id).is_stub()),
        "stub survived cfg construction"
    );
    tracing::debug!(nodes = cfg.len(), edges = cfg.edges().count(), "constructed cfg");
    Ok(cfg)
}

struct Builder {
    cfg: CfgGraph,
    /// Label -> the node control reaches when jumping to it.
    labels: FxHashMap<String, NodeId>,
    /// Stubs awaiting resolution, with the label they stand for.
    pending: Vec<(NodeId, String)>,
}

impl Builder {
    fn new(body: &Stmt) -> Self {
        Builder {
            cfg: CfgGraph::new(body.span),
            labels: FxHashMap::default(),
            pending: Vec::new(),
        }
    }

    /// Visit `stmt`, whose fallthrough successor is `successor`, and return
    /// the node its predecessor should fall into.
    fn visit(&mut self, stmt: &Stmt, successor: NodeId) -> Result<NodeId, CfgError> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Move { target, source } => {
                let kind = match target {
                    Expr::Temp(name) => CfgNodeKind::VarAssign {
                        target: name.clone(),
                        value: source.clone(),
                    },
                    Expr::Mem(address) => CfgNodeKind::MemAssign {
                        address: (**address).clone(),
                        value: source.clone(),
                    },
                    other => return Err(CfgError::InvalidMoveTarget(other.clone())),
                };
                self.link(CfgNode::new(kind, span), successor)
            }
            StmtKind::Call {
                collectors,
                target,
                args,
            } => {
                let kind = CfgNodeKind::Call {
                    collectors: collectors.clone(),
                    target: target.clone(),
                    args: args.clone(),
                };
                self.link(CfgNode::new(kind, span), successor)
            }
            StmtKind::Return => Ok(self.cfg.insert(CfgNode::new(CfgNodeKind::Return, span))),
            StmtKind::Label(label) => {
                self.labels.insert(label.clone(), successor);
                Ok(successor)
            }
            StmtKind::Jump(label) => Ok(self.target_of(label, span)),
            StmtKind::CJump { cond, true_label } => {
                let branch = self
                    .cfg
                    .insert(CfgNode::new(CfgNodeKind::If { cond: cond.clone() }, span));
                let on_true = self.target_of(true_label, span);
                self.cfg.join_with(branch, on_true, Some(true))?;
                self.cfg.join_with(branch, successor, Some(false))?;
                Ok(branch)
            }
            StmtKind::Seq(_) => Err(CfgError::NestedSequence),
        }
    }

    fn link(&mut self, node: CfgNode, successor: NodeId) -> Result<NodeId, CfgError> {
        let id = self.cfg.insert(node);
        self.cfg.join(id, successor)?;
        Ok(id)
    }

    /// The node a jump to `label` reaches, or a fresh stub if the label
    /// has not been seen yet.
    fn target_of(&mut self, label: &str, span: ori_lir::Span) -> NodeId {
        if let Some(&target) = self.labels.get(label) {
            return target;
        }
        let stub = self.cfg.insert(CfgNode::new(CfgNodeKind::Stub, span));
        self.pending.push((stub, label.to_string()));
        stub
    }

    /// Rewire every stub onto the node its label resolved to.
    fn backpatch(&mut self) -> Result<(), CfgError> {
        let stub_labels: FxHashMap<NodeId, String> = self.pending.iter().cloned().collect();
        let mut loops: FxHashMap<NodeId, NodeId> = FxHashMap::default();

        let pending = std::mem::take(&mut self.pending);
        for (stub, _) in &pending {
            let target = match self.resolve(*stub, &stub_labels)? {
                Resolved::Node(target) => target,
                Resolved::Loop(entry) => match loops.get(&entry) {
                    Some(&spin) => spin,
                    None => {
                        let span = self.cfg.node(entry).span;
                        let spin = self.cfg.insert(CfgNode::new(CfgNodeKind::SelfLoop, span));
                        self.cfg.join(spin, spin)?;
                        loops.insert(entry, spin);
                        spin
                    }
                },
            };
            tracing::trace!(stub = %stub, target = %target, "backpatching stub");

            let incoming = self.cfg.incoming_edges(*stub).to_vec();
            for (pred, label) in incoming {
                self.cfg.join_with(pred, target, label)?;
            }
        }

        for (stub, _) in pending {
            self.cfg.remove(stub)?;
        }
        Ok(())
    }

    /// Follow `stub`'s label through any chain of other stubs.
    fn resolve(
        &self,
        stub: NodeId,
        stub_labels: &FxHashMap<NodeId, String>,
    ) -> Result<Resolved, CfgError> {
        let mut seen = FxHashSet::default();
        let mut current = stub;
        loop {
            seen.insert(current);
            let label = &stub_labels[&current];
            let Some(&target) = self.labels.get(label) else {
                return Err(CfgError::UndefinedLabel(label.clone()));
            };
            if !stub_labels.contains_key(&target) {
                return Ok(Resolved::Node(target));
            }
            if seen.contains(&target) {
                return Ok(Resolved::Loop(target));
            }
            current = target;
        }
    }
}

/// Where a stub's jump ultimately lands.
enum Resolved {
    Node(NodeId),
    /// Only other stubs are reachable: an empty loop, identified by the
    /// first stub found twice.
    Loop(NodeId),
}

#[cfg(test)]
mod tests;
