//! Serializing a CFG back into canonical linear IR.
//!
//! # Algorithm
//!
//! Emission follows fallthrough chains. Starting from the start node, each
//! node's statement is emitted and the walk continues into its successor,
//! which then needs neither a label nor a jump. If the successor was
//! already emitted, the chain ends in a jump to it instead.
//!
//! An `If` becomes a conditional jump to its true target and keeps
//! falling into its false target; the true target is queued and started
//! as a new chain once the current one ends. Every chain ends in a
//! `return` or a jump, so chains can be laid out back to back.
//!
//! Labels are minted lazily: only nodes that some jump targets get one.
//!
//! Phi blocks and stubs have no linear form and are rejected.

use std::collections::{BTreeMap, VecDeque};

use ori_lir::{CompUnit, Expr, FuncDecl, NameGen, Span, Stmt, StmtKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::NodeId;
use crate::node::{CfgNode, CfgNodeKind};
use crate::{CfgError, CfgGraph};

/// Flatten every CFG of `cfgs` into a function of a new unit named after
/// `unit`. Functions of `unit` without a CFG are carried over unchanged.
pub fn flatten_unit(
    cfgs: &BTreeMap<String, CfgGraph>,
    unit: &CompUnit,
    names: &mut NameGen,
) -> Result<CompUnit, CfgError> {
    let mut flat = CompUnit::new(unit.name.clone());
    for func in unit.functions.values() {
        let body = match cfgs.get(&func.name) {
            Some(cfg) => flatten(cfg, names)?,
            None => func.body.clone(),
        };
        flat.add_function(FuncDecl::new(func.name.clone(), body));
    }
    for (name, cfg) in cfgs {
        if !unit.functions.contains_key(name) {
            flat.add_function(FuncDecl::new(name.clone(), flatten(cfg, names)?));
        }
    }
    Ok(flat)
}

/// Flatten one CFG into a function body (a single [`StmtKind::Seq`]).
pub fn flatten(cfg: &CfgGraph, names: &mut NameGen) -> Result<Stmt, CfgError> {
    let mut flattener = Flattener::new(cfg);
    flattener.chain(cfg.start())?;
    while let Some(node) = flattener.deferred.pop_front() {
        if !flattener.emitted.contains(&node) {
            flattener.chain(node)?;
        }
    }
    let body = flattener.finish(names);
    tracing::debug!(nodes = cfg.len(), stmts = body.len(), "flattened cfg");
    Ok(Stmt::new(StmtKind::Seq(body), cfg.node(cfg.start()).span))
}

/// One slot of the output before labels are known.
enum Item {
    /// Position of a node; becomes a label if anything jumps there.
    Place(NodeId),
    Stmt(Stmt),
    Jump { target: NodeId, span: Span },
    CJump { cond: Expr, target: NodeId, span: Span },
}

struct Flattener<'g> {
    cfg: &'g CfgGraph,
    items: Vec<Item>,
    emitted: FxHashSet<NodeId>,
    /// True targets waiting for their own chain.
    deferred: VecDeque<NodeId>,
}

impl<'g> Flattener<'g> {
    fn new(cfg: &'g CfgGraph) -> Self {
        Flattener {
            cfg,
            items: Vec::new(),
            emitted: FxHashSet::default(),
            deferred: VecDeque::new(),
        }
    }

    /// Emit the fallthrough chain starting at `node`.
    fn chain(&mut self, mut node: NodeId) -> Result<(), CfgError> {
        loop {
            let payload = self.cfg.node(node);
            if !self.emitted.insert(node) {
                self.items.push(Item::Jump {
                    target: node,
                    span: payload.span,
                });
                return Ok(());
            }
            self.items.push(Item::Place(node));

            match &payload.kind {
                CfgNodeKind::Start => {}
                CfgNodeKind::Return => {
                    self.items.push(Item::Stmt(Stmt::new(StmtKind::Return, payload.span)));
                    return Ok(());
                }
                CfgNodeKind::SelfLoop => {
                    self.items.push(Item::Jump {
                        target: node,
                        span: payload.span,
                    });
                    return Ok(());
                }
                CfgNodeKind::If { cond } => {
                    let targets = self.cfg.outgoing(node);
                    let &[on_true, on_false] = targets.as_slice() else {
                        return Err(unexpected(node, payload));
                    };
                    self.items.push(Item::CJump {
                        cond: cond.clone(),
                        target: on_true,
                        span: payload.span,
                    });
                    self.deferred.push_back(on_true);
                    node = on_false;
                    continue;
                }
                CfgNodeKind::VarAssign { .. }
                | CfgNodeKind::MemAssign { .. }
                | CfgNodeKind::Call { .. }
                | CfgNodeKind::Block(_) => self.straight_line(node, payload)?,
                CfgNodeKind::Phi(_) | CfgNodeKind::Stub => return Err(unexpected(node, payload)),
            }

            let Some(&next) = self.cfg.outgoing(node).first() else {
                return Err(unexpected(node, payload));
            };
            node = next;
        }
    }

    /// Emit the statements of a single-successor node.
    fn straight_line(&mut self, id: NodeId, node: &CfgNode) -> Result<(), CfgError> {
        let span = node.span;
        let stmt = match &node.kind {
            CfgNodeKind::VarAssign { target, value } => StmtKind::Move {
                target: Expr::temp(target.clone()),
                source: value.clone(),
            },
            CfgNodeKind::MemAssign { address, value } => StmtKind::Move {
                target: Expr::mem(address.clone()),
                source: value.clone(),
            },
            CfgNodeKind::Call {
                collectors,
                target,
                args,
            } => StmtKind::Call {
                collectors: collectors.clone(),
                target: target.clone(),
                args: args.clone(),
            },
            CfgNodeKind::Block(children) => {
                for child in children {
                    self.straight_line(id, child)?;
                }
                return Ok(());
            }
            _ => return Err(unexpected(id, node)),
        };
        self.items.push(Item::Stmt(Stmt::new(stmt, span)));
        Ok(())
    }

    /// Resolve node positions into labels, minting one per jump target.
    fn finish(self, names: &mut NameGen) -> Vec<Stmt> {
        let mut labels: FxHashMap<NodeId, String> = FxHashMap::default();
        for item in &self.items {
            if let Item::Jump { target, .. } | Item::CJump { target, .. } = item {
                labels.entry(*target).or_insert_with(|| names.fresh_label());
            }
        }

        let mut body = Vec::with_capacity(self.items.len() + labels.len());
        for item in self.items {
            match item {
                Item::Place(node) => {
                    if let Some(label) = labels.get(&node) {
                        let span = self.cfg.node(node).span;
                        body.push(Stmt::new(StmtKind::Label(label.clone()), span));
                    }
                }
                Item::Stmt(stmt) => body.push(stmt),
                Item::Jump { target, span } => {
                    body.push(Stmt::new(StmtKind::Jump(labels[&target].clone()), span));
                }
                Item::CJump { cond, target, span } => {
                    let true_label = labels[&target].clone();
                    body.push(Stmt::new(StmtKind::CJump { cond, true_label }, span));
                }
            }
        }
        body
    }
}

fn unexpected(node: NodeId, payload: &CfgNode) -> CfgError {
    CfgError::UnexpectedNode {
        node,
        kind: payload.kind.name(),
    }
}
