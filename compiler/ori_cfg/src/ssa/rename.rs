//! SSA renaming over the dominator tree.
//!
//! Each variable has a counter and a stack of live versions, starting at
//! version 0 (the value on entry). Walking the dominator tree depth-first:
//!
//! - uses are rewritten to `name_<top of stack>`;
//! - each definition pushes `name_<counter + 1>`, popped again when the
//!   walk leaves the defining node's subtree;
//! - for every edge into a phi block, the phi's argument slot for that
//!   edge is filled with the version live at the edge's source.

use rustc_hash::FxHashMap;

use crate::dominator::DominatorTree;
use crate::graph::NodeId;
use crate::node::{CfgNode, CfgNodeKind};
use crate::CfgGraph;

/// Rename every reachable node of `cfg`, which must already hold its phi
/// blocks. Only `variables` are versioned.
pub(super) fn rename(cfg: &mut CfgGraph, variables: Vec<String>) {
    let children: FxHashMap<NodeId, Vec<NodeId>> = {
        let dom = DominatorTree::new(cfg);
        dom.preorder()
            .into_iter()
            .map(|node| (node, dom.children_of(node).to_vec()))
            .collect()
    };

    let mut versions = Versions::new(variables);
    let mut stack = vec![Visit::Enter(cfg.start())];
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(node) => {
                let mut defined = Vec::new();
                versions.rename_node(cfg.node_mut(node), &mut defined);
                versions.fill_phi_successors(cfg, node);
                stack.push(Visit::Exit(defined));
                if let Some(kids) = children.get(&node) {
                    stack.extend(kids.iter().rev().map(|&kid| Visit::Enter(kid)));
                }
            }
            Visit::Exit(defined) => versions.pop_all(&defined),
        }
    }
}

enum Visit {
    Enter(NodeId),
    /// Leaving a subtree: pop these variables' versions.
    Exit(Vec<String>),
}

struct Versions {
    counters: FxHashMap<String, u32>,
    stacks: FxHashMap<String, Vec<u32>>,
}

impl Versions {
    fn new(variables: Vec<String>) -> Self {
        let mut counters = FxHashMap::default();
        let mut stacks = FxHashMap::default();
        for var in variables {
            counters.insert(var.clone(), 0);
            stacks.insert(var, vec![0]);
        }
        Versions { counters, stacks }
    }

    /// Name of the live version of `var`, if `var` is versioned.
    fn current(&self, var: &str) -> Option<String> {
        let version = self.stacks.get(var)?.last()?;
        Some(format!("{var}_{version}"))
    }

    /// Push a new version of `var` and return its name. Unversioned
    /// variables keep their name.
    fn define(&mut self, var: &str, defined: &mut Vec<String>) -> String {
        let (Some(counter), Some(stack)) = (self.counters.get_mut(var), self.stacks.get_mut(var))
        else {
            return var.to_string();
        };
        *counter += 1;
        stack.push(*counter);
        defined.push(var.to_string());
        format!("{var}_{counter}")
    }

    fn pop_all(&mut self, defined: &[String]) {
        for var in defined {
            if let Some(stack) = self.stacks.get_mut(var) {
                stack.pop();
            }
        }
    }

    fn use_mapping(&self, node: &CfgNode) -> FxHashMap<String, String> {
        node.uses()
            .into_iter()
            .filter_map(|var| {
                let current = self.current(&var)?;
                Some((var, current))
            })
            .collect()
    }

    /// Rewrite uses, then definitions, of one node.
    fn rename_node(&mut self, node: &mut CfgNode, defined: &mut Vec<String>) {
        let uses = self.use_mapping(node);
        let has_def = !node.defs().is_empty();
        match &mut node.kind {
            CfgNodeKind::VarAssign { target, value } => {
                *value = value.replace_temps(&uses);
                if has_def {
                    *target = self.define(target, defined);
                }
            }
            CfgNodeKind::MemAssign { address, value } => {
                *address = address.replace_temps(&uses);
                *value = value.replace_temps(&uses);
            }
            CfgNodeKind::Call {
                collectors, args, ..
            } => {
                for arg in args.iter_mut() {
                    *arg = arg.replace_temps(&uses);
                }
                for collector in collectors.iter_mut() {
                    *collector = self.define(collector, defined);
                }
            }
            CfgNodeKind::If { cond } => *cond = cond.replace_temps(&uses),
            CfgNodeKind::Block(children) => {
                for child in children {
                    self.rename_node(child, defined);
                }
            }
            CfgNodeKind::Phi(phi) => {
                let targets: Vec<String> = phi.mappings().keys().cloned().collect();
                for target in targets {
                    let renamed = self.define(&target, defined);
                    phi.rename_target(&target, renamed);
                }
            }
            CfgNodeKind::Start | CfgNodeKind::Return | CfgNodeKind::SelfLoop => {}
            CfgNodeKind::Stub => debug_assert!(false, "stub reached ssa renaming"),
        }
    }

    /// Fill the argument slots of every phi block `node` flows into.
    fn fill_phi_successors(&self, cfg: &mut CfgGraph, node: NodeId) {
        let mut succs = cfg.outgoing(node);
        succs.dedup();
        for succ in succs {
            if !cfg.node(succ).is_phi() {
                continue;
            }
            let slots: Vec<usize> = cfg
                .incoming_edges(succ)
                .iter()
                .enumerate()
                .filter(|&(_, &(pred, _))| pred == node)
                .map(|(j, _)| j)
                .collect();
            if let CfgNodeKind::Phi(phi) = &mut cfg.node_mut(succ).kind {
                for j in slots {
                    phi.fill_slot(j, |arg| self.current(arg));
                }
            }
        }
    }
}
