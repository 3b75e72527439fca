//! Conversion into and out of static single assignment form.
//!
//! # Algorithm
//!
//! [`into_ssa`] is the classic Cytron construction:
//!
//! 1. Collect the definition sites of every variable (breadth-first from
//!    the start).
//! 2. Close each variable's definition sites over the dominance frontier
//!    to find the nodes needing a phi for it. A frontier node is added
//!    once per variable, and seeds further work only if it does not
//!    itself define that variable.
//! 3. Splice one [`PhiBlock`] in front of each such node, with one
//!    argument slot per edge moved onto it. A node that jumps to itself
//!    routes that back edge through its phi too, so each iteration reads
//!    the previous iteration's version.
//! 4. Rebuild the dominator tree (the graph changed) and rename along it;
//!    see [`rename`].
//!
//! [`from_ssa`] replaces every phi block by copies on its incoming edges.
//!
//! Variables that are only ever read (argument slots, temps defined
//! outside the function) keep their names.
//!
//! # References
//!
//! - Cytron et al.: "Efficiently Computing Static Single Assignment Form
//!   and the Control Dependence Graph" (TOPLAS 1991)
//! - Appel: "Modern Compiler Implementation" §19.1 (Algorithms 19.6, 19.7)

mod rename;
mod revert;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::dominator::DominatorTree;
use crate::graph::NodeId;
use crate::node::{CfgNode, PhiBlock};
use crate::{CfgError, CfgGraph};

pub use revert::from_ssa;

/// Variable -> nodes defining it.
type DefSites = BTreeMap<String, BTreeSet<NodeId>>;

/// Rewrite `cfg` into SSA form in place.
///
/// Returns the number of phi blocks inserted.
pub fn into_ssa(cfg: &mut CfgGraph) -> Result<usize, CfgError> {
    let defsites = collect_defsites(cfg);
    let placements = {
        let dom = DominatorTree::new(cfg);
        place_phis(&defsites, &dom)
    };

    let mut inserted = 0;
    for (node, vars) in placements {
        // A self-loop's own edge stays on it and never reaches the phi.
        let keep_self = cfg.keeps_self_edge(node);
        let arity = cfg
            .incoming_edges(node)
            .iter()
            .filter(|&&(pred, _)| !(keep_self && pred == node))
            .count();
        if arity == 0 {
            continue;
        }
        let span = cfg.node(node).span;
        let phi = CfgNode::phi(PhiBlock::new(arity, vars)).with_span(span);
        cfg.prepend_node(node, vec![phi])?;
        inserted += 1;
    }

    let variables: Vec<String> = defsites.into_keys().collect();
    rename::rename(cfg, variables);
    tracing::debug!(phis = inserted, nodes = cfg.len(), "converted to ssa");
    Ok(inserted)
}

fn collect_defsites(cfg: &CfgGraph) -> DefSites {
    let mut defsites = DefSites::new();
    for node in cfg.graph().breadth_first(cfg.start()) {
        for var in cfg.node(node).defs() {
            defsites.entry(var).or_default().insert(node);
        }
    }
    defsites
}

/// Node -> variables needing a phi there.
fn place_phis(defsites: &DefSites, dom: &DominatorTree<'_>) -> BTreeMap<NodeId, BTreeSet<String>> {
    let cfg = dom.cfg();
    let mut placements: BTreeMap<NodeId, BTreeSet<String>> = BTreeMap::new();

    for (var, sites) in defsites {
        let mut has_phi: BTreeSet<NodeId> = BTreeSet::new();
        let mut worklist: VecDeque<NodeId> = sites.iter().copied().collect();
        while let Some(node) = worklist.pop_front() {
            for &frontier in dom.frontier_of(node) {
                if !has_phi.insert(frontier) {
                    continue;
                }
                placements.entry(frontier).or_default().insert(var.clone());
                if !cfg.node(frontier).defs().contains(var) {
                    worklist.push_back(frontier);
                }
            }
        }
    }
    tracing::trace!(nodes = placements.len(), "placed phi blocks");
    placements
}
