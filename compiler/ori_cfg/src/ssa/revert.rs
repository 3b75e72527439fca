//! Leaving SSA form.

use ori_lir::Expr;

use crate::graph::Edge;
use crate::node::{CfgNode, CfgNodeKind};
use crate::{CfgError, CfgGraph};

/// Replace every phi block of `cfg` with plain copies.
///
/// For a phi block with incoming edges `e_0 .. e_k`, the block is removed
/// and each `e_j` is re-routed to the block's successor through a chain of
/// `target := args[j]` assignments, one per phi mapping. The edge keeps its
/// label, so a branch feeding a phi still reports `[true, false]`. Copies
/// of a version onto itself are dropped.
///
/// Returns the number of phi blocks removed.
pub fn from_ssa(cfg: &mut CfgGraph) -> Result<usize, CfgError> {
    let phis: Vec<_> = cfg
        .graph()
        .breadth_first(cfg.start())
        .into_iter()
        .filter(|&node| cfg.node(node).is_phi())
        .collect();

    for &node in &phis {
        let succs = cfg.outgoing(node);
        let &[succ] = succs.as_slice() else {
            return Err(CfgError::MalformedPhi(node));
        };
        if succ == node {
            return Err(CfgError::MalformedPhi(node));
        }
        let incoming = cfg.incoming_edges(node).to_vec();
        let CfgNodeKind::Phi(phi) = cfg.remove(node)?.kind else {
            return Err(CfgError::MalformedPhi(node));
        };
        let span = cfg.node(succ).span;

        for (j, (pred, label)) in incoming.into_iter().enumerate() {
            cfg.join_with(pred, succ, label)?;
            let copies: Vec<CfgNode> = phi
                .mappings()
                .iter()
                .filter_map(|(target, args)| {
                    let arg = args.get(j)?;
                    (arg != target).then(|| {
                        CfgNode::var_assign(target.clone(), Expr::temp(arg.clone())).with_span(span)
                    })
                })
                .collect();
            cfg.inner_insert(Edge { from: pred, to: succ, label }, copies)?;
        }
    }

    tracing::debug!(phis = phis.len(), "reverted ssa");
    Ok(phis.len())
}
