//! Control-flow middle-end for the Ori compiler.
//!
//! Takes canonical linear IR ([`ori_lir`]) one function at a time, builds
//! a control-flow graph, and hands it to analyses and transformations
//! before serializing it back to linear IR.
//!
//! # Passes
//!
//! - [`construct`]: canonical IR to [`CfgGraph`].
//! - [`dominator`]: immediate dominators, dominator tree, dominance
//!   frontiers.
//! - [`scc`]: strongly connected components in topological order.
//! - [`worklist`]: generic forward/backward fixpoint dataflow engine.
//! - [`ssa`]: conversion into and out of SSA form.
//! - [`flatten`]: [`CfgGraph`] back to canonical IR.
//! - [`pipeline`]: all of the above over a compilation unit.
//!
//! [`rep_ok`] checks the structural invariants every pass must preserve
//! and [`dot`] renders graphs for debugging.
//!
//! # Tracing
//!
//! Passes emit `tracing` events: `debug` at pass boundaries with node and
//! edge counts, `trace` for per-node detail. See [`init_tracing`].

mod cfg;
pub mod construct;
pub mod dominator;
pub mod dot;
mod error;
pub mod flatten;
pub mod graph;
pub mod node;
pub mod pipeline;
pub mod rep_ok;
pub mod scc;
pub mod ssa;
mod surgery;
pub mod worklist;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

pub use cfg::CfgGraph;
pub use construct::{construct_cfg, construct_unit};
pub use dominator::DominatorTree;
pub use error::CfgError;
pub use flatten::{flatten, flatten_unit};
pub use graph::{Edge, Graph, GraphError, Label, NodeId};
pub use node::{CfgNode, CfgNodeKind, PhiBlock};
pub use pipeline::PipelineConfig;
pub use rep_ok::{assert_rep_ok, check_rep, RepViolation};
pub use scc::{Scc, SccGraph, SccId};
pub use ssa::{from_ssa, into_ssa};
pub use worklist::{BackwardAnalysis, ForwardAnalysis, Lattice};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times; only the first call has an effect.
/// Output is enabled by `RUST_LOG`, e.g. `RUST_LOG=ori_cfg=debug` or
/// `RUST_LOG=ori_cfg::ssa=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
