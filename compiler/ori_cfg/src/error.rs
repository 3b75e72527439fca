use ori_lir::Expr;

use crate::graph::{GraphError, NodeId};

/// Fault raised by a CFG pass.
///
/// Every variant points at a bug in this crate or in the pass that
/// produced its input; none is meant to be recovered from.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CfgError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("jump to undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("statement sequence nested inside the function body")]
    NestedSequence,
    #[error("move target `{0}` is neither a temp nor a memory location")]
    InvalidMoveTarget(Expr),
    #[error("{kind} node {node} cannot be flattened")]
    UnexpectedNode { node: NodeId, kind: &'static str },
    #[error("phi block {0} must have exactly one successor")]
    MalformedPhi(NodeId),
}
