//! Canonical linear IR for the Ori compiler middle-end.
//!
//! This crate provides:
//!
//! - **Expressions** ([`Expr`], [`BinaryOp`]): side-effect-free trees over
//!   constants, temporaries, memory reads and symbolic names.
//! - **Statements** ([`Stmt`], [`StmtKind`]): the canonical statement forms.
//!   Conditional jumps are two-way with the false branch falling through,
//!   and a function body is a single top-level [`StmtKind::Seq`].
//! - **Compilation units** ([`FuncDecl`], [`CompUnit`]).
//! - **Synthetic names** ([`NameGen`], [`ARG_PREFIX`], [`RET_PREFIX`]):
//!   fresh label/temp generation threaded explicitly through passes.
//! - **Reference evaluator** ([`Evaluator`]): executes a [`CompUnit`]
//!   directly. Middle-end tests use it as the oracle for round trips.
//!
//! # Calling Convention
//!
//! Arguments travel in temps named `_ARG0`, `_ARG1`, ... and results in
//! `_RET0`, `_RET1`, .... A call statement's collectors receive the
//! callee's return slots in order.

pub mod eval;
mod expr;
mod names;
mod span;
mod stmt;

pub use eval::{EvalError, Evaluator};
pub use expr::{BinaryOp, Expr, TempSet};
pub use names::{arg_temp, is_arg_temp, is_ret_temp, ret_temp, NameGen, ARG_PREFIX, RET_PREFIX};
pub use span::Span;
pub use stmt::{CompUnit, FuncDecl, Stmt, StmtKind};
