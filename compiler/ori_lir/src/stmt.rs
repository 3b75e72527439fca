//! Statements, function declarations and compilation units.

use std::collections::BTreeMap;
use std::fmt;

use crate::{Expr, Span};

/// A canonical IR statement with its source span.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement forms of the canonical IR.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StmtKind {
    /// `target := source`. The target is a [`Expr::Temp`] or [`Expr::Mem`].
    Move { target: Expr, source: Expr },
    /// Call `target(args)`; `collectors[i]` receives return slot `i`.
    Call {
        collectors: Vec<String>,
        target: String,
        args: Vec<Expr>,
    },
    /// Unconditional jump to a label.
    Jump(String),
    /// Jump to `true_label` when `cond` is non-zero, otherwise fall through.
    CJump { cond: Expr, true_label: String },
    /// Jump target.
    Label(String),
    /// Leave the function. Results are passed in the return slots.
    Return,
    /// Statement sequence.
    Seq(Vec<Stmt>),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }

    /// `target := source` with a dummy span.
    pub fn mov(target: Expr, source: Expr) -> Self {
        Stmt::new(StmtKind::Move { target, source }, Span::DUMMY)
    }

    /// Call with a dummy span.
    pub fn call(collectors: Vec<String>, target: impl Into<String>, args: Vec<Expr>) -> Self {
        Stmt::new(
            StmtKind::Call {
                collectors,
                target: target.into(),
                args,
            },
            Span::DUMMY,
        )
    }

    pub fn jump(label: impl Into<String>) -> Self {
        Stmt::new(StmtKind::Jump(label.into()), Span::DUMMY)
    }

    pub fn cjump(cond: Expr, true_label: impl Into<String>) -> Self {
        Stmt::new(
            StmtKind::CJump {
                cond,
                true_label: true_label.into(),
            },
            Span::DUMMY,
        )
    }

    pub fn label(label: impl Into<String>) -> Self {
        Stmt::new(StmtKind::Label(label.into()), Span::DUMMY)
    }

    pub fn ret() -> Self {
        Stmt::new(StmtKind::Return, Span::DUMMY)
    }

    pub fn seq(stmts: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Seq(stmts), Span::DUMMY)
    }

    /// Replace the span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Visit every label defined or referenced by this statement tree.
    pub fn for_each_label(&self, f: &mut impl FnMut(&str)) {
        match &self.kind {
            StmtKind::Jump(label) | StmtKind::Label(label) => f(label),
            StmtKind::CJump { true_label, .. } => f(true_label),
            StmtKind::Seq(stmts) => {
                for stmt in stmts {
                    stmt.for_each_label(f);
                }
            }
            StmtKind::Move { .. } | StmtKind::Call { .. } | StmtKind::Return => {}
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "    ".repeat(indent);
        match &self.kind {
            StmtKind::Move { target, source } => writeln!(f, "{pad}{target} := {source}"),
            StmtKind::Call {
                collectors,
                target,
                args,
            } => {
                write!(f, "{pad}")?;
                if !collectors.is_empty() {
                    write!(f, "{} := ", collectors.join(", "))?;
                }
                write!(f, "call {target}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                writeln!(f, ")")
            }
            StmtKind::Jump(label) => writeln!(f, "{pad}jump {label}"),
            StmtKind::CJump { cond, true_label } => {
                writeln!(f, "{pad}cjump {cond} -> {true_label}")
            }
            StmtKind::Label(label) => writeln!(f, "{label}:"),
            StmtKind::Return => writeln!(f, "{pad}return"),
            StmtKind::Seq(stmts) => {
                for stmt in stmts {
                    stmt.fmt_indented(f, indent)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 1)
    }
}

/// A function: name plus canonical body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub body: Stmt,
}

impl FuncDecl {
    pub fn new(name: impl Into<String>, body: Stmt) -> Self {
        FuncDecl {
            name: name.into(),
            body,
        }
    }
}

impl fmt::Display for FuncDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {}:", self.name)?;
        write!(f, "{}", self.body)
    }
}

/// A compilation unit. Functions are kept sorted by name.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompUnit {
    pub name: String,
    pub functions: BTreeMap<String, FuncDecl>,
}

impl CompUnit {
    pub fn new(name: impl Into<String>) -> Self {
        CompUnit {
            name: name.into(),
            functions: BTreeMap::new(),
        }
    }

    /// Add (or replace) a function, keyed by its name.
    pub fn add_function(&mut self, func: FuncDecl) {
        self.functions.insert(func.name.clone(), func);
    }

    /// Builder-style [`add_function`](Self::add_function).
    #[must_use]
    pub fn with_function(mut self, func: FuncDecl) -> Self {
        self.add_function(func);
        self
    }

    pub fn function(&self, name: &str) -> Option<&FuncDecl> {
        self.functions.get(name)
    }
}

impl fmt::Display for CompUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "unit {}", self.name)?;
        for func in self.functions.values() {
            writeln!(f)?;
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
