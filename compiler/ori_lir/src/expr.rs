//! Expression trees.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

/// Set of temporary names, as produced by [`Expr::free_vars`].
pub type TempSet = FxHashSet<String>;

/// Binary operators. Comparisons produce `1` or `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Operator spelling used by the printer.
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// A canonical IR expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Integer constant.
    Const(i64),
    /// Named temporary (virtual register).
    Temp(String),
    /// Binary operation.
    Op {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Memory word at the given address.
    Mem(Box<Expr>),
    /// Symbolic address (function or global name).
    Name(String),
}

impl Expr {
    /// Shorthand for [`Expr::Temp`].
    pub fn temp(name: impl Into<String>) -> Self {
        Expr::Temp(name.into())
    }

    /// Shorthand for [`Expr::Op`].
    pub fn op(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Op {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Shorthand for [`Expr::Mem`].
    pub fn mem(address: Expr) -> Self {
        Expr::Mem(Box::new(address))
    }

    /// The temp name if this expression is a bare temporary.
    pub fn as_temp(&self) -> Option<&str> {
        match self {
            Expr::Temp(name) => Some(name),
            _ => None,
        }
    }

    /// Temporaries read by this expression.
    ///
    /// Operators take the union of both operands, memory reads recurse
    /// into the address, constants and names contribute nothing.
    pub fn free_vars(&self) -> TempSet {
        let mut vars = TempSet::default();
        self.collect_free_vars(&mut vars);
        vars
    }

    fn collect_free_vars(&self, vars: &mut TempSet) {
        match self {
            Expr::Const(_) | Expr::Name(_) => {}
            Expr::Temp(name) => {
                vars.insert(name.clone());
            }
            Expr::Op { left, right, .. } => {
                left.collect_free_vars(vars);
                right.collect_free_vars(vars);
            }
            Expr::Mem(address) => address.collect_free_vars(vars),
        }
    }

    /// Rewrite every temporary whose name appears in `mapping`.
    ///
    /// Temps absent from the map are kept as-is.
    #[must_use]
    pub fn replace_temps(&self, mapping: &FxHashMap<String, String>) -> Expr {
        match self {
            Expr::Const(_) | Expr::Name(_) => self.clone(),
            Expr::Temp(name) => match mapping.get(name) {
                Some(renamed) => Expr::Temp(renamed.clone()),
                None => self.clone(),
            },
            Expr::Op { op, left, right } => Expr::Op {
                op: *op,
                left: Box::new(left.replace_temps(mapping)),
                right: Box::new(right.replace_temps(mapping)),
            },
            Expr::Mem(address) => Expr::Mem(Box::new(address.replace_temps(mapping))),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "{value}"),
            Expr::Temp(name) => f.write_str(name),
            Expr::Op { op, left, right } => write!(f, "({left} {} {right})", op.as_symbol()),
            Expr::Mem(address) => write!(f, "MEM[{address}]"),
            Expr::Name(name) => write!(f, "@{name}"),
        }
    }
}

#[cfg(test)]
mod tests;
