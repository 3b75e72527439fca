//! Reference evaluator for canonical IR.
//!
//! Executes a [`CompUnit`] statement by statement. It exists so that
//! transformations over the IR can be checked by running the program
//! before and after and comparing observable behavior.
//!
//! # Semantics
//!
//! - Each call gets a fresh frame of temporaries; unset temps read as `0`.
//! - Arguments are placed in `_ARG<i>`; after `return` the contiguous run
//!   of set `_RET0`, `_RET1`, ... slots is the result.
//! - Memory is a sparse map from address to word, shared by all frames.
//! - `print(x, ...)` is built in and appends its arguments to the output log.
//! - Every executed statement consumes one unit of fuel, so a runaway
//!   loop ends in [`EvalError::OutOfFuel`] instead of hanging.

use rustc_hash::FxHashMap;

use crate::names::{arg_temp, ret_temp};
use crate::{BinaryOp, CompUnit, Expr, Stmt, StmtKind};

const DEFAULT_FUEL: u64 = 1_000_000;

/// Name of the builtin output function.
pub const PRINT: &str = "print";

/// Evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("call to unknown function `{0}`")]
    UnknownFunction(String),
    #[error("jump to undefined label `{label}` in `{function}`")]
    UndefinedLabel { function: String, label: String },
    #[error("division by zero in `{function}`")]
    DivisionByZero { function: String },
    #[error("`{function}` returned no value for collector {index}")]
    MissingReturn { function: String, index: usize },
    #[error("invalid move target `{0}`")]
    InvalidMoveTarget(Expr),
    #[error("symbolic name `{0}` used as a value")]
    NameAsValue(String),
    #[error("evaluation ran out of fuel")]
    OutOfFuel,
}

/// A function body flattened into a linear instruction list.
struct Program<'u> {
    insns: Vec<&'u Stmt>,
    labels: FxHashMap<&'u str, usize>,
}

impl<'u> Program<'u> {
    fn new(body: &'u Stmt) -> Self {
        let mut program = Program {
            insns: Vec::new(),
            labels: FxHashMap::default(),
        };
        program.push(body);
        program
    }

    fn push(&mut self, stmt: &'u Stmt) {
        match &stmt.kind {
            StmtKind::Seq(stmts) => {
                for s in stmts {
                    self.push(s);
                }
            }
            StmtKind::Label(label) => {
                self.labels.insert(label.as_str(), self.insns.len());
                self.insns.push(stmt);
            }
            _ => self.insns.push(stmt),
        }
    }
}

/// Tree-walking evaluator over a compilation unit.
pub struct Evaluator<'u> {
    programs: FxHashMap<&'u str, Program<'u>>,
    heap: FxHashMap<i64, i64>,
    output: Vec<i64>,
    fuel: u64,
}

impl<'u> Evaluator<'u> {
    pub fn new(unit: &'u CompUnit) -> Self {
        let programs = unit
            .functions
            .values()
            .map(|func| (func.name.as_str(), Program::new(&func.body)))
            .collect();
        Evaluator {
            programs,
            heap: FxHashMap::default(),
            output: Vec::new(),
            fuel: DEFAULT_FUEL,
        }
    }

    /// Limit the number of statements executed across all calls.
    #[must_use]
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    /// Values passed to `print` so far, in order.
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    /// Call `name` with `args` and return its results.
    pub fn call(&mut self, name: &str, args: &[i64]) -> Result<Vec<i64>, EvalError> {
        if name == PRINT {
            self.output.extend_from_slice(args);
            return Ok(Vec::new());
        }

        let mut frame: FxHashMap<String, i64> = FxHashMap::default();
        for (i, &arg) in args.iter().enumerate() {
            frame.insert(arg_temp(i), arg);
        }

        let mut pc = 0;
        loop {
            let Some(stmt) = self.program(name)?.insns.get(pc).copied() else {
                break;
            };
            pc += 1;

            if self.fuel == 0 {
                return Err(EvalError::OutOfFuel);
            }
            self.fuel -= 1;

            match &stmt.kind {
                StmtKind::Move { target, source } => {
                    let value = self.eval(name, &frame, source)?;
                    match target {
                        Expr::Temp(temp) => {
                            frame.insert(temp.clone(), value);
                        }
                        Expr::Mem(address) => {
                            let address = self.eval(name, &frame, address)?;
                            self.heap.insert(address, value);
                        }
                        other => return Err(EvalError::InvalidMoveTarget(other.clone())),
                    }
                }
                StmtKind::Call {
                    collectors,
                    target,
                    args,
                } => {
                    let values = args
                        .iter()
                        .map(|arg| self.eval(name, &frame, arg))
                        .collect::<Result<Vec<_>, _>>()?;
                    let results = self.call(target, &values)?;
                    for (index, collector) in collectors.iter().enumerate() {
                        let Some(&value) = results.get(index) else {
                            return Err(EvalError::MissingReturn {
                                function: target.clone(),
                                index,
                            });
                        };
                        frame.insert(collector.clone(), value);
                    }
                }
                StmtKind::Jump(label) => pc = self.resolve(name, label)?,
                StmtKind::CJump { cond, true_label } => {
                    if self.eval(name, &frame, cond)? != 0 {
                        pc = self.resolve(name, true_label)?;
                    }
                }
                StmtKind::Label(_) | StmtKind::Seq(_) => {}
                StmtKind::Return => break,
            }
        }

        let results = (0..)
            .map_while(|i| frame.get(&ret_temp(i)).copied())
            .collect();
        tracing::trace!(function = name, ?results, "returned");
        Ok(results)
    }

    fn program(&self, name: &str) -> Result<&Program<'u>, EvalError> {
        self.programs
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))
    }

    fn resolve(&self, function: &str, label: &str) -> Result<usize, EvalError> {
        self.program(function)?
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| EvalError::UndefinedLabel {
                function: function.to_string(),
                label: label.to_string(),
            })
    }

    fn eval(
        &self,
        function: &str,
        frame: &FxHashMap<String, i64>,
        expr: &Expr,
    ) -> Result<i64, EvalError> {
        Ok(match expr {
            Expr::Const(value) => *value,
            Expr::Temp(name) => frame.get(name).copied().unwrap_or(0),
            Expr::Mem(address) => {
                let address = self.eval(function, frame, address)?;
                self.heap.get(&address).copied().unwrap_or(0)
            }
            Expr::Name(name) => return Err(EvalError::NameAsValue(name.clone())),
            Expr::Op { op, left, right } => {
                let l = self.eval(function, frame, left)?;
                let r = self.eval(function, frame, right)?;
                apply(*op, l, r).ok_or_else(|| EvalError::DivisionByZero {
                    function: function.to_string(),
                })?
            }
        })
    }
}

/// Apply a binary operator; `None` on division by zero.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "shift amounts are masked to 0..64"
)]
fn apply(op: BinaryOp, l: i64, r: i64) -> Option<i64> {
    Some(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => l.checked_div(r).or_else(|| (r == -1).then(|| l.wrapping_neg()))?,
        BinaryOp::Mod => l.checked_rem(r).or((r == -1).then_some(0))?,
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::Shl => l.wrapping_shl((r & 63) as u32),
        BinaryOp::Shr => l.wrapping_shr((r & 63) as u32),
        BinaryOp::Eq => i64::from(l == r),
        BinaryOp::Ne => i64::from(l != r),
        BinaryOp::Lt => i64::from(l < r),
        BinaryOp::Le => i64::from(l <= r),
        BinaryOp::Gt => i64::from(l > r),
        BinaryOp::Ge => i64::from(l >= r),
    })
}

#[cfg(test)]
mod tests;
