#![allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]

use pretty_assertions::assert_eq;

use crate::{FuncDecl, Span};

use super::*;

fn t(name: &str) -> Expr {
    Expr::temp(name)
}

fn bin(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    Expr::op(op, l, r)
}

/// `sum(n)`: loop adding 1..=n, returning the total.
fn sum_unit() -> CompUnit {
    CompUnit::new("sum").with_function(FuncDecl::new(
        "sum",
        Stmt::seq(vec![
            Stmt::mov(t("n"), t("_ARG0")),
            Stmt::mov(t("acc"), Expr::Const(0)),
            Stmt::label("head"),
            Stmt::cjump(bin(BinaryOp::Gt, t("n"), Expr::Const(0)), "body"),
            Stmt::mov(t("_RET0"), t("acc")),
            Stmt::ret(),
            Stmt::label("body"),
            Stmt::mov(t("acc"), bin(BinaryOp::Add, t("acc"), t("n"))),
            Stmt::mov(t("n"), bin(BinaryOp::Sub, t("n"), Expr::Const(1))),
            Stmt::jump("head"),
        ]),
    ))
}

/// A counted loop produces the expected result.
#[test]
fn loop_sum() {
    let unit = sum_unit();
    let mut eval = Evaluator::new(&unit);
    assert_eq!(eval.call("sum", &[10]).unwrap(), vec![55]);
    assert_eq!(eval.call("sum", &[0]).unwrap(), vec![0]);
}

/// Multi-value returns land in the caller's collectors; `print` logs.
#[test]
fn multi_return_and_print() {
    let unit = CompUnit::new("m")
        .with_function(FuncDecl::new(
            "divmod",
            Stmt::seq(vec![
                Stmt::mov(t("_RET0"), bin(BinaryOp::Div, t("_ARG0"), t("_ARG1"))),
                Stmt::mov(t("_RET1"), bin(BinaryOp::Mod, t("_ARG0"), t("_ARG1"))),
                Stmt::ret(),
            ]),
        ))
        .with_function(FuncDecl::new(
            "main",
            Stmt::seq(vec![
                Stmt::call(
                    vec!["q".into(), "r".into()],
                    "divmod",
                    vec![Expr::Const(17), Expr::Const(5)],
                ),
                Stmt::call(vec![], PRINT, vec![t("q"), t("r")]),
                Stmt::ret(),
            ]),
        ));

    let mut eval = Evaluator::new(&unit);
    assert_eq!(eval.call("main", &[]).unwrap(), Vec::<i64>::new());
    assert_eq!(eval.output(), &[3, 2]);
}

/// Memory writes persist across calls; unset temps read as zero.
#[test]
fn memory_and_default_temps() {
    let unit = CompUnit::new("m").with_function(FuncDecl::new(
        "bump",
        Stmt::seq(vec![
            Stmt::mov(
                Expr::mem(Expr::Const(8)),
                bin(BinaryOp::Add, Expr::mem(Expr::Const(8)), t("unset")),
            ),
            Stmt::mov(
                Expr::mem(Expr::Const(8)),
                bin(BinaryOp::Add, Expr::mem(Expr::Const(8)), Expr::Const(1)),
            ),
            Stmt::mov(t("_RET0"), Expr::mem(Expr::Const(8))),
            Stmt::ret(),
        ]),
    ));
    let mut eval = Evaluator::new(&unit);
    assert_eq!(eval.call("bump", &[]).unwrap(), vec![1]);
    assert_eq!(eval.call("bump", &[]).unwrap(), vec![2]);
}

/// Faults surface as errors rather than panics.
#[test]
fn faults() {
    let unit = CompUnit::new("m")
        .with_function(FuncDecl::new(
            "spin",
            Stmt::seq(vec![Stmt::label("l"), Stmt::jump("l")]),
        ))
        .with_function(FuncDecl::new(
            "lost",
            Stmt::seq(vec![Stmt::jump("nowhere").with_span(Span::new(3, 9))]),
        ))
        .with_function(FuncDecl::new(
            "div0",
            Stmt::seq(vec![
                Stmt::mov(t("x"), bin(BinaryOp::Div, Expr::Const(1), Expr::Const(0))),
                Stmt::ret(),
            ]),
        ))
        .with_function(FuncDecl::new(
            "short",
            Stmt::seq(vec![
                Stmt::call(vec!["a".into()], PRINT, vec![]),
                Stmt::ret(),
            ]),
        ));

    let mut eval = Evaluator::new(&unit).with_fuel(100);
    assert_eq!(eval.call("spin", &[]), Err(EvalError::OutOfFuel));

    let mut eval = Evaluator::new(&unit);
    assert_eq!(
        eval.call("lost", &[]),
        Err(EvalError::UndefinedLabel {
            function: "lost".into(),
            label: "nowhere".into()
        })
    );
    assert_eq!(
        eval.call("div0", &[]),
        Err(EvalError::DivisionByZero {
            function: "div0".into()
        })
    );
    assert_eq!(
        eval.call("short", &[]),
        Err(EvalError::MissingReturn {
            function: PRINT.into(),
            index: 0
        })
    );
    assert_eq!(
        eval.call("missing", &[]),
        Err(EvalError::UnknownFunction("missing".into()))
    );
}

/// Falling off the end of a body returns like an explicit `return`.
#[test]
fn implicit_return() {
    let unit = CompUnit::new("m").with_function(FuncDecl::new(
        "f",
        Stmt::seq(vec![Stmt::mov(t("_RET0"), Expr::Const(4))]),
    ));
    assert_eq!(Evaluator::new(&unit).call("f", &[]).unwrap(), vec![4]);
}
