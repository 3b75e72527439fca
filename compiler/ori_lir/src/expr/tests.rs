use pretty_assertions::assert_eq;

use super::*;

fn set(names: &[&str]) -> TempSet {
    names.iter().map(|n| (*n).to_string()).collect()
}

/// Constants and names have no free variables.
#[test]
fn leaves_without_temps() {
    assert!(Expr::Const(7).free_vars().is_empty());
    assert!(Expr::Name("f".into()).free_vars().is_empty());
}

/// Operators union their operands and memory reads recurse into the address.
#[test]
fn nested_free_vars() {
    let expr = Expr::op(
        BinaryOp::Add,
        Expr::temp("a"),
        Expr::mem(Expr::op(BinaryOp::Mul, Expr::temp("b"), Expr::temp("a"))),
    );
    assert_eq!(expr.free_vars(), set(&["a", "b"]));
}

/// Replacement only touches mapped temps.
#[test]
fn replace_temps_partial() {
    let expr = Expr::op(BinaryOp::Sub, Expr::temp("x"), Expr::temp("y"));
    let mut mapping = FxHashMap::default();
    mapping.insert("x".to_string(), "x_2".to_string());

    let renamed = expr.replace_temps(&mapping);
    assert_eq!(
        renamed,
        Expr::op(BinaryOp::Sub, Expr::temp("x_2"), Expr::temp("y"))
    );
}

/// Printer output is fully parenthesized.
#[test]
fn display_form() {
    let expr = Expr::mem(Expr::op(BinaryOp::Add, Expr::temp("p"), Expr::Const(8)));
    assert_eq!(expr.to_string(), "MEM[(p + 8)]");
    assert_eq!(Expr::Name("print".into()).to_string(), "@print");
}
