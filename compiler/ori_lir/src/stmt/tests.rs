use pretty_assertions::assert_eq;

use crate::{BinaryOp, Expr};

use super::*;

/// Labels sit flush left; everything else is indented one level.
#[test]
fn display_function_body() {
    let func = FuncDecl::new(
        "abs",
        Stmt::seq(vec![
            Stmt::mov(Expr::temp("x"), Expr::temp("_ARG0")),
            Stmt::cjump(
                Expr::op(BinaryOp::Ge, Expr::temp("x"), Expr::Const(0)),
                "done",
            ),
            Stmt::mov(
                Expr::temp("x"),
                Expr::op(BinaryOp::Sub, Expr::Const(0), Expr::temp("x")),
            ),
            Stmt::label("done"),
            Stmt::mov(Expr::temp("_RET0"), Expr::temp("x")),
            Stmt::ret(),
        ]),
    );

    let expected = "\
func abs:
    x := _ARG0
    cjump (x >= 0) -> done
    x := (0 - x)
done:
    _RET0 := x
    return
";
    assert_eq!(func.to_string(), expected);
}

/// Calls print their collectors before the target.
#[test]
fn display_call() {
    let call = Stmt::call(
        vec!["q".into(), "r".into()],
        "divmod",
        vec![Expr::temp("a"), Expr::Const(3)],
    );
    assert_eq!(call.to_string(), "    q, r := call divmod(a, 3)\n");
}

/// Label traversal reaches nested sequences and jump targets.
#[test]
fn label_traversal() {
    let body = Stmt::seq(vec![
        Stmt::jump("a"),
        Stmt::seq(vec![Stmt::label("b")]),
        Stmt::cjump(Expr::Const(1), "c"),
    ]);
    let mut seen = Vec::new();
    body.for_each_label(&mut |l| seen.push(l.to_string()));
    assert_eq!(seen, vec!["a", "b", "c"]);
}

/// Functions are keyed and ordered by name.
#[test]
fn comp_unit_ordering() {
    let unit = CompUnit::new("m")
        .with_function(FuncDecl::new("zeta", Stmt::seq(vec![Stmt::ret()])))
        .with_function(FuncDecl::new("alpha", Stmt::seq(vec![Stmt::ret()])));
    let names: Vec<_> = unit.functions.keys().cloned().collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    assert!(unit.function("alpha").is_some());
    assert!(unit.function("beta").is_none());
}
