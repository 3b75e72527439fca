use pretty_assertions::assert_eq;

use crate::test_helpers::diamond;

use super::*;

/// The diamond renders every node and labels the branch edges.
#[test]
fn diamond_rendered() {
    let (cfg, _) = diamond();
    assert_eq!(
        to_dot(&cfg),
        "digraph nfa {
    node [shape=rectangle]
    n0 [label=\"start\"];
    n1 [label=\"if c\"];
    n2 [label=\"a := 1\"];
    n3 [label=\"a := 2\"];
    n4 [label=\"return\"];
    n0 -> n1;
    n1 -> n2 [label=\"  true\"];
    n1 -> n3 [label=\"  false\"];
    n2 -> n4;
    n3 -> n4;
}
"
    );
}

/// Quotes inside statements are escaped.
#[test]
fn labels_escaped() {
    assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
    assert_eq!(escape("a\\b"), "a\\\\b");
}
