//! Graphviz rendering of a CFG, for debugging.

use std::fmt::Write;

use crate::CfgGraph;

/// Render `cfg` in DOT syntax. Nodes are named by id and labelled with
/// their statement; branch edges carry their `true`/`false` label.
pub fn to_dot(cfg: &CfgGraph) -> String {
    let mut dot = String::new();
    dot.push_str("digraph nfa {\n");
    dot.push_str("    node [shape=rectangle]\n");

    for id in cfg.nodes() {
        // Writing to a String is infallible
        let _ = writeln!(dot, "    {id} [label=\"{}\"];", escape(&cfg.node(id).to_string()));
    }
    for edge in cfg.edges() {
        let _ = match edge.label {
            Some(label) => writeln!(dot, "    {} -> {} [label=\"  {label}\"];", edge.from, edge.to),
            None => writeln!(dot, "    {} -> {};", edge.from, edge.to),
        };
    }

    dot.push_str("}\n");
    dot
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests;
