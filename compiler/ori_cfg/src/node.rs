//! CFG node model.
//!
//! A closed set of node kinds ([`CfgNodeKind`]), each exposing the sets
//! dataflow analyses need. The sets are pure functions of the payload, so
//! after SSA renaming rewrites a node they are simply recomputed on the
//! next query.
//!
//! | kind        | defs            | uses                  | kills       | gens          |
//! |-------------|-----------------|-----------------------|-------------|---------------|
//! | `VarAssign` | target*         | free vars of value**  | target      | copy hint***  |
//! | `MemAssign` |                 | address + value       |             |               |
//! | `Call`      | collectors      | free vars of args     | collectors  |               |
//! | `If`        |                 | free vars of cond     |             |               |
//! | `Block`     | forward union   | backward fold         | forward     | forward fold  |
//!
//! \* unless the target is a return slot.
//! \*\* unless the value is a bare argument slot.
//! \*\*\* `target -> source` when the value is a bare temp that is neither
//! an argument slot nor the target itself.
//!
//! `Start`, `Return`, `SelfLoop` and `Stub` have empty sets. A phi block
//! defines and kills its targets and uses its arguments.

use std::collections::BTreeMap;
use std::fmt;

use ori_lir::{is_arg_temp, is_ret_temp, Expr, Span, TempSet};
use rustc_hash::FxHashMap;

/// Copy-propagation hints: `variable -> source variable`.
pub type GenMap = FxHashMap<String, String>;

/// A node of a control-flow graph.
#[derive(Clone, Debug, PartialEq)]
pub struct CfgNode {
    pub kind: CfgNodeKind,
    pub span: Span,
}

/// Node kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum CfgNodeKind {
    /// Function entry. Exactly one per graph.
    Start,
    /// Function exit.
    Return,
    /// `target := value`.
    VarAssign { target: String, value: Expr },
    /// `MEM[address] := value`.
    MemAssign { address: Expr, value: Expr },
    /// Call whose return slots land in `collectors`.
    Call {
        collectors: Vec<String>,
        target: String,
        args: Vec<Expr>,
    },
    /// Two-way branch. Outgoing edges are `[true, false]`.
    If { cond: Expr },
    /// Empty infinite loop; its only edge points at itself.
    SelfLoop,
    /// Straight-line run of simple statements.
    Block(Vec<CfgNode>),
    /// SSA merge point (see [`PhiBlock`]).
    Phi(PhiBlock),
    /// Backpatching placeholder. Never escapes CFG construction.
    Stub,
}

impl CfgNodeKind {
    /// Short kind name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            CfgNodeKind::Start => "start",
            CfgNodeKind::Return => "return",
            CfgNodeKind::VarAssign { .. } => "var-assign",
            CfgNodeKind::MemAssign { .. } => "mem-assign",
            CfgNodeKind::Call { .. } => "call",
            CfgNodeKind::If { .. } => "if",
            CfgNodeKind::SelfLoop => "self-loop",
            CfgNodeKind::Block(_) => "block",
            CfgNodeKind::Phi(_) => "phi",
            CfgNodeKind::Stub => "stub",
        }
    }
}

/// A block of phi functions placed in front of a merge node.
///
/// Maps each variable to one argument per incoming edge: slot `j` holds
/// the name flowing in along the phi block's `j`th incoming edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhiBlock {
    arity: usize,
    mappings: BTreeMap<String, Vec<String>>,
}

impl PhiBlock {
    /// A phi block for `vars` with `arity` slots, each holding the
    /// unversioned variable name as a placeholder.
    pub fn new(arity: usize, vars: impl IntoIterator<Item = String>) -> Self {
        let mappings = vars
            .into_iter()
            .map(|var| {
                let args = vec![var.clone(); arity];
                (var, args)
            })
            .collect();
        PhiBlock { arity, mappings }
    }

    /// Number of argument slots per variable.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn mappings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.mappings
    }

    pub fn args(&self, var: &str) -> Option<&[String]> {
        self.mappings.get(var).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Rename the variable a phi defines, keeping its arguments.
    pub(crate) fn rename_target(&mut self, old: &str, new: String) {
        if let Some(args) = self.mappings.remove(old) {
            self.mappings.insert(new, args);
        }
    }

    /// Overwrite slot `index` of every phi with `f(current_arg)`.
    pub(crate) fn fill_slot(&mut self, index: usize, mut f: impl FnMut(&str) -> Option<String>) {
        for args in self.mappings.values_mut() {
            if let Some(arg) = args.get_mut(index) {
                if let Some(renamed) = f(arg) {
                    *arg = renamed;
                }
            }
        }
    }
}

// ── Construction ────────────────────────────────────────────────────

impl CfgNode {
    pub fn new(kind: CfgNodeKind, span: Span) -> Self {
        CfgNode { kind, span }
    }

    pub fn start() -> Self {
        CfgNode::new(CfgNodeKind::Start, Span::DUMMY)
    }

    pub fn ret() -> Self {
        CfgNode::new(CfgNodeKind::Return, Span::DUMMY)
    }

    pub fn var_assign(target: impl Into<String>, value: Expr) -> Self {
        CfgNode::new(
            CfgNodeKind::VarAssign {
                target: target.into(),
                value,
            },
            Span::DUMMY,
        )
    }

    pub fn mem_assign(address: Expr, value: Expr) -> Self {
        CfgNode::new(CfgNodeKind::MemAssign { address, value }, Span::DUMMY)
    }

    pub fn call(collectors: Vec<String>, target: impl Into<String>, args: Vec<Expr>) -> Self {
        CfgNode::new(
            CfgNodeKind::Call {
                collectors,
                target: target.into(),
                args,
            },
            Span::DUMMY,
        )
    }

    pub fn branch(cond: Expr) -> Self {
        CfgNode::new(CfgNodeKind::If { cond }, Span::DUMMY)
    }

    pub fn self_loop() -> Self {
        CfgNode::new(CfgNodeKind::SelfLoop, Span::DUMMY)
    }

    pub fn block(children: Vec<CfgNode>) -> Self {
        CfgNode::new(CfgNodeKind::Block(children), Span::DUMMY)
    }

    pub fn phi(phi: PhiBlock) -> Self {
        CfgNode::new(CfgNodeKind::Phi(phi), Span::DUMMY)
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, CfgNodeKind::Phi(_))
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.kind, CfgNodeKind::Stub)
    }
}

// ── Dataflow sets ───────────────────────────────────────────────────

impl CfgNode {
    /// Variables this node defines.
    pub fn defs(&self) -> TempSet {
        match &self.kind {
            CfgNodeKind::VarAssign { target, .. } => {
                if is_ret_temp(target) {
                    TempSet::default()
                } else {
                    TempSet::from_iter([target.clone()])
                }
            }
            CfgNodeKind::Call { collectors, .. } => collectors.iter().cloned().collect(),
            CfgNodeKind::Block(children) => children.iter().flat_map(CfgNode::defs).collect(),
            CfgNodeKind::Phi(phi) => phi.mappings.keys().cloned().collect(),
            CfgNodeKind::Start
            | CfgNodeKind::Return
            | CfgNodeKind::MemAssign { .. }
            | CfgNodeKind::If { .. }
            | CfgNodeKind::SelfLoop
            | CfgNodeKind::Stub => TempSet::default(),
        }
    }

    /// Variables this node reads before any write of its own.
    pub fn uses(&self) -> TempSet {
        match &self.kind {
            CfgNodeKind::VarAssign { value, .. } => match value.as_temp() {
                Some(temp) if is_arg_temp(temp) => TempSet::default(),
                _ => value.free_vars(),
            },
            CfgNodeKind::MemAssign { address, value } => {
                let mut uses = address.free_vars();
                uses.extend(value.free_vars());
                uses
            }
            CfgNodeKind::Call { args, .. } => args.iter().flat_map(Expr::free_vars).collect(),
            CfgNodeKind::If { cond } => cond.free_vars(),
            CfgNodeKind::Block(children) => {
                let mut uses = TempSet::default();
                for child in children.iter().rev() {
                    for def in child.defs() {
                        uses.remove(&def);
                    }
                    uses.extend(child.uses());
                }
                uses
            }
            CfgNodeKind::Phi(phi) => phi.mappings.values().flatten().cloned().collect(),
            CfgNodeKind::Start
            | CfgNodeKind::Return
            | CfgNodeKind::SelfLoop
            | CfgNodeKind::Stub => TempSet::default(),
        }
    }

    /// Variables whose previous values this node overwrites.
    pub fn kills(&self) -> TempSet {
        match &self.kind {
            CfgNodeKind::VarAssign { target, .. } => TempSet::from_iter([target.clone()]),
            CfgNodeKind::Call { collectors, .. } => collectors.iter().cloned().collect(),
            CfgNodeKind::Block(children) => children.iter().flat_map(CfgNode::kills).collect(),
            CfgNodeKind::Phi(phi) => phi.mappings.keys().cloned().collect(),
            CfgNodeKind::Start
            | CfgNodeKind::Return
            | CfgNodeKind::MemAssign { .. }
            | CfgNodeKind::If { .. }
            | CfgNodeKind::SelfLoop
            | CfgNodeKind::Stub => TempSet::default(),
        }
    }

    /// Copy-propagation facts established by this node.
    pub fn gens(&self) -> GenMap {
        match &self.kind {
            CfgNodeKind::VarAssign { target, value } => match value.as_temp() {
                Some(source) if !is_arg_temp(source) && source != target => {
                    GenMap::from_iter([(target.clone(), source.to_string())])
                }
                _ => GenMap::default(),
            },
            CfgNodeKind::Block(children) => {
                let mut gens = GenMap::default();
                for child in children {
                    let killed = child.kills();
                    gens.retain(|var, source| !killed.contains(var) && !killed.contains(source));
                    gens.extend(child.gens());
                }
                gens
            }
            CfgNodeKind::Start
            | CfgNodeKind::Return
            | CfgNodeKind::MemAssign { .. }
            | CfgNodeKind::Call { .. }
            | CfgNodeKind::If { .. }
            | CfgNodeKind::SelfLoop
            | CfgNodeKind::Phi(_)
            | CfgNodeKind::Stub => GenMap::default(),
        }
    }
}

impl fmt::Display for CfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CfgNodeKind::Start => f.write_str("start"),
            CfgNodeKind::Return => f.write_str("return"),
            CfgNodeKind::VarAssign { target, value } => write!(f, "{target} := {value}"),
            CfgNodeKind::MemAssign { address, value } => write!(f, "MEM[{address}] := {value}"),
            CfgNodeKind::Call {
                collectors,
                target,
                args,
            } => {
                if !collectors.is_empty() {
                    write!(f, "{} := ", collectors.join(", "))?;
                }
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "call {target}({})", args.join(", "))
            }
            CfgNodeKind::If { cond } => write!(f, "if {cond}"),
            CfgNodeKind::SelfLoop => f.write_str("self-loop"),
            CfgNodeKind::Block(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            CfgNodeKind::Phi(phi) => {
                for (i, (var, args)) in phi.mappings.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{var} := phi({})", args.join(", "))?;
                }
                Ok(())
            }
            CfgNodeKind::Stub => f.write_str("stub"),
        }
    }
}
