//! Synthetic names: calling-convention slots and fresh labels.

use crate::CompUnit;

/// Prefix of argument slots (`_ARG0`, `_ARG1`, ...).
pub const ARG_PREFIX: &str = "_ARG";

/// Prefix of return slots (`_RET0`, `_RET1`, ...).
pub const RET_PREFIX: &str = "_RET";

const LABEL_PREFIX: &str = "_l";

/// Name of argument slot `index`.
pub fn arg_temp(index: usize) -> String {
    format!("{ARG_PREFIX}{index}")
}

/// Name of return slot `index`.
pub fn ret_temp(index: usize) -> String {
    format!("{RET_PREFIX}{index}")
}

/// Whether `name` is an argument slot.
pub fn is_arg_temp(name: &str) -> bool {
    name.starts_with(ARG_PREFIX)
}

/// Whether `name` is a return slot.
pub fn is_ret_temp(name: &str) -> bool {
    name.starts_with(RET_PREFIX)
}

/// Generator of fresh labels.
///
/// Passed by `&mut` to every pass that mints names, so two passes over
/// the same unit never hand out the same name.
#[derive(Clone, Debug, Default)]
pub struct NameGen {
    next_label: u32,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose labels cannot collide with `_l<n>` labels
    /// already present in `unit`.
    pub fn for_unit(unit: &CompUnit) -> Self {
        let mut names = Self::new();
        for func in unit.functions.values() {
            func.body.for_each_label(&mut |label| {
                if let Some(n) = numbered(label, LABEL_PREFIX) {
                    names.next_label = names.next_label.max(n.saturating_add(1));
                }
            });
        }
        names
    }

    /// Mint a fresh label (`_l<n>`).
    pub fn fresh_label(&mut self) -> String {
        let label = format!("{LABEL_PREFIX}{}", self.next_label);
        self.next_label += 1;
        label
    }
}

fn numbered(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.parse().ok()
}
