//! Per-unit driver: construct, optionally round-trip through SSA, flatten.

use ori_lir::{CompUnit, NameGen};

use crate::construct::construct_unit;
use crate::flatten::flatten_unit;
use crate::rep_ok::assert_rep_ok;
use crate::ssa::{from_ssa, into_ssa};
use crate::{CfgError, CfgGraph};

/// Environment variable enabling the SSA round trip.
pub const SSA_ENV: &str = "ORI_CFG_SSA";

/// Environment variable enabling rep-ok verification.
pub const VERIFY_ENV: &str = "ORI_CFG_VERIFY";

/// Which stages [`run`] performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Convert every CFG into SSA form and back before flattening.
    pub ssa_round_trip: bool,

    /// Check graph invariants after every stage that produces a graph.
    /// A violation panics.
    /// Default: on in debug builds.
    pub verify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            ssa_round_trip: false,
            verify: cfg!(debug_assertions),
        }
    }
}

impl PipelineConfig {
    /// Enable or disable the SSA round trip (builder pattern).
    #[must_use]
    pub fn with_ssa_round_trip(mut self, enable: bool) -> Self {
        self.ssa_round_trip = enable;
        self
    }

    /// Enable or disable verification (builder pattern).
    #[must_use]
    pub fn with_verify(mut self, enable: bool) -> Self {
        self.verify = enable;
        self
    }

    /// Defaults overridden by [`SSA_ENV`] and [`VERIFY_ENV`].
    ///
    /// Each accepts `1`/`true` or `0`/`false`; anything else is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(enable) = lookup(SSA_ENV).as_deref().and_then(parse_flag) {
            config.ssa_round_trip = enable;
        }
        if let Some(enable) = lookup(VERIFY_ENV).as_deref().and_then(parse_flag) {
            config.verify = enable;
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Run the middle-end over every function of `unit` and return the
/// flattened unit.
pub fn run(unit: &CompUnit, config: &PipelineConfig) -> Result<CompUnit, CfgError> {
    tracing::debug!(
        unit = %unit.name,
        functions = unit.functions.len(),
        ssa = config.ssa_round_trip,
        verify = config.verify,
        "running cfg pipeline"
    );
    let mut names = NameGen::for_unit(unit);
    let mut cfgs = construct_unit(unit)?;

    for (name, cfg) in &mut cfgs {
        verify(config, cfg, name, "construct");
        if config.ssa_round_trip {
            into_ssa(cfg)?;
            verify(config, cfg, name, "into-ssa");
            from_ssa(cfg)?;
            verify(config, cfg, name, "from-ssa");
        }
    }

    flatten_unit(&cfgs, unit, &mut names)
}

fn verify(config: &PipelineConfig, cfg: &CfgGraph, function: &str, stage: &str) {
    if config.verify {
        tracing::trace!(function, stage, "verifying cfg");
        assert_rep_ok(cfg);
    }
}
