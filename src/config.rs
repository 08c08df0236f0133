//! Solver configuration

use clap::{Args, ValueEnum};
use miette::Diagnostic;
use std::{path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Unknown {kind} `{value}`")]
    #[diagnostic(help("supported values: {supported}"))]
    UnknownStrategy { kind: &'static str, value: String, supported: &'static str },

    #[error("`{option}` must be {requirement}, got {value}")]
    OutOfRange { option: &'static str, requirement: &'static str, value: String },

    #[error("Decomposer program {} does not exist", path.display())]
    MissingDecomposer { path: PathBuf },
}

/// How the next branching variable is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Branching {
    /// Static order derived from a tree decomposition
    Static,
    /// Decaying literal activity combined with live occurrence counts
    #[default]
    Vsads,
    /// Sum of the undecided occurrence counts of both polarities
    Dlcs,
    /// Product of the undecided occurrence counts of both polarities
    Dlcp,
    /// Min-fill elimination recomputed on the current component
    MinFill,
}

/// How neighbours are enumerated when building graphs and components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Traversal {
    /// One loop over all occurrences, deduplicated and sorted
    #[default]
    Uniform,
    /// Loops specialised per clause arity, unsorted
    ArityClassed,
}

/// Which engine computes implied literals of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImplicationEngine {
    /// Probing with nested searches on the solver's own trail
    #[default]
    Native,
    /// An incremental SAT solver working on a renamed copy of the component
    External,
}

macro_rules! from_str_via_value_enum {
    ($ty:ty, $kind:literal, $supported:literal) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as ValueEnum>::from_str(s, true).map_err(|_| ConfigError::UnknownStrategy {
                    kind: $kind,
                    value: s.to_owned(),
                    supported: $supported,
                })
            }
        }
    };
}

from_str_via_value_enum!(Branching, "branching heuristic", "static, vsads, dlcs, dlcp, min-fill");
from_str_via_value_enum!(Traversal, "traversal strategy", "uniform, arity-classed");
from_str_via_value_enum!(ImplicationEngine, "implication engine", "native, external");

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Branching heuristic
    #[arg(long, value_enum, default_value_t = Branching::default())]
    pub branching: Branching,

    /// Neighbour enumeration for primal graphs and dynamic decomposition
    #[arg(long, value_enum, default_value_t = Traversal::default())]
    pub traversal: Traversal,

    /// Engine used to compute implied literals
    #[arg(long, value_enum, default_value_t = ImplicationEngine::default())]
    pub implication_engine: ImplicationEngine,

    /// Let the external engine also report implied binary clauses
    #[arg(long)]
    pub implied_binaries: bool,

    /// Largest treewidth the in-process decomposition accepts before giving up
    #[arg(long, default_value_t = 64)]
    pub width_bound: usize,

    /// External tree decomposer reading PACE `.gr` on stdin and writing `.td` to stdout
    #[arg(long)]
    pub decomposer: Option<PathBuf>,

    /// Wall-clock limit for the external decomposer, in seconds
    #[arg(long, default_value_t = 10)]
    pub decomposer_timeout: u64,

    /// Initial conflict budget of a probing search
    #[arg(long, default_value_t = 64)]
    pub probe_budget: u64,

    /// Factor applied to the probe budget after an inconclusive pass
    #[arg(long, default_value_t = 2.0)]
    pub budget_growth: f64,

    /// Conflicts before the first restart
    #[arg(long, default_value_t = 32)]
    pub restart_interval: u64,

    /// Factor applied to the restart interval after every restart
    #[arg(long, default_value_t = 1.5)]
    pub restart_growth: f64,

    /// Learnt long clauses kept before a reduction
    #[arg(long, default_value_t = 2000)]
    pub max_learnts: usize,

    /// Learnt clauses up to this length survive every reduction
    #[arg(long, default_value_t = 3)]
    pub keep_learnt_len: usize,

    /// Weight of literal activity in VSADS scores
    #[arg(long, default_value_t = 1.0)]
    pub vsads_activity: f64,

    /// Weight of occurrence counts in VSADS scores
    #[arg(long, default_value_t = 0.5)]
    pub vsads_count: f64,

    /// Weight occurrences in long clauses by the inverse of their undecided size
    #[arg(long)]
    pub weighted_counts: bool,

    /// Activity decay factor
    #[arg(long, default_value_t = 0.95)]
    pub activity_decay: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branching: Branching::default(),
            traversal: Traversal::default(),
            implication_engine: ImplicationEngine::default(),
            implied_binaries: false,
            width_bound: 64,
            decomposer: None,
            decomposer_timeout: 10,
            probe_budget: 64,
            budget_growth: 2.0,
            restart_interval: 32,
            restart_growth: 1.5,
            max_learnts: 2000,
            keep_learnt_len: 3,
            vsads_activity: 1.0,
            vsads_count: 0.5,
            weighted_counts: false,
            activity_decay: 0.95,
        }
    }
}

impl Config {
    /// Rejects option combinations the solver cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn out_of_range(
            option: &'static str,
            requirement: &'static str,
            value: impl ToString,
        ) -> ConfigError {
            ConfigError::OutOfRange { option, requirement, value: value.to_string() }
        }

        if self.width_bound == 0 {
            return Err(out_of_range("width-bound", "positive", self.width_bound));
        }
        if self.probe_budget == 0 {
            return Err(out_of_range("probe-budget", "positive", self.probe_budget));
        }
        if self.restart_interval == 0 {
            return Err(out_of_range("restart-interval", "positive", self.restart_interval));
        }
        if !(self.budget_growth > 1.0) {
            return Err(out_of_range("budget-growth", "greater than 1", self.budget_growth));
        }
        if !(self.restart_growth > 1.0) {
            return Err(out_of_range("restart-growth", "greater than 1", self.restart_growth));
        }
        if !(self.activity_decay > 0.0 && self.activity_decay < 1.0) {
            return Err(out_of_range("activity-decay", "in (0, 1)", self.activity_decay));
        }
        if self.max_learnts == 0 {
            return Err(out_of_range("max-learnts", "positive", self.max_learnts));
        }
        if let Some(path) = &self.decomposer {
            if !path.exists() {
                return Err(ConfigError::MissingDecomposer { path: path.clone() });
            }
        }
        Ok(())
    }

    pub(crate) fn decomposer_timeout(&self) -> Duration {
        Duration::from_secs(self.decomposer_timeout)
    }
}
