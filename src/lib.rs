#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_panics_doc, clippy::module_name_repetitions)]
//#![warn(clippy::cargo)]

use std::{
    fmt::Display,
    process::{ExitCode, Termination},
};

#[macro_use]
pub mod cnf;
mod clause;
pub mod cli;
pub mod component;
pub mod config;
pub mod counter;
mod datastructure;
pub mod dimacs;
pub mod graph;
pub mod literal;
pub mod model;
mod occurrence;
mod sat;
pub mod solver;
pub mod tool;

// Re-export
pub use clause::alloc::ClauseId;
pub use config::Config;
pub use solver::Solver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SolverResult {
    Satisfiable = 10,
    Unsatisfiable = 20,
    Unknown = 30,
}

impl Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Satisfiable => write!(f, "satisfiable"),
            SolverResult::Unsatisfiable => write!(f, "unsatisfiable"),
            SolverResult::Unknown => write!(f, "unknown"),
        }
    }
}

impl Termination for SolverResult {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}
