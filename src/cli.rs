use crate::{config::Config, counter::CounterKind};
use clap::Parser;
use miette::{Diagnostic, Result};
use std::{io::Read, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ArgError {
    #[error("Path {} does not exist", path.display())]
    FileDoesNotExist { path: PathBuf },

    #[error("{} is not a file", path.display())]
    NotAFile { path: PathBuf },

    #[error("Cannot read file {}: {}", path.display(), err)]
    CannotReadFile { path: PathBuf, err: std::io::Error },

    #[error("Cannot read from stdin: {}", err)]
    CannotReadStdIn { err: std::io::Error },
}

/// Decomposes a CNF formula and computes its implied literals.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// DIMACS file, read from stdin if missing
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub config: Config,

    /// Replace equivalent literals by a representative before solving
    #[arg(long)]
    pub substitute: bool,

    /// Print the branching order derived from a tree decomposition
    #[arg(long)]
    pub order: bool,

    /// Print the connected components of the formula
    #[arg(long)]
    pub components: bool,

    /// Print the literals implied by the formula, restricted to `c p show`
    /// variables if there are any
    #[arg(long)]
    pub backbone: bool,

    /// Count models with an external model counter
    #[arg(long, value_enum)]
    pub counter: Option<CounterKind>,

    /// Path of the model counter, defaults to its usual program name
    #[arg(long, requires = "counter")]
    pub counter_program: Option<PathBuf>,

    /// Wall-clock limit for the model counter, in seconds
    #[arg(long, default_value_t = 60)]
    pub counter_timeout: u64,
}

impl Cli {
    pub fn counter_timeout(&self) -> Duration {
        Duration::from_secs(self.counter_timeout)
    }

    /// The input formula, from the given file or from stdin.
    ///
    /// # Errors
    ///
    /// The file does not exist or cannot be read.
    pub fn content(&self) -> Result<Vec<u8>> {
        let Some(file_path) = &self.input else {
            tracing::info!("No input file provided, read from stdin");
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .map_err(|err| ArgError::CannotReadStdIn { err })?;
            return Ok(buffer);
        };
        if !file_path.exists() {
            return Err(ArgError::FileDoesNotExist { path: file_path.clone() }.into());
        }
        if !file_path.is_file() {
            return Err(ArgError::NotAFile { path: file_path.clone() }.into());
        }
        let contents = std::fs::read(file_path)
            .map_err(|err| ArgError::CannotReadFile { path: file_path.clone(), err })?;
        Ok(contents)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Branching, Traversal};

    #[test]
    fn flattened_config() {
        let cli = Cli::try_parse_from([
            "cardinal",
            "--branching",
            "dlcp",
            "--traversal",
            "arity-classed",
            "--probe-budget",
            "8",
            "--backbone",
            "formula.cnf",
        ])
        .unwrap();
        assert_eq!(cli.config.branching, Branching::Dlcp);
        assert_eq!(cli.config.traversal, Traversal::ArityClassed);
        assert_eq!(cli.config.probe_budget, 8);
        assert!(cli.backbone);
        assert_eq!(cli.input, Some(PathBuf::from("formula.cnf")));
    }

    #[test]
    fn defaults_match_config() {
        let cli = Cli::try_parse_from(["cardinal"]).unwrap();
        let defaults = Config::default();
        assert_eq!(cli.config.width_bound, defaults.width_bound);
        assert_eq!(cli.config.max_learnts, defaults.max_learnts);
        assert_eq!(cli.counter, None);
    }

    #[test]
    fn counter_program_needs_counter() {
        assert!(Cli::try_parse_from(["cardinal", "--counter-program", "d4"]).is_err());
        let cli = Cli::try_parse_from(["cardinal", "--counter", "sharp-sat"]).unwrap();
        assert_eq!(cli.counter, Some(CounterKind::SharpSat));
    }

    #[test]
    fn missing_file() {
        let cli = Cli::try_parse_from(["cardinal", "/nonexistent/formula.cnf"]).unwrap();
        let err = cli.content().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
