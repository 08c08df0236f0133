//! External model counters, used as a reference for the counts this crate
//! prepares.
//!
//! The formula is written to a temporary DIMACS file, the counter runs on it
//! with a timeout and the count is read from the counter's result line.

use crate::{
    cnf::Cnf,
    tool::{wait_with_timeout, ToolError},
};
use clap::ValueEnum;
use num_bigint::BigUint;
use std::{
    fmt::Display,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, info};

/// Supported counters, they differ in invocation and output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CounterKind {
    /// `# solutions` followed by the count on the next line
    SharpSat,
    /// `s <count>`
    D4,
    /// `s mc <count>`
    Ganak,
    /// `s wmc <weighted count>`, the only weighted counter
    Addmc,
    /// `Counting...<count> models`
    C2d,
}

impl CounterKind {
    /// The program name used if no path is given.
    pub fn default_program(self) -> &'static str {
        match self {
            CounterKind::SharpSat => "sharpSAT",
            CounterKind::D4 => "d4",
            CounterKind::Ganak => "ganak",
            CounterKind::Addmc => "addmc",
            CounterKind::C2d => "c2d",
        }
    }

    fn args(self, input: &Path) -> Vec<String> {
        let input = input.display().to_string();
        match self {
            CounterKind::SharpSat | CounterKind::Ganak => vec![input],
            CounterKind::D4 => vec![input, "-mc".to_string()],
            CounterKind::Addmc => vec!["--cf".to_string(), input],
            CounterKind::C2d => vec!["-in".to_string(), input, "-count".to_string()],
        }
    }

    fn marker(self) -> &'static str {
        match self {
            CounterKind::SharpSat => "# solutions",
            CounterKind::D4 => "s ",
            CounterKind::Ganak => "s mc",
            CounterKind::Addmc => "s wmc",
            CounterKind::C2d => "Counting...",
        }
    }

    fn is_weighted(self) -> bool {
        self == CounterKind::Addmc
    }
}

/// The number of models, or their total weight.
#[derive(Debug, Clone, PartialEq)]
pub enum Count {
    Exact(BigUint),
    Weighted(f64),
}

impl Display for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Count::Exact(count) => write!(f, "{count}"),
            Count::Weighted(weight) => write!(f, "{weight}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelCounter {
    kind: CounterKind,
    program: PathBuf,
    timeout: Duration,
}

impl ModelCounter {
    pub fn new(kind: CounterKind, program: Option<PathBuf>, timeout: Duration) -> Self {
        let program = program.unwrap_or_else(|| PathBuf::from(kind.default_program()));
        Self { kind, program, timeout }
    }

    /// Counts the models of `cnf`.
    ///
    /// # Errors
    ///
    /// Weighted formulas given to an unweighted counter, spawn failures,
    /// timeouts, non-zero exit codes and output without a result line.
    pub fn count(&self, cnf: &Cnf) -> Result<Count, ToolError> {
        if cnf.is_weighted() && !self.kind.is_weighted() {
            return Err(ToolError::WeightsUnsupported { program: self.program.clone() });
        }
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("formula.cnf");
        let output = dir.path().join("counter.out");
        {
            let mut writer = BufWriter::new(File::create(&input)?);
            write!(writer, "{cnf}")?;
            writer.flush()?;
        }

        debug!(
            "running `{}` on {} variables and {} clauses",
            self.program.display(),
            cnf.num_variables(),
            cnf.num_clauses()
        );
        let mut child = Command::new(&self.program)
            .args(self.kind.args(&input))
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(File::create(&output)?)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ToolError::Spawn { program: self.program.clone(), source })?;
        wait_with_timeout(&mut child, &self.program, self.timeout)?;

        let text = std::fs::read_to_string(&output)?;
        let count = parse_count(self.kind, &text, &self.program)?;
        info!("`{}` counted {count}", self.program.display());
        Ok(count)
    }
}

/// Finds the result line of `kind` in `text`.
pub(crate) fn parse_count(
    kind: CounterKind,
    text: &str,
    program: &Path,
) -> Result<Count, ToolError> {
    let marker = kind.marker();
    let mut lines = text.lines().enumerate();
    let Some((idx, line)) = lines.find(|(_, line)| line.starts_with(marker)) else {
        return Err(ToolError::MissingMarker {
            program: program.to_path_buf(),
            marker: marker.trim_end().to_string(),
        });
    };
    let (line, value) = match kind {
        CounterKind::SharpSat => {
            let (next, value) = lines.next().ok_or_else(|| ToolError::Malformed {
                program: program.to_path_buf(),
                line: idx + 1,
                reason: "count missing after the marker".to_string(),
            })?;
            (next + 1, value.trim())
        }
        CounterKind::C2d => {
            let rest = &line[marker.len()..];
            (idx + 1, rest.split_whitespace().next().unwrap_or_default())
        }
        CounterKind::D4 | CounterKind::Ganak | CounterKind::Addmc => {
            (idx + 1, line[marker.len()..].trim())
        }
    };
    let malformed = |reason: String| ToolError::Malformed {
        program: program.to_path_buf(),
        line,
        reason,
    };
    if kind.is_weighted() {
        let weight = value
            .parse::<f64>()
            .map_err(|_| malformed(format!("expected a weighted count, found `{value}`")))?;
        Ok(Count::Weighted(weight))
    } else {
        let count = BigUint::from_str(value)
            .map_err(|_| malformed(format!("expected a model count, found `{value}`")))?;
        Ok(Count::Exact(count))
    }
}
