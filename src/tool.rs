//! Running external engines as subprocesses.

use crate::graph::decomposition::InvalidDecomposition;
use miette::Diagnostic;
use std::{
    path::{Path, PathBuf},
    process::{Child, ExitStatus},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

/// Failure of an external engine. These are never retried.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("failed to run `{}`", .program.display())]
    #[diagnostic(help("check that the program exists and is executable"))]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{}` did not finish within {timeout:?}", .program.display())]
    Timeout { program: PathBuf, timeout: Duration },
    #[error("`{}` exited with {status}", .program.display())]
    Failed { program: PathBuf, status: ExitStatus },
    #[error("output of `{}` contains no line starting with `{marker}`", .program.display())]
    MissingMarker { program: PathBuf, marker: String },
    #[error("malformed output of `{}` in line {line}: {reason}", .program.display())]
    Malformed { program: PathBuf, line: usize, reason: String },
    #[error("`{}` cannot count weighted formulas", .program.display())]
    #[diagnostic(help("use a weighted model counter such as ADDMC"))]
    WeightsUnsupported { program: PathBuf },
    #[error("SAT engine failed: {0}")]
    Engine(String),
    #[error("invalid tree decomposition")]
    InvalidDecomposition(#[from] InvalidDecomposition),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Waits for `child` at most `timeout`, the child is killed afterwards.
///
/// # Errors
///
/// [`ToolError::Timeout`] if the child did not exit in time and
/// [`ToolError::Failed`] if it exited with a non-zero status.
pub(crate) fn wait_with_timeout(
    child: &mut Child,
    program: &Path,
    timeout: Duration,
) -> Result<(), ToolError> {
    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            debug!("killing `{}` after {timeout:?}", program.display());
            // the child may have exited in between
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolError::Timeout { program: program.to_path_buf(), timeout });
        }
    };
    if !status.success() {
        return Err(ToolError::Failed { program: program.to_path_buf(), status });
    }
    Ok(())
}
