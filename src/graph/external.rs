//! Tree decompositions computed by an external program speaking the PACE
//! 2017 formats: the graph (`.gr`) on stdin, the decomposition (`.td`) on
//! stdout.

use super::{decomposition::TreeDecomposition, PrimalGraph};
use crate::{
    literal::Var,
    tool::{wait_with_timeout, ToolError},
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExternalDecomposer {
    program: PathBuf,
    timeout: Duration,
}

impl ExternalDecomposer {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    /// Runs the decomposer on `graph` and verifies its answer.
    ///
    /// # Errors
    ///
    /// Spawn failures, timeouts, non-zero exit codes, malformed output and
    /// invalid decompositions.
    pub fn decompose(&self, graph: &PrimalGraph) -> Result<TreeDecomposition, ToolError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("graph.gr");
        let output = dir.path().join("graph.td");
        {
            let mut writer = BufWriter::new(File::create(&input)?);
            write_graph(graph, &mut writer)?;
            writer.flush()?;
        }

        debug!("running `{}` on {} vertices", self.program.display(), graph.vertices().len());
        let mut child = Command::new(&self.program)
            .stdin(File::open(&input)?)
            .stdout(File::create(&output)?)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ToolError::Spawn { program: self.program.clone(), source })?;
        wait_with_timeout(&mut child, &self.program, self.timeout)?;

        let text = std::fs::read_to_string(&output)?;
        let decomposition = parse_decomposition(&text, graph.vertices(), &self.program)?;
        decomposition.verify(graph)?;
        Ok(decomposition)
    }
}

/// Writes `graph` in PACE `.gr` format, vertex `i` is the `i`-th vertex of
/// the graph counting from 1.
pub(crate) fn write_graph(graph: &PrimalGraph, writer: &mut impl Write) -> std::io::Result<()> {
    let vertices = graph.vertices();
    writeln!(writer, "p tw {} {}", vertices.len(), graph.edge_count())?;
    for (idx, &var) in vertices.iter().enumerate() {
        for &other in graph.neighbours(var) {
            if var < other {
                let other_idx = vertices.binary_search(&other).expect("neighbours are vertices");
                writeln!(writer, "{} {}", idx + 1, other_idx + 1)?;
            }
        }
    }
    Ok(())
}

/// Parses a PACE `.td` file over the vertices given in `.gr` order.
pub(crate) fn parse_decomposition(
    text: &str,
    vertices: &[Var],
    program: &Path,
) -> Result<TreeDecomposition, ToolError> {
    let malformed = |line: usize, reason: String| ToolError::Malformed {
        program: program.to_path_buf(),
        line,
        reason,
    };
    let number = |token: &str, line: usize| -> Result<usize, ToolError> {
        token.parse().map_err(|_| malformed(line, format!("expected a number, found `{token}`")))
    };

    let mut bags: Option<Vec<Vec<Var>>> = None;
    let mut edges = Vec::new();
    for (idx, content) in text.lines().enumerate() {
        let line = idx + 1;
        let mut tokens = content.split_whitespace();
        match tokens.next() {
            None | Some("c") => {}
            Some("s") => {
                if tokens.next() != Some("td") {
                    return Err(malformed(line, "expected `s td`".to_string()));
                }
                let count = number(tokens.next().unwrap_or_default(), line)?;
                bags = Some(vec![Vec::new(); count]);
            }
            Some("b") => {
                let bags = bags
                    .as_mut()
                    .ok_or_else(|| malformed(line, "bag before the solution line".to_string()))?;
                let bag = number(tokens.next().unwrap_or_default(), line)?;
                if bag == 0 || bag > bags.len() {
                    return Err(malformed(line, format!("unknown bag {bag}")));
                }
                for token in tokens {
                    let vertex = number(token, line)?;
                    let var = vertex
                        .checked_sub(1)
                        .and_then(|idx| vertices.get(idx))
                        .ok_or_else(|| malformed(line, format!("unknown vertex {vertex}")))?;
                    bags[bag - 1].push(*var);
                }
            }
            Some(first) => {
                let a = number(first, line)?;
                let b = number(tokens.next().unwrap_or_default(), line)?;
                if a == 0 || b == 0 {
                    return Err(malformed(line, "bags are numbered from 1".to_string()));
                }
                edges.push((a - 1, b - 1));
            }
        }
    }
    let bags = bags.ok_or_else(|| ToolError::MissingMarker {
        program: program.to_path_buf(),
        marker: "s td".to_string(),
    })?;
    Ok(TreeDecomposition::from_bags(bags, edges))
}

#[cfg(test)]
mod test {
    use super::*;

    fn var(dimacs: i32) -> Var {
        Var::from_dimacs(dimacs)
    }

    fn square() -> PrimalGraph {
        let vertices = [var(2), var(4), var(6), var(8)];
        PrimalGraph::from_edges(
            &vertices,
            &[(var(2), var(4)), (var(4), var(6)), (var(6), var(8)), (var(8), var(2))],
        )
    }

    #[test]
    fn write_pace_graph() {
        let mut out = Vec::new();
        write_graph(&square(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "p tw 4 4\n1 2\n1 4\n2 3\n3 4\n");
    }

    #[test]
    fn parse_pace_decomposition() {
        let text = "c produced by hand\ns td 2 3 4\nb 1 1 2 4\nb 2 2 3 4\n1 2\n";
        let graph = square();
        let decomposition = parse_decomposition(text, graph.vertices(), Path::new("td")).unwrap();
        assert_eq!(decomposition.width(), 2);
        assert_eq!(decomposition.bags()[1], vec![var(4), var(6), var(8)]);
        assert_eq!(decomposition.edges(), &[(0, 1)]);
        assert_eq!(decomposition.verify(&graph), Ok(()));
        assert_eq!(decomposition.elimination_order().len(), 4);
    }

    #[test]
    fn malformed_decompositions() {
        let vertices = square().vertices().to_vec();
        let parse = |text: &str| parse_decomposition(text, &vertices, Path::new("td"));
        assert!(matches!(parse("b 1 1 2\n"), Err(ToolError::Malformed { line: 1, .. })));
        let unknown_vertex = parse("s td 1 2 4\nb 1 1 9\n");
        assert!(matches!(unknown_vertex, Err(ToolError::Malformed { line: 2, .. })));
        assert!(matches!(parse("c nothing\n"), Err(ToolError::MissingMarker { .. })));
        assert!(matches!(parse("s td 1 2 4\nx y\n"), Err(ToolError::Malformed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn missing_program() {
        let program = PathBuf::from("/nonexistent/decomposer");
        let decomposer = ExternalDecomposer::new(program, Duration::from_secs(1));
        assert!(matches!(decomposer.decompose(&square()), Err(ToolError::Spawn { .. })));
    }
}
