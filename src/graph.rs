//! The primal graph of a component and the static variable order derived
//! from its tree decomposition.

use crate::{
    component::Component,
    config::Traversal,
    datastructure::VarVec,
    literal::{Lit, Var},
    solver::Solver,
    tool::ToolError,
};
use tracing::{info, warn};

pub mod decomposition;
pub mod external;
pub mod order;

use self::{decomposition::min_fill, external::ExternalDecomposer, order::VarOrder};

/// Variables are vertices, two variables are adjacent if they occur together
/// in an active clause.
#[derive(Debug, Clone, Default)]
pub struct PrimalGraph {
    vertices: Vec<Var>,
    adjacency: VarVec<Vec<Var>>,
}

impl PrimalGraph {
    /// Builds a graph from an explicit edge list.
    pub fn from_edges(vertices: &[Var], edges: &[(Var, Var)]) -> Self {
        let mut vertices = vertices.to_vec();
        vertices.sort_unstable();
        vertices.dedup();
        let var_count = vertices.last().map_or(0, |var| var.index() + 1);
        let mut adjacency: VarVec<Vec<Var>> = VarVec::with_var_count(var_count);
        for &(a, b) in edges {
            if a != b {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        for &var in &vertices {
            adjacency[var].sort_unstable();
            adjacency[var].dedup();
        }
        Self { vertices, adjacency }
    }

    /// The vertices in ascending order.
    pub fn vertices(&self) -> &[Var] {
        &self.vertices
    }

    pub fn neighbours(&self, var: Var) -> &[Var] {
        self.adjacency.get(var).map_or(&[], Vec::as_slice)
    }

    pub fn edge_count(&self) -> usize {
        self.vertices.iter().map(|&var| self.neighbours(var).len()).sum::<usize>() / 2
    }

    /// Size of the variable range the graph was built over.
    pub fn var_count(&self) -> usize {
        self.adjacency.var_count()
    }
}

impl Solver {
    /// The primal graph over the undecided variables and active clauses of
    /// `component`.
    ///
    /// [`Traversal::Uniform`] sorts the adjacency lists, both strategies
    /// yield the same neighbour sets.
    pub fn primal_graph(&mut self, component: &Component, traversal: Traversal) -> PrimalGraph {
        let vertices: Vec<Var> = component
            .vars()
            .iter()
            .copied()
            .filter(|&var| self.assignment[var].is_none())
            .collect();
        let mut is_vertex = VarVec::<bool>::with_var_count(self.var_count);
        vertices.iter().for_each(|&var| is_vertex[var] = true);

        let mut adjacency: VarVec<Vec<Var>> = VarVec::with_var_count(self.var_count);
        let mut marks = std::mem::take(&mut self.marks);
        for &var in &vertices {
            marks.clear();
            marks.mark(var);
            let mut neighbours = Vec::new();
            let mut add = |other: Var, neighbours: &mut Vec<Var>| {
                if is_vertex[other] && marks.mark(other) {
                    neighbours.push(other);
                }
            };
            for lit in [var.positive(), var.negative()] {
                for &other in self.clauses.binary.partners(lit) {
                    add(other.var(), &mut neighbours);
                }
            }
            let active = |clause_id| {
                component.contains_clause(clause_id) && !self.is_satisfied(clause_id)
            };
            match traversal {
                Traversal::Uniform => {
                    for &clause_id in self.occurrences.of_var(var) {
                        if active(clause_id) {
                            for &lit in self.clauses[clause_id].lits() {
                                add(lit.var(), &mut neighbours);
                            }
                        }
                    }
                    neighbours.sort_unstable();
                }
                Traversal::ArityClassed => {
                    for lit in [var.positive(), var.negative()] {
                        for &clause_id in self.occurrences.ternary(lit) {
                            if active(clause_id) {
                                let &[a, b, c] = self.clauses[clause_id].lits() else {
                                    unreachable!("ternary occurrence of a longer clause")
                                };
                                add(a.var(), &mut neighbours);
                                add(b.var(), &mut neighbours);
                                add(c.var(), &mut neighbours);
                            }
                        }
                        for &clause_id in self.occurrences.quaternary(lit) {
                            if active(clause_id) {
                                let &[a, b, c, d] = self.clauses[clause_id].lits() else {
                                    unreachable!(
                                        "quaternary occurrence of a clause with another arity"
                                    )
                                };
                                add(a.var(), &mut neighbours);
                                add(b.var(), &mut neighbours);
                                add(c.var(), &mut neighbours);
                                add(d.var(), &mut neighbours);
                            }
                        }
                        for &clause_id in self.occurrences.wide(lit) {
                            if active(clause_id) {
                                for &other in self.clauses[clause_id].lits() {
                                    add(other.var(), &mut neighbours);
                                }
                            }
                        }
                    }
                }
            }
            adjacency[var] = neighbours;
        }
        self.marks = marks;
        PrimalGraph { vertices, adjacency }
    }

    /// Per variable the product of its two polarity scores, a polarity
    /// scores its binary degree plus `1 / |C|` for every active long clause.
    pub(crate) fn decomposition_weights(&self, component: &Component) -> VarVec<f64> {
        let score = |lit: Lit| -> f64 {
            let binary = self
                .clauses
                .binary
                .partners(lit)
                .iter()
                .filter(|other| self.assignment[other.var()].is_none())
                .count();
            let long: f64 = self
                .occurrences
                .of_lit(lit)
                .filter(|&id| component.contains_clause(id) && !self.is_satisfied(id))
                .map(|id| {
                    #[allow(clippy::cast_precision_loss)]
                    let len = self.clauses[id].len() as f64;
                    1.0 / len
                })
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let binary = binary as f64;
            binary + long
        };
        let mut weights = VarVec::with_var_count(self.var_count);
        for &var in component.vars() {
            weights[var] = score(var.positive()) * score(var.negative());
        }
        weights
    }

    /// Computes a static branching order from a tree decomposition of the
    /// component and installs it.
    ///
    /// Falls back to the weight order if min-fill exceeds the width bound.
    ///
    /// # Errors
    ///
    /// Failures of the external decomposer are returned, never retried.
    pub fn compute_var_order(&mut self, component: &Component) -> Result<&VarOrder, ToolError> {
        let graph = self.primal_graph(component, self.config.traversal);
        let weights = self.decomposition_weights(component);
        let elimination = match &self.config.decomposer {
            Some(program) => {
                let decomposer =
                    ExternalDecomposer::new(program.clone(), self.config.decomposer_timeout());
                let decomposition = decomposer.decompose(&graph)?;
                info!("external decomposition of width {}", decomposition.width());
                decomposition.elimination_order()
            }
            None => match min_fill(&graph, self.config.width_bound) {
                Some(decomposition) => {
                    info!(
                        "min-fill decomposition of width {} for {} vertices and {} edges",
                        decomposition.width(),
                        graph.vertices().len(),
                        graph.edge_count()
                    );
                    decomposition.elimination_order()
                }
                None => {
                    warn!(
                        "decomposition abandoned at width bound {}, ordering by weight",
                        self.config.width_bound
                    );
                    self.stats.components.abandoned_decompositions += 1;
                    Vec::new()
                }
            },
        };
        self.stats.components.var_orders += 1;
        self.order = VarOrder::from_elimination(&elimination, &weights, self.var_count);
        Ok(&self.order)
    }

    pub fn var_order(&self) -> &VarOrder {
        &self.order
    }
}
