//! Branching heuristics and phase selection

use super::Solver;
use crate::{
    component::Component,
    config::{Branching, Traversal},
    graph::decomposition::min_fill,
    literal::{Lit, Var},
};
use ordered_float::OrderedFloat;
use tracing::trace;

/// Live occurrences of both literals of a variable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Counts {
    pub(crate) positive: f64,
    pub(crate) negative: f64,
}

impl Counts {
    fn sum(self) -> f64 {
        self.positive + self.negative
    }

    fn product(self) -> f64 {
        self.positive * self.negative
    }

    /// The more frequent polarity, positive on ties.
    pub(crate) fn phase(self, var: Var) -> Lit {
        var.lit(self.positive >= self.negative)
    }
}

impl Solver {
    /// Picks the next decision among the open variables of `component`.
    ///
    /// Returns `None` if every variable of the component is assigned.
    pub(crate) fn next_decision(&mut self, component: &Component) -> Option<Lit> {
        let var = match self.config.branching {
            Branching::Static => self.open_vars(component).min_by_key(|&var| self.order.rank(var)),
            Branching::Vsads => {
                let (activity, count) = (self.config.vsads_activity, self.config.vsads_count);
                self.best_open_var(component, |solver, var| {
                    let score = *solver.activity.var_score(var);
                    OrderedFloat(activity * score + count * solver.counts(var).sum())
                })
            }
            Branching::Dlcs => {
                self.best_open_var(component, |solver, var| OrderedFloat(solver.counts(var).sum()))
            }
            Branching::Dlcp => self.best_open_var(component, |solver, var| {
                let counts = solver.counts(var);
                // the sum breaks ties between equal products
                (OrderedFloat(counts.product()), OrderedFloat(counts.sum()))
            }),
            Branching::MinFill => self.min_fill_decision(component),
        }?;
        let decision = self.counts(var).phase(var);
        trace!("decide {decision} ({:?})", self.config.branching);
        Some(decision)
    }

    fn open_vars<'a>(&'a self, component: &'a Component) -> impl Iterator<Item = Var> + 'a {
        component.vars().iter().copied().filter(|&var| self.assignment[var].is_none())
    }

    /// The open variable with the highest score, the smallest one on ties.
    fn best_open_var<K, F>(&self, component: &Component, score: F) -> Option<Var>
    where
        K: Ord,
        F: Fn(&Self, Var) -> K,
    {
        let mut best: Option<(Var, K)> = None;
        for var in self.open_vars(component) {
            let value = score(self, var);
            if best.as_ref().map_or(true, |(_, best)| value > *best) {
                best = Some((var, value));
            }
        }
        best.map(|(var, _)| var)
    }

    /// Recomputes a min-fill elimination of the open part of the component
    /// and branches on the variable eliminated last.
    fn min_fill_decision(&mut self, component: &Component) -> Option<Var> {
        let open =
            Component::new(self.open_vars(component).collect(), component.clauses().to_vec());
        if open.is_empty() {
            return None;
        }
        let graph = self.primal_graph(&open, Traversal::ArityClassed);
        min_fill(&graph, usize::MAX)
            .and_then(|decomposition| decomposition.order().last().copied())
            .or_else(|| open.vars().first().copied())
    }

    /// Occurrences of both literals of `var` in clauses that are not
    /// satisfied.
    ///
    /// Long clauses count `2 / open size` if configured, so clauses close to
    /// becoming binary weigh more.
    pub(crate) fn counts(&self, var: Var) -> Counts {
        let count = |lit: Lit| -> f64 {
            let binary = self
                .clauses
                .binary
                .partners(lit)
                .iter()
                .filter(|&&other| !self.assignment.lit_is_true(other))
                .count();
            let long: f64 = self
                .occurrences
                .of_lit(lit)
                .filter(|&clause_id| !self.is_satisfied(clause_id))
                .map(|clause_id| {
                    if self.config.weighted_counts {
                        let open = self.clauses[clause_id]
                            .iter()
                            .filter(|l| self.assignment[l.var()].is_none())
                            .count();
                        // precision loss is irrelevant for clause sizes
                        #[allow(clippy::cast_precision_loss)]
                        let open = open.max(1) as f64;
                        2.0 / open
                    } else {
                        1.0
                    }
                })
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let binary = binary as f64;
            binary + long
        };
        Counts { positive: count(var.positive()), negative: count(var.negative()) }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        component::Component,
        config::{Branching, Config},
        literal::{Lit, Var},
        solver::Solver,
    };

    fn lit(dimacs: i32) -> Lit {
        Lit::from_dimacs(dimacs)
    }

    fn formula() -> crate::cnf::Cnf {
        cnf_formula![
            1 2;
            1 3;
            1 -4 5;
            -1 4;
            2 3 4;
        ]
    }

    #[test]
    fn phase_follows_counts() {
        let solver = Solver::from_cnf(&formula(), Config::default());
        let counts = solver.counts(Var::from_dimacs(1));
        assert_eq!(counts.positive, 3.0);
        assert_eq!(counts.negative, 1.0);
        assert_eq!(counts.phase(Var::from_dimacs(1)), lit(1));
    }

    #[test]
    fn weighted_counts() {
        let config = Config { weighted_counts: true, ..Config::default() };
        let solver = Solver::from_cnf(&formula(), config);
        let counts = solver.counts(Var::from_dimacs(5));
        assert!((counts.positive - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(counts.negative, 0.0);
    }

    #[test]
    fn every_strategy_picks_an_open_variable() {
        let strategies = [
            Branching::Static,
            Branching::Vsads,
            Branching::Dlcs,
            Branching::Dlcp,
            Branching::MinFill,
        ];
        for branching in strategies {
            let config = Config { branching, ..Config::default() };
            let mut solver = Solver::from_cnf(&formula(), config);
            let component = solver.init_component();
            assert_eq!(solver.decide(lit(1)), Ok(()));
            let decision = solver.next_decision(&component).unwrap();
            assert_eq!(solver.value(decision), None, "{branching:?}");
        }
    }

    #[test]
    fn dlcp_breaks_only_exact_ties_by_sum() {
        // 1 has product 2 * 2 = 4 and sum 4, 2 has product 1 * 5 = 5 and sum 6,
        // 3 has product 4 as well but sum 5
        let cnf = cnf_formula![
            1 7;
            1 8;
            -1 7;
            -1 8;
            -2 7;
            2 7;
            2 8;
            2 9;
            2 10;
            2 11;
            3 9;
            3 10;
            3 11;
            3 12;
            -3 9;
        ];
        let config = Config { branching: Branching::Dlcp, ..Config::default() };
        let mut solver = Solver::from_cnf(&cnf, config);
        let component = Component::new(vec![Var::from_dimacs(1), Var::from_dimacs(3)], Vec::new());
        assert_eq!(solver.next_decision(&component).map(Lit::var), Some(Var::from_dimacs(3)));
        let component = Component::new((1..=3).map(Var::from_dimacs).collect(), Vec::new());
        assert_eq!(solver.next_decision(&component).map(Lit::var), Some(Var::from_dimacs(2)));
    }

    #[test]
    fn dlcs_prefers_frequent_variables() {
        let config = Config { branching: Branching::Dlcs, ..Config::default() };
        let mut solver = Solver::from_cnf(&formula(), config);
        let component = solver.init_component();
        assert_eq!(solver.next_decision(&component), Some(lit(1)));
    }
}
