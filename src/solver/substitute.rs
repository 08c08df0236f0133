//! Equivalent literal substitution.
//!
//! Two original binary clauses `(!a ∨ b)` and `(a ∨ !b)` make `a` and `b`
//! equivalent. Every class of equivalent literals is replaced by the literal
//! with the smallest variable, the other variables no longer occur in any
//! clause.

use super::{Reason, Solver};
use crate::{
    clause::{db::ClauseStore, normalize},
    graph::order::VarOrder,
    literal::{Lit, Var},
    model::Model,
};
use tracing::{debug, info};

/// The variables removed by [`Solver::substitute_equivalences`] together with
/// the literal each one is equivalent to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    replaced: Vec<(Var, Lit)>,
}

impl Substitution {
    pub fn len(&self) -> usize {
        self.replaced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replaced.is_empty()
    }

    pub fn eliminated(&self) -> impl Iterator<Item = Var> + '_ {
        self.replaced.iter().map(|&(var, _)| var)
    }

    /// The literal that `var` is equivalent to, if `var` was eliminated.
    pub fn representative(&self, var: Var) -> Option<Lit> {
        self.replaced.iter().find(|&&(eliminated, _)| eliminated == var).map(|&(_, lit)| lit)
    }

    /// Assigns the eliminated variables of `model` from their
    /// representatives. Representatives without a value are skipped.
    pub fn extend_model(&self, model: &mut Model) {
        for &(var, representative) in &self.replaced {
            if let Some(value) = model.value(representative.var()) {
                model.assign(var.lit(value == representative.is_positive()));
            }
        }
    }
}

/// Union-find over variables where every variable points to a literal it is
/// equivalent to.
struct Equivalences {
    parent: Vec<Lit>,
}

impl Equivalences {
    fn new(var_count: usize) -> Self {
        Self { parent: Var::range(var_count).map(Var::positive).collect() }
    }

    /// The representative of `lit`.
    fn find(&mut self, lit: Lit) -> Lit {
        let var = lit.var();
        let mut root = var.positive();
        while self.parent[root.var().index()].var() != root.var() {
            let next = self.parent[root.var().index()];
            root = if root.is_positive() { next } else { !next };
        }
        // path compression, the parent of `var` is its representative
        let mut current = var.positive();
        let mut relative = root;
        while current.var() != root.var() {
            let next = self.parent[current.var().index()];
            self.parent[current.var().index()] = relative;
            // `next` is equivalent to `current`, so `relative` follows its sign
            relative = if next.is_positive() { relative } else { !relative };
            current = next.var().positive();
        }
        if lit.is_positive() {
            root
        } else {
            !root
        }
    }

    /// Merges the classes of `a` and `b`, returns `false` if `a` was already
    /// equivalent to `!b`.
    fn union(&mut self, a: Lit, b: Lit) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return true;
        }
        if ra == !rb {
            return false;
        }
        let (keep, other) = if ra.var() < rb.var() { (ra, rb) } else { (rb, ra) };
        // other ≡ keep, stated for the positive literal of `other`
        self.parent[other.var().index()] =
            if other.is_positive() { keep } else { !keep };
        true
    }
}

impl Solver {
    /// Replaces equivalent literals by a representative.
    ///
    /// Only allowed on decision level 0 and before components are computed,
    /// as clause IDs change. Learnt clauses are rewritten as well.
    pub fn substitute_equivalences(&mut self) -> Substitution {
        assert!(self.decision_level().is_root(), "substitution happens at the root level");
        if self.is_conflicted() {
            return Substitution::default();
        }
        let mut equivalences = Equivalences::new(self.var_count);
        for var in Var::range(self.var_count) {
            if self.assignment[var].is_some() {
                continue;
            }
            let a = var.positive();
            for &b in self.clauses.binary.partners(!a) {
                // (!a ∨ b) together with (a ∨ !b)
                if self.assignment[b.var()].is_some()
                    || !self.clauses.binary.partners(a).contains(&!b)
                {
                    continue;
                }
                if !equivalences.union(a, b) {
                    info!("{a} is equivalent to its negation, instance is unsatisfiable");
                    self.set_conflicted();
                    return Substitution::default();
                }
            }
        }

        let mut substitution = Substitution::default();
        for var in Var::range(self.var_count) {
            let representative = equivalences.find(var.positive());
            if representative.var() != var {
                substitution.replaced.push((var, representative));
            }
        }
        if substitution.is_empty() {
            return substitution;
        }
        debug!("substituting {} equivalent variables", substitution.len());

        for &(var, representative) in &substitution.replaced {
            if self.projection[var] {
                self.projection[representative.var()] = true;
                self.projection[var] = false;
            }
        }

        let clauses = self.clauses.export();
        self.clauses = ClauseStore::default();
        self.clauses.set_var_count(self.var_count);
        self.watches.rebuild(&self.clauses);
        self.occurrences.rebuild(&self.clauses);
        // root facts keep their values, their reasons are gone
        for &lit in self.trail.lits() {
            self.reasons[lit.var()] = Reason::Decision;
        }
        for (lits, learnt) in clauses {
            let mut lits: Vec<Lit> = lits.into_iter().map(|lit| equivalences.find(lit)).collect();
            if !normalize(&mut lits) {
                continue;
            }
            self.insert_clause(lits, learnt);
        }

        self.order = VarOrder::default();
        self.order.set_var_count(self.var_count);
        self.activity.reset();
        if self.propagate_from(0).is_some() {
            self.set_conflicted();
        }
        substitution
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::Config, model::ModelPool, SolverResult};

    fn lit(dimacs: i32) -> Lit {
        Lit::from_dimacs(dimacs)
    }

    #[test]
    fn equivalence_chain() {
        let mut equivalences = Equivalences::new(4);
        assert!(equivalences.union(lit(3), lit(-2)));
        assert!(equivalences.union(lit(4), lit(3)));
        assert!(equivalences.union(lit(1), lit(-4)));
        assert_eq!(equivalences.find(lit(4)), lit(-1));
        assert_eq!(equivalences.find(lit(-4)), lit(1));
        assert_eq!(equivalences.find(lit(2)), lit(1));
        assert_eq!(equivalences.find(lit(-3)), lit(1));
        assert!(!equivalences.union(lit(3), lit(1)));
    }

    #[test]
    fn substitutes_representatives() {
        let cnf = cnf_formula![
            -1 2;
            1 -2;
            2 -3;
            -2 3;
            3 4 5;
            -1 -4 6;
        ];
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let substitution = solver.substitute_equivalences();
        let mut eliminated: Vec<Var> = substitution.eliminated().collect();
        eliminated.sort_unstable();
        assert_eq!(eliminated, vec![Var::from_dimacs(2), Var::from_dimacs(3)]);
        assert_eq!(substitution.representative(Var::from_dimacs(3)), Some(lit(1)));
        assert_eq!(substitution.representative(Var::from_dimacs(1)), None);

        let exported: Vec<Vec<Lit>> =
            solver.clauses.export().into_iter().map(|(lits, _)| lits).collect();
        assert_eq!(exported.len(), 2);
        assert!(exported
            .iter()
            .flatten()
            .all(|lit| lit.var() != Var::from_dimacs(2) && lit.var() != Var::from_dimacs(3)));
        assert_eq!(solver.occurrences.of_var(Var::from_dimacs(1)).len(), 2);

        let component = solver.init_component();
        assert!(!component.contains(Var::from_dimacs(3)));
        assert_eq!(solver.solve(), SolverResult::Satisfiable);
    }

    #[test]
    fn extends_models() {
        let cnf = cnf_formula![
            -1 -2;
            1 2;
            -2 3 4;
        ];
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let substitution = solver.substitute_equivalences();
        assert_eq!(substitution.representative(Var::from_dimacs(2)), Some(lit(-1)));

        let mut pool = ModelPool::default();
        let mut model = pool.allocate(4);
        model.assign(lit(1));
        substitution.extend_model(&mut model);
        assert_eq!(model.value(Var::from_dimacs(2)), Some(false));
    }

    #[test]
    fn collapsing_clause_becomes_root_fact() {
        let cnf = cnf_formula![
            -1 2;
            1 -2;
            1 2 3;
            -3 1 2;
        ];
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let substitution = solver.substitute_equivalences();
        assert_eq!(substitution.len(), 1);
        // (1 ∨ 1 ∨ 3) and (1 ∨ 1 ∨ !3) leave the binary clauses (1 3), (1 -3)
        assert_eq!(solver.solve(), SolverResult::Satisfiable);
        assert!(!solver.is_conflicted());
    }

    #[test]
    fn contradicting_equivalence() {
        let cnf = cnf_formula![
            -1 2;
            1 -2;
            -2 -1;
            2 1;
        ];
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        assert!(solver.substitute_equivalences().is_empty());
        assert!(solver.is_conflicted());
    }
}
