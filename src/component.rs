//! Components: independent parts of the formula under the current
//! assignment, and their discovery by flood fill.

use crate::{
    clause::alloc::ClauseId,
    config::Traversal,
    datastructure::VarVec,
    literal::{Lit, Var},
    solver::Solver,
};
use tracing::debug;

/// A set of variables together with the original long clauses over them.
///
/// Original binary clauses with both variables in the component belong to it
/// implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    vars: Vec<Var>,
    clauses: Vec<ClauseId>,
}

impl Component {
    #[must_use]
    pub fn new(mut vars: Vec<Var>, mut clauses: Vec<ClauseId>) -> Self {
        vars.sort_unstable();
        vars.dedup();
        clauses.sort_unstable();
        clauses.dedup();
        Self { vars, clauses }
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn clauses(&self) -> &[ClauseId] {
        &self.clauses
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn contains(&self, var: Var) -> bool {
        self.vars.binary_search(&var).is_ok()
    }

    pub fn contains_clause(&self, clause_id: ClauseId) -> bool {
        self.clauses.binary_search(&clause_id).is_ok()
    }
}

/// The result of splitting a component.
#[derive(Debug, Clone, Default)]
pub struct Decomposition {
    /// Connected pieces, ascending by number of variables
    pub components: Vec<Component>,
    /// Undecided variables without any active clause
    pub free: Vec<Var>,
}

/// State of a flood fill over one source component.
struct FloodFill {
    /// undecided variables of the source that were not reached yet
    pending_vars: VarVec<bool>,
    /// active clauses of the source that were not reached yet
    pending_clauses: Vec<bool>,
    stack: Vec<Var>,
    vars: Vec<Var>,
    clauses: Vec<ClauseId>,
}

impl FloodFill {
    fn reach_var(&mut self, var: Var) {
        if std::mem::take(&mut self.pending_vars[var]) {
            self.stack.push(var);
            self.vars.push(var);
        }
    }

    /// Returns `true` if the clause was not reached before.
    fn reach_clause(&mut self, clause_id: ClauseId) -> bool {
        let pending = std::mem::take(&mut self.pending_clauses[clause_id.index()]);
        if pending {
            self.clauses.push(clause_id);
        }
        pending
    }
}

impl Solver {
    /// The variables and original long clauses left after the root facts.
    ///
    /// Variables without any clause are dropped.
    pub fn init_component(&self) -> Component {
        let vars = Var::range(self.var_count)
            .filter(|&var| {
                let fixed =
                    self.assignment.is_assigned(var) && self.level(var).is_root();
                !fixed && self.occurs(var)
            })
            .collect();
        let clauses = self
            .clauses
            .iter_long()
            .filter(|(_, clause)| !clause.is_learnt())
            .filter(|(_, clause)| {
                !clause.iter().any(|&lit| {
                    self.assignment.lit_is_true(lit) && self.level(lit.var()).is_root()
                })
            })
            .map(|(clause_id, _)| clause_id)
            .collect();
        Component::new(vars, clauses)
    }

    /// The undecided variables and active original long clauses under the
    /// current assignment.
    pub fn current_component(&self) -> Component {
        let vars = Var::range(self.var_count)
            .filter(|&var| !self.assignment.is_assigned(var) && self.occurs(var))
            .collect();
        let clauses = self
            .clauses
            .iter_long()
            .filter(|(clause_id, clause)| !clause.is_learnt() && !self.is_satisfied(*clause_id))
            .map(|(clause_id, _)| clause_id)
            .collect();
        Component::new(vars, clauses)
    }

    fn occurs(&self, var: Var) -> bool {
        !self.occurrences.of_var(var).is_empty()
            || !self.clauses.binary.partners(var.positive()).is_empty()
            || !self.clauses.binary.partners(var.negative()).is_empty()
    }

    /// Splits `source` into maximal connected pieces under the current
    /// assignment.
    ///
    /// Undecided variables without an active clause end up in
    /// [`Decomposition::free`], decided variables and satisfied clauses are
    /// dropped.
    pub fn decompose_dynamic(&mut self, source: &Component) -> Decomposition {
        let mut fill = FloodFill {
            pending_vars: VarVec::with_var_count(self.var_count),
            pending_clauses: vec![false; self.clauses.long.len()],
            stack: Vec::new(),
            vars: Vec::new(),
            clauses: Vec::new(),
        };
        for &var in source.vars() {
            if self.assignment[var].is_none() {
                fill.pending_vars[var] = true;
            }
        }
        for &clause_id in source.clauses() {
            if !self.is_satisfied(clause_id) {
                fill.pending_clauses[clause_id.index()] = true;
            }
        }

        let mut decomposition = Decomposition::default();
        for &root in source.vars() {
            if !fill.pending_vars[root] {
                continue;
            }
            fill.reach_var(root);
            while let Some(var) = fill.stack.pop() {
                self.fill_binary(&mut fill, var);
                match self.config.traversal {
                    Traversal::Uniform => self.fill_uniform(&mut fill, var),
                    Traversal::ArityClassed => self.fill_arity_classed(&mut fill, var),
                }
            }
            let vars = std::mem::take(&mut fill.vars);
            let clauses = std::mem::take(&mut fill.clauses);
            if vars.len() == 1 && clauses.is_empty() {
                decomposition.free.push(vars[0]);
            } else {
                decomposition.components.push(Component::new(vars, clauses));
            }
        }
        decomposition.components.sort_by_key(Component::len);

        let stats = &mut self.stats.components;
        stats.decompositions += 1;
        stats.components += decomposition.components.len() as u64;
        stats.free_vars += decomposition.free.len() as u64;
        debug!(
            "split component of {} variables into {} components and {} free variables",
            source.len(),
            decomposition.components.len(),
            decomposition.free.len()
        );
        decomposition
    }

    fn fill_binary(&self, fill: &mut FloodFill, var: Var) {
        for lit in [var.positive(), var.negative()] {
            for &other in self.clauses.binary.partners(lit) {
                // satisfied or unit clauses do not connect anything
                if self.assignment[other.var()].is_none() {
                    fill.reach_var(other.var());
                }
            }
        }
    }

    fn fill_uniform(&self, fill: &mut FloodFill, var: Var) {
        for &clause_id in self.occurrences.of_var(var) {
            if fill.reach_clause(clause_id) {
                for &lit in self.clauses[clause_id].lits() {
                    fill.reach_var(lit.var());
                }
            }
        }
    }

    fn fill_arity_classed(&self, fill: &mut FloodFill, var: Var) {
        for lit in [var.positive(), var.negative()] {
            for &clause_id in self.occurrences.ternary(lit) {
                if fill.reach_clause(clause_id) {
                    let &[a, b, c] = self.clauses[clause_id].lits() else {
                        unreachable!("ternary occurrence of a clause with another arity")
                    };
                    fill.reach_var(a.var());
                    fill.reach_var(b.var());
                    fill.reach_var(c.var());
                }
            }
            for &clause_id in self.occurrences.quaternary(lit) {
                if fill.reach_clause(clause_id) {
                    let &[a, b, c, d] = self.clauses[clause_id].lits() else {
                        unreachable!("quaternary occurrence of a clause with another arity")
                    };
                    fill.reach_var(a.var());
                    fill.reach_var(b.var());
                    fill.reach_var(c.var());
                    fill.reach_var(d.var());
                }
            }
            for &clause_id in self.occurrences.wide(lit) {
                if fill.reach_clause(clause_id) {
                    self.clauses[clause_id].iter().for_each(|l: &Lit| fill.reach_var(l.var()));
                }
            }
        }
    }
}
