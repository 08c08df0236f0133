//! The CDCL engine driving propagation, conflict analysis, branching and
//! nested search inside components.

use self::{
    activity::Activity,
    assignment::Assignment,
    conflict::ConflictAnalysis,
    stats::Statistics,
    trail::Trail,
    watch::WatchList,
};
use crate::{
    clause::{
        alloc::ClauseId,
        db::{ClauseStore, Stored},
        normalize,
    },
    cnf::Cnf,
    component::Component,
    config::Config,
    datastructure::{Marks, VarVec},
    dimacs::FromDimacs,
    graph::order::VarOrder,
    literal::{Lit, LitSlice, Var},
    model::ModelPool,
    occurrence::Occurrences,
};
use tracing::{debug, trace};

pub(crate) mod activity;
pub(crate) mod assignment;
pub(crate) mod backbone;
pub(crate) mod branch;
pub(crate) mod conflict;
pub(crate) mod propagate;
pub(crate) mod reduce;
pub(crate) mod restart;
pub(crate) mod search;
pub(crate) mod stats;
pub(crate) mod substitute;
pub(crate) mod trail;
pub(crate) mod watch;

#[cfg(test)]
mod test;

pub use backbone::ImpliedLiterals;
pub use search::{Learnt, SearchResult};
pub use stats::Statistics as SolverStatistics;
pub use substitute::Substitution;
pub use trail::DecLvl;

/// Justification of an assignment on the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Reason {
    /// A decision or a root fact
    #[default]
    Decision,
    /// Implied by the binary clause whose other, false, literal is given
    Binary(Lit),
    /// Implied by a long clause whose other literals are false
    Long(ClauseId),
}

/// A clause that is falsified by the current assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Binary(Lit, Lit),
    Long(ClauseId),
}

/// The variables propagation is restricted to.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: Option<Vec<Var>>,
    /// trail length when the scope was entered
    entry: usize,
}

#[derive(Debug, Default)]
pub struct Solver {
    pub(crate) config: Config,
    pub(crate) var_count: usize,
    pub(crate) clauses: ClauseStore,
    pub(crate) occurrences: Occurrences,
    pub(crate) assignment: Assignment,
    pub(crate) trail: Trail,
    pub(crate) reasons: VarVec<Reason>,
    pub(crate) levels: VarVec<DecLvl>,
    pub(crate) watches: WatchList,
    pub(crate) activity: Activity,
    pub(crate) analysis: ConflictAnalysis,
    pub(crate) order: VarOrder,
    pub(crate) scope: Scope,
    pub(crate) in_scope: VarVec<bool>,
    pub(crate) projection: VarVec<bool>,
    /// scratch marks for traversals
    pub(crate) marks: Marks,
    /// root facts that were learnt above level 0
    pending_facts: Vec<Lit>,
    pub(crate) max_learnts: usize,
    /// set to true if the empty clause was derived
    conflicted: bool,
    pub(crate) pool: ModelPool,
    pub(crate) stats: Statistics,
}

/// Public interface
impl Solver {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            activity: Activity::new(config.activity_decay),
            max_learnts: config.max_learnts,
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_cnf(cnf: &Cnf, config: Config) -> Self {
        let mut solver = Self::new(config);
        solver.set_var_count(cnf.num_variables());
        for clause in &cnf.clauses {
            solver.add_clause(clause);
        }
        if let Some(projection) = &cnf.projection {
            solver.set_projection(projection);
        }
        debug!(
            "stored {} clauses, {} root facts, {} long clauses indexed",
            solver.clauses.num_clauses(),
            solver.clauses.units().len(),
            solver.occurrences.indexed()
        );
        solver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Grows every variable-indexed structure to `count` variables.
    pub fn set_var_count(&mut self, count: usize) {
        if count <= self.var_count {
            return;
        }
        self.var_count = count;
        self.clauses.set_var_count(count);
        self.occurrences.set_var_count(count);
        self.assignment.set_var_count(count);
        self.reasons.set_var_count(count);
        self.levels.set_var_count(count);
        self.watches.set_var_count(count);
        self.activity.set_var_count(count);
        self.analysis.set_var_count(count);
        self.in_scope.set_var_count(count);
        self.projection.set_var_count(count);
        self.marks.set_var_count(count);
        self.order.set_var_count(count);
    }

    /// Adds an original clause, only allowed at decision level 0.
    pub fn add_clause(&mut self, lits: &[Lit]) {
        assert!(self.decision_level().is_root(), "clauses are added at the root level");
        debug!("Add clause: {}", LitSlice::from(lits));
        if let Some(max) = lits.iter().map(|lit| lit.var().index() + 1).max() {
            self.set_var_count(max);
        }
        let mut lits = Vec::from(lits);
        if !normalize(&mut lits) {
            // tautologies never constrain anything
            return;
        }
        self.insert_clause(lits, false);
    }

    /// Restricts backbone candidates of
    /// [`Solver::implied_literals_projected`] to `vars`.
    pub fn set_projection(&mut self, vars: &[Var]) {
        if let Some(max) = vars.iter().map(|var| var.index() + 1).max() {
            self.set_var_count(max);
        }
        self.projection.fill(false);
        for &var in vars {
            self.projection[var] = true;
        }
    }

    pub fn is_projected(&self, var: Var) -> bool {
        self.projection[var]
    }

    /// Returns `true` once the empty clause was derived.
    pub fn is_conflicted(&self) -> bool {
        self.conflicted
    }

    pub fn decision_level(&self) -> DecLvl {
        self.trail.decision_level()
    }

    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.assignment.lit_value(lit)
    }

    /// The literals assigned since `lvl` was opened.
    pub fn trail_from(&self, lvl: DecLvl) -> &[Lit] {
        &self.trail.lits()[self.trail.level_start(lvl)..]
    }

    /// Opens a decision level, assigns `lit` and propagates.
    ///
    /// # Errors
    ///
    /// Returns the falsified clause if propagation ran into a conflict. The
    /// level stays open, the caller decides where to backtrack to.
    pub fn decide(&mut self, lit: Lit) -> Result<(), Conflict> {
        debug_assert!(!self.assignment.is_assigned(lit.var()));
        self.stats.search.decisions += 1;
        self.trail.new_level();
        self.assign(lit, Reason::Decision);
        self.propagate().map_or(Ok(()), Err)
    }

    /// Propagates the trail, only needed after external changes like
    /// [`Solver::restore_scope`].
    ///
    /// # Errors
    ///
    /// Returns the falsified clause if propagation ran into a conflict.
    pub fn propagate_trail(&mut self) -> Result<(), Conflict> {
        self.propagate().map_or(Ok(()), Err)
    }

    /// Removes every assignment above `lvl`.
    pub fn backtrack_to(&mut self, lvl: DecLvl) {
        if lvl >= self.decision_level() {
            return;
        }
        trace!("backtrack to {lvl}");
        self.trail.backtrack_to(lvl, |assigned_lit| {
            self.assignment.unassign(assigned_lit.var());
            self.reasons[assigned_lit.var()] = Reason::Decision;
        });
        self.restore_pending_facts();
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn pool_mut(&mut self) -> &mut ModelPool {
        &mut self.pool
    }
}

impl Solver {
    /// Stores a normalized clause and makes it visible to propagation.
    pub(crate) fn insert_clause(&mut self, mut lits: Vec<Lit>, learnt: bool) {
        debug_assert!(self.decision_level().is_root());
        // non-false literals first, they become the watched ones
        lits.sort_by_key(|&lit| self.assignment.lit_is_false(lit));
        match lits.first() {
            None => {
                tracing::warn!("empty clause was added, instance is unsatisfiable");
                self.conflicted = true;
                return;
            }
            Some(&first) if self.assignment.lit_is_false(first) => {
                debug!("clause is falsified by root facts");
                self.conflicted = true;
                return;
            }
            Some(_) => {}
        }
        match self.clauses.add(&lits, learnt) {
            Stored::Unit(lit) => {
                if self.assignment[lit.var()].is_none() {
                    self.assign(lit, Reason::Decision);
                }
            }
            Stored::Binary(_) => {}
            Stored::Long(clause_id) => {
                if !learnt {
                    self.occurrences.insert(clause_id, &lits);
                }
                self.watches.watch_clause(clause_id, self.clauses[clause_id].watched());
            }
        }
        // earlier root facts may propagate through the new clause
        self.trail.rewind_head(0);
    }

    /// Records `lit` on the trail at the current decision level.
    pub(crate) fn assign(&mut self, lit: Lit, reason: Reason) {
        trace!("assign {lit} ({reason:?})");
        self.assignment.assign(lit);
        self.levels[lit.var()] = self.decision_level();
        self.reasons[lit.var()] = reason;
        self.trail.push(lit);
    }

    /// Records a root fact regardless of the current decision level.
    ///
    /// Facts above level 0 are re-asserted after every backtrack.
    pub(crate) fn assign_root_fact(&mut self, lit: Lit) {
        debug_assert!(self.assignment[lit.var()].is_none());
        self.assignment.assign(lit);
        self.levels[lit.var()] = DecLvl::ROOT;
        self.reasons[lit.var()] = Reason::Decision;
        self.trail.push(lit);
        if !self.decision_level().is_root() {
            self.pending_facts.push(lit);
        }
    }

    fn restore_pending_facts(&mut self) {
        if self.pending_facts.is_empty() {
            return;
        }
        let facts = std::mem::take(&mut self.pending_facts);
        for lit in facts {
            match self.assignment.lit_value(lit) {
                Some(true) => {
                    if !self.decision_level().is_root() {
                        self.pending_facts.push(lit);
                    }
                }
                Some(false) => {
                    // a root fact cannot be falsified above level 0 without a conflict,
                    // the conflict analysis has derived the empty clause already
                    self.conflicted = true;
                }
                None => self.assign_root_fact(lit),
            }
        }
    }

    pub(crate) fn level(&self, var: Var) -> DecLvl {
        self.levels[var]
    }

    pub(crate) fn set_conflicted(&mut self) {
        self.conflicted = true;
    }

    /// Returns `true` if some literal of the long clause is true.
    pub(crate) fn is_satisfied(&self, clause_id: ClauseId) -> bool {
        self.clauses[clause_id].iter().any(|&lit| self.assignment.lit_is_true(lit))
    }

    pub(crate) fn is_in_scope(&self, var: Var) -> bool {
        self.scope.vars.is_none() || self.in_scope[var]
    }

    /// Restricts propagation to the variables of `component`.
    ///
    /// Returns the previous scope which has to be handed to
    /// [`Solver::restore_scope`] on every exit path.
    pub fn enter_scope(&mut self, component: &Component) -> Scope {
        let entry = self.trail.len();
        let previous = std::mem::take(&mut self.scope);
        if let Some(vars) = &previous.vars {
            vars.iter().for_each(|&var| self.in_scope[var] = false);
        }
        component.vars().iter().for_each(|&var| self.in_scope[var] = true);
        self.scope = Scope { vars: Some(component.vars().to_vec()), entry };
        previous
    }

    /// Undoes [`Solver::enter_scope`].
    ///
    /// Literals assigned inside the scope are propagated again on the next
    /// propagation, as implications leaving the scope were skipped.
    pub fn restore_scope(&mut self, previous: Scope) {
        let current = std::mem::replace(&mut self.scope, previous);
        if let Some(vars) = &current.vars {
            vars.iter().for_each(|&var| self.in_scope[var] = false);
        }
        if let Some(vars) = &self.scope.vars {
            vars.iter().for_each(|&var| self.in_scope[var] = true);
        }
        self.trail.rewind_head(current.entry);
    }

    /// The clause `(!decision_1 ∨ … ∨ !decision_n)` of the current decisions.
    pub(crate) fn decision_clause(&self) -> Vec<Lit> {
        let mut lvl = DecLvl::ROOT;
        let mut clause = Vec::new();
        while lvl < self.decision_level() {
            lvl = lvl.successor();
            if let Some(decision) = self.trail.decision(lvl) {
                clause.push(!decision);
            }
        }
        clause
    }
}

impl FromDimacs for Solver {
    fn set_num_variables(&mut self, variables: u32) {
        self.set_var_count(variables as usize);
    }

    fn set_num_clauses(&mut self, clauses: u32) {
        self.clauses.reserve(clauses as usize);
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        Solver::add_clause(self, lits);
    }

    fn project(&mut self, vars: &[Var]) {
        if let Some(max) = vars.iter().map(|var| var.index() + 1).max() {
            self.set_var_count(max);
        }
        for &var in vars {
            self.projection[var] = true;
        }
    }
}
