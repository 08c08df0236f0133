//! Restart-bounded CDCL search inside a component.
//!
//! A search is re-entrant: it starts on the current decision level, never
//! backtracks below it and restores it on every exit path.

use super::{restart::Restart, trail::DecLvl, Reason, Solver};
use crate::{component::Component, literal::Lit, model::Model, SolverResult};
use std::time::Instant;
use tracing::{debug, info, trace};

/// A learnt clause together with the reason for asserting its first literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learnt {
    pub(crate) lits: Vec<Lit>,
    pub(crate) reason: Reason,
}

impl Learnt {
    pub(crate) fn empty() -> Self {
        Self { lits: Vec::new(), reason: Reason::Decision }
    }

    /// The literals, the asserting one first.
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }
}

#[derive(Debug)]
pub enum SearchResult {
    /// Every variable of the component is assigned without conflict
    Satisfiable(Model),
    /// A clause was learnt that backjumps below the entry level of the search.
    /// It is stored already, the empty clause means the formula is
    /// unsatisfiable.
    Refuted(Learnt),
    /// The conflict budget was exhausted
    Unknown,
}

impl Solver {
    /// Solves the whole formula.
    pub fn solve(&mut self) -> SolverResult {
        let instant = Instant::now();
        let result = self.solve_root();
        self.stats.search.solve_time += instant.elapsed();
        info!("\n{:#?}", self.stats);
        result
    }

    fn solve_root(&mut self) -> SolverResult {
        if self.is_conflicted() {
            return SolverResult::Unsatisfiable;
        }
        self.backtrack_to(DecLvl::ROOT);
        let component = self.init_component();
        match self.search(&component, None) {
            SearchResult::Satisfiable(model) => {
                self.pool.free(model);
                SolverResult::Satisfiable
            }
            SearchResult::Refuted(learnt) => {
                debug_assert!(learnt.is_empty());
                SolverResult::Unsatisfiable
            }
            SearchResult::Unknown => SolverResult::Unknown,
        }
    }

    /// Searches for a model of `component` extending the current assignment.
    ///
    /// `budget` bounds the number of conflicts, `None` searches until the
    /// question is settled.
    pub fn search(&mut self, component: &Component, budget: Option<u64>) -> SearchResult {
        self.stats.search.searches += 1;
        let entry = self.decision_level();
        let previous = self.enter_scope(component);
        let result = self.search_scoped(component, entry, budget);
        self.backtrack_to(entry);
        self.restore_scope(previous);
        trace!("search on level {entry} finished");
        result
    }

    fn search_scoped(
        &mut self,
        component: &Component,
        entry: DecLvl,
        budget: Option<u64>,
    ) -> SearchResult {
        if self.is_conflicted() {
            return SearchResult::Refuted(Learnt::empty());
        }
        let mut restart = Restart::new(self.config.restart_interval, self.config.restart_growth);
        let mut conflicts = 0;
        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.search.conflicts += 1;
                conflicts += 1;
                if self.conflict_level(conflict) <= entry {
                    return SearchResult::Refuted(self.refute(conflict));
                }
                let backjump = self
                    .analyze(conflict, None)
                    .expect("conflict above the entry level is not on level 0");
                if backjump < entry {
                    debug!("learnt clause backjumps to {backjump}, below entry level {entry}");
                    return SearchResult::Refuted(self.learn());
                }
                self.backtrack_to(backjump);
                let learnt = self.learn();
                self.assert_learnt(&learnt);

                if budget.map_or(false, |budget| conflicts >= budget) {
                    debug!("conflict budget of {conflicts} exhausted");
                    return SearchResult::Unknown;
                }
                if restart.should_do_restart() {
                    trace!("restart");
                    self.stats.search.restarts += 1;
                    self.backtrack_to(entry);
                    self.reduce_learnts();
                }
                continue;
            }
            let Some(decision) = self.next_decision(component) else {
                return SearchResult::Satisfiable(self.capture_model());
            };
            self.stats.search.decisions += 1;
            self.trail.new_level();
            self.assign(decision, Reason::Decision);
        }
    }

    /// Copies the current assignment into a fresh model.
    pub(crate) fn capture_model(&mut self) -> Model {
        let mut model = self.pool.allocate(self.var_count);
        for &lit in self.trail.iter() {
            model.assign(lit);
        }
        model
    }
}
