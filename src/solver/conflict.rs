//! First-UIP and fixed-UIP conflict analysis, clause learning

use super::{search::Learnt, trail::DecLvl, Conflict, Reason, Solver};
use crate::{
    clause::db::Stored,
    datastructure::Marks,
    literal::{Lit, LitSlice, Var},
};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub(crate) struct ConflictAnalysis {
    /// The learnt clause, the asserting literal is at position 0
    clause: Vec<Lit>,
    /// Variables that were resolved or are contained in the clause
    seen: Marks,
    /// Number of seen literals on the conflict level not resolved yet
    current_level_count: usize,
    /// Antecedents of the literal that is resolved next
    antecedents: Vec<Lit>,
}

impl ConflictAnalysis {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.seen.set_var_count(count);
    }

    pub(crate) fn clause(&self) -> &[Lit] {
        &self.clause
    }

    fn reset(&mut self) {
        self.clause.clear();
        self.seen.clear();
        self.current_level_count = 0;
    }
}

impl Solver {
    /// The highest decision level among the literals of `conflict`.
    pub(crate) fn conflict_level(&self, conflict: Conflict) -> DecLvl {
        self.conflict_lits(conflict)
            .iter()
            .map(|lit| self.level(lit.var()))
            .max()
            .unwrap_or(DecLvl::ROOT)
    }

    /// Derives an asserting clause from `conflict`, see
    /// [`ConflictAnalysis::clause`].
    ///
    /// Resolution happens on the level of the conflict, which may be lower
    /// than the current decision level. Without `fixed` it stops at the first
    /// unique implication point. With `fixed` it continues until the fixed
    /// literal is the only literal left on the conflict level, or the decision
    /// of that level is reached.
    ///
    /// Returns the backjump level, or `None` if the empty clause was derived.
    pub(crate) fn analyze(&mut self, conflict: Conflict, fixed: Option<Lit>) -> Option<DecLvl> {
        self.analysis.reset();
        let conflict_level = self.conflict_level(conflict);
        if conflict_level.is_root() {
            debug!("conflict on level 0, derived the empty clause");
            self.set_conflicted();
            return None;
        }
        let fixed = fixed.filter(|lit| {
            self.assignment.lit_is_true(*lit) && self.level(lit.var()) == conflict_level
        });

        // position 0 is reserved for the asserting literal
        self.analysis.clause.push(Lit::positive(Var::from_index(0)));
        let mut antecedents = std::mem::take(&mut self.analysis.antecedents);
        antecedents.clear();
        antecedents.extend(self.conflict_lits(conflict));
        trace!("conflict clause: {}", LitSlice::from(antecedents.as_slice()));

        let mut trail_idx = self.trail.len();
        let uip = loop {
            for &lit in &antecedents {
                self.add_literal(lit, conflict_level);
            }

            // the next seen literal of the conflict level on the trail
            let pivot = loop {
                trail_idx -= 1;
                let lit = self.trail.lits()[trail_idx];
                if self.analysis.seen.is_marked(lit.var())
                    && self.level(lit.var()) == conflict_level
                {
                    break lit;
                }
            };
            self.analysis.seen.unmark(pivot.var());
            self.analysis.current_level_count -= 1;

            let reason = self.reasons[pivot.var()];
            let unique = self.analysis.current_level_count == 0;
            if unique && (fixed.map_or(true, |lit| lit == pivot) || reason == Reason::Decision) {
                break pivot;
            }
            antecedents.clear();
            self.collect_antecedents(pivot, reason, &mut antecedents);
            if unique && antecedents.iter().all(|lit| self.level(lit.var()) != conflict_level) {
                // `fixed` is not reachable from here, resolving would leave the level
                break pivot;
            }
            trace!("resolve on {pivot} ({reason:?})");
        };
        self.analysis.antecedents = antecedents;
        self.analysis.clause[0] = !uip;
        // the asserting literal counts as part of the clause for minimization
        self.analysis.seen.mark(uip.var());

        self.minimize_learnt_clause();

        // second literal is the one with the highest level, it becomes watched
        let clause = &mut self.analysis.clause;
        let backjump = if clause.len() > 1 {
            let (pos, lvl) = clause
                .iter()
                .enumerate()
                .skip(1)
                .map(|(pos, lit)| (pos, self.levels[lit.var()]))
                .max_by_key(|&(_, lvl)| lvl)
                .expect("clause has a second literal");
            clause.swap(1, pos);
            lvl
        } else {
            DecLvl::ROOT
        };
        debug!(
            "learnt clause {} at conflict level {conflict_level}, backjump to {backjump}",
            LitSlice::from(self.analysis.clause.as_slice())
        );
        Some(backjump)
    }

    fn add_literal(&mut self, lit: Lit, conflict_level: DecLvl) {
        let var = lit.var();
        let lvl = self.level(var);
        if lvl.is_root() || !self.analysis.seen.mark(var) {
            return;
        }
        if lvl == conflict_level {
            self.analysis.current_level_count += 1;
        } else {
            self.analysis.clause.push(lit);
        }
    }

    /// The false literals that forced `lit` to be true.
    fn collect_antecedents(&self, lit: Lit, reason: Reason, antecedents: &mut Vec<Lit>) {
        match reason {
            Reason::Decision => {}
            Reason::Binary(other) => antecedents.push(other),
            Reason::Long(clause_id) => antecedents.extend(
                self.clauses[clause_id].iter().copied().filter(|l| l.var() != lit.var()),
            ),
        }
    }

    /// Removes literals whose antecedents are contained in the clause or
    /// assigned at level 0.
    fn minimize_learnt_clause(&mut self) {
        trace!(
            "clause minimization for clause {}",
            LitSlice::from(self.analysis.clause.as_slice())
        );
        let mut antecedents = Vec::new();
        let mut idx = 1;
        while idx < self.analysis.clause.len() {
            let lit = self.analysis.clause[idx];
            let reason = self.reasons[lit.var()];
            antecedents.clear();
            self.collect_antecedents(!lit, reason, &mut antecedents);
            let redundant = reason != Reason::Decision
                && antecedents.iter().all(|premise| {
                    self.level(premise.var()).is_root()
                        || self.analysis.seen.is_marked(premise.var())
                });
            if redundant {
                trace!("{lit} is redundant");
                self.analysis.clause.swap_remove(idx);
            } else {
                idx += 1;
            }
        }
    }

    /// Stores the analyzed clause without asserting it.
    ///
    /// Bumps the activity of every literal of the clause and decays.
    pub(crate) fn learn(&mut self) -> Learnt {
        let lits = self.analysis.clause().to_vec();
        self.stats.search.learnt_clauses += 1;
        for &lit in &lits {
            self.activity.bump(lit);
        }
        self.activity.decay();
        let reason = match self.clauses.add(&lits, true) {
            Stored::Unit(_) => Reason::Decision,
            Stored::Binary([_, other]) => Reason::Binary(other),
            Stored::Long(clause_id) => {
                self.watches.watch_clause(clause_id, self.clauses[clause_id].watched());
                Reason::Long(clause_id)
            }
        };
        Learnt { lits, reason }
    }

    /// Asserts the first literal of a learnt clause that is unit under the
    /// current assignment.
    pub(crate) fn assert_learnt(&mut self, learnt: &Learnt) {
        let lit = learnt.lits[0];
        debug_assert!(learnt.lits[1..].iter().all(|&l| self.assignment.lit_is_false(l)));
        if learnt.lits.len() == 1 {
            self.assign_root_fact(lit);
        } else {
            self.assign(lit, learnt.reason);
        }
    }

    /// Learns a clause from a conflict that cannot be resolved by search
    /// above the conflict level.
    ///
    /// Resolution runs towards the decision of the conflict level, so the
    /// clause holds one literal of that level and literals from lower levels.
    /// It is falsified on the conflict level and unit below it. On level 0
    /// the empty clause is derived.
    pub(crate) fn refute(&mut self, conflict: Conflict) -> Learnt {
        let conflict_level = self.conflict_level(conflict);
        let decision = self.trail.decision(conflict_level);
        match self.analyze(conflict, decision) {
            None => Learnt::empty(),
            Some(_) => self.learn(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        config::Config,
        literal::Lit,
        solver::{DecLvl, Solver},
    };

    fn lit(dimacs: i32) -> Lit {
        Lit::from_dimacs(dimacs)
    }

    /// Classic implication graph where `4` is the first UIP.
    fn solver() -> Solver {
        let cnf = cnf_formula![
            -1 -2 4;
            -3 -4 5;
            -4 6;
            -5 -6 7;
            -5 -6 -7;
        ];
        Solver::from_cnf(&cnf, Config::default())
    }

    #[test]
    fn first_uip() {
        let mut solver = solver();
        assert_eq!(solver.decide(lit(3)), Ok(()));
        assert_eq!(solver.decide(lit(1)), Ok(()));
        let conflict = solver.decide(lit(2)).unwrap_err();
        let backjump = solver.analyze(conflict, None).unwrap();
        let clause = solver.analysis.clause().to_vec();
        assert_eq!(clause[0], lit(-4));
        assert_eq!(clause[1], lit(-3));
        assert_eq!(clause.len(), 2);
        assert_eq!(backjump, DecLvl::ROOT.successor());

        // learnt clause validity: every literal but the asserting one is false
        assert!(clause[1..].iter().all(|&l| solver.value(l) == Some(false)));

        solver.backtrack_to(backjump);
        let learnt = solver.learn();
        solver.assert_learnt(&learnt);
        assert_eq!(solver.propagate(), None);
        assert_eq!(solver.value(lit(4)), Some(false));
        assert_eq!(solver.value(lit(1)), None);
        // the conflict is not triggered again
        assert_eq!(solver.decide(lit(1)), Ok(()));
        assert_eq!(solver.value(lit(2)), Some(false));
    }

    #[test]
    fn fixed_uip_resolves_to_decision() {
        let mut solver = solver();
        assert_eq!(solver.decide(lit(3)), Ok(()));
        assert_eq!(solver.decide(lit(1)), Ok(()));
        let conflict = solver.decide(lit(2)).unwrap_err();
        let backjump = solver.analyze(conflict, Some(lit(2))).unwrap();
        let mut clause = solver.analysis.clause().to_vec();
        assert_eq!(clause[0], lit(-2));
        clause.sort_unstable();
        assert_eq!(clause, vec![lit(-1), lit(-2), lit(-3)]);
        assert_eq!(backjump, DecLvl::ROOT.successor().successor());
    }

    #[test]
    fn root_conflict_derives_empty_clause() {
        let cnf = cnf_formula![
            1 2;
            -1 2;
            1 -2;
            -1 -2;
        ];
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let conflict = solver.decide(lit(1)).unwrap_err();
        let learnt = solver.refute(conflict);
        assert_eq!(learnt.lits(), &[lit(-1)]);
        solver.backtrack_to(DecLvl::ROOT);
        solver.assert_learnt(&learnt);
        let conflict = solver.propagate().unwrap();
        let learnt = solver.refute(conflict);
        assert!(learnt.lits().is_empty());
        assert!(solver.is_conflicted());
    }
}
