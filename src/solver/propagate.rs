//! Unit clause propagation

use super::{watch::Watch, Conflict, Reason, Solver};
use crate::literal::Lit;
use std::mem;
use tracing::trace;

impl Solver {
    /// Propagates every literal on the trail that was not propagated yet.
    ///
    /// Variables outside the current scope are never assigned.
    pub(crate) fn propagate(&mut self) -> Option<Conflict> {
        while let Some(lit) = self.trail.next_to_propagate() {
            self.stats.search.propagations += 1;
            if let Some(conflict) = self.propagate_binary(lit) {
                return Some(conflict);
            }
            if let Some(conflict) = self.propagate_long(lit) {
                return Some(conflict);
            }
        }
        None
    }

    /// Propagates again every literal from trail position `offset` on.
    pub(crate) fn propagate_from(&mut self, offset: usize) -> Option<Conflict> {
        self.trail.rewind_head(offset);
        self.propagate()
    }

    /// `lit` became true, walk the binary clauses containing `!lit`.
    fn propagate_binary(&mut self, lit: Lit) -> Option<Conflict> {
        let count = self.clauses.binary.implied(lit).len();
        for idx in 0..count {
            let implied = self.clauses.binary.implied(lit)[idx];
            match self.assignment.lit_value(implied) {
                Some(true) => {}
                Some(false) => return Some(Conflict::Binary(!lit, implied)),
                None if self.is_in_scope(implied.var()) => {
                    self.assign(implied, Reason::Binary(!lit));
                }
                None => {}
            }
        }
        None
    }

    /// `lit` became true, visit the long clauses watching `!lit`.
    fn propagate_long(&mut self, lit: Lit) -> Option<Conflict> {
        let falsified = !lit;
        let mut conflict = None;
        let mut watches = mem::take(&mut self.watches[falsified]);
        watches.retain(|watch: &Watch| {
            if conflict.is_some() {
                // keep the remaining watches untouched
                return true;
            }
            let clause = &mut self.clauses[watch.clause];
            trace!("Propagate {lit} in clause {clause}");
            let lits = clause.lits_mut();
            debug_assert!(lits[0] == falsified || lits[1] == falsified);

            // move falsified literal to second position in clause
            if lits[0] == falsified {
                lits.swap(0, 1);
            }

            // check if the other watched literal satisfies the clause
            let first = lits[0];
            if self.assignment.lit_is_true(first) {
                return true;
            }

            let (initial, remaining) = lits.split_at_mut(2);
            for remaining_lit in remaining {
                if !self.assignment.lit_is_false(*remaining_lit) {
                    // we found a non-false literal which we make a watched literal for this clause
                    mem::swap(&mut initial[1], remaining_lit);
                    self.watches.add_watch(initial[1], *watch);
                    return false;
                }
            }

            match self.assignment.lit_value(first) {
                Some(false) => conflict = Some(Conflict::Long(watch.clause)),
                None if self.is_in_scope(first.var()) => {
                    // unit clause => propagate
                    self.assign(first, Reason::Long(watch.clause));
                }
                _ => {}
            }
            true
        });
        // no watch of `falsified` was added while visiting, but keep them if there are
        let added = mem::replace(&mut self.watches[falsified], watches);
        self.watches[falsified].extend(added);
        conflict
    }

    /// The literals of a conflicting clause, all of them false.
    pub(crate) fn conflict_lits(&self, conflict: Conflict) -> Vec<Lit> {
        match conflict {
            Conflict::Binary(a, b) => vec![a, b],
            Conflict::Long(clause_id) => self.clauses[clause_id].lits().to_vec(),
        }
    }
}
