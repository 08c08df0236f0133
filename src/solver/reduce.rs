//! Learnt clause database reduction

use super::{Reason, Solver};
use tracing::debug;

impl Solver {
    /// Forgets learnt long clauses once there are more than `max_learnts`.
    ///
    /// Kept are reasons of assigned literals, short clauses and the most
    /// recent half. Only learnt clauses after the last original clause are
    /// candidates, so the IDs of original clauses, which components refer
    /// to, never change.
    pub(crate) fn reduce_learnts(&mut self) {
        if self.clauses.num_learnt_long() <= self.max_learnts {
            return;
        }
        let last_original = self
            .clauses
            .iter_long()
            .filter(|(_, clause)| !clause.is_learnt())
            .map(|(clause_id, _)| clause_id)
            .last();
        let mut locked = vec![false; self.clauses.long.len()];
        for &lit in self.trail.iter() {
            if let Reason::Long(clause_id) = self.reasons[lit.var()] {
                locked[clause_id.index()] = true;
            }
        }
        let candidates: Vec<_> = self
            .clauses
            .iter_long()
            .filter(|&(clause_id, clause)| {
                clause.is_learnt() && last_original.map_or(true, |last| clause_id > last)
            })
            .map(|(clause_id, _)| clause_id)
            .collect();
        let first_recent = candidates.get(candidates.len() / 2).copied();

        let keep_len = self.config.keep_learnt_len;
        let before = self.clauses.num_learnt_long();
        let map = self.clauses.retain_learnt(|clause_id, clause| {
            last_original.map_or(false, |last| clause_id < last)
                || locked[clause_id.index()]
                || clause.len() <= keep_len
                || first_recent.map_or(true, |first| clause_id >= first)
        });
        for &lit in self.trail.iter() {
            let reason = &mut self.reasons[lit.var()];
            if let Reason::Long(clause_id) = *reason {
                *reason =
                    Reason::Long(map.get(clause_id).expect("reasons survive the reduction"));
            }
        }
        self.watches.rebuild(&self.clauses);
        self.occurrences.rebuild(&self.clauses);

        // scores only reflect the clauses still known
        self.activity.reset();
        for (_, clause) in self.clauses.iter_long().filter(|(_, clause)| clause.is_learnt()) {
            for &lit in clause.lits() {
                self.activity.bump(lit);
            }
        }

        self.max_learnts += (self.max_learnts / 10).max(1);
        self.stats.search.reductions += 1;
        debug!(
            "reduced learnt long clauses from {before} to {}, next limit {}, {} learnt binaries",
            self.clauses.num_learnt_long(),
            self.max_learnts,
            self.clauses.binary.learnt_count()
        );
    }
}
