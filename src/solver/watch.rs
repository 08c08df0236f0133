use crate::{
    clause::{alloc::ClauseId, db::ClauseStore},
    datastructure::LitVec,
    literal::Lit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Watch {
    /// A reference to a clause where the watched literals
    /// are in the first and second position.
    pub(crate) clause: ClauseId,
}

/// For every literal, the long clauses watching it.
#[derive(Debug, Clone, Default)]
pub(crate) struct WatchList {
    watches: LitVec<Vec<Watch>>,
}

impl WatchList {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.watches.set_var_count(count);
    }

    /// Watches the first two literals of every long clause.
    pub(crate) fn rebuild(&mut self, clauses: &ClauseStore) {
        self.watches.clear();
        for (clause_id, clause) in clauses.iter_long() {
            self.watch_clause(clause_id, clause.watched());
        }
    }

    pub(crate) fn watch_clause(&mut self, clause_id: ClauseId, lits: [Lit; 2]) {
        for lit in lits {
            self.add_watch(lit, Watch { clause: clause_id });
        }
    }

    pub(crate) fn add_watch(&mut self, lit: Lit, watch: Watch) {
        self.watches[lit].push(watch);
    }
}

impl std::ops::Index<Lit> for WatchList {
    type Output = Vec<Watch>;

    fn index(&self, lit: Lit) -> &Self::Output {
        &self.watches[lit]
    }
}

impl std::ops::IndexMut<Lit> for WatchList {
    fn index_mut(&mut self, lit: Lit) -> &mut Self::Output {
        &mut self.watches[lit]
    }
}
