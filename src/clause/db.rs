//! Clause database

use super::{
    alloc::{Allocator, ClauseId, IdMap},
    binary::BinaryClauses,
    Clause,
};
use crate::literal::Lit;

/// Where a clause ended up after insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stored {
    Unit(Lit),
    Binary([Lit; 2]),
    Long(ClauseId),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ClauseStore {
    pub(crate) binary: BinaryClauses,
    pub(crate) long: Allocator,
    /// Root facts, original and learnt
    units: Vec<Lit>,
    learnt_long: usize,
}

impl ClauseStore {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.binary.set_var_count(count);
    }

    pub(crate) fn reserve(&mut self, num_clauses: usize) {
        self.long.reserve(num_clauses);
    }

    /// Stores a normalized, non-empty clause.
    pub(crate) fn add(&mut self, lits: &[Lit], learnt: bool) -> Stored {
        match *lits {
            [] => unreachable!("the empty clause is never stored"),
            [lit] => {
                self.units.push(lit);
                Stored::Unit(lit)
            }
            [a, b] => {
                self.binary.add([a, b], learnt);
                Stored::Binary([a, b])
            }
            _ => {
                if learnt {
                    self.learnt_long += 1;
                }
                Stored::Long(self.long.add(lits, learnt))
            }
        }
    }

    pub(crate) fn units(&self) -> &[Lit] {
        &self.units
    }

    pub(crate) fn num_clauses(&self) -> usize {
        self.units.len() + self.binary.count() + self.long.len()
    }

    pub(crate) fn num_learnt_long(&self) -> usize {
        self.learnt_long
    }

    pub(crate) fn iter_long(&self) -> impl Iterator<Item = (ClauseId, &Clause)> {
        self.long.iter()
    }

    /// Removes learnt long clauses for which `keep` returns `false`.
    pub(crate) fn retain_learnt<F>(&mut self, mut keep: F) -> IdMap
    where
        F: FnMut(ClauseId, &Clause) -> bool,
    {
        let map = self.long.retain(|id, clause| !clause.is_learnt() || keep(id, clause));
        self.learnt_long = self.long.iter().filter(|(_, clause)| clause.is_learnt()).count();
        map
    }

    /// All stored clauses as literal vectors with their learnt flag.
    pub(crate) fn export(&self) -> Vec<(Vec<Lit>, bool)> {
        self.units
            .iter()
            .map(|&lit| (vec![lit], false))
            .chain(self.binary.iter().map(|(lits, learnt)| (lits.to_vec(), learnt)))
            .chain(self.long.iter().map(|(_, clause)| (clause.lits().to_vec(), clause.is_learnt())))
            .collect()
    }
}

impl std::ops::Index<ClauseId> for ClauseStore {
    type Output = Clause;

    fn index(&self, index: ClauseId) -> &Self::Output {
        &self.long[index]
    }
}

impl std::ops::IndexMut<ClauseId> for ClauseStore {
    fn index_mut(&mut self, index: ClauseId) -> &mut Self::Output {
        &mut self.long[index]
    }
}
