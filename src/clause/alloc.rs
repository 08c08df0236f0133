//! Append-only arena for long clauses

use super::Clause;
use crate::literal::Lit;

/// Stable handle of a long clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClauseId(u32);

impl ClauseId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index.try_into().expect("clause index fits into u32"))
    }
}

impl std::fmt::Display for ClauseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Maps the IDs before a compaction to the IDs after it.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdMap(Vec<Option<ClauseId>>);

impl IdMap {
    pub(crate) fn get(&self, old: ClauseId) -> Option<ClauseId> {
        self.0.get(old.index()).copied().flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Allocator {
    clauses: Vec<Clause>,
}

impl Allocator {
    pub(crate) fn reserve(&mut self, num_clauses: usize) {
        self.clauses.reserve(num_clauses);
    }

    pub(crate) fn len(&self) -> usize {
        self.clauses.len()
    }

    pub(crate) fn add(&mut self, clause: &[Lit], learnt: bool) -> ClauseId {
        let id = ClauseId::from_index(self.clauses.len());
        self.clauses.push(Clause::new(clause, learnt));
        id
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ClauseId, &Clause)> {
        self.clauses.iter().enumerate().map(|(idx, clause)| (ClauseId::from_index(idx), clause))
    }

    /// Removes every clause for which `keep` returns `false`.
    ///
    /// The relative order of the remaining clauses is preserved.
    pub(crate) fn retain<F>(&mut self, mut keep: F) -> IdMap
    where
        F: FnMut(ClauseId, &Clause) -> bool,
    {
        let mut map = Vec::with_capacity(self.clauses.len());
        let mut next = 0;
        for (idx, clause) in self.clauses.iter().enumerate() {
            if keep(ClauseId::from_index(idx), clause) {
                map.push(Some(ClauseId::from_index(next)));
                next += 1;
            } else {
                map.push(None);
            }
        }
        let mut idx = 0;
        self.clauses.retain(|_| {
            let kept = map[idx].is_some();
            idx += 1;
            kept
        });
        IdMap(map)
    }
}

impl std::ops::Index<ClauseId> for Allocator {
    type Output = Clause;

    fn index(&self, index: ClauseId) -> &Self::Output {
        &self.clauses[index.index()]
    }
}

impl std::ops::IndexMut<ClauseId> for Allocator {
    fn index_mut(&mut self, index: ClauseId) -> &mut Self::Output {
        &mut self.clauses[index.index()]
    }
}
