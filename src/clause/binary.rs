//! Binary clauses stored as implication lists.

use crate::{datastructure::LitVec, literal::Lit};

/// Binary clauses.
///
/// For every literal `l` the list `implied(l)` holds the literals that become
/// true once `l` is true. Original clauses occupy a prefix of every list,
/// learnt clauses are appended after it.
#[derive(Debug, Default, Clone)]
pub(crate) struct BinaryClauses {
    by_lit: LitVec<Vec<Lit>>,
    original: LitVec<usize>,
    count: usize,
    learnt: usize,
}

impl BinaryClauses {
    /// Update structures for a new variable count.
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.by_lit.set_var_count(count);
        self.original.set_var_count(count);
    }

    /// Add a binary clause.
    pub(crate) fn add(&mut self, lits: [Lit; 2], learnt: bool) {
        for (&lit, &other) in lits.iter().zip(lits.iter().rev()) {
            let implied = &mut self.by_lit[!lit];
            if learnt {
                implied.push(other);
            } else {
                let prefix = &mut self.original[!lit];
                implied.insert(*prefix, other);
                *prefix += 1;
            }
        }
        self.count += 1;
        if learnt {
            self.learnt += 1;
        }
    }

    /// Implications of a given literal
    pub(crate) fn implied(&self, lit: Lit) -> &[Lit] {
        &self.by_lit[lit]
    }

    /// Implications of a given literal through original clauses only
    pub(crate) fn implied_original(&self, lit: Lit) -> &[Lit] {
        &self.by_lit[lit][..self.original[lit]]
    }

    /// The other literals of original binary clauses containing `lit`.
    pub(crate) fn partners(&self, lit: Lit) -> &[Lit] {
        self.implied_original(!lit)
    }

    /// Number of binary clauses.
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn learnt_count(&self) -> usize {
        self.learnt
    }

    /// Every clause exactly once, with a flag for learnt clauses.
    pub(crate) fn iter(&self) -> impl Iterator<Item = ([Lit; 2], bool)> + '_ {
        self.by_lit.iter().flat_map(move |(lit, implied)| {
            let prefix = self.original[lit];
            implied.iter().enumerate().filter_map(move |(pos, &other)| {
                // clause (!lit ∨ other) is listed under `lit` and under `!other`
                (!lit < other).then_some(([!lit, other], pos >= prefix))
            })
        })
    }
}
