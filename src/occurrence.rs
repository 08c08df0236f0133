//! Membership index: which original long clauses a literal occurs in.
//!
//! Occurrences are split by arity so that traversals can use loops
//! specialised to ternary and quaternary clauses.

use crate::{
    clause::{alloc::ClauseId, db::ClauseStore},
    datastructure::{LitVec, VarVec},
    literal::{Lit, Var},
};

#[derive(Debug, Clone, Default)]
pub(crate) struct Occurrences {
    ternary: LitVec<Vec<ClauseId>>,
    quaternary: LitVec<Vec<ClauseId>>,
    /// clauses with five or more literals
    wide: LitVec<Vec<ClauseId>>,
    by_var: VarVec<Vec<ClauseId>>,
    /// number of original long clauses
    indexed: usize,
}

impl Occurrences {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.ternary.set_var_count(count);
        self.quaternary.set_var_count(count);
        self.wide.set_var_count(count);
        self.by_var.set_var_count(count);
    }

    /// Recomputes the index from the original long clauses of `store`.
    pub(crate) fn rebuild(&mut self, store: &ClauseStore) {
        self.ternary.clear();
        self.quaternary.clear();
        self.wide.clear();
        self.by_var.clear();
        self.indexed = 0;
        for (id, clause) in store.iter_long().filter(|(_, clause)| !clause.is_learnt()) {
            self.insert(id, clause.lits());
        }
    }

    /// Adds a single original clause without a full rebuild.
    pub(crate) fn insert(&mut self, id: ClauseId, lits: &[Lit]) {
        let class = match lits.len() {
            3 => &mut self.ternary,
            4 => &mut self.quaternary,
            _ => &mut self.wide,
        };
        for &lit in lits {
            class[lit].push(id);
            self.by_var[lit.var()].push(id);
        }
        self.indexed += 1;
    }

    pub(crate) fn ternary(&self, lit: Lit) -> &[ClauseId] {
        &self.ternary[lit]
    }

    pub(crate) fn quaternary(&self, lit: Lit) -> &[ClauseId] {
        &self.quaternary[lit]
    }

    pub(crate) fn wide(&self, lit: Lit) -> &[ClauseId] {
        &self.wide[lit]
    }

    /// All original long clauses containing `lit`.
    pub(crate) fn of_lit(&self, lit: Lit) -> impl Iterator<Item = ClauseId> + '_ {
        self.ternary[lit]
            .iter()
            .chain(&self.quaternary[lit])
            .chain(&self.wide[lit])
            .copied()
    }

    /// All original long clauses containing `var` in either polarity.
    pub(crate) fn of_var(&self, var: Var) -> &[ClauseId] {
        &self.by_var[var]
    }

    pub(crate) fn indexed(&self) -> usize {
        self.indexed
    }
}
