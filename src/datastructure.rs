use crate::literal::{Lit, Var};
use std::ops::{Index, IndexMut};

pub(crate) mod heap;

/// Wrapper around a `Vec` that is indexed by [`Var`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VarVec<T>(Vec<T>);

impl<T: Default> VarVec<T> {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.0.resize_with(count, Default::default);
    }

    pub(crate) fn with_var_count(count: usize) -> Self {
        let mut vec = Self::default();
        vec.set_var_count(count);
        vec
    }
}

impl<T: Clone> VarVec<T> {
    pub(crate) fn fill(&mut self, value: T) {
        self.0.iter_mut().for_each(|entry| *entry = value.clone());
    }
}

impl<T> Default for VarVec<T> {
    fn default() -> Self {
        Self(Vec::default())
    }
}

impl<T> VarVec<Vec<T>> {
    pub(crate) fn clear(&mut self) {
        self.0.iter_mut().for_each(Vec::clear);
    }
}

impl<T> VarVec<T> {
    pub(crate) fn var_count(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Var, &T)> {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, value)| (Var::from_index(idx.try_into().unwrap()), value))
    }

    pub(crate) fn get(&self, index: Var) -> Option<&T> {
        self.0.get(index.index())
    }
}

impl<T> From<Vec<T>> for VarVec<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T> Index<Var> for VarVec<T> {
    type Output = T;

    fn index(&self, index: Var) -> &Self::Output {
        &self.0[index.index()]
    }
}

impl<T> IndexMut<Var> for VarVec<T> {
    fn index_mut(&mut self, index: Var) -> &mut Self::Output {
        &mut self.0[index.index()]
    }
}

/// Wrapper around a `Vec` that is indexed by [`Lit`].
#[derive(Debug, Clone)]
pub(crate) struct LitVec<T>(Vec<T>);

impl<T: Default> LitVec<T> {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.0.resize_with(count * 2, Default::default);
    }
}

impl<T> Default for LitVec<T> {
    fn default() -> Self {
        Self(Vec::default())
    }
}

impl<T> LitVec<Vec<T>> {
    pub(crate) fn clear(&mut self) {
        self.0.iter_mut().for_each(Vec::clear);
    }
}

impl<T> LitVec<T> {
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Lit, &T)> {
        self.0.iter().enumerate().map(|(idx, value)| (Lit::from_index(idx), value))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

impl<T> Index<Lit> for LitVec<T> {
    type Output = T;

    fn index(&self, index: Lit) -> &Self::Output {
        &self.0[index.as_index()]
    }
}

impl<T> IndexMut<Lit> for LitVec<T> {
    fn index_mut(&mut self, index: Lit) -> &mut Self::Output {
        &mut self.0[index.as_index()]
    }
}

/// Constant-time resettable membership marks over variables.
///
/// Marking compares against a stamp, so starting a new sweep is a single
/// increment instead of clearing the whole array.
#[derive(Debug, Clone, Default)]
pub(crate) struct Marks {
    stamps: VarVec<u32>,
    current: u32,
}

impl Marks {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.stamps.set_var_count(count);
        // stamp 0 is reserved for unmarked entries
        self.current = self.current.max(1);
    }

    /// Starts a new sweep, forgetting all marks.
    pub(crate) fn clear(&mut self) {
        if self.current == u32::MAX {
            self.stamps.fill(0);
            self.current = 0;
        }
        self.current += 1;
    }

    /// Marks `var` and returns `true` if it was not marked before.
    pub(crate) fn mark(&mut self, var: Var) -> bool {
        let stamp = &mut self.stamps[var];
        if *stamp == self.current {
            return false;
        }
        *stamp = self.current;
        true
    }

    pub(crate) fn unmark(&mut self, var: Var) {
        self.stamps[var] = 0;
    }

    pub(crate) fn is_marked(&self, var: Var) -> bool {
        self.stamps[var] == self.current
    }
}
