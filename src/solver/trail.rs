use crate::literal::Lit;

#[derive(Debug, Clone, Default)]
pub(crate) struct Trail {
    /// List of assignments in chronological order
    trail: Vec<Lit>,
    /// Indices into trail marking the decision levels
    decisions: Vec<usize>,
    /// Index of the next literal to propagate
    head: usize,
}

/// A decision level, level 0 holds the root facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecLvl(usize);

impl Trail {
    pub(crate) fn push(&mut self, lit: Lit) {
        self.trail.push(lit);
    }

    pub(crate) fn decision_level(&self) -> DecLvl {
        DecLvl(self.decisions.len())
    }

    /// Opens a new decision level that starts at the end of the trail.
    pub(crate) fn new_level(&mut self) {
        self.decisions.push(self.trail.len());
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Lit> + DoubleEndedIterator {
        self.trail.iter()
    }

    pub(crate) fn lits(&self) -> &[Lit] {
        &self.trail
    }

    /// The first literal assigned at `lvl`, if any.
    pub(crate) fn decision(&self, lvl: DecLvl) -> Option<Lit> {
        if lvl.is_root() {
            return None;
        }
        self.trail.get(*self.decisions.get(lvl.0 - 1)?).copied()
    }

    /// Trail position where `lvl` starts.
    pub(crate) fn level_start(&self, lvl: DecLvl) -> usize {
        if lvl.is_root() {
            0
        } else {
            self.decisions.get(lvl.0 - 1).copied().unwrap_or(self.trail.len())
        }
    }

    /// Returns the next literal whose consequences were not propagated yet.
    pub(crate) fn next_to_propagate(&mut self) -> Option<Lit> {
        let lit = *self.trail.get(self.head)?;
        self.head += 1;
        Some(lit)
    }

    /// Makes sure every literal from `pos` on is propagated again.
    pub(crate) fn rewind_head(&mut self, pos: usize) {
        self.head = self.head.min(pos);
    }

    #[cfg(test)]
    pub(crate) fn is_propagated(&self) -> bool {
        self.head == self.trail.len()
    }

    /// Removes every literal above `lvl`, calling `callback` from last to first.
    pub(crate) fn backtrack_to<F>(&mut self, lvl: DecLvl, callback: F)
    where
        F: FnMut(Lit),
    {
        if lvl >= self.decision_level() {
            return;
        }
        let trail_idx = self.decisions[lvl.0];
        self.decisions.truncate(lvl.0);
        self.trail[trail_idx..].iter().copied().rev().for_each(callback);
        self.trail.truncate(trail_idx);
        self.head = self.head.min(trail_idx);
    }

    pub(crate) fn len(&self) -> usize {
        self.trail.len()
    }
}

impl DecLvl {
    pub const ROOT: DecLvl = DecLvl(0);

    #[must_use]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    #[must_use]
    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for DecLvl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
