use crate::literal::Lit;

pub(crate) mod alloc;
pub(crate) mod binary;
pub(crate) mod db;

/// A clause of arity three or more.
///
/// The literals at position 0 and 1 are the watched ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    lits: Vec<Lit>,
    learnt: bool,
}

impl Clause {
    pub(crate) fn new(literals: &[Lit], learnt: bool) -> Self {
        debug_assert!(literals.len() > 2, "binary clauses are stored as adjacency");
        Self { lits: literals.to_vec(), learnt }
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Lit> {
        self.lits.iter()
    }

    pub(crate) fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub(crate) fn lits_mut(&mut self) -> &mut [Lit] {
        &mut self.lits
    }

    pub(crate) fn len(&self) -> usize {
        self.lits.len()
    }

    pub(crate) fn is_learnt(&self) -> bool {
        self.learnt
    }

    pub(crate) fn watched(&self) -> [Lit; 2] {
        [self.lits[0], self.lits[1]]
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &lit in &self.lits {
            write!(f, "{lit} ")?;
        }
        write!(f, "0")
    }
}

impl<'a> IntoIterator for &'a Clause {
    type Item = &'a Lit;
    type IntoIter = std::slice::Iter<'a, Lit>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Sorts and deduplicates `lits`, returns `false` for tautologies.
pub(crate) fn normalize(lits: &mut Vec<Lit>) -> bool {
    lits.sort_unstable();
    lits.dedup();
    // literals are sorted by variable, so opposing literals are neighbours
    !lits.windows(2).any(|pair| pair[0] == !pair[1])
}
