use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    index: u32,
}

impl Var {
    pub(crate) const MAX_VAR: Var = Var { index: (u32::MAX >> 1) - 1 };

    pub fn from_index(index: u32) -> Self {
        assert!(index <= Self::MAX_VAR.index);
        Self { index }
    }

    pub fn from_dimacs(var: i32) -> Self {
        assert!(var > 0);
        Self::from_index((var - 1).try_into().expect("var - 1 is greater or equal to 0"))
    }

    pub fn to_dimacs(self) -> i32 {
        (self.index + 1).try_into().expect("index + 1 should always be smaller than i32::MAX")
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn positive(self) -> Lit {
        Lit::positive(self)
    }

    pub fn negative(self) -> Lit {
        Lit::negative(self)
    }

    /// The literal of this variable that is true under `value`.
    pub fn lit(self, value: bool) -> Lit {
        Lit::from_var(self, value)
    }

    /// Iterates over the variables `0..count`.
    pub(crate) fn range(count: usize) -> impl Iterator<Item = Var> + DoubleEndedIterator {
        (0..u32::try_from(count).expect("variable count fits into u32")).map(Var::from_index)
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

/// A literal, ordered by variable first and polarity second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit {
    /// internal representation of a literal
    repr: u32,
}

const _: () = assert!(std::mem::size_of::<Lit>() == 4);

impl Lit {
    pub(crate) const MIN_LIT: Lit = Lit::negative(Var::MAX_VAR);
    pub(crate) const MAX_LIT: Lit = Lit::positive(Var::MAX_VAR);

    pub(crate) const fn from_var(variable: Var, polarity: bool) -> Self {
        assert!(variable.index <= Var::MAX_VAR.index);
        Self { repr: (variable.index << 1) | (!polarity as u32) }
    }

    pub const fn positive(variable: Var) -> Self {
        Self::from_var(variable, true)
    }

    pub const fn negative(variable: Var) -> Self {
        Self::from_var(variable, false)
    }

    pub fn var(self) -> Var {
        Var { index: self.repr >> 1 }
    }

    pub fn is_negative(self) -> bool {
        (self.repr & 1) == 1
    }

    pub fn is_positive(self) -> bool {
        !self.is_negative()
    }

    /// The value the variable takes when this literal is true.
    pub fn polarity(self) -> bool {
        self.is_positive()
    }

    pub fn from_dimacs(lit: i32) -> Self {
        Self::from_var(Var::from_dimacs(lit.abs()), lit > 0)
    }

    pub fn to_dimacs(self) -> i32 {
        if self.is_negative() {
            -self.var().to_dimacs()
        } else {
            self.var().to_dimacs()
        }
    }

    pub(crate) fn as_index(self) -> usize {
        self.repr as usize
    }

    pub(crate) fn from_index(idx: usize) -> Lit {
        Lit { repr: idx.try_into().expect("index should be smaller than u32::MAX") }
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

impl std::ops::Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self { repr: self.repr ^ 1 }
    }
}

/// Helper struct which implements [`Display`] for [`Lit`] slices
#[derive(Debug, Clone, Copy)]
pub(crate) struct LitSlice<'a>(&'a [Lit]);

impl<'a> From<&'a [Lit]> for LitSlice<'a> {
    fn from(slice: &'a [Lit]) -> Self {
        Self(slice)
    }
}

impl<'a> Display for LitSlice<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "(")?;
        for (idx, lit) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{lit}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negation() {
        let a = Var::from_dimacs(1);
        let l = Lit::positive(a);
        let neg_l = !l;
        assert_ne!(l, neg_l);
        assert_eq!(neg_l, Lit::negative(a));
        assert_eq!(l, !neg_l);
        assert_eq!(a.lit(false), neg_l);
    }

    #[test]
    fn ordered_by_variable() {
        let lits: Vec<_> = [3, -1, 2, 1, -3].into_iter().map(Lit::from_dimacs).collect();
        let mut sorted = lits.clone();
        sorted.sort_unstable();
        let dimacs: Vec<_> = sorted.iter().map(|l| l.to_dimacs()).collect();
        assert_eq!(dimacs, vec![1, -1, 2, 3, -3]);
    }

    #[test]
    fn dimacs_roundtrip() {
        for value in [1, -1, 17, -42] {
            assert_eq!(Lit::from_dimacs(value).to_dimacs(), value);
        }
        assert_eq!(Lit::from_index(Lit::from_dimacs(-5).as_index()), Lit::from_dimacs(-5));
    }

    #[test]
    fn max_var() {
        let _max = Var::from_index(Var::MAX_VAR.index);
    }

    #[test]
    #[should_panic]
    fn larger_than_max_var() {
        let _max = Var::from_index(Var::MAX_VAR.index + 1);
    }
}

/// Provides a strategy for randomly generating variables and literals.
#[cfg(test)]
pub(crate) mod strategy {
    use super::{Lit, Var};
    use proptest::{bool, prelude::*};

    pub(crate) fn var(index: impl Strategy<Value = u32>) -> impl Strategy<Value = Var> {
        index.prop_map(Var::from_index)
    }

    pub(crate) fn lit(index: impl Strategy<Value = u32>) -> impl Strategy<Value = Lit> {
        (var(index), bool::ANY).prop_map(|(var, polarity)| Lit::from_var(var, polarity))
    }
}
