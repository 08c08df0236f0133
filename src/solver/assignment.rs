use crate::{
    datastructure::VarVec,
    literal::{Lit, Var},
};

/// Partial assignment of the variables.
#[derive(Debug, Clone, Default)]
pub(crate) struct Assignment {
    assignment: VarVec<Option<bool>>,
}

impl Assignment {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.assignment.set_var_count(count);
    }

    pub(crate) fn assign(&mut self, lit: Lit) {
        debug_assert!(self.assignment[lit.var()].is_none(), "{lit} is assigned twice");
        self.assignment[lit.var()] = Some(lit.polarity());
    }

    pub(crate) fn unassign(&mut self, var: Var) {
        let old_value = self.assignment[var].take();
        debug_assert!(old_value.is_some());
    }

    pub(crate) fn is_assigned(&self, var: Var) -> bool {
        self.assignment[var].is_some()
    }

    /// The truth value of `lit`, `None` if its variable is unassigned.
    pub(crate) fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.var()].map(|value| value == lit.polarity())
    }

    pub(crate) fn lit_is_true(&self, lit: Lit) -> bool {
        self.lit_value(lit) == Some(true)
    }

    pub(crate) fn lit_is_false(&self, lit: Lit) -> bool {
        self.lit_value(lit) == Some(false)
    }
}

impl std::ops::Index<Var> for Assignment {
    type Output = Option<bool>;

    fn index(&self, index: Var) -> &Self::Output {
        &self.assignment[index]
    }
}
