use crate::{datastructure::VarVec, literal::Var};
use ordered_float::NotNan;
use std::cmp::Reverse;

/// Static branching order, lower ranks are branched on first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarOrder {
    ranks: VarVec<usize>,
}

impl VarOrder {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        let old = self.ranks.var_count();
        self.ranks.set_var_count(count);
        // new variables come last, in index order
        for (pos, var) in Var::range(count).skip(old).enumerate() {
            self.ranks[var] = old + pos;
        }
    }

    pub fn rank(&self, var: Var) -> usize {
        self.ranks.get(var).copied().unwrap_or(usize::MAX)
    }

    /// The variables in branching order.
    pub fn vars(&self) -> Vec<Var> {
        let mut vars: Vec<Var> = self.ranks.iter().map(|(var, _)| var).collect();
        vars.sort_by_key(|&var| self.ranks[var]);
        vars
    }

    /// Branches on the variables eliminated last first, the variables not
    /// eliminated follow by decreasing weight.
    pub(crate) fn from_elimination(
        elimination: &[Var],
        weights: &VarVec<f64>,
        var_count: usize,
    ) -> Self {
        let mut order: Vec<Var> = elimination.iter().rev().copied().collect();
        let mut placed = VarVec::<bool>::with_var_count(var_count);
        order.iter().for_each(|&var| placed[var] = true);
        let mut rest: Vec<Var> = Var::range(var_count).filter(|&var| !placed[var]).collect();
        // stable, so equal weights keep the index order
        rest.sort_by_key(|&var| {
            let weight = weights.get(var).copied().unwrap_or_default();
            Reverse(NotNan::new(weight).unwrap_or_default())
        });
        order.extend(rest);

        let mut ranks = VarVec::with_var_count(var_count);
        for (rank, &var) in order.iter().enumerate() {
            ranks[var] = rank;
        }
        Self { ranks }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn var(dimacs: i32) -> Var {
        Var::from_dimacs(dimacs)
    }

    #[test]
    fn reversed_elimination_then_weights() {
        let weights = VarVec::from(vec![0.5, 0.0, 0.0, 2.0, 0.5]);
        let order = VarOrder::from_elimination(&[var(2), var(3)], &weights, 5);
        assert_eq!(order.vars(), vec![var(3), var(2), var(4), var(1), var(5)]);
        assert_eq!(order.rank(var(3)), 0);
        assert_eq!(order.rank(var(6)), usize::MAX);
    }

    #[test]
    fn default_order_is_index_order() {
        let mut order = VarOrder::default();
        order.set_var_count(3);
        assert_eq!(order.vars(), vec![var(1), var(2), var(3)]);
    }
}
