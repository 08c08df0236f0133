//! Implementation of SAT solver interface for [varisat](https://crates.io/crates/varisat).

use super::{SatSolver, SatSolverLit};
use crate::literal::{Lit, Var};
use varisat::ExtendFormula;

pub(crate) struct Varisat {
    solver: varisat::Solver<'static>,
    /// the index of the next variable
    new_lit: usize,
    model: Vec<varisat::Lit>,
}

impl SatSolver for Varisat {
    type Lit = varisat::Lit;
    type Err = varisat::solver::SolverError;

    fn add_variable(&mut self) -> Self::Lit {
        let var = Var::from_index(self.new_lit.try_into().expect("variable index fits into u32"));
        self.new_lit += 1;
        Lit::positive(var).into()
    }

    fn add_clause(&mut self, lits: &[Self::Lit]) {
        self.solver.add_clause(lits);
    }

    fn solve_with_assumptions(&mut self, assumptions: &[Self::Lit]) -> Result<bool, Self::Err> {
        self.solver.assume(assumptions);
        let result = self.solver.solve()?;
        Ok(result)
    }

    fn model(&mut self) -> Option<&[Self::Lit]> {
        self.model = self.solver.model()?;
        Some(&self.model)
    }
}

impl Default for Varisat {
    fn default() -> Self {
        Self { solver: varisat::Solver::new(), new_lit: 0, model: Vec::default() }
    }
}

impl SatSolverLit for varisat::Lit {}

impl From<Lit> for varisat::Lit {
    fn from(lit: Lit) -> Self {
        varisat::Lit::from_index(lit.var().index(), lit.is_positive())
    }
}

impl From<varisat::Lit> for Lit {
    fn from(lit: varisat::Lit) -> Self {
        let index = lit.index().try_into().expect("variable index fits into u32");
        Var::from_index(index).lit(lit.is_positive())
    }
}
