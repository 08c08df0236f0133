//! [`SatSolver`] backed by [cryptominisat](https://crates.io/crates/cryptominisat).

use super::{SatSolver, SatSolverLit};
use crate::literal::{Lit, Var};
use cryptominisat::Lbool;
use std::convert::Infallible;

pub(crate) struct CryptoMiniSat {
    solver: cryptominisat::Solver,
    model: Vec<cryptominisat::Lit>,
}

impl CryptoMiniSat {
    fn value(var: Var, value: Lbool) -> Option<cryptominisat::Lit> {
        match value {
            Lbool::True => Some(var.positive().into()),
            Lbool::False => Some(var.negative().into()),
            Lbool::Undef => None,
        }
    }
}

impl SatSolver for CryptoMiniSat {
    type Lit = cryptominisat::Lit;
    type Err = Infallible;

    fn add_variable(&mut self) -> Self::Lit {
        self.solver.new_var()
    }

    fn add_clause(&mut self, lits: &[Self::Lit]) {
        self.solver.add_clause(lits);
    }

    fn solve_with_assumptions(&mut self, assumptions: &[Self::Lit]) -> Result<bool, Self::Err> {
        // without time or conflict limits the solver always decides
        Ok(self.solver.solve_with_assumptions(assumptions) == Lbool::True)
    }

    fn model(&mut self) -> Option<&[Self::Lit]> {
        let values = self.solver.get_model();
        self.model = values
            .iter()
            .enumerate()
            .filter_map(|(idx, &value)| {
                let var = Var::from_index(idx.try_into().ok()?);
                Self::value(var, value)
            })
            .collect();
        Some(&self.model)
    }
}

impl Default for CryptoMiniSat {
    fn default() -> Self {
        Self { solver: cryptominisat::Solver::new(), model: Vec::default() }
    }
}

impl SatSolverLit for cryptominisat::Lit {}

impl From<Lit> for cryptominisat::Lit {
    fn from(lit: Lit) -> Self {
        let var = u32::try_from(lit.var().index()).expect("variable index fits into u32");
        cryptominisat::Lit::new(var, lit.is_negative()).expect("variable is below the solver limit")
    }
}
