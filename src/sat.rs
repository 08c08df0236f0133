//! Generic SAT solver interface that supports incremental solving, and the
//! external backbone engine built on top of it.

use derivative::Derivative;
use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::{
    datastructure::VarVec,
    literal::{Lit, Var},
    tool::ToolError,
};

#[cfg(feature = "cryptominisat")]
pub(crate) mod cmsat;
pub(crate) mod varisat;

/// The incremental solver behind [`BackboneEngine`].
#[cfg(feature = "cryptominisat")]
pub(crate) type ExternalSolver = cmsat::CryptoMiniSat;
#[cfg(not(feature = "cryptominisat"))]
pub(crate) type ExternalSolver = varisat::Varisat;

/// Incremental SAT solver interface.
///
/// We assume variables to be index-based, such that mapping from
/// [`crate::literal::Lit`] to [`SatSolver::Lit`] is cheap.
pub(crate) trait SatSolver: Default {
    type Lit: SatSolverLit;
    type Err: std::error::Error + 'static;

    fn add_variable(&mut self) -> Self::Lit;
    fn add_clause(&mut self, lits: &[Self::Lit]);
    fn solve_with_assumptions(&mut self, assumptions: &[Self::Lit]) -> Result<bool, Self::Err>;
    fn model(&mut self) -> Option<&[Self::Lit]>;
    fn solve(&mut self) -> Result<bool, Self::Err> {
        self.solve_with_assumptions(&[])
    }
}

pub(crate) trait SatSolverLit: Copy + Eq + std::ops::Not<Output = Self> {}

/// Maps our variables to solver variables on first use.
#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct LookupSolver<S: SatSolver> {
    #[derivative(Debug = "ignore")]
    sat_solver: S,
    #[derivative(Debug = "ignore")]
    var_lookup: VarVec<Option<S::Lit>>,
}

impl<S: SatSolver> Default for LookupSolver<S> {
    fn default() -> Self {
        Self { sat_solver: Default::default(), var_lookup: VarVec::default() }
    }
}

impl<S: SatSolver> LookupSolver<S> {
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.var_lookup.set_var_count(count);
    }

    pub(crate) fn lookup(&mut self, lit: Lit) -> S::Lit {
        let sat_var =
            *self.var_lookup[lit.var()].get_or_insert_with(|| self.sat_solver.add_variable());
        if lit.is_negative() {
            !sat_var
        } else {
            sat_var
        }
    }

    pub(crate) fn orig_model(&mut self) -> Option<Vec<Lit>> {
        let model = self.sat_solver.model()?;
        Some(
            self.var_lookup
                .iter()
                .filter_map(|(var, &mapped)| {
                    let mapped = mapped?;
                    if model.contains(&mapped) {
                        Some(Lit::positive(var))
                    } else if model.contains(&!mapped) {
                        Some(Lit::negative(var))
                    } else {
                        None
                    }
                })
                .collect(),
        )
    }
}

impl<S: SatSolver> SatSolver for LookupSolver<S> {
    type Lit = S::Lit;
    type Err = S::Err;

    fn add_variable(&mut self) -> Self::Lit {
        self.sat_solver.add_variable()
    }

    fn add_clause(&mut self, lits: &[Self::Lit]) {
        self.sat_solver.add_clause(lits);
    }

    fn solve_with_assumptions(&mut self, assumptions: &[Self::Lit]) -> Result<bool, Self::Err> {
        self.sat_solver.solve_with_assumptions(assumptions)
    }

    fn model(&mut self) -> Option<&[Self::Lit]> {
        self.sat_solver.model()
    }
}

/// Dense renaming of a variable subset to `0..len` (DIMACS `1..=len`).
#[derive(Debug, Clone, Default)]
pub struct Renaming {
    renamed: VarVec<Option<Var>>,
    originals: Vec<Var>,
}

impl Renaming {
    /// Renames `vars` in the given order, `var_count` bounds the original
    /// range.
    pub fn new(vars: &[Var], var_count: usize) -> Self {
        let mut renamed: VarVec<Option<Var>> = VarVec::with_var_count(var_count);
        let mut originals = Vec::with_capacity(vars.len());
        for &var in vars {
            if renamed[var].is_none() {
                renamed[var] = Some(Var::from_index(
                    originals.len().try_into().expect("renamed variables fit into u32"),
                ));
                originals.push(var);
            }
        }
        Self { renamed, originals }
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// The renamed literal, `None` if the variable is not renamed.
    pub fn rename(&self, lit: Lit) -> Option<Lit> {
        let var = self.renamed.get(lit.var()).copied().flatten()?;
        Some(var.lit(lit.is_positive()))
    }

    pub fn original(&self, lit: Lit) -> Lit {
        self.originals[lit.var().index()].lit(lit.is_positive())
    }
}

/// What the engine reports besides satisfiability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputControl {
    pub model: bool,
    pub units: bool,
    pub short_learnt: bool,
}

impl Default for OutputControl {
    fn default() -> Self {
        Self { model: true, units: true, short_learnt: false }
    }
}

/// The answer of a [`BackboneEngine`] run, in renamed space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineAnswer {
    pub satisfiable: bool,
    /// The backbone literals
    pub units: Vec<Lit>,
    /// Implied binary clauses over non-backbone variables, only reported
    /// with [`OutputControl::short_learnt`]
    pub binaries: Vec<[Lit; 2]>,
    /// Models found while probing
    pub models: Vec<Vec<Lit>>,
}

/// Computes the backbone of a formula by assumption probing with an
/// incremental SAT solver.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) struct BackboneEngine<S: SatSolver = ExternalSolver> {
    #[derivative(Debug = "ignore")]
    solver: LookupSolver<S>,
    var_count: usize,
    /// values shared by every known model
    candidates: VarVec<Option<bool>>,
    known_models: usize,
}

impl<S: SatSolver> BackboneEngine<S> {
    pub(crate) fn new(var_count: usize) -> Self {
        let mut solver = LookupSolver::default();
        solver.set_var_count(var_count);
        Self { solver, var_count, candidates: VarVec::with_var_count(var_count), known_models: 0 }
    }

    pub(crate) fn add_clause(&mut self, lits: &[Lit]) {
        let lits: Vec<S::Lit> = lits.iter().map(|&lit| self.solver.lookup(lit)).collect();
        self.solver.add_clause(&lits);
    }

    /// A model known beforehand, it rules out backbone candidates without
    /// a solver call.
    pub(crate) fn add_model(&mut self, model: &[Lit]) {
        self.restrict_candidates(model);
    }

    fn restrict_candidates(&mut self, model: &[Lit]) {
        let mut values = VarVec::<Option<bool>>::with_var_count(self.var_count);
        for &lit in model {
            values[lit.var()] = Some(lit.is_positive());
        }
        for var in Var::range(self.var_count) {
            let candidate = &mut self.candidates[var];
            *candidate = match (self.known_models, *candidate, values[var]) {
                (0, _, value) => value,
                (_, Some(old), Some(new)) if old == new => Some(old),
                _ => None,
            };
        }
        self.known_models += 1;
    }

    /// Solves and probes every candidate literal.
    ///
    /// # Errors
    ///
    /// Failures of the underlying solver.
    pub(crate) fn run(&mut self, control: OutputControl) -> Result<EngineAnswer, ToolError> {
        let engine_error = |err: S::Err| ToolError::Engine(err.to_string());
        let mut answer = EngineAnswer::default();
        // every variable takes part, even those without a clause
        for var in Var::range(self.var_count) {
            self.solver.lookup(var.positive());
        }
        if !self.solver.solve().map_err(engine_error)? {
            debug!("external engine: unsatisfiable");
            return Ok(answer);
        }
        answer.satisfiable = true;
        self.record_model(control, &mut answer);

        for var in Var::range(self.var_count) {
            let Some(value) = self.candidates[var] else {
                continue;
            };
            let lit = var.lit(value);
            let assumption = self.solver.lookup(!lit);
            if self.solver.solve_with_assumptions(&[assumption]).map_err(engine_error)? {
                self.record_model(control, &mut answer);
            } else {
                trace!("external engine: backbone literal {lit}");
                let unit = self.solver.lookup(lit);
                self.solver.add_clause(&[unit]);
                if control.units {
                    answer.units.push(lit);
                }
            }
        }
        if control.short_learnt {
            answer.binaries = self.implied_binaries()?;
            debug!("external engine: {} implied binary clauses", answer.binaries.len());
        }
        Ok(answer)
    }

    /// Binary clauses over non-backbone variables that hold in every model,
    /// found by probing pairs of literals.
    ///
    /// For every literal `lit` the literals true in all models with `lit`
    /// are narrowed down by the models found, the survivors `other` are
    /// refuted under `lit ∧ !other`. Only valid after the backbone probes.
    fn implied_binaries(&mut self) -> Result<Vec<[Lit; 2]>, ToolError> {
        let engine_error = |err: S::Err| ToolError::Engine(err.to_string());
        let open: Vec<Var> =
            Var::range(self.var_count).filter(|&var| self.candidates[var].is_none()).collect();
        let mut found = BTreeSet::new();
        for &var in &open {
            for lit in [var.positive(), var.negative()] {
                let assumption = self.solver.lookup(lit);
                if !self.solver.solve_with_assumptions(&[assumption]).map_err(engine_error)? {
                    continue;
                }
                let Some(model) = self.solver.orig_model() else {
                    continue;
                };
                let mut implied: Vec<Lit> = model
                    .into_iter()
                    .filter(|other| other.var() != var && self.candidates[other.var()].is_none())
                    .collect();
                while let Some(other) = implied.pop() {
                    let assumptions = [assumption, self.solver.lookup(!other)];
                    if self.solver.solve_with_assumptions(&assumptions).map_err(engine_error)? {
                        if let Some(model) = self.solver.orig_model() {
                            implied.retain(|lit| model.contains(lit));
                        }
                    } else {
                        let mut clause = [!lit, other];
                        clause.sort_unstable();
                        found.insert(clause);
                    }
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    fn record_model(&mut self, control: OutputControl, answer: &mut EngineAnswer) {
        let Some(model) = self.solver.orig_model() else {
            return;
        };
        self.restrict_candidates(&model);
        if control.model {
            answer.models.push(model);
        }
    }
}
