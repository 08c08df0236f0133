//! Implied literals of a component: the literals true in every model that
//! extends the current assignment.
//!
//! Candidates are literals on which every known model agrees. Each one is
//! probed by assuming its negation and running a bounded nested search,
//! which either finds a model that rules the candidate out or refutes the
//! negation.

use super::{search::Learnt, Reason, SearchResult, Solver};
use crate::{
    clause::db::Stored,
    component::Component,
    config::ImplicationEngine,
    literal::{Lit, LitSlice, Var},
    model::ModelLedger,
    sat::{BackboneEngine, ExternalSolver, OutputControl, Renaming},
    tool::ToolError,
};
use std::cmp::Reverse;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpliedLiterals {
    /// The component has no model under the current assignment, `learnt` is
    /// falsified by it
    Unsatisfiable { learnt: Vec<Lit> },
    /// The literals assigned while computing the backbone
    Forced {
        literals: Vec<Lit>,
        /// `false` if some candidates were given up on
        complete: bool,
    },
}

/// Outcome of probing a single candidate.
#[derive(Debug)]
enum Probe {
    Forced,
    /// A different literal than the candidate was forced
    Mismatch(Lit),
    Model,
    Postponed,
    Unsatisfiable(Vec<Lit>),
}

impl Solver {
    /// The literals over the variables of `component` that are implied by the
    /// current assignment. Models found on the way are added to `ledger`.
    ///
    /// The implied literals remain assigned on the current decision level.
    ///
    /// # Errors
    ///
    /// Only if the external engine is configured and fails.
    pub fn implied_literals(
        &mut self,
        component: &Component,
        ledger: &mut ModelLedger,
    ) -> Result<ImpliedLiterals, ToolError> {
        self.implied_literals_over(component, ledger, false)
    }

    /// Like [`Solver::implied_literals`], but only variables of the
    /// projection are candidates.
    ///
    /// # Errors
    ///
    /// Only if the external engine is configured and fails.
    pub fn implied_literals_projected(
        &mut self,
        component: &Component,
        ledger: &mut ModelLedger,
    ) -> Result<ImpliedLiterals, ToolError> {
        self.implied_literals_over(component, ledger, true)
    }

    fn implied_literals_over(
        &mut self,
        component: &Component,
        ledger: &mut ModelLedger,
        projected: bool,
    ) -> Result<ImpliedLiterals, ToolError> {
        self.stats.backbone.calls += 1;
        if self.is_conflicted() {
            debug!("implied literals: empty clause derived at the root");
            return Ok(ImpliedLiterals::Unsatisfiable { learnt: Vec::new() });
        }
        let entry = self.decision_level();
        let start = self.trail.len();
        let previous = self.enter_scope(component);
        let result = match self.config.implication_engine {
            ImplicationEngine::Native => Ok(self.backbone_native(component, ledger, projected)),
            ImplicationEngine::External => self.backbone_external(component, ledger, projected),
        };
        self.backtrack_to(entry);
        self.restore_scope(previous);

        let result = result?;
        if let ImpliedLiterals::Forced { complete, .. } = result {
            let literals: Vec<Lit> = self.trail.lits()[start..]
                .iter()
                .copied()
                .filter(|lit| component.contains(lit.var()))
                .collect();
            debug!("implied literals: {}", LitSlice::from(literals.as_slice()));
            if !complete {
                warn!("backbone is incomplete, some candidates exceeded the probe budget");
            }
            return Ok(ImpliedLiterals::Forced { literals, complete });
        }
        Ok(result)
    }

    fn backbone_native(
        &mut self,
        component: &Component,
        ledger: &mut ModelLedger,
        projected: bool,
    ) -> ImpliedLiterals {
        if let Some(conflict) = self.propagate() {
            return ImpliedLiterals::Unsatisfiable { learnt: self.refute(conflict).lits };
        }
        let mut budget = self.config.probe_budget;
        while ledger.is_empty() {
            match self.search(component, Some(budget)) {
                SearchResult::Satisfiable(model) => {
                    self.stats.backbone.models += 1;
                    ledger.add(model);
                }
                SearchResult::Refuted(learnt) => {
                    if let Err(learnt) = self.apply_refutation(&learnt) {
                        return ImpliedLiterals::Unsatisfiable { learnt };
                    }
                }
                SearchResult::Unknown => budget = self.grow_budget(budget),
            }
        }

        let vars: Vec<Var> = component
            .vars()
            .iter()
            .copied()
            .filter(|&var| !projected || self.is_projected(var))
            .collect();
        let mut budget = self.config.probe_budget;
        let mut complete = true;
        loop {
            let candidates = self.backbone_candidates(&vars, ledger);
            if candidates.is_empty() {
                break;
            }
            trace!("backbone pass over {} candidates", candidates.len());
            let mut progress = false;
            let mut postponed = 0;
            for lit in candidates {
                // forced or ruled out earlier in this pass
                if self.assignment[lit.var()].is_some()
                    || ledger.unanimous(lit.var()) != Some(lit.is_positive())
                {
                    continue;
                }
                match self.probe(component, lit, budget, ledger) {
                    Probe::Forced => {
                        self.stats.backbone.forced += 1;
                        progress = true;
                    }
                    Probe::Mismatch(forced) => {
                        trace!("probing {lit} forced {forced}");
                        self.stats.backbone.mismatched_uip += 1;
                        progress = true;
                    }
                    Probe::Model => progress = true,
                    Probe::Postponed => {
                        self.stats.backbone.postponed += 1;
                        postponed += 1;
                    }
                    Probe::Unsatisfiable(learnt) => {
                        return ImpliedLiterals::Unsatisfiable { learnt };
                    }
                }
            }
            if postponed > 0 {
                budget = self.grow_budget(budget);
            }
            if !progress {
                complete = postponed == 0;
                break;
            }
        }
        ImpliedLiterals::Forced { literals: Vec::new(), complete }
    }

    /// Open variables on which all models agree, most active first.
    fn backbone_candidates(&self, vars: &[Var], ledger: &ModelLedger) -> Vec<Lit> {
        let mut candidates: Vec<Lit> = ledger
            .candidates(vars)
            .into_iter()
            .filter(|lit| self.assignment[lit.var()].is_none())
            .collect();
        candidates.sort_by_key(|&lit| Reverse(self.activity.score(lit)));
        candidates
    }

    fn grow_budget(&self, budget: u64) -> u64 {
        // budgets stay far below the precision limit of f64
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let grown = (budget as f64 * self.config.budget_growth).ceil() as u64;
        grown.max(budget + 1)
    }

    /// Assumes `!lit` on a fresh level and tries to refute it.
    fn probe(
        &mut self,
        component: &Component,
        lit: Lit,
        budget: u64,
        ledger: &mut ModelLedger,
    ) -> Probe {
        self.stats.backbone.probes += 1;
        let entry = self.decision_level();
        self.trail.new_level();
        self.assign(!lit, Reason::Decision);
        if let Some(conflict) = self.propagate() {
            // resolves towards the probe, so the clause asserts `lit`
            let learnt = self.refute(conflict);
            self.backtrack_to(entry);
            return self.apply_probe_refutation(lit, &learnt);
        }
        let result = self.search(component, Some(budget));
        self.backtrack_to(entry);
        match result {
            SearchResult::Satisfiable(model) => {
                self.stats.backbone.models += 1;
                ledger.add(model);
                Probe::Model
            }
            SearchResult::Refuted(learnt) => self.apply_probe_refutation(lit, &learnt),
            SearchResult::Unknown => Probe::Postponed,
        }
    }

    fn apply_probe_refutation(&mut self, lit: Lit, learnt: &Learnt) -> Probe {
        match self.apply_refutation(learnt) {
            Err(learnt) => Probe::Unsatisfiable(learnt),
            Ok(()) if learnt.lits[0] == lit => Probe::Forced,
            Ok(()) => Probe::Mismatch(learnt.lits[0]),
        }
    }

    /// Asserts the first literal of a refuting clause on the current level
    /// and propagates.
    ///
    /// Returns a clause falsified on the current level if the component
    /// turned out to be unsatisfiable.
    fn apply_refutation(&mut self, learnt: &Learnt) -> Result<(), Vec<Lit>> {
        let Some(&first) = learnt.lits.first() else {
            self.set_conflicted();
            return Err(Vec::new());
        };
        match self.assignment.lit_value(first) {
            Some(true) => {}
            Some(false) => return Err(learnt.lits.clone()),
            None => {
                trace!("assert {first} on level {}", self.decision_level());
                self.assert_learnt(learnt);
            }
        }
        match self.propagate() {
            Some(conflict) => Err(self.refute(conflict).lits),
            None => Ok(()),
        }
    }

    /// Computes the backbone with an external engine over the open part of
    /// the component.
    fn backbone_external(
        &mut self,
        component: &Component,
        ledger: &mut ModelLedger,
        projected: bool,
    ) -> Result<ImpliedLiterals, ToolError> {
        if let Some(conflict) = self.propagate() {
            return Ok(ImpliedLiterals::Unsatisfiable { learnt: self.refute(conflict).lits });
        }
        let open: Vec<Var> = component
            .vars()
            .iter()
            .copied()
            .filter(|&var| self.assignment[var].is_none())
            .collect();
        let renaming = Renaming::new(&open, self.var_count);
        let mut engine = BackboneEngine::<ExternalSolver>::new(renaming.len());
        for &clause_id in component.clauses() {
            if self.is_satisfied(clause_id) {
                continue;
            }
            let lits: Vec<Lit> =
                self.clauses[clause_id].iter().filter_map(|&lit| renaming.rename(lit)).collect();
            engine.add_clause(&lits);
        }
        for &var in &open {
            for lit in [var.positive(), var.negative()] {
                for &other in self.clauses.binary.partners(lit) {
                    if lit < other {
                        if let (Some(a), Some(b)) = (renaming.rename(lit), renaming.rename(other)) {
                            engine.add_clause(&[a, b]);
                        }
                    }
                }
            }
        }
        for model in ledger.models() {
            let renamed: Option<Vec<Lit>> = open
                .iter()
                .map(|&var| {
                    let value = model.value(var)?;
                    renaming.rename(var.lit(value))
                })
                .collect();
            if let Some(renamed) = renamed {
                engine.add_model(&renamed);
            }
        }

        let control = OutputControl {
            short_learnt: self.config.implied_binaries,
            ..OutputControl::default()
        };
        let answer = engine.run(control)?;
        if !answer.satisfiable {
            debug!("external engine refuted the component");
            return Ok(ImpliedLiterals::Unsatisfiable { learnt: self.decision_clause() });
        }
        for renamed in &answer.models {
            let mut model = self.capture_model();
            for &lit in renamed {
                model.assign(renaming.original(lit));
            }
            self.stats.backbone.models += 1;
            ledger.add(model);
        }

        let start = self.trail.len();
        for &unit in &answer.units {
            let lit = renaming.original(unit);
            if (projected && !self.is_projected(lit.var())) || self.assignment[lit.var()].is_some()
            {
                continue;
            }
            self.stats.backbone.forced += 1;
            let learnt = self.learn_implied(&[lit]);
            self.assert_learnt(&learnt);
        }
        for &[a, b] in &answer.binaries {
            let (a, b) = (renaming.original(a), renaming.original(b));
            if self.assignment[a.var()].is_some()
                || self.assignment[b.var()].is_some()
                || self.clauses.binary.implied(!a).contains(&b)
            {
                continue;
            }
            trace!("implied binary clause ({a} {b})");
            self.stats.backbone.implied_binaries += 1;
            self.learn_implied(&[a, b]);
        }
        if let Some(conflict) = self.propagate_from(start) {
            return Ok(ImpliedLiterals::Unsatisfiable { learnt: self.refute(conflict).lits });
        }
        Ok(ImpliedLiterals::Forced { literals: Vec::new(), complete: true })
    }

    /// Stores `implied ∨ !decisions`, the clause justifying a unit or binary
    /// clause found outside of the solver.
    ///
    /// The literals of `implied` have to be unassigned.
    fn learn_implied(&mut self, implied: &[Lit]) -> Learnt {
        let mut lits = implied.to_vec();
        // the latest decision is watched next to a unit
        lits.extend(self.decision_clause().into_iter().rev());
        let reason = match self.clauses.add(&lits, true) {
            Stored::Unit(_) => Reason::Decision,
            Stored::Binary([_, other]) => Reason::Binary(other),
            Stored::Long(clause_id) => {
                self.watches.watch_clause(clause_id, self.clauses[clause_id].watched());
                Reason::Long(clause_id)
            }
        };
        Learnt { lits, reason }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::Config, model::ModelPool, solver::DecLvl};

    fn lit(dimacs: i32) -> Lit {
        Lit::from_dimacs(dimacs)
    }

    fn forced(result: ImpliedLiterals) -> Vec<Lit> {
        let ImpliedLiterals::Forced { mut literals, complete } = result else {
            panic!("component is satisfiable");
        };
        assert!(complete);
        literals.sort_unstable();
        literals
    }

    fn formula() -> crate::cnf::Cnf {
        // 1 and 2 are implied, 3 and 4 are free to choose as long as one is true
        cnf_formula![
            1 2;
            1 -2;
            -1 2 5;
            -5 2;
            3 4;
        ]
    }

    #[test]
    fn native_backbone() {
        let mut solver = Solver::from_cnf(&formula(), Config::default());
        let component = solver.init_component();
        let mut ledger = ModelLedger::default();
        let literals = forced(solver.implied_literals(&component, &mut ledger).unwrap());
        assert_eq!(literals, vec![lit(1), lit(2)]);
        assert!(!ledger.is_empty());
        assert_eq!(solver.decision_level(), DecLvl::ROOT);
        assert_eq!(solver.value(lit(2)), Some(true));
    }

    #[test]
    fn external_backbone() {
        let config =
            Config { implication_engine: ImplicationEngine::External, ..Config::default() };
        let mut solver = Solver::from_cnf(&formula(), config);
        let component = solver.init_component();
        let mut ledger = ModelLedger::default();
        let literals = forced(solver.implied_literals(&component, &mut ledger).unwrap());
        assert_eq!(literals, vec![lit(1), lit(2)]);
        assert!(ledger.models().iter().all(|model| model.satisfies(lit(1))));
    }

    #[test]
    fn projected_backbone() {
        let mut solver = Solver::from_cnf(&formula(), Config::default());
        solver.set_projection(&[Var::from_dimacs(3), Var::from_dimacs(4)]);
        let component = solver.init_component();
        let mut ledger = ModelLedger::default();
        let ImpliedLiterals::Forced { literals, .. } =
            solver.implied_literals_projected(&component, &mut ledger).unwrap()
        else {
            panic!("component is satisfiable");
        };
        assert!(literals.iter().all(|lit| lit.var() != Var::from_dimacs(3)));
        assert!(literals.iter().all(|lit| lit.var() != Var::from_dimacs(4)));
    }

    #[test]
    fn unsatisfiable_under_decision() {
        let cnf = cnf_formula![
            -1 2 3;
            -1 -2 3;
            -1 2 -3;
            -1 -2 -3;
            1 4;
        ];
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let component = Component::new(
            [2, 3].into_iter().map(Var::from_dimacs).collect(),
            solver.init_component().clauses().to_vec(),
        );
        assert_eq!(solver.decide(lit(1)), Ok(()));
        let mut ledger = ModelLedger::default();
        let result = solver.implied_literals(&component, &mut ledger).unwrap();
        let ImpliedLiterals::Unsatisfiable { learnt } = result else {
            panic!("1 contradicts the clauses over 2 and 3");
        };
        assert!(learnt.iter().all(|&l| solver.value(l) == Some(false)));
        assert!(learnt.contains(&lit(-1)));
        assert_eq!(solver.decision_level(), DecLvl::ROOT.successor());
    }

    #[test]
    fn ledger_models_are_reused() {
        let mut solver = Solver::from_cnf(&formula(), Config::default());
        let component = solver.init_component();
        let mut pool = ModelPool::default();
        let mut ledger = ModelLedger::default();
        for assignment in [[1, 2, 3, 4, 5], [1, 2, -3, 4, -5], [1, 2, 3, -4, 5]] {
            let mut model = pool.allocate(5);
            assignment.into_iter().for_each(|l| model.assign(lit(l)));
            ledger.add(model);
        }
        let literals = forced(solver.implied_literals(&component, &mut ledger).unwrap());
        assert_eq!(literals, vec![lit(1), lit(2)]);
        // only 1 and 2 were candidates
        assert!(solver.statistics().backbone.probes <= 2);
    }

    #[test]
    fn root_conflict_is_unsatisfiable() {
        for engine in [ImplicationEngine::Native, ImplicationEngine::External] {
            let config = Config { implication_engine: engine, ..Config::default() };
            let mut solver = Solver::from_cnf(&cnf_formula![-4; 4; 1 2;], config);
            assert!(solver.is_conflicted());
            let component = solver.init_component();
            let mut pool = ModelPool::default();
            let mut ledger = ModelLedger::default();
            for assignment in [[1, -2], [-1, 2]] {
                let mut model = pool.allocate(4);
                assignment.into_iter().for_each(|l| model.assign(lit(l)));
                ledger.add(model);
            }
            assert_eq!(
                solver.implied_literals(&component, &mut ledger).unwrap(),
                ImpliedLiterals::Unsatisfiable { learnt: Vec::new() },
                "{engine:?}"
            );
            ledger.release(&mut pool);
        }
    }

    #[test]
    fn external_binaries_are_learnt() {
        let config = Config {
            implication_engine: ImplicationEngine::External,
            implied_binaries: true,
            ..Config::default()
        };
        // 1 implies 2 through 3, nothing is forced
        let mut solver = Solver::from_cnf(&cnf_formula![-1 3; -3 2; 1 4 5;], config);
        let component = solver.init_component();
        let mut ledger = ModelLedger::default();
        assert!(forced(solver.implied_literals(&component, &mut ledger).unwrap()).is_empty());
        assert!(solver.statistics().backbone.implied_binaries > 0);
        assert!(solver.clauses.binary.implied(lit(1)).contains(&lit(2)));
        assert!(solver.clauses.binary.implied(lit(-2)).contains(&lit(-1)));
        // original binaries are not stored twice
        let twice = solver.clauses.binary.implied(lit(1)).iter().filter(|&&l| l == lit(3));
        assert_eq!(twice.count(), 1);
    }
}
