//! Scenario and property tests of the solver as a whole.

use super::{ImpliedLiterals, SearchResult, Solver};
use crate::{
    cnf::{
        strategy::{cnf, projected_cnf},
        Cnf,
    },
    component::Component,
    config::{Branching, Config, ImplicationEngine, Traversal},
    literal::{Lit, Var},
    model::{ModelLedger, ModelPool},
    SolverResult,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn lit(dimacs: i32) -> Lit {
    Lit::from_dimacs(dimacs)
}

/// All models of `cnf` over its variables, by enumeration.
fn brute_force_models(cnf: &Cnf) -> Vec<Vec<bool>> {
    let vars = cnf.num_variables();
    assert!(vars <= 16, "enumeration is limited to small formulas");
    (0..1u32 << vars)
        .map(|bits| (0..vars).map(|idx| bits & (1 << idx) != 0).collect::<Vec<bool>>())
        .filter(|values| {
            cnf.clauses.iter().all(|clause| {
                clause.iter().any(|lit| values[lit.var().index()] == lit.is_positive())
            })
        })
        .collect()
}

/// The literals over `vars` true in every model.
fn brute_force_backbone(models: &[Vec<bool>], vars: &[Var]) -> BTreeSet<Lit> {
    vars.iter()
        .filter_map(|&var| {
            let value = models.first()?[var.index()];
            models.iter().all(|model| model[var.index()] == value).then(|| var.lit(value))
        })
        .collect()
}

/// The clauses of `cnf` that are stored, tautologies are dropped and their
/// variables may stay unassigned in models.
fn stored_clauses(cnf: &Cnf) -> impl Iterator<Item = &Vec<Lit>> {
    cnf.clauses.iter().filter(|clause| !clause.iter().any(|&lit| clause.contains(&!lit)))
}

fn falsified(solver: &Solver, cnf: &Cnf) -> bool {
    cnf.clauses
        .iter()
        .any(|clause| clause.iter().all(|&lit| solver.value(lit) == Some(false)))
}

fn branching() -> impl Strategy<Value = Branching> {
    prop_oneof![
        Just(Branching::Static),
        Just(Branching::Vsads),
        Just(Branching::Dlcs),
        Just(Branching::Dlcp),
        Just(Branching::MinFill),
    ]
}

#[test]
fn exclusive_pair() {
    let cnf = cnf_formula![
        1 2;
        -1 -2;
    ];
    let mut solver = Solver::from_cnf(&cnf, Config::default());
    assert_eq!(solver.propagate_trail(), Ok(()));
    assert_eq!(solver.value(lit(1)), None);
    assert_eq!(solver.value(lit(2)), None);

    let component = solver.init_component();
    let mut ledger = ModelLedger::default();
    let result = solver.implied_literals(&component, &mut ledger).unwrap();
    assert_eq!(result, ImpliedLiterals::Forced { literals: Vec::new(), complete: true });
    assert!(ledger.models().iter().any(|model| model.satisfies(lit(1))));
    assert!(ledger.models().iter().any(|model| model.satisfies(lit(2))));

    assert_eq!(solver.decide(lit(1)), Ok(()));
    assert_eq!(solver.value(lit(2)), Some(false));
}

#[test]
fn propagation_chain() {
    let cnf = cnf_formula![
        1;
        -1 2;
        -2 3;
    ];
    let mut solver = Solver::from_cnf(&cnf, Config::default());
    assert_eq!(solver.propagate_trail(), Ok(()));
    assert!((1..=3).all(|var| solver.value(lit(var)) == Some(true)));
    assert_eq!(solver.statistics().search.decisions, 0);
}

#[test]
fn all_binary_combinations() {
    let cnf = cnf_formula![
        1 2;
        -1 2;
        1 -2;
        -1 -2;
    ];
    let mut solver = Solver::from_cnf(&cnf, Config::default());
    let component = solver.init_component();
    let SearchResult::Refuted(learnt) = solver.search(&component, None) else {
        panic!("formula is unsatisfiable");
    };
    assert!(learnt.is_empty());
    assert_eq!(solver.solve(), SolverResult::Unsatisfiable);
}

#[test]
fn two_components() {
    let cnf = cnf_formula![
        1 2;
        -1 -2;
        3 4;
        -3 -4;
    ];
    let mut solver = Solver::from_cnf(&cnf, Config::default());
    let component = solver.init_component();
    let decomposition = solver.decompose_dynamic(&component);
    assert_eq!(decomposition.components.len(), 2);
    assert!(decomposition.free.is_empty());
    let vars: Vec<Vec<i32>> = decomposition
        .components
        .iter()
        .map(|component| component.vars().iter().map(|var| var.to_dimacs()).collect())
        .collect();
    assert!(vars.contains(&vec![1, 2]));
    assert!(vars.contains(&vec![3, 4]));
}

#[test]
fn refuted_candidate_becomes_unit() {
    // 5 is implied, 1 to 4 are not
    let cnf = cnf_formula![
        5 1 2;
        5 -1 2;
        5 1 -2;
        5 -1 -2;
        3 4;
    ];
    let mut solver = Solver::from_cnf(&cnf, Config::default());
    let component = solver.init_component();

    let mut pool = ModelPool::default();
    let mut ledger = ModelLedger::default();
    for assignment in [[1, 2, 3, -4, 5], [-1, -2, -3, 4, 5]] {
        let mut model = pool.allocate(5);
        assignment.into_iter().for_each(|l| model.assign(lit(l)));
        ledger.add(model);
    }

    let result = solver.implied_literals(&component, &mut ledger).unwrap();
    assert_eq!(result, ImpliedLiterals::Forced { literals: vec![lit(5)], complete: true });
    let stats = &solver.statistics().backbone;
    assert_eq!(stats.probes, 1);
    assert_eq!(stats.forced, 1);
    assert!(solver.clauses.units().contains(&lit(5)));
    assert_eq!(solver.value(lit(5)), Some(true));
}

#[test]
fn weighted_counts_and_static_order_solve() {
    let cnf = cnf_formula![
        1 2 3;
        -1 -2;
        -2 -3;
        -1 -3;
        2 4 5;
    ];
    let config = Config {
        branching: Branching::Static,
        weighted_counts: true,
        ..Config::default()
    };
    let mut solver = Solver::from_cnf(&cnf, config);
    let component = solver.init_component();
    solver.compute_var_order(&component).unwrap();
    assert_eq!(solver.solve(), SolverResult::Satisfiable);
}

proptest! {
    #[test]
    fn solve_matches_brute_force(cnf in cnf(8, 0..40, 1..4), branching in branching()) {
        let config = Config { branching, ..Config::default() };
        let mut solver = Solver::from_cnf(&cnf, config);
        let expected = if brute_force_models(&cnf).is_empty() {
            SolverResult::Unsatisfiable
        } else {
            SolverResult::Satisfiable
        };
        prop_assert_eq!(solver.solve(), expected);
    }

    #[test]
    fn models_satisfy_every_clause(cnf in cnf(10, 0..40, 1..5), branching in branching()) {
        let config = Config { branching, max_learnts: 4, ..Config::default() };
        let mut solver = Solver::from_cnf(&cnf, config);
        let component = solver.init_component();
        if let SearchResult::Satisfiable(model) = solver.search(&component, None) {
            for clause in stored_clauses(&cnf) {
                prop_assert!(clause.iter().any(|&lit| model.satisfies(lit)));
            }
        } else {
            prop_assert!(brute_force_models(&cnf).is_empty());
        }
    }

    #[test]
    fn propagation_is_sound(
        cnf in cnf(10, 0..40, 1..5),
        decisions in proptest::collection::vec(crate::literal::strategy::lit(0u32..10), 0..6),
    ) {
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        if solver.is_conflicted() || solver.propagate_trail().is_err() {
            return Ok(());
        }
        prop_assert!(!falsified(&solver, &cnf));
        for decision in decisions {
            if solver.value(decision).is_some() {
                continue;
            }
            if solver.decide(decision).is_err() {
                break;
            }
            prop_assert!(!falsified(&solver, &cnf));
        }
    }

    #[test]
    fn components_partition_open_variables(
        cnf in cnf(12, 0..30, 1..5),
        decisions in proptest::collection::vec(crate::literal::strategy::lit(0u32..12), 0..4),
        traversal in prop_oneof![Just(Traversal::Uniform), Just(Traversal::ArityClassed)],
    ) {
        let config = Config { traversal, ..Config::default() };
        let mut solver = Solver::from_cnf(&cnf, config);
        if solver.is_conflicted() || solver.propagate_trail().is_err() {
            return Ok(());
        }
        let source = solver.init_component();
        for decision in decisions {
            if solver.value(decision).is_none() && solver.decide(decision).is_err() {
                return Ok(());
            }
        }
        let decomposition = solver.decompose_dynamic(&source);

        let mut seen = BTreeSet::new();
        for component in &decomposition.components {
            for &var in component.vars() {
                prop_assert!(seen.insert(var), "{} is in two components", var);
            }
            for &clause_id in component.clauses() {
                for &lit in solver.clauses[clause_id].lits() {
                    if solver.value(lit).is_none() {
                        prop_assert!(component.contains(lit.var()));
                    }
                }
            }
            for &var in component.vars() {
                for lit in [var.positive(), var.negative()] {
                    for &other in solver.clauses.binary.partners(lit) {
                        if solver.value(other).is_none() && solver.value(lit).is_none() {
                            prop_assert!(component.contains(other.var()));
                        }
                    }
                }
            }
        }
        for &var in &decomposition.free {
            prop_assert!(seen.insert(var), "{} is free and in a component", var);
        }
        let open: BTreeSet<Var> = source
            .vars()
            .iter()
            .copied()
            .filter(|&var| solver.value(var.positive()).is_none())
            .collect();
        prop_assert_eq!(seen, open);

        let active: Vec<_> =
            source.clauses().iter().copied().filter(|&id| !solver.is_satisfied(id)).collect();
        for clause_id in active {
            let owners = decomposition
                .components
                .iter()
                .filter(|component| component.contains_clause(clause_id))
                .count();
            prop_assert_eq!(owners, 1);
        }
    }

    #[test]
    fn traversals_agree(
        cnf in cnf(10, 0..30, 1..6),
        decisions in proptest::collection::vec(crate::literal::strategy::lit(0u32..10), 0..3),
    ) {
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        if solver.is_conflicted() || solver.propagate_trail().is_err() {
            return Ok(());
        }
        for decision in decisions {
            if solver.value(decision).is_none() && solver.decide(decision).is_err() {
                return Ok(());
            }
        }
        let component = solver.init_component();
        let uniform = solver.primal_graph(&component, Traversal::Uniform);
        let classed = solver.primal_graph(&component, Traversal::ArityClassed);
        prop_assert_eq!(uniform.vertices(), classed.vertices());
        for &var in uniform.vertices() {
            let mut neighbours = classed.neighbours(var).to_vec();
            neighbours.sort_unstable();
            prop_assert_eq!(uniform.neighbours(var), neighbours.as_slice());
        }

        let pieces = |solver: &mut Solver, traversal| {
            solver.config.traversal = traversal;
            let mut pieces: Vec<Vec<Var>> = solver
                .decompose_dynamic(&component)
                .components
                .into_iter()
                .map(|component| component.vars().to_vec())
                .collect();
            pieces.sort();
            pieces
        };
        let uniform = pieces(&mut solver, Traversal::Uniform);
        let classed = pieces(&mut solver, Traversal::ArityClassed);
        prop_assert_eq!(uniform, classed);
    }

    #[test]
    fn backbone_matches_brute_force(
        cnf in cnf(7, 0..25, 1..4),
        engine in prop_oneof![Just(ImplicationEngine::Native), Just(ImplicationEngine::External)],
    ) {
        let config = Config { implication_engine: engine, ..Config::default() };
        let mut solver = Solver::from_cnf(&cnf, config);
        let component = solver.init_component();
        let models = brute_force_models(&cnf);
        let mut ledger = ModelLedger::default();
        match solver.implied_literals(&component, &mut ledger).unwrap() {
            ImpliedLiterals::Unsatisfiable { .. } => prop_assert!(models.is_empty()),
            ImpliedLiterals::Forced { literals, complete } => {
                prop_assert!(!models.is_empty());
                let forced: BTreeSet<Lit> = literals.iter().copied().collect();
                prop_assert_eq!(forced.len(), literals.len());
                for lit in &forced {
                    prop_assert!(!forced.contains(&!*lit));
                }
                let expected = brute_force_backbone(&models, component.vars());
                if complete {
                    prop_assert_eq!(forced, expected);
                } else {
                    prop_assert!(forced.is_subset(&expected));
                }
                for model in ledger.models() {
                    for clause in stored_clauses(&cnf) {
                        prop_assert!(clause.iter().any(|&lit| model.satisfies(lit)));
                    }
                }
            }
        }
    }

    #[test]
    fn projected_backbone_is_restricted(cnf in projected_cnf(7, 0..25, 1..4)) {
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let component = solver.init_component();
        let models = brute_force_models(&cnf);
        let mut ledger = ModelLedger::default();
        if let ImpliedLiterals::Forced { literals, complete } =
            solver.implied_literals_projected(&component, &mut ledger).unwrap()
        {
            let forced: BTreeSet<Lit> = literals.into_iter().collect();
            let expected = brute_force_backbone(&models, component.vars());
            // propagation may force literals outside the projection
            prop_assert!(forced.is_subset(&expected));
            if !complete {
                return Ok(());
            }
            let projection = cnf.projection.clone().unwrap_or_default();
            for lit in expected.iter().filter(|lit| projection.contains(&lit.var())) {
                prop_assert!(forced.contains(lit));
            }
        }
    }

    #[test]
    fn substitution_preserves_satisfiability(cnf in cnf(8, 0..40, 1..4)) {
        let mut solver = Solver::from_cnf(&cnf, Config::default());
        let substitution = solver.substitute_equivalences();
        let component = solver.init_component();
        let satisfiable = !brute_force_models(&cnf).is_empty();
        match solver.search(&component, None) {
            SearchResult::Satisfiable(mut model) => {
                prop_assert!(satisfiable);
                substitution.extend_model(&mut model);
                for clause in &cnf.clauses {
                    // variables outside every clause stay unassigned
                    let assigned = clause.iter().all(|lit| model.value(lit.var()).is_some());
                    if assigned {
                        prop_assert!(clause.iter().any(|&lit| model.satisfies(lit)));
                    }
                }
            }
            SearchResult::Refuted(_) => prop_assert!(!satisfiable),
            SearchResult::Unknown => prop_assert!(false, "search without budget"),
        }
    }
}

#[test]
fn component_of_given_vars_only() {
    let cnf = cnf_formula![
        1 2 3;
        -3 4;
    ];
    let mut solver = Solver::from_cnf(&cnf, Config::default());
    let component = Component::new(vec![Var::from_dimacs(1), Var::from_dimacs(2)], Vec::new());
    let SearchResult::Satisfiable(model) = solver.search(&component, None) else {
        panic!("nothing constrains 1 and 2");
    };
    assert!(model.value(Var::from_dimacs(1)).is_some());
    assert_eq!(model.value(Var::from_dimacs(4)), None);
}
