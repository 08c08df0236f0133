use cardinal::{
    cli::Cli,
    cnf::Cnf,
    counter::ModelCounter,
    dimacs::{DimacsParser, ExtendedParseError},
    model::ModelLedger,
    solver::{ImpliedLiterals, Solver},
    SolverResult,
};
use clap::Parser;
use miette::Result;
use std::io::Cursor;
use tracing_subscriber::EnvFilter;

fn main() -> Result<SolverResult> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    cli.config.validate()?;
    let contents = cli.content()?;
    let reader = Cursor::new(&contents);

    let cnf: Cnf = match DimacsParser::new(reader).parse() {
        Ok(cnf) => cnf,
        Err(err) => Err(ExtendedParseError { source_code: contents, related: vec![err] })?,
    };

    if let Some(kind) = cli.counter {
        let counter = ModelCounter::new(kind, cli.counter_program.clone(), cli.counter_timeout());
        println!("c model count: {}", counter.count(&cnf)?);
    }

    let mut solver = Solver::from_cnf(&cnf, cli.config.clone());
    if cli.substitute {
        let substitution = solver.substitute_equivalences();
        println!("c substituted variables: {}", substitution.len());
    }
    let component = solver.init_component();

    if cli.order {
        let order = solver.compute_var_order(&component)?;
        let vars: Vec<String> = order.vars().iter().map(ToString::to_string).collect();
        println!("c order: {}", vars.join(" "));
    }

    if cli.components {
        let decomposition = solver.decompose_dynamic(&component);
        for (idx, piece) in decomposition.components.iter().enumerate() {
            let vars: Vec<String> = piece.vars().iter().map(ToString::to_string).collect();
            println!("c component {}: {}", idx + 1, vars.join(" "));
        }
        println!("c free variables: {}", decomposition.free.len());
    }

    if cli.backbone {
        let mut ledger = ModelLedger::default();
        let implied = if cnf.projection.is_some() {
            solver.implied_literals_projected(&component, &mut ledger)?
        } else {
            solver.implied_literals(&component, &mut ledger)?
        };
        match implied {
            ImpliedLiterals::Unsatisfiable { .. } => println!("c backbone: unsatisfiable"),
            ImpliedLiterals::Forced { literals, complete } => {
                let lits: Vec<String> = literals.iter().map(ToString::to_string).collect();
                let suffix = if complete { "" } else { " (incomplete)" };
                println!("c backbone{suffix}: {}", lits.join(" "));
            }
        }
        ledger.release(solver.pool_mut());
    }

    let result = solver.solve();
    println!("result status: {result}");

    Ok(result)
}
