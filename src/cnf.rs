//! A straight-forward representation of a propositional formula in CNF.

use crate::{
    dimacs::FromDimacs,
    literal::{Lit, Var},
};
use ordered_float::NotNan;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cnf {
    /// The variable count of the header, may exceed the variables used
    pub var_count: usize,
    pub clauses: Vec<Vec<Lit>>,
    /// Variables of `c p show` lines
    pub projection: Option<Vec<Var>>,
    /// Literal weights of `c p weight` lines
    pub weights: Vec<(Lit, NotNan<f64>)>,
}

impl Cnf {
    #[must_use]
    pub fn new(clauses: &[&[i32]]) -> Self {
        let clauses = clauses
            .iter()
            .map(|&lits| lits.iter().map(|&lit| Lit::from_dimacs(lit)).collect())
            .collect();
        let mut cnf = Cnf { clauses, ..Cnf::default() };
        cnf.var_count = cnf.num_variables();
        cnf
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// The header count or the largest variable mentioned anywhere, whichever
    /// is larger.
    pub fn num_variables(&self) -> usize {
        let used = self
            .clauses
            .iter()
            .flatten()
            .map(|lit| lit.var())
            .chain(self.projection.iter().flatten().copied())
            .chain(self.weights.iter().map(|(lit, _)| lit.var()))
            .map(|var| var.index() + 1)
            .max()
            .unwrap_or_default();
        used.max(self.var_count)
    }

    pub fn is_weighted(&self) -> bool {
        !self.weights.is_empty()
    }

    /// The weight of `lit`, the last weight line wins. Literals without a
    /// weight line weigh 1.
    pub fn weight_of(&self, lit: Lit) -> f64 {
        self.weights
            .iter()
            .rev()
            .find(|&&(weighted, _)| weighted == lit)
            .map_or(1.0, |&(_, weight)| weight.into_inner())
    }
}

impl FromDimacs for Cnf {
    fn set_num_variables(&mut self, variables: u32) {
        self.var_count = variables as usize;
    }

    fn set_num_clauses(&mut self, clauses: u32) {
        self.clauses.reserve(clauses as usize);
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        self.clauses.push(lits.to_owned());
    }

    fn project(&mut self, vars: &[Var]) {
        self.projection.get_or_insert_with(Vec::new).extend_from_slice(vars);
    }

    fn weight(&mut self, lit: Lit, weight: NotNan<f64>) {
        self.weights.push((lit, weight));
    }
}

impl std::fmt::Display for Cnf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_variables(), self.num_clauses())?;
        if let Some(projection) = &self.projection {
            write!(f, "c p show")?;
            for var in projection {
                write!(f, " {var}")?;
            }
            writeln!(f, " 0")?;
        }
        for (lit, weight) in &self.weights {
            writeln!(f, "c p weight {lit} {weight} 0")?;
        }
        for clause in &self.clauses {
            for lit in clause {
                write!(f, "{lit} ")?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
macro_rules! cnf_core {
    ($clauses:expr,) => {
		(crate::cnf::Cnf::new(&$clauses))
	};
    ($clauses:expr, $( $x:literal )* ; $($tail:tt)* ) => {{
		$clauses.push(&[ $( $x ),* ]);
        cnf_core![$clauses, $($tail)*]
    }};
}

/// Macro that creates a [`Cnf`] instance from a DIMACS-like representation.
/// The main differences are:
/// * No support for comments
/// * No header line
/// * Clauses are seperated by `;`, whereas DIMACS uses `0`.
///
/// # Example
/// ```
/// let cnf = cnf_formula![
///     1 2;
///     -1 -2;
/// ];
/// ```
///
#[cfg(test)]
macro_rules! cnf_formula {
	($($tail:tt)*) => {
		 {
			 let mut clauses: Vec<&[i32]> = Vec::new();
			 cnf_core![clauses, $($tail)*]
		 }

	};
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cnf_macro() {
        let cnf = cnf_formula![
            1 2;
            -3;
        ];
        assert_eq!(cnf.num_clauses(), 2);
        assert_eq!(cnf.num_variables(), 3);
        assert!(!cnf.is_weighted());
    }

    #[test]
    fn display() {
        let mut cnf = cnf_formula![
            1 -2;
            2;
        ];
        cnf.project(&[Var::from_dimacs(2)]);
        cnf.weight(Lit::from_dimacs(-1), NotNan::new(0.25).unwrap());
        assert_eq!(
            cnf.to_string(),
            "p cnf 2 2\nc p show 2 0\nc p weight -1 0.25 0\n1 -2 0\n2 0\n"
        );
        assert!((cnf.weight_of(Lit::from_dimacs(-1)) - 0.25).abs() < f64::EPSILON);
        assert!((cnf.weight_of(Lit::from_dimacs(1)) - 1.0).abs() < f64::EPSILON);
    }
}
