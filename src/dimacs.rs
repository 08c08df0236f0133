//! Parser for the DIMACS CNF input file format.
//!
//! Besides clauses, two comment annotations of the model counting
//! competition are understood: `c p show <vars> 0` declares projection
//! variables and `c p weight <lit> <weight> 0` assigns a literal weight.

use crate::literal::{Lit, Var};
use miette::{Diagnostic, SourceSpan};
use ordered_float::NotNan;
use std::{
    io::{Bytes, Read},
    iter::Peekable,
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("Cannot parse DIMACS")]
#[diagnostic()]
pub struct ExtendedParseError {
    #[source_code]
    pub source_code: Vec<u8>,

    #[related]
    pub related: Vec<ParseError>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("The underlying IO has failed")]
    IO(#[from] std::io::Error),

    #[error("Invalid header: {}", reason)]
    #[diagnostic()]
    InvalidHeader {
        reason: HeaderError,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Missing DIMACS header, i.e., `p cnf ...`")]
    MissingHeader,

    #[error("Unexpected end of file")]
    UnexpectedEndOfFile {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Unexpected character")]
    #[diagnostic()]
    UnexpectedChar {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Invalid integer")]
    InvalidInt {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Invalid weight, expected a finite number")]
    InvalidWeight {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Variable {val} is out of bound")]
    VariableOutOfBound {
        val: i64,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Literal {val} is out of bound")]
    LiteralOutOfBound {
        val: i64,

        #[label]
        err_span: SourceSpan,
    },

    #[error(
        "Number of clauses does not match header: expected {}, but found {} clauses",
        expected,
        found
    )]
    NumClausesMismatch { expected: u32, found: u32 },
}

#[derive(Debug, Error, Diagnostic)]
pub enum HeaderError {
    #[error("`p cnf` prefix missing or invalid")]
    InvalidPrefix,

    #[error("Invalid variable count")]
    InvalidVariableCount,

    #[error("Invalid clause count")]
    InvalidClauseCount,
}

/// An instance of an implementor can be derived from a textual representation
/// of a formula in the DIMACS format.
pub trait FromDimacs: Default {
    fn set_num_variables(&mut self, variables: u32);
    fn set_num_clauses(&mut self, clauses: u32);
    fn add_clause(&mut self, lits: &[Lit]);

    /// Variables of a `c p show` line, there may be several lines.
    fn project(&mut self, _vars: &[Var]) {}

    fn weight(&mut self, _lit: Lit, _weight: NotNan<f64>) {}
}

#[derive(Debug)]
pub struct DimacsParser<R: Read> {
    bytes: Peekable<Bytes<R>>,
    num_clauses: u32,
    num_clauses_read: u32,

    offset: usize,
}

impl<R: Read> DimacsParser<R> {
    pub fn new(reader: R) -> Self {
        Self { bytes: reader.bytes().peekable(), offset: 0, num_clauses: 0, num_clauses_read: 0 }
    }

    /// Parses a DIMACS file and returns the representation `D`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the read content is not valid DIMACS.
    /// The function propagates underlying IO failures.
    pub fn parse<D: FromDimacs>(&mut self) -> Result<D, ParseError> {
        let mut result = D::default();
        self.parse_comment_or_header(&mut result)?;
        self.parse_clauses(&mut result)?;

        // check that number of clauses match the header
        if self.num_clauses_read != self.num_clauses {
            return Err(ParseError::NumClausesMismatch {
                expected: self.num_clauses,
                found: self.num_clauses_read,
            });
        }

        Ok(result)
    }

    /// Either `c ...` or `p cnf ...`
    fn parse_comment_or_header<D: FromDimacs>(
        &mut self,
        result: &mut D,
    ) -> Result<(), ParseError> {
        while let Some(b) = self.next_byte()? {
            match b {
                b'c' => self.parse_comment(result)?,
                b'p' => {
                    // `p cnf [NUM_VARIABLES] [NUM_CLAUSES]` header
                    self.expect(&b" cnf"[..]).map_err(|_| ParseError::InvalidHeader {
                        reason: HeaderError::InvalidPrefix,
                        err_span: self.err_span(),
                    })?;

                    // parse variable count
                    self.skip_whitespace_and_peek()?.ok_or_else(|| {
                        ParseError::UnexpectedEndOfFile { err_span: self.err_span() }
                    })?;
                    let num_variables: u32 =
                        self.parse_int().map_err(|err| ParseError::InvalidHeader {
                            reason: HeaderError::InvalidVariableCount,
                            err_span: err.err_span().unwrap_or_else(|| self.err_span()),
                        })?;

                    // parse clause count
                    self.skip_whitespace_and_peek()?.ok_or_else(|| {
                        ParseError::UnexpectedEndOfFile { err_span: self.err_span() }
                    })?;
                    let num_clauses: u32 =
                        self.parse_int().map_err(|err| ParseError::InvalidHeader {
                            reason: HeaderError::InvalidClauseCount,
                            err_span: err.err_span().unwrap_or_else(|| self.err_span()),
                        })?;

                    self.num_clauses = num_clauses;
                    result.set_num_variables(num_variables);
                    result.set_num_clauses(num_clauses);
                    return Ok(());
                }
                b if b.is_ascii_whitespace() => {
                    // ignore whitespace at the beginning of the file
                }
                _ => return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() }),
            }
        }
        Err(ParseError::MissingHeader)
    }

    /// The remainder of a comment line after the `c`.
    fn parse_comment<D: FromDimacs>(&mut self, result: &mut D) -> Result<(), ParseError> {
        let start = self.err_offset();
        let mut line = Vec::new();
        while let Some(b) = self.next_byte()? {
            if b == b'\n' {
                break;
            }
            line.push(b);
        }
        let Ok(text) = std::str::from_utf8(&line) else {
            // arbitrary bytes are fine in ordinary comments
            return Ok(());
        };
        let mut tokens = tokens(text, start);
        if tokens.next().map(|(token, _)| token) != Some("p") {
            return Ok(());
        }
        match tokens.next() {
            Some(("show", _)) => {
                let mut vars = Vec::new();
                for (token, err_span) in tokens {
                    let var: i64 = token.parse().map_err(|_| ParseError::InvalidInt { err_span })?;
                    if var == 0 {
                        break;
                    }
                    if !(1..=i64::from(Var::MAX_VAR.to_dimacs())).contains(&var) {
                        return Err(ParseError::VariableOutOfBound { val: var, err_span });
                    }
                    vars.push(Var::from_dimacs(var.try_into().expect("checked bound")));
                }
                result.project(&vars);
            }
            Some(("weight", span)) => {
                let (token, err_span) = tokens
                    .next()
                    .ok_or(ParseError::UnexpectedEndOfFile { err_span: span })?;
                let lit: i64 = token.parse().map_err(|_| ParseError::InvalidInt { err_span })?;
                if lit == 0
                    || !(i64::from(Lit::MIN_LIT.to_dimacs())..=i64::from(Lit::MAX_LIT.to_dimacs()))
                        .contains(&lit)
                {
                    return Err(ParseError::LiteralOutOfBound { val: lit, err_span });
                }
                let (token, err_span) =
                    tokens.next().ok_or(ParseError::UnexpectedEndOfFile { err_span })?;
                let weight = token
                    .parse::<f64>()
                    .ok()
                    .filter(|weight| weight.is_finite())
                    .and_then(|weight| NotNan::new(weight).ok())
                    .ok_or(ParseError::InvalidWeight { err_span })?;
                result.weight(Lit::from_dimacs(lit.try_into().expect("checked bound")), weight);
            }
            _ => {}
        }
        Ok(())
    }

    /// Parses clauses and comments until EOF
    fn parse_clauses<D: FromDimacs>(&mut self, result: &mut D) -> Result<(), ParseError> {
        let mut clause = Vec::new();
        while let Some(b) = self.skip_whitespace_and_peek()? {
            match b {
                b'c' => {
                    self.next_byte()?;
                    self.parse_comment(result)?;
                    continue;
                }
                b'-' | (b'0'..=b'9') => {}
                _ => return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() }),
            }
            clause.clear();
            loop {
                self.skip_whitespace_and_peek()?
                    .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?;
                let start_offset = self.err_offset();
                let lit: i32 = self.parse_int()?;
                if lit == 0 {
                    break;
                }
                if !(Lit::MIN_LIT.to_dimacs()..=Lit::MAX_LIT.to_dimacs()).contains(&lit) {
                    return Err(ParseError::LiteralOutOfBound {
                        val: lit.into(),
                        err_span: (start_offset..self.err_offset()).into(),
                    });
                }
                clause.push(Lit::from_dimacs(lit));
            }
            result.add_clause(&clause);
            self.num_clauses_read += 1;
        }
        Ok(())
    }

    /// Consumes the next byte in the input.
    /// Returns the byte or `None` in the case of EOF.
    fn next_byte(&mut self) -> Result<Option<u8>, ParseError> {
        let byte = self.bytes.next().transpose()?;
        if byte.is_some() {
            self.offset += 1;
        }
        Ok(byte)
    }

    /// Returns the next byte value without consuming.
    fn peek_byte(&mut self) -> Option<u8> {
        match self.bytes.peek() {
            Some(Ok(b)) => Some(*b),
            _ => None,
        }
    }

    /// Skips input bytes until a non-ASCII whitespace character is found.
    /// Returns the first non-ASCII whitespace character (if not EOF).
    fn skip_whitespace_and_peek(&mut self) -> Result<Option<u8>, ParseError> {
        while let Some(b) = self.peek_byte() {
            if !b.is_ascii_whitespace() {
                return Ok(Some(b));
            }
            self.next_byte()?;
        }
        Ok(None)
    }

    fn expect(&mut self, value: &[u8]) -> Result<(), ParseError> {
        for (&expected, found) in value.iter().zip(&mut self.bytes) {
            let found = found?;
            self.offset += 1;
            if found != expected {
                return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() });
            }
        }
        Ok(())
    }

    fn parse_int<I>(&mut self) -> Result<I, ParseError>
    where
        I: TryFrom<i64>,
    {
        let start_span = self.err_offset();
        let mut parsed: i64 = 0;
        let mut is_negated = false;
        while let Some(b) = self.next_byte()? {
            match b {
                b'-' => {
                    if is_negated {
                        return Err(ParseError::InvalidInt { err_span: self.err_span() });
                    }
                    is_negated = true;
                }
                b @ b'0'..=b'9' => {
                    let val = i64::from(b - b'0');
                    parsed = if let Some(parsed) =
                        parsed.checked_mul(10).and_then(|res| res.checked_add(val))
                    {
                        parsed
                    } else {
                        // overflow while parsing integer
                        return Err(ParseError::InvalidInt {
                            err_span: (start_span..self.err_offset()).into(),
                        });
                    }
                }
                b => {
                    if !b.is_ascii_whitespace() {
                        return Err(ParseError::InvalidInt {
                            err_span: (start_span..self.err_offset()).into(),
                        });
                    }
                    break;
                }
            }
        }
        if is_negated {
            parsed = -parsed;
        }
        I::try_from(parsed).map_err(|_| {
            ParseError::LiteralOutOfBound {
                val: parsed,
                // reduce end offset by one, as last byte was a whitespace
                err_span: (start_span..self.err_offset().saturating_sub(1)).into(),
            }
        })
    }

    fn err_offset(&self) -> usize {
        self.offset
    }

    fn err_span(&self) -> SourceSpan {
        self.offset.saturating_sub(1).into()
    }
}

/// Whitespace separated tokens of `text` with their spans, `text` starts at
/// byte `offset` of the input.
fn tokens(text: &str, offset: usize) -> impl Iterator<Item = (&str, SourceSpan)> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let rest = &text[pos..];
        pos += rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_whitespace()).len();
        let rest = &text[pos..];
        if rest.is_empty() {
            return None;
        }
        let len = rest.find(|c: char| c.is_ascii_whitespace()).unwrap_or(rest.len());
        let token = (&rest[..len], SourceSpan::from((offset + pos, len)));
        pos += len;
        Some(token)
    })
}

impl ParseError {
    fn err_span(&self) -> Option<SourceSpan> {
        match self {
            ParseError::InvalidInt { err_span }
            | ParseError::LiteralOutOfBound { err_span, .. } => Some(*err_span),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cnf::Cnf;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        #[test]
        fn doesnt_crash(s in ".*") {
            let reader = Cursor::new(s);
            let _cnf: Option<Cnf> = DimacsParser::new(reader).parse().ok();
        }

        #[test]
        fn roundtrip_from_cnf(input in crate::cnf::strategy::projected_cnf(12, 0..100, 0..10)) {
            let dimacs = format!("{input}");
            let reader = Cursor::new(dimacs);
            let parsed: Cnf = DimacsParser::new(reader).parse()?;
            assert_eq!(parsed, input);
        }
    }

    macro_rules! expect_error {
        ( $input:expr, $pat:pat ) => {
            let reader = std::io::Cursor::new(&$input);
            match DimacsParser::new(reader).parse::<crate::cnf::Cnf>() {
                Ok(parsed) => panic!("Expexcted errror but got {:?}", parsed),
                Err(err) => match err {
                    $pat => (),
                    _ => panic!("Unexpected error {:?}", err),
                },
            }
        };
    }

    #[test]
    fn minimal() -> Result<(), ParseError> {
        let dimacs = "p cnf 0 0";
        let reader = Cursor::new(dimacs);
        let cnf: Cnf = DimacsParser::new(reader).parse()?;
        assert_eq!(cnf, Cnf::default());
        Ok(())
    }

    #[test]
    fn simple() -> Result<(), ParseError> {
        let dimacs = "
		c satisfiable.cnf
		p cnf 3 4
		-1 2 -3 0
		2 3 0
		c between clauses
		-2 3 0
		1 3 0
		";
        let reader = Cursor::new(dimacs);
        let cnf: Cnf = DimacsParser::new(reader).parse()?;
        assert_eq!(cnf.num_variables(), 3);
        assert_eq!(cnf.clauses[2], vec![Lit::from_dimacs(-2), Lit::from_dimacs(3)]);
        assert_eq!(cnf.projection, None);
        Ok(())
    }

    #[test]
    fn annotations() -> Result<(), ParseError> {
        let dimacs = "c t pmc\np cnf 4 1\nc p show 1 3 0\nc p show 4 0\nc p weight -2 0.75 0\n\
                      c p weight 3 1e-3 0\n1 2 3 4 0\nc p other things\n";
        let reader = Cursor::new(dimacs);
        let cnf: Cnf = DimacsParser::new(reader).parse()?;
        let projection: Vec<i32> =
            cnf.projection.iter().flatten().map(|var| var.to_dimacs()).collect();
        assert_eq!(projection, vec![1, 3, 4]);
        assert!(cnf.is_weighted());
        assert!((cnf.weight_of(Lit::from_dimacs(-2)) - 0.75).abs() < f64::EPSILON);
        assert!((cnf.weight_of(Lit::from_dimacs(3)) - 1e-3).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn roundtrip() -> Result<(), ParseError> {
        let orig = cnf_formula![
            -1 2 -3;
            2 3;
            -2 3;
            1 3;
        ];
        let dimacs = format!("{orig}");
        let reader = Cursor::new(dimacs);
        let parsed: Cnf = DimacsParser::new(reader).parse()?;
        assert_eq!(orig, parsed);
        Ok(())
    }

    #[test]
    fn missing_header() {
        expect_error!(b"", ParseError::MissingHeader);
        expect_error!(b"c comment\nc comments\n\n", ParseError::MissingHeader);
    }

    #[test]
    fn out_of_bound() {
        // i32::MAX = 2147483647 is the largest representable literal
        // i32::MIN = -2147483648 is not a valid literal
        expect_error!(b"p cnf 0 0\n1 2147483648 3 0", ParseError::LiteralOutOfBound { .. });
        expect_error!(b"p cnf 0 0\n1 -2147483648 3 0", ParseError::LiteralOutOfBound { .. });
        expect_error!(b"p cnf 3 0\nc p show 1 -2 0\n", ParseError::VariableOutOfBound { .. });
    }

    #[test]
    fn invalid_annotations() {
        expect_error!(b"p cnf 3 0\nc p show 1 x 0\n", ParseError::InvalidInt { .. });
        expect_error!(b"p cnf 3 0\nc p weight 1 heavy 0\n", ParseError::InvalidWeight { .. });
        expect_error!(b"p cnf 3 0\nc p weight 1 NaN 0\n", ParseError::InvalidWeight { .. });
        expect_error!(b"p cnf 3 0\nc p weight 0 0.5 0\n", ParseError::LiteralOutOfBound { .. });
        expect_error!(b"p cnf 3 0\nc p weight 2\n", ParseError::UnexpectedEndOfFile { .. });
    }

    #[test]
    fn end_of_file() {
        expect_error!(b"p cnf 0 0\n1 2 3 0\n-1 2 3", ParseError::UnexpectedEndOfFile { .. });
    }

    #[test]
    fn header() -> Result<(), ParseError> {
        let dimacs = "p cnf     10      0";
        let reader = Cursor::new(dimacs);
        let _cnf: Cnf = DimacsParser::new(reader).parse()?;

        expect_error!(
            b"p dnf 2 2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidPrefix, .. }
        );
        expect_error!(
            b"pcnf 2 2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidPrefix, .. }
        );
        expect_error!(
            b"p cnf -2 2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidVariableCount, .. }
        );
        expect_error!(
            b"p cnf 2 -2",
            ParseError::InvalidHeader { reason: HeaderError::InvalidClauseCount, .. }
        );
        Ok(())
    }

    #[test]
    fn num_clauses() {
        expect_error!(
            b"p cnf 3 2\n1 -2 0\n2 -3 0\n3 -1 0\n",
            ParseError::NumClausesMismatch { expected: 2, found: 3 }
        );
    }
}
