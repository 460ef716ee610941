//! # Chain IR — data model and `.bln` line parser
//!
//! A chain is written one step per line:
//!
//! ```text
//! D = 0110 a b
//! E = 0001 c d
//! ```
//!
//! The head letter names the step output, the binary segment is the gate's
//! truth table (character `k` is the gate value for fan-in pattern `k`) and
//! the trailing letters are the fan-ins. Primary inputs are `a, b, c, ...`
//! and step outputs continue the alphabet in upper case; fan-ins may refer
//! to either case.
//!
//! ## Example
//!
//! ```rust
//! use bln_verify::chain_ir::{Chain, VarId};
//!
//! let chain = Chain::parse(&["D = 0110 a b", "E = 0110 c d"], 3, 2, 2).unwrap();
//! assert_eq!(chain.output(), Some(VarId(4)));
//! assert_eq!(chain.steps[1].fanins, vec![VarId(2), VarId(3)]);
//! ```

use crate::config::MAX_FANIN;
use crate::truth_table::TruthTable;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Number of names the letter alphabet can express.
pub const ALPHABET_SIZE: usize = 26;

const SEPARATOR: &str = " = ";

/// Dense variable id: primary inputs first, then step outputs in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }

    /// Maps a fan-in letter (either case) to its id.
    pub fn from_letter(c: char) -> Option<Self> {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        Some(VarId((c.to_ascii_lowercase() as u8 - b'a') as usize))
    }

    /// Lower-case letter used in fan-in position (`'?'` past the alphabet).
    pub fn letter(self) -> char {
        if self.0 < ALPHABET_SIZE {
            (b'a' + self.0 as u8) as char
        } else {
            '?'
        }
    }

    /// Upper-case letter used to name a step output.
    pub fn step_name(self) -> char {
        self.letter().to_ascii_uppercase()
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < ALPHABET_SIZE {
            write!(f, "{}", self.letter())
        } else {
            write!(f, "v{}", self.0)
        }
    }
}

/// The fan-ins of one step, in the order they were written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SupportSet(Vec<VarId>);

impl SupportSet {
    pub fn new(vars: Vec<VarId>) -> Self {
        Self(vars)
    }

    pub fn as_slice(&self) -> &[VarId] {
        &self.0
    }

    pub fn contains(&self, var: VarId) -> bool {
        self.0.contains(&var)
    }

    /// Co-lexicographic comparison: sequences compared from their last
    /// element backward.
    pub fn colex_cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

/// One gate of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Output variable
    pub output: VarId,
    /// Gate truth table as written, character `k` = gate bit `k`
    pub gate_bits: String,
    /// Gate truth table over `fanin` variables
    pub gate: TruthTable,
    /// Fan-ins, strictly ascending
    pub fanins: Vec<VarId>,
}

impl Step {
    pub fn fanin(&self) -> usize {
        self.fanins.len()
    }

    pub fn support(&self) -> SupportSet {
        SupportSet::new(self.fanins.clone())
    }

    /// Renders the step back into the `.bln` line grammar.
    pub fn to_line(&self) -> String {
        let mut line = format!("{}{}{}", self.output.step_name(), SEPARATOR, self.gate_bits);
        for fanin in &self.fanins {
            line.push(' ');
            line.push(fanin.letter());
        }
        line
    }
}

/// A parsed chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Number of primary inputs
    pub num_vars: usize,
    /// Steps in chain order
    pub steps: Vec<Step>,
}

/// Why a line (or block) is not a well-formed chain.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ParseFailure {
    /// Gate fan-in outside `1..=MAX_FANIN`
    #[error("fan-in must be between 1 and {max}, got {0}", max = MAX_FANIN)]
    InvalidFanin(usize),
    /// Inputs and steps need more names than the alphabet has
    #[error("{num_vars} inputs and {steps} steps do not fit the {letters}-letter alphabet", letters = ALPHABET_SIZE)]
    AlphabetExhausted { num_vars: usize, steps: usize },
    /// Block line count differs from the declared number of steps
    #[error("chain has {found} steps, expected {expected}")]
    WrongStepCount { expected: usize, found: usize },
    /// Head letter is not the next sequential step name
    #[error("step {step}: expected step name {expected}, found {found:?}")]
    WrongStepName {
        step: usize,
        expected: char,
        found: Option<char>,
    },
    /// The line does not follow the step grammar
    #[error("step {step}: mal-formed step ({reason})")]
    MalformedStep { step: usize, reason: &'static str },
    /// Gate bit 0 is set
    #[error("step {step}: gate is not normalized")]
    UnnormalizedGate { step: usize },
    /// Fan-ins are not strictly ascending
    #[error("step {step}: fan-ins are in wrong order")]
    FaninOutOfOrder { step: usize },
    /// Fan-in refers to this step or a later one
    #[error("step {step}: fan-in {fanin} is not defined yet")]
    FaninUndefined { step: usize, fanin: char },
}

impl Chain {
    /// Parses one block of trimmed lines into a chain of exactly `steps`
    /// steps over `num_vars` inputs with gates of `fanin` inputs.
    pub fn parse<S: AsRef<str>>(
        lines: &[S],
        num_vars: usize,
        fanin: usize,
        steps: usize,
    ) -> Result<Self, ParseFailure> {
        if fanin == 0 || fanin > MAX_FANIN {
            return Err(ParseFailure::InvalidFanin(fanin));
        }
        if num_vars + steps > ALPHABET_SIZE {
            return Err(ParseFailure::AlphabetExhausted { num_vars, steps });
        }
        if lines.len() != steps {
            return Err(ParseFailure::WrongStepCount {
                expected: steps,
                found: lines.len(),
            });
        }
        let mut parsed = Vec::with_capacity(steps);
        for (idx, line) in lines.iter().enumerate() {
            let output = VarId(num_vars + idx);
            parsed.push(parse_step_line(line.as_ref(), idx, output, fanin)?);
        }
        Ok(Chain {
            num_vars,
            steps: parsed,
        })
    }

    /// Output of the last step.
    pub fn output(&self) -> Option<VarId> {
        self.steps.last().map(|s| s.output)
    }

    /// Concatenation of every step's support in chain order.
    pub fn support_history(&self) -> impl Iterator<Item = VarId> + '_ {
        self.steps.iter().flat_map(|s| s.fanins.iter().copied())
    }

    pub fn to_text(&self) -> String {
        let mut buf = String::new();
        for step in &self.steps {
            buf.push_str(&step.to_line());
            buf.push('\n');
        }
        buf
    }
}

/// Typed cursor over one step line.
struct LineCursor<'a> {
    rest: &'a str,
    step: usize,
}

impl<'a> LineCursor<'a> {
    fn new(line: &'a str, step: usize) -> Self {
        Self { rest: line, step }
    }

    fn malformed(&self, reason: &'static str) -> ParseFailure {
        ParseFailure::MalformedStep {
            step: self.step,
            reason,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }

    fn literal(&mut self, lit: &str, reason: &'static str) -> Result<(), ParseFailure> {
        match self.rest.strip_prefix(lit) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(self.malformed(reason)),
        }
    }

    fn gate(&mut self, len: usize) -> Result<&'a str, ParseFailure> {
        let segment = self
            .rest
            .get(..len)
            .ok_or_else(|| self.malformed("gate is too short"))?;
        if !segment.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(self.malformed("gate is not a binary string"));
        }
        self.rest = &self.rest[len..];
        Ok(segment)
    }

    fn fanin(&mut self) -> Result<char, ParseFailure> {
        self.literal(" ", "expected ' ' before fan-in")?;
        match self.next_char() {
            Some(c) if c.is_ascii_alphabetic() => Ok(c),
            _ => Err(self.malformed("fan-in is not a letter")),
        }
    }

    fn finish(&self) -> Result<(), ParseFailure> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(self.malformed("trailing characters"))
        }
    }
}

fn parse_step_line(
    line: &str,
    step: usize,
    output: VarId,
    fanin: usize,
) -> Result<Step, ParseFailure> {
    let mut cursor = LineCursor::new(line, step);
    let expected = output.step_name();
    let head = cursor.next_char();
    if head != Some(expected) {
        return Err(ParseFailure::WrongStepName {
            step,
            expected,
            found: head,
        });
    }
    cursor.literal(SEPARATOR, "expected ' = ' after step name")?;

    let gate_bits = cursor.gate(1 << fanin)?;
    if gate_bits.starts_with('1') {
        return Err(ParseFailure::UnnormalizedGate { step });
    }
    let bytes = gate_bits.as_bytes();
    let gate = TruthTable::from_fn(fanin, |k| bytes[k] == b'1');

    let mut fanins: Vec<VarId> = Vec::with_capacity(fanin);
    for _ in 0..fanin {
        let letter = cursor.fanin()?;
        let var = VarId::from_letter(letter).ok_or_else(|| cursor.malformed("fan-in is not a letter"))?;
        if fanins.last().is_some_and(|&prev| var <= prev) {
            return Err(ParseFailure::FaninOutOfOrder { step });
        }
        if var >= output {
            return Err(ParseFailure::FaninUndefined {
                step,
                fanin: letter.to_ascii_lowercase(),
            });
        }
        fanins.push(var);
    }
    cursor.finish()?;

    Ok(Step {
        output,
        gate_bits: gate_bits.to_string(),
        gate,
        fanins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str], num_vars: usize, fanin: usize) -> Result<Chain, ParseFailure> {
        Chain::parse(lines, num_vars, fanin, lines.len())
    }

    #[test]
    fn parses_two_step_chain() {
        let chain = parse(&["D = 0110 a b", "E = 0110 c d"], 3, 2).unwrap();
        assert_eq!(chain.steps.len(), 2);
        assert_eq!(chain.steps[0].output, VarId(3));
        assert_eq!(chain.steps[0].gate_bits, "0110");
        assert!(chain.steps[0].gate.get_bit(1));
        assert!(!chain.steps[0].gate.get_bit(3));
        let history: Vec<char> = chain.support_history().map(VarId::letter).collect();
        assert_eq!(history, vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn gate_character_k_is_bit_k() {
        let chain = parse(&["C = 0001 a b"], 2, 2).unwrap();
        let gate = &chain.steps[0].gate;
        assert!(gate.get_bit(3));
        assert_eq!(gate.count_ones(), 1);
    }

    #[test]
    fn upper_case_fanins_are_accepted() {
        let chain = parse(&["D = 0001 a b", "E = 0110 c D"], 3, 2).unwrap();
        assert_eq!(chain.steps[1].fanins, vec![VarId(2), VarId(3)]);
        assert_eq!(chain.to_text(), "D = 0001 a b\nE = 0110 c d\n");
    }

    #[test]
    fn step_count_checked_before_lines() {
        let err = Chain::parse(&["garbage"], 2, 2, 2).unwrap_err();
        assert_eq!(
            err,
            ParseFailure::WrongStepCount {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn last_letter_is_the_limit() {
        let chain = Chain::parse(&["Y = 0110 a b", "Z = 0110 a y"], 24, 2, 2).unwrap();
        assert_eq!(chain.output(), Some(VarId(25)));
        assert_eq!(chain.to_text(), "Y = 0110 a b\nZ = 0110 a y\n");
        assert_eq!(
            Chain::parse(&["Z = 0110 a b", "? = 0110 a b"], 25, 2, 2).unwrap_err(),
            ParseFailure::AlphabetExhausted {
                num_vars: 25,
                steps: 2
            }
        );
    }

    #[test]
    fn fanin_outside_range_is_refused() {
        assert_eq!(
            Chain::parse(&["C = 0 a"], 2, 64, 1).unwrap_err(),
            ParseFailure::InvalidFanin(64)
        );
        assert_eq!(
            Chain::parse(&["C = 0"], 2, 0, 1).unwrap_err(),
            ParseFailure::InvalidFanin(0)
        );
        assert!(Chain::parse(&["C = 01 b"], 2, 1, 1).is_ok());
    }

    #[test]
    fn wrong_step_name() {
        assert_eq!(
            parse(&["D = 0110 a b"], 2, 2).unwrap_err(),
            ParseFailure::WrongStepName {
                step: 0,
                expected: 'C',
                found: Some('D')
            }
        );
        assert!(matches!(
            parse(&["c = 0110 a b"], 2, 2).unwrap_err(),
            ParseFailure::WrongStepName { .. }
        ));
    }

    #[test]
    fn malformed_lines() {
        for line in [
            "C=0110 a b",
            "C = 011",
            "C = 01x0 a b",
            "C = 0110 ab",
            "C = 0110 a 1",
            "C = 0110 a b c",
            "C = 0110 a",
        ] {
            let err = parse(&[line], 2, 2).unwrap_err();
            assert!(
                matches!(err, ParseFailure::MalformedStep { step: 0, .. }),
                "{line:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn unnormalized_gate() {
        assert_eq!(
            parse(&["C = 1001 a b"], 2, 2).unwrap_err(),
            ParseFailure::UnnormalizedGate { step: 0 }
        );
    }

    #[test]
    fn fanin_order_and_definition() {
        assert_eq!(
            parse(&["C = 0110 b a"], 2, 2).unwrap_err(),
            ParseFailure::FaninOutOfOrder { step: 0 }
        );
        assert_eq!(
            parse(&["C = 0110 a a"], 2, 2).unwrap_err(),
            ParseFailure::FaninOutOfOrder { step: 0 }
        );
        assert_eq!(
            parse(&["C = 0110 a c"], 2, 2).unwrap_err(),
            ParseFailure::FaninUndefined {
                step: 0,
                fanin: 'c'
            }
        );
        assert_eq!(
            parse(&["D = 0001 a b", "E = 0110 d F"], 3, 2).unwrap_err(),
            ParseFailure::FaninUndefined {
                step: 1,
                fanin: 'f'
            }
        );
    }

    #[test]
    fn three_input_gates() {
        let chain = parse(&["D = 00010111 a b c"], 3, 3).unwrap();
        assert_eq!(chain.steps[0].fanin(), 3);
        assert_eq!(chain.steps[0].gate.count_ones(), 4);
    }

    #[test]
    fn colex_compares_from_the_back() {
        let bc = SupportSet::new(vec![VarId(1), VarId(2)]);
        let ad = SupportSet::new(vec![VarId(0), VarId(3)]);
        assert_eq!(bc.colex_cmp(&ad), Ordering::Less);
        assert_eq!(ad.colex_cmp(&bc), Ordering::Greater);
        assert_eq!(bc.colex_cmp(&bc.clone()), Ordering::Equal);
    }
}
