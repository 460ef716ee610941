//! # Truth Tables
//!
//! Complete truth tables over a fixed number of variables, stored as a
//! bit vector of length `2^num_vars`. Bit `p` holds the function value for
//! the assignment whose binary encoding is `p` (variable `i` is bit `i` of
//! `p`).
//!
//! Literals are written most significant bit first, the way truth tables
//! are usually printed: the hexadecimal literal `e8` is the 3-input
//! majority function and the binary literal `0110` is 2-input XOR.
//!
//! ```rust
//! use bln_verify::TruthTable;
//!
//! let maj = TruthTable::from_hex(3, "e8").unwrap();
//! assert!(maj.get_bit(0b011));
//! assert!(!maj.get_bit(0b100));
//! assert!(maj.is_symmetric_in(0, 2));
//! assert_eq!(maj.to_string(), "e8");
//! ```

use bitvec::prelude::*;
use std::fmt;
use thiserror::Error;

/// Largest variable count a table may be built for.
pub const MAX_VARS: usize = 20;

/// Errors raised while building a table from a literal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TruthTableError {
    /// A character that is not a digit of the literal's radix
    #[error("invalid digit {0:?} in truth table literal")]
    InvalidDigit(char),
    /// The literal does not have the digit count implied by the variable count
    #[error("truth table literal has {got} digits, expected {expected}")]
    WrongLength { expected: usize, got: usize },
    /// Variable count above [`MAX_VARS`]
    #[error("too many variables: {0} (maximum {max})", max = MAX_VARS)]
    TooManyVars(usize),
}

/// A complete truth table.
#[derive(Clone, PartialEq, Eq)]
pub struct TruthTable {
    num_vars: usize,
    bits: BitVec<u64, Lsb0>,
}

impl TruthTable {
    /// Constant-zero table over `num_vars` variables.
    ///
    /// # Panics
    ///
    /// Panics if `num_vars` exceeds [`MAX_VARS`].
    pub fn new(num_vars: usize) -> Self {
        assert!(num_vars <= MAX_VARS, "truth table too wide: {num_vars} vars");
        Self {
            num_vars,
            bits: BitVec::repeat(false, 1 << num_vars),
        }
    }

    /// Builds a table by evaluating `f` on every assignment index.
    pub fn from_fn(num_vars: usize, f: impl Fn(usize) -> bool) -> Self {
        assert!(num_vars <= MAX_VARS, "truth table too wide: {num_vars} vars");
        Self {
            num_vars,
            bits: (0..1usize << num_vars).map(f).collect(),
        }
    }

    /// Projection onto input `var`.
    pub fn nth_var(num_vars: usize, var: usize) -> Self {
        debug_assert!(var < num_vars);
        Self::from_fn(num_vars, |p| (p >> var) & 1 == 1)
    }

    /// Parses a hexadecimal literal, most significant nibble first.
    ///
    /// Tables with fewer than four bits still take one digit; its value
    /// must fit into the table.
    pub fn from_hex(num_vars: usize, text: &str) -> Result<Self, TruthTableError> {
        check_width(num_vars)?;
        let mut tt = Self::new(num_vars);
        let expected = hex_len(num_vars);
        let digits: Vec<char> = text.chars().collect();
        if digits.len() != expected {
            return Err(TruthTableError::WrongLength {
                expected,
                got: digits.len(),
            });
        }
        for (nibble_idx, &c) in digits.iter().rev().enumerate() {
            let value = c.to_digit(16).ok_or(TruthTableError::InvalidDigit(c))? as usize;
            for k in 0..4 {
                if (value >> k) & 1 == 0 {
                    continue;
                }
                let index = nibble_idx * 4 + k;
                if index >= tt.num_bits() {
                    return Err(TruthTableError::InvalidDigit(c));
                }
                tt.bits.set(index, true);
            }
        }
        Ok(tt)
    }

    /// Parses a binary literal of exactly `2^num_vars` digits; the last
    /// digit is bit 0.
    pub fn from_binary(num_vars: usize, text: &str) -> Result<Self, TruthTableError> {
        check_width(num_vars)?;
        let mut tt = Self::new(num_vars);
        let digits: Vec<char> = text.chars().collect();
        if digits.len() != tt.num_bits() {
            return Err(TruthTableError::WrongLength {
                expected: tt.num_bits(),
                got: digits.len(),
            });
        }
        for (index, &c) in digits.iter().rev().enumerate() {
            match c {
                '0' => {}
                '1' => tt.bits.set(index, true),
                other => return Err(TruthTableError::InvalidDigit(other)),
            }
        }
        Ok(tt)
    }

    /// Parses a literal whose radix is given by a `0x`/`0b` prefix or, when
    /// unprefixed, by its length: `2^num_vars` binary digits read as binary,
    /// anything else as hexadecimal.
    pub fn from_literal(num_vars: usize, text: &str) -> Result<Self, TruthTableError> {
        check_width(num_vars)?;
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return Self::from_hex(num_vars, hex);
        }
        if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            return Self::from_binary(num_vars, bin);
        }
        let num_bits = 1usize << num_vars;
        let looks_binary = text.len() == num_bits
            && num_bits != hex_len(num_vars)
            && text.chars().all(|c| c == '0' || c == '1');
        if looks_binary {
            Self::from_binary(num_vars, text)
        } else {
            Self::from_hex(num_vars, text)
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn get_bit(&self, index: usize) -> bool {
        self.bits[index]
    }

    #[inline]
    pub fn set_bit(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// Negative cofactor: the table with `var` fixed to 0, same width.
    pub fn cofactor0(&self, var: usize) -> Self {
        let mask = 1usize << var;
        Self::from_fn(self.num_vars, |p| self.bits[p & !mask])
    }

    /// Positive cofactor: the table with `var` fixed to 1, same width.
    pub fn cofactor1(&self, var: usize) -> Self {
        let mask = 1usize << var;
        Self::from_fn(self.num_vars, |p| self.bits[p | mask])
    }

    /// `true` if every onset assignment of `self` is in the onset of `other`.
    pub fn implies(&self, other: &Self) -> bool {
        debug_assert_eq!(self.num_vars, other.num_vars);
        self.bits.iter_ones().all(|p| other.bits[p])
    }

    /// The table with input `var` complemented.
    pub fn flip(&self, var: usize) -> Self {
        let mask = 1usize << var;
        Self::from_fn(self.num_vars, |p| self.bits[p ^ mask])
    }

    /// `true` if swapping inputs `a` and `b` leaves the function unchanged.
    pub fn is_symmetric_in(&self, a: usize, b: usize) -> bool {
        if a == b {
            return true;
        }
        let (ma, mb) = (1usize << a, 1usize << b);
        (0..self.num_bits())
            .filter(|p| p & ma == 0 && p & mb != 0)
            .all(|p| self.bits[p] == self.bits[p ^ ma ^ mb])
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nibble_idx in (0..hex_len(self.num_vars)).rev() {
            let mut value = 0u32;
            for k in 0..4 {
                let index = nibble_idx * 4 + k;
                if index < self.num_bits() && self.bits[index] {
                    value |= 1 << k;
                }
            }
            // value < 16 always
            write!(f, "{value:x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TruthTable({} vars, 0x{})", self.num_vars, self)
    }
}

fn hex_len(num_vars: usize) -> usize {
    ((1usize << num_vars) / 4).max(1)
}

fn check_width(num_vars: usize) -> Result<(), TruthTableError> {
    if num_vars > MAX_VARS {
        return Err(TruthTableError::TooManyVars(num_vars));
    }
    Ok(())
}
