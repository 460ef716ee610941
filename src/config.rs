//! Verification run configuration.

use crate::chain_ir::ALPHABET_SIZE;
use crate::truth_table::{TruthTable, TruthTableError, MAX_VARS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest gate fan-in accepted.
pub const MAX_FANIN: usize = 16;

/// What a symmetry violation does to an otherwise accepted chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryPolicy {
    /// Log and attach the violations; the chain stays accepted
    #[default]
    Report,
    /// Reject the chain
    Reject,
}

impl SymmetryPolicy {
    /// Parse policy from string name.
    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "report" => Some(SymmetryPolicy::Report),
            "reject" => Some(SymmetryPolicy::Reject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymmetryPolicy::Report => "report",
            SymmetryPolicy::Reject => "reject",
        }
    }
}

/// Shape of the chains being verified and the symmetry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Number of primary inputs
    pub num_vars: usize,
    /// Inputs per gate
    pub fanin: usize,
    /// Steps per chain
    pub steps: usize,
    /// Symmetry violation handling
    #[serde(default)]
    pub symmetry: SymmetryPolicy,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fan-in must be between 1 and {max}, got {0}", max = MAX_FANIN)]
    Fanin(usize),
    #[error("chain must have at least one step")]
    NoSteps,
    #[error("too many primary inputs: {0} (maximum {max})", max = MAX_VARS)]
    TooManyVars(usize),
    #[error("{num_vars} inputs and {steps} steps do not fit the {letters}-letter alphabet", letters = ALPHABET_SIZE)]
    AlphabetExhausted { num_vars: usize, steps: usize },
    #[error("invalid specification: {0}")]
    Spec(#[from] TruthTableError),
    #[error("specification has {got} inputs, expected {expected}")]
    SpecWidth { expected: usize, got: usize },
}

impl VerifyConfig {
    pub fn new(num_vars: usize, fanin: usize, steps: usize) -> Self {
        Self {
            num_vars,
            fanin,
            steps,
            symmetry: SymmetryPolicy::default(),
        }
    }

    pub fn with_symmetry(mut self, symmetry: SymmetryPolicy) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fanin == 0 || self.fanin > MAX_FANIN {
            return Err(ConfigError::Fanin(self.fanin));
        }
        if self.steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        if self.num_vars > MAX_VARS {
            return Err(ConfigError::TooManyVars(self.num_vars));
        }
        if self.num_vars + self.steps > ALPHABET_SIZE {
            return Err(ConfigError::AlphabetExhausted {
                num_vars: self.num_vars,
                steps: self.steps,
            });
        }
        Ok(())
    }

    /// Parses the target function for this configuration.
    pub fn parse_spec(&self, literal: &str) -> Result<TruthTable, ConfigError> {
        Ok(TruthTable::from_literal(self.num_vars, literal)?)
    }
}
