//! # Chain verification
//!
//! [`Verifier`] runs one chain block through the stages
//!
//! ```text
//! Parsing -> Evaluating/OrderChecking -> EquivalenceChecking -> SymmetryChecking
//! ```
//!
//! and returns a [`Verdict`]. Every failure before equivalence holds rejects
//! the chain with the specific error; once equivalence holds the chain is
//! accepted, with symmetry violations attached (or, under
//! [`SymmetryPolicy::Reject`], turned into a rejection).
//!
//! ## Example
//!
//! ```rust
//! use bln_verify::{Verifier, VerifyConfig};
//!
//! let verifier = Verifier::new(VerifyConfig::new(2, 2, 1), "6").unwrap();
//! assert!(verifier.verify(&["C = 0110 a b"]).is_accepted());
//! assert!(!verifier.verify(&["C = 0111 a b"]).is_accepted());
//! ```

use crate::chain_ir::{Chain, ParseFailure, VarId};
use crate::config::{ConfigError, SymmetryPolicy, VerifyConfig};
use crate::order::{OrderValidator, OrderingError};
use crate::simulate::{EvalError, TableArena};
use crate::truth_table::TruthTable;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Verification stages, in the order a chain passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Parsing,
    Evaluating,
    OrderChecking,
    EquivalenceChecking,
    SymmetryChecking,
    Accepted,
    Rejected,
}

/// Coarse classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Line does not follow the step grammar
    Lexical,
    /// Wrong step count, step naming or fan-in references
    Structural,
    /// Gate bit 0 is set
    Normalization,
    /// Adjacent steps out of canonical order
    Ordering,
    /// Chain computes a different function
    Functional,
    /// Input introduction order contradicts a symmetry of the target
    Symmetry,
}

/// Inputs `first < second` are symmetric in the target but `second`
/// appears in the chain before `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymmetryViolation {
    pub first: usize,
    pub second: usize,
}

impl fmt::Display for SymmetryViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "symmetry property violated in {} and {}",
            self.first, self.second
        )
    }
}

/// Why a chain was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum VerifyError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Ordering(#[from] OrderingError),
    #[error("chain does not compute the target function")]
    NotEquivalent,
    #[error("{} symmetry violation(s)", .0.len())]
    Symmetry(Vec<SymmetryViolation>),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::Parse(ParseFailure::MalformedStep { .. }) => ErrorKind::Lexical,
            VerifyError::Parse(ParseFailure::UnnormalizedGate { .. }) => ErrorKind::Normalization,
            VerifyError::Parse(_) | VerifyError::Eval(_) => ErrorKind::Structural,
            VerifyError::Ordering(_) => ErrorKind::Ordering,
            VerifyError::NotEquivalent => ErrorKind::Functional,
            VerifyError::Symmetry(_) => ErrorKind::Symmetry,
        }
    }

    /// Stage that produced the error.
    pub fn stage(&self) -> Stage {
        match self {
            VerifyError::Parse(_) => Stage::Parsing,
            VerifyError::Eval(_) => Stage::Evaluating,
            VerifyError::Ordering(_) => Stage::OrderChecking,
            VerifyError::NotEquivalent => Stage::EquivalenceChecking,
            VerifyError::Symmetry(_) => Stage::SymmetryChecking,
        }
    }
}

/// Outcome of verifying one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Accepted {
        symmetry_violations: Vec<SymmetryViolation>,
    },
    Rejected {
        error: VerifyError,
    },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }

    pub fn error(&self) -> Option<&VerifyError> {
        match self {
            Verdict::Accepted { .. } => None,
            Verdict::Rejected { error } => Some(error),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error().map(VerifyError::kind)
    }

    /// Symmetry violations of an accepted chain (empty when rejected).
    pub fn symmetry_violations(&self) -> &[SymmetryViolation] {
        match self {
            Verdict::Accepted {
                symmetry_violations,
            } => symmetry_violations,
            Verdict::Rejected { .. } => &[],
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Verdict::Accepted { .. } => Stage::Accepted,
            Verdict::Rejected { .. } => Stage::Rejected,
        }
    }
}

/// Verifies chains against one target function.
///
/// Holds only immutable data, so one verifier can be shared across threads.
#[derive(Debug, Clone)]
pub struct Verifier {
    config: VerifyConfig,
    spec: TruthTable,
    /// Symmetric input pairs `(i, j)`, `i < j`, ordered by `j` then `i`
    symmetric_pairs: Vec<(usize, usize)>,
}

impl Verifier {
    /// Builds a verifier from a hexadecimal (or binary) spec literal.
    pub fn new(config: VerifyConfig, spec_literal: &str) -> Result<Self, ConfigError> {
        config.validate()?;
        let spec = config.parse_spec(spec_literal)?;
        Self::with_spec(config, spec)
    }

    pub fn with_spec(config: VerifyConfig, spec: TruthTable) -> Result<Self, ConfigError> {
        config.validate()?;
        if spec.num_vars() != config.num_vars {
            return Err(ConfigError::SpecWidth {
                expected: config.num_vars,
                got: spec.num_vars(),
            });
        }
        let symmetric_pairs = (1..config.num_vars)
            .flat_map(|j| (0..j).map(move |i| (i, j)))
            .filter(|&(i, j)| spec.is_symmetric_in(i, j))
            .collect();
        Ok(Self {
            config,
            spec,
            symmetric_pairs,
        })
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    pub fn spec(&self) -> &TruthTable {
        &self.spec
    }

    /// Verifies one block of trimmed, non-empty lines.
    pub fn verify<S: AsRef<str>>(&self, lines: &[S]) -> Verdict {
        debug!(stage = ?Stage::Parsing, lines = lines.len(), "verifying chain");
        let result = Chain::parse(
            lines,
            self.config.num_vars,
            self.config.fanin,
            self.config.steps,
        )
        .map_err(VerifyError::from)
        .and_then(|chain| self.check(&chain));
        self.conclude(result)
    }

    /// Verifies an already parsed chain.
    pub fn verify_chain(&self, chain: &Chain) -> Verdict {
        let result = if chain.steps.len() != self.config.steps {
            Err(VerifyError::Parse(ParseFailure::WrongStepCount {
                expected: self.config.steps,
                found: chain.steps.len(),
            }))
        } else {
            self.check(chain)
        };
        self.conclude(result)
    }

    fn conclude(&self, result: Result<Vec<SymmetryViolation>, VerifyError>) -> Verdict {
        match result {
            Ok(symmetry_violations) => {
                debug!(stage = ?Stage::Accepted, "chain accepted");
                Verdict::Accepted {
                    symmetry_violations,
                }
            }
            Err(error) => {
                debug!(stage = ?error.stage(), %error, "chain rejected");
                Verdict::Rejected { error }
            }
        }
    }

    fn check(&self, chain: &Chain) -> Result<Vec<SymmetryViolation>, VerifyError> {
        debug!(stage = ?Stage::Evaluating, steps = chain.steps.len());
        let mut arena = TableArena::new(self.config.num_vars);
        let mut order = OrderValidator::new();
        for step in &chain.steps {
            order.accept(step)?;
            arena.push_step(step)?;
        }

        debug!(stage = ?Stage::EquivalenceChecking);
        let computed = chain.output().and_then(|out| arena.get(out));
        if computed != Some(&self.spec) {
            return Err(VerifyError::NotEquivalent);
        }

        debug!(stage = ?Stage::SymmetryChecking);
        let violations = self.symmetry_violations(chain);
        for violation in &violations {
            warn!("{violation}");
        }
        if !violations.is_empty() && self.config.symmetry == SymmetryPolicy::Reject {
            return Err(VerifyError::Symmetry(violations));
        }
        Ok(violations)
    }

    /// Symmetric input pairs whose first occurrences in the support history
    /// are out of order. An input that never occurs counts as occurring
    /// after everything else.
    pub fn symmetry_violations(&self, chain: &Chain) -> Vec<SymmetryViolation> {
        let history: Vec<VarId> = chain.support_history().collect();
        let first_use = |var: usize| {
            history
                .iter()
                .position(|&v| v == VarId(var))
                .unwrap_or(history.len())
        };
        self.symmetric_pairs
            .iter()
            .filter(|&&(i, j)| first_use(j) < first_use(i))
            .map(|&(first, second)| SymmetryViolation { first, second })
            .collect()
    }
}

/// Verifies one block against a hexadecimal spec with the reporting
/// symmetry policy.
pub fn verify<S: AsRef<str>>(
    lines: &[S],
    num_vars: usize,
    hex_spec: &str,
    fanin: usize,
    steps: usize,
) -> Result<Verdict, ConfigError> {
    let verifier = Verifier::new(VerifyConfig::new(num_vars, fanin, steps), hex_spec)?;
    Ok(verifier.verify(lines))
}
