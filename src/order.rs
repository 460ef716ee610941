//! Canonical step order.
//!
//! Exact synthesis prunes symmetric solutions by only emitting chains whose
//! adjacent steps are ordered. The validator is fed one step at a time and
//! remembers only the previous step.

use crate::chain_ir::{Step, SupportSet, VarId};
use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

/// Adjacent steps out of canonical order.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum OrderingError {
    /// Same support, gate bit-string not strictly greater than the previous one
    #[error("step {step}: gates with same support are not ordered")]
    SameSupportNotIncreasing { step: usize },
    /// Different support, not co-lexicographically ordered and no cascade
    #[error("step {step}: co-lexicographic order violated")]
    SupportNotCoLex { step: usize },
}

#[derive(Debug, Clone)]
struct Previous {
    support: SupportSet,
    gate_bits: String,
    output: VarId,
}

/// Checks adjacent-step ordering as steps are accepted.
#[derive(Debug, Clone, Default)]
pub struct OrderValidator {
    prev: Option<Previous>,
    accepted: usize,
}

impl OrderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `step` against the previously accepted step and, if ordered,
    /// makes it the new reference.
    pub fn accept(&mut self, step: &Step) -> Result<(), OrderingError> {
        let support = step.support();
        if let Some(prev) = &self.prev {
            let index = self.accepted;
            if support == prev.support {
                if step.gate_bits.as_str() <= prev.gate_bits.as_str() {
                    return Err(OrderingError::SameSupportNotIncreasing { step: index });
                }
            } else if !support.contains(prev.output)
                && prev.support.colex_cmp(&support) == Ordering::Greater
            {
                return Err(OrderingError::SupportNotCoLex { step: index });
            }
        }
        self.prev = Some(Previous {
            support,
            gate_bits: step.gate_bits.clone(),
            output: step.output,
        });
        self.accepted += 1;
        Ok(())
    }
}
