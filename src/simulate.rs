//! Step simulation over an append-only table arena.
//!
//! The arena holds one truth table per variable, indexed by [`VarId`]:
//! projections of the primary inputs first, then one table per evaluated
//! step in chain order. Tables are never modified once pushed.

use crate::chain_ir::{Step, VarId};
use crate::truth_table::TruthTable;
use serde::Serialize;
use thiserror::Error;

/// Arena invariant violations.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum EvalError {
    /// Step output is not the next free id
    #[error("step output {got} is out of sequence, expected {expected}")]
    OutOfSequence { expected: VarId, got: VarId },
    /// Fan-in has no table yet
    #[error("fan-in {0} has no table")]
    MissingFanin(VarId),
    /// Gate table width differs from the step's fan-in count
    #[error("gate over {gate_vars} inputs used with {fanins} fan-ins")]
    GateWidth { gate_vars: usize, fanins: usize },
}

/// Truth tables for every variable defined so far.
#[derive(Debug, Clone)]
pub struct TableArena {
    num_vars: usize,
    tables: Vec<TruthTable>,
}

impl TableArena {
    /// Arena seeded with the projections of `num_vars` primary inputs.
    pub fn new(num_vars: usize) -> Self {
        let tables = (0..num_vars)
            .map(|i| TruthTable::nth_var(num_vars, i))
            .collect();
        Self { num_vars, tables }
    }

    /// Next id the arena will hand out.
    pub fn next_id(&self) -> VarId {
        VarId(self.tables.len())
    }

    pub fn get(&self, var: VarId) -> Option<&TruthTable> {
        self.tables.get(var.index())
    }

    /// Simulates `step` and appends its table.
    pub fn push_step(&mut self, step: &Step) -> Result<&TruthTable, EvalError> {
        let expected = self.next_id();
        if step.output != expected {
            return Err(EvalError::OutOfSequence {
                expected,
                got: step.output,
            });
        }
        let table = self.simulate(step)?;
        self.tables.push(table);
        Ok(&self.tables[expected.index()])
    }

    /// Computes the output table of `step` from its fan-ins' tables.
    ///
    /// Bit `j` of the gate pattern at position `p` is fan-in `j`'s value at
    /// `p`; the output at `p` is the gate's bit at that pattern.
    pub fn simulate(&self, step: &Step) -> Result<TruthTable, EvalError> {
        if step.gate.num_vars() != step.fanin() {
            return Err(EvalError::GateWidth {
                gate_vars: step.gate.num_vars(),
                fanins: step.fanin(),
            });
        }
        let inputs = step
            .fanins
            .iter()
            .map(|&v| self.get(v).ok_or(EvalError::MissingFanin(v)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = TruthTable::new(self.num_vars);
        for p in 0..out.num_bits() {
            let pattern = inputs
                .iter()
                .enumerate()
                .fold(0usize, |acc, (j, tt)| acc | (usize::from(tt.get_bit(p)) << j));
            if step.gate.get_bit(pattern) {
                out.set_bit(p, true);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_ir::Chain;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn eval_chain(chain: &Chain) -> TableArena {
        let mut arena = TableArena::new(chain.num_vars);
        for step in &chain.steps {
            arena.push_step(step).unwrap();
        }
        arena
    }

    #[test]
    fn xor_of_two_inputs() {
        let chain = Chain::parse(&["C = 0110 a b"], 2, 2, 1).unwrap();
        let arena = eval_chain(&chain);
        assert_eq!(arena.get(VarId(2)).unwrap().to_string(), "6");
    }

    #[test]
    fn majority_from_and_or() {
        let chain = Chain::parse(
            &["D = 0001 a b", "E = 0111 a b", "F = 0001 c e", "G = 0111 d f"],
            3,
            2,
            4,
        )
        .unwrap();
        let arena = eval_chain(&chain);
        assert_eq!(arena.get(VarId(3)).unwrap().to_string(), "88");
        assert_eq!(arena.get(VarId(4)).unwrap().to_string(), "ee");
        assert_eq!(arena.get(VarId(6)).unwrap().to_string(), "e8");
    }

    #[test]
    fn single_majority_gate() {
        let chain = Chain::parse(&["D = 00010111 a b c"], 3, 3, 1).unwrap();
        let arena = eval_chain(&chain);
        assert_eq!(arena.get(VarId(3)).unwrap().to_string(), "e8");
    }

    #[test]
    fn fanin_order_selects_pattern_bits() {
        // gate bit 1 only: first fan-in high, second low
        let chain = Chain::parse(&["D = 0100 a c"], 3, 2, 1).unwrap();
        let arena = eval_chain(&chain);
        let out = arena.get(VarId(3)).unwrap();
        for p in 0..8 {
            assert_eq!(out.get_bit(p), p & 1 == 1 && p & 4 == 0, "p={p}");
        }
    }

    #[test]
    fn out_of_sequence_step_is_refused() {
        let chain = Chain::parse(&["D = 0110 a b"], 3, 2, 1).unwrap();
        let mut arena = TableArena::new(2);
        assert_eq!(
            arena.push_step(&chain.steps[0]).unwrap_err(),
            EvalError::OutOfSequence {
                expected: VarId(2),
                got: VarId(3)
            }
        );
    }

    #[test]
    fn missing_fanin_is_refused() {
        let chain = Chain::parse(&["D = 0001 a b", "E = 0110 c d"], 3, 2, 2).unwrap();
        let arena = TableArena::new(3);
        assert_eq!(
            arena.simulate(&chain.steps[1]).unwrap_err(),
            EvalError::MissingFanin(VarId(3))
        );
    }

    #[test]
    fn agrees_with_pointwise_evaluation() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..50 {
            let num_vars = rng.gen_range(2..=5);
            let fanin = rng.gen_range(1..=num_vars.min(3));
            let steps = rng.gen_range(1..=4);
            let mut lines = Vec::new();
            for i in 0..steps {
                let defined = num_vars + i;
                let mut fanins: Vec<usize> = Vec::new();
                while fanins.len() < fanin {
                    let v = rng.gen_range(0..defined);
                    if !fanins.contains(&v) {
                        fanins.push(v);
                    }
                }
                fanins.sort_unstable();
                let mut gate = String::from("0");
                for _ in 1..(1 << fanin) {
                    gate.push(if rng.gen_bool(0.5) { '1' } else { '0' });
                }
                let mut line = format!("{} = {}", VarId(defined).step_name(), gate);
                for v in fanins {
                    line.push(' ');
                    line.push(VarId(v).letter());
                }
                lines.push(line);
            }
            let chain = Chain::parse(&lines, num_vars, fanin, steps).unwrap();
            let arena = eval_chain(&chain);

            for p in 0..(1usize << num_vars) {
                let mut values: Vec<bool> = (0..num_vars).map(|i| (p >> i) & 1 == 1).collect();
                for step in &chain.steps {
                    let pattern = step
                        .fanins
                        .iter()
                        .enumerate()
                        .fold(0usize, |acc, (j, v)| acc | (usize::from(values[v.0]) << j));
                    values.push(step.gate_bits.as_bytes()[pattern] == b'1');
                }
                for (id, &value) in values.iter().enumerate() {
                    assert_eq!(arena.get(VarId(id)).unwrap().get_bit(p), value);
                }
            }
        }
    }
}
