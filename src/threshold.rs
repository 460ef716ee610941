//! # Threshold function identification
//!
//! A Boolean function is a threshold function if it can be written as
//!
//! ```text
//! f(x_0, ..., x_{n-1}) = [ w_0 x_0 + ... + w_{n-1} x_{n-1} >= T ]
//! ```
//!
//! Identification first checks that the function is unate in every
//! variable (binate functions are never threshold functions) and
//! complements the negative-unate variables. The resulting positive-unate
//! function is turned into an integer program with one row per truth-table
//! bit, handed to an [`IlpSolver`], and the optimal weights are mapped back
//! through the complementation.
//!
//! ```rust
//! use bln_verify::threshold::is_threshold;
//! use bln_verify::TruthTable;
//!
//! let maj = TruthTable::from_hex(3, "e8").unwrap();
//! let form = is_threshold(&maj).unwrap();
//! assert_eq!(form.weights, vec![1, 1, 1]);
//! assert_eq!(form.threshold, 2);
//!
//! let xor = TruthTable::from_hex(2, "6").unwrap();
//! assert!(is_threshold(&xor).is_none());
//! ```

use crate::truth_table::TruthTable;
use microlp::{ComparisonOp, OptimizationDirection, Problem};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Monotonicity of a function in one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Non-decreasing in the variable
    Positive,
    /// Non-increasing in the variable (complemented before solving)
    Negative,
}

/// Row comparison of an [`IlpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmp {
    Ge,
    Le,
}

/// One linear row `coeffs · x (>=|<=) rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub coeffs: Vec<i64>,
    pub cmp: Cmp,
    pub rhs: i64,
}

/// Integer program over non-negative integer columns, minimizing
/// `objective · x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlpModel {
    pub num_cols: usize,
    pub objective: Vec<i64>,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("model is infeasible")]
    Infeasible,
    #[error("solver error: {0}")]
    Solver(String),
}

/// Solves an [`IlpModel`] to integral optimality.
pub trait IlpSolver {
    /// Returns one value per column of an optimal solution.
    fn solve(&self, model: &IlpModel) -> Result<Vec<i64>, SolveError>;
}

/// [`IlpSolver`] backed by the in-process `microlp` branch-and-bound solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpSolver;

impl IlpSolver for MicrolpSolver {
    fn solve(&self, model: &IlpModel) -> Result<Vec<i64>, SolveError> {
        if model.objective.len() != model.num_cols {
            return Err(SolveError::Solver(format!(
                "objective has {} coefficients for {} columns",
                model.objective.len(),
                model.num_cols
            )));
        }
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<_> = model
            .objective
            .iter()
            .map(|&c| problem.add_integer_var(c as f64, (0, i32::MAX)))
            .collect();
        for row in &model.constraints {
            if row.coeffs.len() != model.num_cols {
                return Err(SolveError::Solver(format!(
                    "row has {} coefficients for {} columns",
                    row.coeffs.len(),
                    model.num_cols
                )));
            }
            let expr: Vec<_> = vars
                .iter()
                .zip(&row.coeffs)
                .filter(|(_, &c)| c != 0)
                .map(|(&v, &c)| (v, c as f64))
                .collect();
            let op = match row.cmp {
                Cmp::Ge => ComparisonOp::Ge,
                Cmp::Le => ComparisonOp::Le,
            };
            problem.add_constraint(&expr[..], op, row.rhs as f64);
        }
        match problem.solve() {
            Ok(solution) => Ok(vars.iter().map(|&v| solution[v].round() as i64).collect()),
            Err(microlp::Error::Infeasible) => Err(SolveError::Infeasible),
            Err(e) => Err(SolveError::Solver(e.to_string())),
        }
    }
}

/// Weights and threshold of a threshold function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearForm {
    pub weights: Vec<i64>,
    pub threshold: i64,
}

impl LinearForm {
    /// Value of the form at assignment index `p` (input `i` is bit `i`).
    pub fn evaluate(&self, p: usize) -> bool {
        let sum: i64 = self
            .weights
            .iter()
            .enumerate()
            .filter(|(i, _)| (p >> i) & 1 == 1)
            .map(|(_, &w)| w)
            .sum();
        sum >= self.threshold
    }

    /// Truth table realized by the form.
    pub fn to_truth_table(&self) -> TruthTable {
        TruthTable::from_fn(self.weights.len(), |p| self.evaluate(p))
    }
}

impl fmt::Display for LinearForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weights: Vec<String> = self.weights.iter().map(i64::to_string).collect();
        write!(f, "[{}; {}]", weights.join(", "), self.threshold)
    }
}

/// Per-variable polarity, or `None` if the function is binate in some
/// variable. A variable the function ignores is reported as negative.
pub fn unate_polarities(tt: &TruthTable) -> Option<Vec<Polarity>> {
    (0..tt.num_vars())
        .map(|i| {
            let (c0, c1) = (tt.cofactor0(i), tt.cofactor1(i));
            if c1.implies(&c0) {
                Some(Polarity::Negative)
            } else if c0.implies(&c1) {
                Some(Polarity::Positive)
            } else {
                None
            }
        })
        .collect()
}

/// Integer program for a positive-unate table: columns `[w_0..w_{n-1}, T]`,
/// onset rows `Σ w_j x_j - T >= 0`, offset rows `Σ w_j x_j - T <= -1`,
/// objective `Σ w_j + T`.
pub fn build_model(tt: &TruthTable) -> IlpModel {
    let n = tt.num_vars();
    let constraints = (0..tt.num_bits())
        .map(|p| {
            let mut coeffs: Vec<i64> = (0..n).map(|j| ((p >> j) & 1) as i64).collect();
            coeffs.push(-1);
            if tt.get_bit(p) {
                Constraint {
                    coeffs,
                    cmp: Cmp::Ge,
                    rhs: 0,
                }
            } else {
                Constraint {
                    coeffs,
                    cmp: Cmp::Le,
                    rhs: -1,
                }
            }
        })
        .collect();
    IlpModel {
        num_cols: n + 1,
        objective: vec![1; n + 1],
        constraints,
    }
}

/// Identifies `tt` as a threshold function using `solver`.
///
/// Binate functions, infeasible models and solver failures all yield
/// `None`.
pub fn identify_threshold<S: IlpSolver + ?Sized>(tt: &TruthTable, solver: &S) -> Option<LinearForm> {
    let Some(polarities) = unate_polarities(tt) else {
        debug!(tt = %tt, "binate, not a threshold function");
        return None;
    };
    let flipped = polarities
        .iter()
        .enumerate()
        .filter(|(_, &p)| p == Polarity::Negative)
        .fold(tt.clone(), |acc, (i, _)| acc.flip(i));

    let model = build_model(&flipped);
    let values = match solver.solve(&model) {
        Ok(values) if values.len() == model.num_cols => values,
        Ok(values) => {
            debug!(got = values.len(), "solver returned a short assignment");
            return None;
        }
        Err(e) => {
            debug!(tt = %tt, error = %e, "not a threshold function");
            return None;
        }
    };

    let n = tt.num_vars();
    let mut threshold = values[n];
    let weights = polarities
        .iter()
        .zip(&values[..n])
        .map(|(&polarity, &w)| match polarity {
            Polarity::Positive => w,
            Polarity::Negative => {
                threshold -= w;
                -w
            }
        })
        .collect();
    Some(LinearForm { weights, threshold })
}

/// [`identify_threshold`] with the default solver.
pub fn is_threshold(tt: &TruthTable) -> Option<LinearForm> {
    identify_threshold(tt, &MicrolpSolver)
}
