//! # bln_verify
//!
//! **Verification of exact-synthesis Boolean chains**
//!
//! A chain is an ordered list of bounded-fan-in gates over the primary
//! inputs `a, b, c, ...`, each gate named by the next letter of the
//! alphabet and given by its normalized truth table. Exact synthesis emits
//! every optimum chain it finds for a target function; this crate checks
//! that each one is well-formed, computes the target, and respects the
//! canonical step order the search uses to prune duplicates.
//!
//! ## Quick Start
//!
//! ```rust
//! use bln_verify::{Verifier, VerifyConfig};
//!
//! // a XOR b: 2 inputs, fan-in 2, 1 step
//! let verifier = Verifier::new(VerifyConfig::new(2, 2, 1), "6").unwrap();
//!
//! assert!(verifier.verify(&["C = 0110 a b"]).is_accepted());
//! assert!(!verifier.verify(&["C = 0111 a b"]).is_accepted());
//! ```
//!
//! ## Key Concepts
//!
//! - **TruthTable**: Bit-packed function of up to 20 inputs
//! - **Chain**: Parsed steps, each a gate over earlier signals
//! - **Verifier**: Parse, simulate, order-check and compare against the target
//! - **Batch**: Parallel verification of every chain in a `.bln` file
//! - **Threshold**: Linear-form identification through an ILP solver

pub mod batch;
pub mod chain_ir;
pub mod config;
pub mod order;
pub mod simulate;
pub mod threshold;
pub mod truth_table;
pub mod verify;

pub use batch::{verify_file, BatchReport};
pub use chain_ir::{Chain, ParseFailure, Step, VarId};
pub use config::{ConfigError, SymmetryPolicy, VerifyConfig};
pub use threshold::{is_threshold, LinearForm};
pub use truth_table::{TruthTable, TruthTableError};
pub use verify::{verify, ErrorKind, Verdict, Verifier, VerifyError};
