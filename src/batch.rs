//! Batch verification of `.bln` chain files.
//!
//! A chain file holds every solution an exact-synthesis run produced for one
//! target, one block of step lines per chain, blocks separated by blank
//! lines. Files are named `<hex-spec>-<fanin>-<steps>.bln`.

use crate::verify::{Verdict, Verifier};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Contiguous non-blank lines of a chain file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// 1-based line number of the first line
    pub start_line: usize,
    /// Trimmed lines
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub index: usize,
    pub start_line: usize,
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// Aggregate outcome of one chain file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Blocks seen
    pub solutions: usize,
    /// Blocks rejected
    pub violations: usize,
    /// Accepted blocks with at least one symmetry violation
    pub symmetry_warnings: usize,
    /// `solutions / 2^violations`
    pub points: f64,
    pub blocks: Vec<BlockReport>,
}

/// File name of the chains for `hex_spec` at the given fan-in and length.
pub fn chain_file_name(hex_spec: &str, fanin: usize, steps: usize) -> String {
    format!("{hex_spec}-{fanin}-{steps}.bln")
}

pub fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    for (n, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            blocks.extend(current.take());
            continue;
        }
        current
            .get_or_insert_with(|| Block {
                start_line: n + 1,
                lines: Vec::new(),
            })
            .lines
            .push(line.to_string());
    }
    blocks.extend(current);
    blocks
}

/// Verifies `blocks` in parallel; reports stay in block order.
pub fn verify_blocks(verifier: &Verifier, blocks: &[Block]) -> BatchReport {
    let blocks: Vec<BlockReport> = blocks
        .par_iter()
        .enumerate()
        .map(|(index, block)| BlockReport {
            index,
            start_line: block.start_line,
            verdict: verifier.verify(&block.lines),
        })
        .collect();

    let solutions = blocks.len();
    let mut violations = 0;
    let mut symmetry_warnings = 0;
    for report in &blocks {
        match &report.verdict {
            Verdict::Rejected { error } => {
                debug!(
                    block = report.index,
                    line = report.start_line,
                    kind = ?error.kind(),
                    "{error}"
                );
                violations += 1;
            }
            Verdict::Accepted {
                symmetry_violations,
            } if !symmetry_violations.is_empty() => symmetry_warnings += 1,
            Verdict::Accepted { .. } => {}
        }
    }
    let points = solutions as f64 / 2f64.powi(violations.min(i32::MAX as usize) as i32);
    info!(solutions, violations, symmetry_warnings, points, "batch verified");

    BatchReport {
        solutions,
        violations,
        symmetry_warnings,
        points,
        blocks,
    }
}

/// Reads and verifies one chain file.
pub fn verify_file(path: &Path, verifier: &Verifier) -> Result<BatchReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read chain file {}", path.display()))?;
    let blocks = split_blocks(&text);
    info!(path = %path.display(), blocks = blocks.len(), "verifying chain file");
    Ok(verify_blocks(verifier, &blocks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifyConfig;
    use crate::verify::ErrorKind;
    use std::io::Write;

    fn xor_verifier() -> Verifier {
        Verifier::new(VerifyConfig::new(2, 2, 1), "6").unwrap()
    }

    #[test]
    fn file_name_layout() {
        assert_eq!(chain_file_name("e8", 2, 4), "e8-2-4.bln");
    }

    #[test]
    fn blocks_split_on_blank_lines() {
        let text = "\n  C = 0110 a b \n\n\n   \nD = 0001 a b\nE = 0111 a b\n";
        let blocks = split_blocks(text);
        assert_eq!(
            blocks,
            vec![
                Block {
                    start_line: 2,
                    lines: vec!["C = 0110 a b".into()]
                },
                Block {
                    start_line: 6,
                    lines: vec!["D = 0001 a b".into(), "E = 0111 a b".into()]
                },
            ]
        );
        assert!(split_blocks("").is_empty());
        assert!(split_blocks("\n\n").is_empty());
    }

    #[test]
    fn report_counts_and_points() {
        let blocks = split_blocks("C = 0110 a b\n\nC = 0111 a b\n\nC = 0110 b a\n\nC = 0110 a b\n");
        let report = verify_blocks(&xor_verifier(), &blocks);
        assert_eq!(report.solutions, 4);
        assert_eq!(report.violations, 2);
        assert_eq!(report.symmetry_warnings, 0);
        assert_eq!(report.points, 1.0);
        assert_eq!(report.blocks[1].verdict.kind(), Some(ErrorKind::Functional));
        assert_eq!(report.blocks[2].verdict.kind(), Some(ErrorKind::Structural));
        assert_eq!(report.blocks[3].start_line, 7);
        assert!(report.blocks[3].verdict.is_accepted());
    }

    #[test]
    fn symmetry_warnings_are_counted() {
        let verifier = Verifier::new(VerifyConfig::new(3, 2, 2), "96").unwrap();
        let blocks = split_blocks("D = 0110 b c\nE = 0110 a d\n\nD = 0110 a b\nE = 0110 c d\n");
        let report = verify_blocks(&verifier, &blocks);
        assert_eq!(report.violations, 0);
        assert_eq!(report.symmetry_warnings, 1);
        assert_eq!(report.points, 2.0);
    }

    #[test]
    fn reads_chain_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(chain_file_name("6", 2, 1));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "C = 0110 a b\n\nC = 0001 a b").unwrap();
        drop(file);

        let report = verify_file(&path, &xor_verifier()).unwrap();
        assert_eq!(report.solutions, 2);
        assert_eq!(report.violations, 1);
        assert_eq!(report.points, 1.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["blocks"][0]["verdict"], "accepted");
        assert_eq!(json["blocks"][1]["verdict"], "rejected");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_file(&dir.path().join("absent.bln"), &xor_verifier()).unwrap_err();
        assert!(err.to_string().contains("absent.bln"));
    }

    #[test]
    fn empty_file_scores_zero() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let report = verify_file(file.path(), &xor_verifier()).unwrap();
        assert_eq!(report.solutions, 0);
        assert_eq!(report.points, 0.0);
    }
}
