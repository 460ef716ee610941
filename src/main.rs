use anyhow::{anyhow, Context, Result};
use bln_verify::batch::{chain_file_name, verify_file};
use bln_verify::threshold::is_threshold;
use bln_verify::{SymmetryPolicy, TruthTable, Verifier, VerifyConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Verifier for exact-synthesis Boolean chains
#[derive(Parser)]
#[command(name = "bln-verify", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every chain in `<HEX-TT>-<FANIN>-<STEPS>.bln`
    ///
    /// A missing chain file is an error, not an empty run with zero
    /// solutions.
    Verify {
        /// Number of primary inputs
        vars: usize,
        /// Target truth table, hexadecimal, most significant digit first
        spec: String,
        /// Inputs per gate
        fanin: usize,
        /// Steps per chain
        steps: usize,
        /// Directory holding the chain file
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Explicit chain file, overrides --dir (must exist)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Symmetry violation handling: report or reject
        #[arg(long, default_value = "report")]
        symmetry: String,
        /// Print the full report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Identify a threshold function and print its linear form
    Threshold {
        /// Number of inputs
        vars: usize,
        /// Truth table, hexadecimal, most significant digit first
        spec: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Verify {
            vars,
            spec,
            fanin,
            steps,
            dir,
            file,
            symmetry,
            json,
        } => {
            let policy = SymmetryPolicy::from_str(&symmetry)
                .ok_or_else(|| anyhow!("unknown symmetry policy: {symmetry}"))?;
            let config = VerifyConfig::new(vars, fanin, steps).with_symmetry(policy);
            let verifier = Verifier::new(config, &spec).context("invalid verification setup")?;
            let path = file.unwrap_or_else(|| dir.join(chain_file_name(&spec, fanin, steps)));
            info!(path = %path.display(), policy = policy.as_str(), "verify");

            let report = verify_file(&path, &verifier)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("[i] violations = {}", report.violations);
                println!("[i] solutions = {}", report.solutions);
                println!("[i] points = {}", report.points);
            }
        }
        Commands::Threshold { vars, spec } => {
            let tt = TruthTable::from_literal(vars, &spec)
                .with_context(|| format!("invalid truth table {spec}"))?;
            match is_threshold(&tt) {
                Some(form) => println!("{form}"),
                None => println!("not a threshold function"),
            }
        }
    }
    Ok(())
}
