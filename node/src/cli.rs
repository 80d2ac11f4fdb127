//! # CLI Interface
//!
//! Defines the command-line argument structure for `riskproof-node` using
//! `clap` derive. Supports four subcommands: `run`, `setup`, `verify`,
//! and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use riskproof_protocol::config::{CIRCUIT_ID, RANGE_BITS};

use crate::logging::LogFormat;

/// RiskProof assessment node.
///
/// Proves that a private risk score lies inside a declared range without
/// revealing it, verifies such proofs, and keeps an audit trail of every
/// assessment. Serves a JSON API and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "riskproof-node",
    about = "RiskProof assessment node",
    version,
    propagate_version = true
)]
pub struct RiskProofCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the RiskProof node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the assessment API.
    Run(RunArgs),
    /// Run a local trusted setup and write the circuit artifacts to disk.
    Setup(SetupArgs),
    /// Verify a proof bundle offline against a verification key file.
    Verify(VerifyArgs),
    /// Print version information and exit.
    Version,
}

/// Log output format as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to a JSON service configuration file.
    ///
    /// Every field is optional; flags below override the file.
    #[arg(long, short = 'c', env = "RISKPROOF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the assessment record database.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "RISKPROOF_DATA_DIR", default_value = "./riskproof-data")]
    pub data_dir: PathBuf,

    /// Directory holding `<circuit>.manifest.json`, `<circuit>.pk` and
    /// `<circuit>.vk`, as written by `riskproof-node setup`.
    #[arg(long, short = 'a', env = "RISKPROOF_ARTIFACTS_DIR", default_value = "./artifacts")]
    pub artifacts_dir: PathBuf,

    /// Circuit artifact stem. Overrides `circuitId` in the config file.
    #[arg(long, env = "RISKPROOF_CIRCUIT_ID")]
    pub circuit_id: Option<String>,

    /// Proving timeout in milliseconds. Overrides `provingTimeoutMs`.
    #[arg(long, env = "RISKPROOF_PROVING_TIMEOUT_MS")]
    pub proving_timeout_ms: Option<u64>,

    /// Port for the assessment API.
    #[arg(long, env = "RISKPROOF_API_PORT", default_value_t = 9851)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "RISKPROOF_METRICS_PORT", default_value_t = 9852)]
    pub metrics_port: u16,

    /// Address both listeners bind to.
    #[arg(long, env = "RISKPROOF_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Log output format.
    #[arg(long, env = "RISKPROOF_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

/// Arguments for the `setup` subcommand.
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Directory to write the artifacts into.
    #[arg(long, short = 'a', env = "RISKPROOF_ARTIFACTS_DIR", default_value = "./artifacts")]
    pub artifacts_dir: PathBuf,

    /// Circuit artifact stem.
    #[arg(long, default_value = CIRCUIT_ID)]
    pub circuit_id: String,

    /// Comparator bit width.
    #[arg(long, default_value_t = RANGE_BITS)]
    pub range_bits: usize,

    /// Deterministic seed. Development only: anyone who knows the seed can
    /// forge proofs.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// JSON file with `{ "proof": ..., "publicSignals": [...] }`.
    ///
    /// An assessment receipt works too; extra fields are ignored.
    #[arg(long, short = 'b')]
    pub bundle: PathBuf,

    /// Verification key file (`<circuit>.vk`).
    #[arg(long, short = 'k')]
    pub verification_key: PathBuf,
}
