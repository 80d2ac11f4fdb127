// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # RiskProof Node
//!
//! Entry point for the `riskproof-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the assessment service and serves
//! the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     start the assessment API
//! - `setup`   run a local trusted setup and write circuit artifacts
//! - `verify`  check a proof bundle offline
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::OsRng, rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tokio::signal;

use riskproof_protocol::config::{ServiceConfig, CIRCUIT_VERSION, PROOF_SYSTEM, ZKP_CURVE};
use riskproof_protocol::storage::SledRecordStore;
use riskproof_protocol::zkp::{
    self, setup_circuit, ArtifactCache, FetchPolicy, FsArtifactSource, Groth16Backend,
    ProofBundle, VerificationKey,
};
use riskproof_protocol::AssessmentService;

use cli::{Commands, RiskProofCli};
use logging::{LogFormat, DEFAULT_FILTER};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RiskProofCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Setup(args) => run_setup(args).await,
        Commands::Verify(args) => verify_bundle(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Builds the service config from the optional file plus CLI overrides.
fn load_config(args: &cli::RunArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(id) = &args.circuit_id {
        config.circuit_id = id.clone();
    }
    if let Some(ms) = args.proving_timeout_ms {
        config.proving_timeout_ms = ms;
    }
    config.validate().context("invalid service configuration")?;
    Ok(config)
}

/// Starts the assessment API and the metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(DEFAULT_FILTER, args.log_format.into());

    let config = load_config(&args)?;
    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        artifacts_dir = %args.artifacts_dir.display(),
        circuit_id = %config.circuit_id,
        proving_timeout_ms = config.proving_timeout_ms,
        "starting riskproof-node"
    );

    // --- Circuit artifacts ---
    let source = Arc::new(FsArtifactSource::new(&args.artifacts_dir));
    let policy = FetchPolicy::from_config(&config);
    let verification_key = VerificationKey::fetch(source.as_ref(), &config.circuit_id, policy)
        .await
        .with_context(|| {
            format!(
                "failed to load verification key for '{}' from {} (run `riskproof-node setup` first)",
                config.circuit_id,
                args.artifacts_dir.display()
            )
        })?;
    tracing::info!(fingerprint = %verification_key.fingerprint(), "verification key loaded");

    let artifacts = Arc::new(ArtifactCache::new(source, policy));
    // Warm the proving key so the first request does not pay for it.
    artifacts
        .get(&config.circuit_id)
        .await
        .context("failed to load proving artifacts")?;

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let store = Arc::new(
        SledRecordStore::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Application state ---
    let service = AssessmentService::new(
        Arc::new(Groth16Backend::new()),
        artifacts,
        Arc::new(verification_key),
        store.clone(),
        &config,
    );
    let app_state = api::AppState {
        version: format!(
            "{} (circuit v{})",
            env!("CARGO_PKG_VERSION"),
            CIRCUIT_VERSION
        ),
        circuit_id: config.circuit_id.clone(),
        service: Arc::new(service),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    store.flush().context("failed to flush database")?;
    tracing::info!("riskproof-node stopped");
    Ok(())
}

/// Runs a local trusted setup and writes the artifacts.
async fn run_setup(args: cli::SetupArgs) -> Result<()> {
    logging::init_logging("riskproof_node=info,riskproof_protocol=info", LogFormat::Pretty);

    tracing::info!(
        circuit_id = %args.circuit_id,
        range_bits = args.range_bits,
        artifacts_dir = %args.artifacts_dir.display(),
        "running circuit setup"
    );
    if args.seed.is_some() {
        tracing::warn!("deterministic seed in use; these keys are for development only");
    }

    let circuit_id = args.circuit_id.clone();
    let range_bits = args.range_bits;
    let seed = args.seed;
    let setup = tokio::task::spawn_blocking(move || match seed {
        Some(seed) => setup_circuit(&circuit_id, range_bits, &mut StdRng::seed_from_u64(seed)),
        None => setup_circuit(&circuit_id, range_bits, &mut OsRng),
    })
    .await
    .context("setup task panicked")?
    .context("circuit setup failed")?;

    setup
        .write_to_dir(&args.artifacts_dir)
        .await
        .with_context(|| {
            format!(
                "failed to write artifacts to {}",
                args.artifacts_dir.display()
            )
        })?;

    println!("Circuit setup complete.");
    println!("  Circuit         : {}", setup.manifest.circuit_id);
    println!("  Range bits      : {}", setup.manifest.range_bits);
    println!("  Artifacts       : {}", args.artifacts_dir.display());
    println!("  VK fingerprint  : {}", setup.verification_key.fingerprint());

    Ok(())
}

/// Verifies a proof bundle file against a verification key file and prints
/// the outcome as JSON.
async fn verify_bundle(args: cli::VerifyArgs) -> Result<()> {
    let raw = tokio::fs::read(&args.bundle)
        .await
        .with_context(|| format!("failed to read bundle {}", args.bundle.display()))?;
    let bundle: ProofBundle = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid bundle JSON in {}", args.bundle.display()))?;

    let key_bytes = tokio::fs::read(&args.verification_key)
        .await
        .with_context(|| {
            format!(
                "failed to read verification key {}",
                args.verification_key.display()
            )
        })?;
    let vk = VerificationKey::from_bytes(&key_bytes).context("invalid verification key")?;

    let outcome = zkp::verify(&bundle.proof, &bundle.public_signals, &vk)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("riskproof-node {}", env!("CARGO_PKG_VERSION"));
    println!("circuit        v{}", CIRCUIT_VERSION);
    println!("proof system   {} / {}", PROOF_SYSTEM, ZKP_CURVE);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
