//! # Circuit Artifacts
//!
//! A proving run needs two artifacts produced by the circuit's setup:
//!
//! ```text
//! <circuit_id>.manifest.json   the circuit program: id, version, range width,
//!                              signal count, curve, proof system
//! <circuit_id>.pk              compressed Groth16 proving key
//! <circuit_id>.vk              compressed Groth16 verification key
//! ```
//!
//! Artifacts are read through an [`ArtifactSource`] (local directory or an
//! in-memory map) and cached per circuit id by [`ArtifactCache`]. The cache
//! loads each circuit at most once, even under concurrent first use, and
//! never evicts. A failed load leaves the slot empty so the next request
//! tries again.
//!
//! Transient I/O failures are retried with exponential backoff. Missing or
//! corrupt artifacts are not.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::{
    ServiceConfig, CIRCUIT_ID, CIRCUIT_VERSION, MAX_FETCH_BACKOFF, PROOF_SYSTEM,
    PUBLIC_SIGNAL_COUNT, RANGE_BITS, ZKP_CURVE,
};
use crate::crypto::fingerprint;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an artifact could not be obtained.
#[derive(Debug, Error)]
pub enum ArtifactFetchError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("artifact is corrupt: {0}")]
    Corrupt(String),

    /// The artifact is well-formed but was built for another circuit.
    #[error("artifact does not match this circuit: {0}")]
    Incompatible(String),

    #[error("I/O error reading {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactFetchError {
    /// Whether retrying the same fetch could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ArtifactFetchError::Io { source, .. } => !matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Describes the circuit a proving key was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitManifest {
    pub circuit_id: String,
    pub version: u32,
    /// Bit width of the value and bounds inside the circuit.
    pub range_bits: usize,
    pub public_signals: usize,
    pub curve: String,
    pub proof_system: String,
}

impl CircuitManifest {
    /// Manifest for the range circuit at the given width.
    pub fn range_circuit(circuit_id: impl Into<String>, range_bits: usize) -> Self {
        Self {
            circuit_id: circuit_id.into(),
            version: CIRCUIT_VERSION,
            range_bits,
            public_signals: PUBLIC_SIGNAL_COUNT,
            curve: ZKP_CURVE.to_string(),
            proof_system: PROOF_SYSTEM.to_string(),
        }
    }

    /// Reject manifests this build cannot prove for.
    pub fn check_compatible(&self) -> Result<(), ArtifactFetchError> {
        if self.version != CIRCUIT_VERSION {
            return Err(ArtifactFetchError::Incompatible(format!(
                "circuit version {} (expected {CIRCUIT_VERSION})",
                self.version
            )));
        }
        if self.curve != ZKP_CURVE || self.proof_system != PROOF_SYSTEM {
            return Err(ArtifactFetchError::Incompatible(format!(
                "{}/{} (expected {ZKP_CURVE}/{PROOF_SYSTEM})",
                self.curve, self.proof_system
            )));
        }
        if self.public_signals != PUBLIC_SIGNAL_COUNT {
            return Err(ArtifactFetchError::Incompatible(format!(
                "{} public signals (expected {PUBLIC_SIGNAL_COUNT})",
                self.public_signals
            )));
        }
        if self.range_bits == 0 || self.range_bits > RANGE_BITS {
            return Err(ArtifactFetchError::Incompatible(format!(
                "range width {} outside 1..={RANGE_BITS}",
                self.range_bits
            )));
        }
        Ok(())
    }
}

impl Default for CircuitManifest {
    fn default() -> Self {
        Self::range_circuit(CIRCUIT_ID, RANGE_BITS)
    }
}

pub fn manifest_file(circuit_id: &str) -> String {
    format!("{circuit_id}.manifest.json")
}

pub fn proving_key_file(circuit_id: &str) -> String {
    format!("{circuit_id}.pk")
}

pub fn verification_key_file(circuit_id: &str) -> String {
    format!("{circuit_id}.vk")
}

/// Everything the prover needs for one circuit.
#[derive(Clone)]
pub struct CircuitArtifacts {
    pub manifest: CircuitManifest,
    pub proving_key: Bytes,
    /// BLAKE3 fingerprint of `proving_key`.
    pub fingerprint: String,
}

impl CircuitArtifacts {
    pub fn new(manifest: CircuitManifest, proving_key: Bytes) -> Self {
        let fingerprint = fingerprint(&proving_key);
        Self {
            manifest,
            proving_key,
            fingerprint,
        }
    }
}

impl std::fmt::Debug for CircuitArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitArtifacts")
            .field("manifest", &self.manifest)
            .field("proving_key", &format_args!("{} bytes", self.proving_key.len()))
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Somewhere artifacts can be read from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Read one artifact by file name.
    async fn fetch(&self, name: &str) -> Result<Bytes, ArtifactFetchError>;
}

/// Reads artifacts from a local directory.
#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    root: PathBuf,
}

impl FsArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactSource for FsArtifactSource {
    async fn fetch(&self, name: &str) -> Result<Bytes, ArtifactFetchError> {
        let path = self.root.join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactFetchError::NotFound(path.display().to_string()))
            }
            Err(source) => Err(ArtifactFetchError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// In-memory artifact map. Used by tests and by nodes that run their own
/// setup at startup.
#[derive(Debug, Default)]
pub struct MemoryArtifactSource {
    entries: DashMap<String, Bytes>,
}

impl MemoryArtifactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.entries.insert(name.into(), data.into());
    }

    pub fn remove(&self, name: &str) {
        self.entries.remove(name);
    }
}

#[async_trait]
impl ArtifactSource for MemoryArtifactSource {
    async fn fetch(&self, name: &str) -> Result<Bytes, ArtifactFetchError> {
        self.entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ArtifactFetchError::NotFound(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// How hard to try before giving up on a transient failure.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl FetchPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            attempts: config.fetch_attempts.max(1),
            backoff: config.fetch_backoff(),
        }
    }

    /// Delay before retry number `attempt` (1-based): `backoff * 2^(attempt-1)`,
    /// saturating at [`MAX_FETCH_BACKOFF`].
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff
            .checked_mul(factor)
            .map_or(MAX_FETCH_BACKOFF, |d| d.min(MAX_FETCH_BACKOFF))
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

/// Fetch with exponential backoff on transient errors.
pub async fn fetch_with_retry(
    source: &dyn ArtifactSource,
    name: &str,
    policy: FetchPolicy,
) -> Result<Bytes, ArtifactFetchError> {
    let mut attempt = 1;
    loop {
        match source.fetch(name).await {
            Ok(data) => return Ok(data),
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                let delay = policy.delay(attempt);
                warn!(artifact = name, attempt, ?delay, error = %e, "artifact fetch failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetch and validate a circuit's manifest and proving key.
pub async fn load_artifacts(
    source: &dyn ArtifactSource,
    circuit_id: &str,
    policy: FetchPolicy,
) -> Result<CircuitArtifacts, ArtifactFetchError> {
    let raw = fetch_with_retry(source, &manifest_file(circuit_id), policy).await?;
    let manifest: CircuitManifest = serde_json::from_slice(&raw)
        .map_err(|e| ArtifactFetchError::Corrupt(format!("{}: {e}", manifest_file(circuit_id))))?;
    if manifest.circuit_id != circuit_id {
        return Err(ArtifactFetchError::Incompatible(format!(
            "manifest names circuit '{}', requested '{circuit_id}'",
            manifest.circuit_id
        )));
    }
    manifest.check_compatible()?;

    let proving_key = fetch_with_retry(source, &proving_key_file(circuit_id), policy).await?;
    if proving_key.is_empty() {
        return Err(ArtifactFetchError::Corrupt(format!(
            "{} is empty",
            proving_key_file(circuit_id)
        )));
    }

    Ok(CircuitArtifacts::new(manifest, proving_key))
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Loads circuit artifacts once per circuit id and shares them.
pub struct ArtifactCache {
    source: Arc<dyn ArtifactSource>,
    policy: FetchPolicy,
    slots: DashMap<String, Arc<OnceCell<Arc<CircuitArtifacts>>>>,
}

impl ArtifactCache {
    pub fn new(source: Arc<dyn ArtifactSource>, policy: FetchPolicy) -> Self {
        Self {
            source,
            policy,
            slots: DashMap::new(),
        }
    }

    /// Artifacts for `circuit_id`, loading them on first use.
    pub async fn get(&self, circuit_id: &str) -> Result<Arc<CircuitArtifacts>, ArtifactFetchError> {
        let slot = self
            .slots
            .entry(circuit_id.to_string())
            .or_default()
            .clone();

        slot.get_or_try_init(|| async {
            debug!(circuit_id, "loading circuit artifacts");
            let artifacts = load_artifacts(self.source.as_ref(), circuit_id, self.policy).await?;
            info!(
                circuit_id,
                range_bits = artifacts.manifest.range_bits,
                pk_bytes = artifacts.proving_key.len(),
                pk_fingerprint = %artifacts.fingerprint,
                "circuit artifacts loaded"
            );
            Ok(Arc::new(artifacts))
        })
        .await
        .cloned()
    }

    pub fn is_loaded(&self, circuit_id: &str) -> bool {
        self.slots
            .get(circuit_id)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }
}
