//! # Protocol Configuration & Constants
//!
//! Every magic number of the assessment workflow lives here, next to the
//! runtime [`ServiceConfig`] the node builds from its CLI flags.
//!
//! Circuit-shaped constants (range width, MiMC rounds, commitment domain)
//! are part of the proving contract: the proving key, the verification key
//! and every stored commitment depend on them. Changing one means a new
//! circuit id and a new setup, not a patch release.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Circuit identity
// ---------------------------------------------------------------------------

/// Identifier of the range-assessment circuit. Used as the artifact stem
/// (`<id>.manifest.json`, `<id>.pk`, `<id>.vk`) and stored in the manifest.
pub const CIRCUIT_ID: &str = "range_assessment";

/// Circuit version. Bump together with any constraint change.
pub const CIRCUIT_VERSION: u32 = 1;

/// Bit width of the in-circuit comparators. Value and both bounds must lie in
/// the signed window `[-2^(RANGE_BITS-1), 2^(RANGE_BITS-1))`.
pub const RANGE_BITS: usize = 64;

/// Number of public signals the circuit exposes:
/// `[inRange, commitment, minBound, maxBound]`.
pub const PUBLIC_SIGNAL_COUNT: usize = 4;

/// ZKP curve. BN254 keeps the verifier compatible with the EVM precompiles
/// and with keys produced by other Groth16 toolchains.
pub const ZKP_CURVE: &str = "BN254";

/// Proof system label recorded in manifests and API responses.
pub const PROOF_SYSTEM: &str = "groth16";

// ---------------------------------------------------------------------------
// Commitment parameters
// ---------------------------------------------------------------------------

/// MiMC-7 round count over the BN254 scalar field (the standard MiMC-7 parameter).
pub const MIMC_ROUNDS: usize = 91;

/// Domain tag for the MiMC key used by the commitment encoder.
pub const COMMITMENT_DOMAIN: &str = "riskproof 2026-01 commitment key v1";

/// Domain tag for the MiMC round constants.
pub const MIMC_CONSTANTS_DOMAIN: &str = "riskproof 2026-01 mimc7 round constants";

/// Hex digits in a rendered commitment (32-byte big-endian field element).
pub const COMMITMENT_HEX_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Timing and retry
// ---------------------------------------------------------------------------

/// Hard ceiling for a single proving run. A stuck prover must not hang the
/// calling request.
pub const DEFAULT_PROVING_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts (including the first) for a transient artifact fetch failure.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Base delay of the exponential backoff between artifact fetch attempts.
pub const DEFAULT_FETCH_BACKOFF: Duration = Duration::from_millis(200);

/// Ceiling for any single backoff delay, and for the configured base.
pub const MAX_FETCH_BACKOFF: Duration = Duration::from_secs(60);

/// Maximum accepted length of a subject identifier, in bytes.
pub const MAX_SUBJECT_ID_LENGTH: usize = 256;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Runtime knobs for the assessment service.
///
/// Deserialises from JSON with every field optional; missing fields fall
/// back to the constants above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Artifact stem of the circuit to prove with.
    pub circuit_id: String,
    /// Proving timeout in milliseconds.
    pub proving_timeout_ms: u64,
    /// Attempts for transient artifact fetch failures.
    pub fetch_attempts: u32,
    /// Base backoff between artifact fetch attempts, in milliseconds.
    pub fetch_backoff_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            circuit_id: CIRCUIT_ID.to_string(),
            proving_timeout_ms: DEFAULT_PROVING_TIMEOUT.as_millis() as u64,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            fetch_backoff_ms: DEFAULT_FETCH_BACKOFF.as_millis() as u64,
        }
    }
}

/// Errors raised while loading a [`ServiceConfig`] file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ServiceConfig {
    /// Load a JSON config file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.circuit_id.is_empty() {
            return Err(ConfigError::Invalid("circuitId must not be empty".into()));
        }
        if self.proving_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "provingTimeoutMs must be positive".into(),
            ));
        }
        if self.fetch_attempts == 0 {
            return Err(ConfigError::Invalid("fetchAttempts must be at least 1".into()));
        }
        if self.fetch_backoff() > MAX_FETCH_BACKOFF {
            return Err(ConfigError::Invalid(format!(
                "fetchBackoffMs must not exceed {}",
                MAX_FETCH_BACKOFF.as_millis()
            )));
        }
        Ok(())
    }

    pub fn proving_timeout(&self) -> Duration {
        Duration::from_millis(self.proving_timeout_ms)
    }

    pub fn fetch_backoff(&self) -> Duration {
        Duration::from_millis(self.fetch_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = ServiceConfig::default();
        assert_eq!(config.circuit_id, CIRCUIT_ID);
        assert_eq!(config.proving_timeout(), DEFAULT_PROVING_TIMEOUT);
        assert_eq!(config.fetch_attempts, DEFAULT_FETCH_ATTEMPTS);
        assert_eq!(config.fetch_backoff(), DEFAULT_FETCH_BACKOFF);
        config.validate().expect("defaults must be valid");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{ "provingTimeoutMs": 5000 }"#).unwrap();
        assert_eq!(config.proving_timeout(), Duration::from_secs(5));
        assert_eq!(config.circuit_id, CIRCUIT_ID);
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = ServiceConfig {
            proving_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_backoff_rejected() {
        let config = ServiceConfig {
            fetch_backoff_ms: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let at_cap = ServiceConfig {
            fetch_backoff_ms: MAX_FETCH_BACKOFF.as_millis() as u64,
            ..Default::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");
        std::fs::write(&path, r#"{ "circuitId": "range_v2", "fetchAttempts": 5 }"#).unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.circuit_id, "range_v2");
        assert_eq!(config.fetch_attempts, 5);
    }

    #[test]
    fn comparator_width_fits_field() {
        // Comparators decompose (a' - b' + 2^RANGE_BITS) into RANGE_BITS + 1 bits;
        // that has to stay far below the 254-bit modulus.
        assert!(RANGE_BITS + 1 < 253);
        assert_eq!(COMMITMENT_HEX_LEN, 64);
    }
}
