// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # RiskProof Protocol: Core Library
//!
//! Private range assessments for health records. A caller holds a private
//! integer (a risk score) and wants to disclose only that it lies inside a
//! declared range `[min_bound, max_bound]`. This crate turns that claim into
//! a Groth16 proof over BN254 and checks it again on the other side, without
//! the score ever leaving the proving step.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants and the runtime `ServiceConfig`.
//! - **crypto**: Hashing helpers (BLAKE3 fingerprints, hash-to-field).
//! - **zkp**: Commitment encoder, circuit input builder, proving backend,
//!   proof service and verifier.
//! - **assessment**: The per-assessment state machine and the service that
//!   composes the zkp pieces into `submit_assessment` / `verify_existing`.
//! - **storage**: Append-only assessment record store (sled or in-memory).
//!
//! ## Data flow
//!
//! ```text
//! {subject, value, min, max}
//!     → commit(value)              zkp::commitment
//!     → build(value, min, max, c)  zkp::input
//!     → prove(input, artifacts)    zkp::prover (+ zkp::artifacts)
//!     → verify(proof, signals, vk) zkp::verifier
//!     → store.put(record)          storage
//! ```

pub mod assessment;
pub mod config;
pub mod crypto;
pub mod storage;
pub mod zkp;

pub use assessment::{AssessmentReceipt, AssessmentRecord, AssessmentService, AssessmentState};
pub use zkp::{AssessmentError, VerificationOutcome};
