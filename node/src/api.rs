//! # REST API
//!
//! Builds the axum router that exposes the node's assessment interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Description                          |
//! |--------|-----------------------------|--------------------------------------|
//! | GET    | `/health`                   | Liveness probe                       |
//! | POST   | `/assessments`              | Commit, prove, verify and record     |
//! | GET    | `/assessments/:subject_id`  | A subject's records, oldest first    |
//! | GET    | `/records/:id`              | One record by id                     |
//! | POST   | `/verify`                   | Verify a proof + public signals      |
//! | GET    | `/verification-key`         | The key this node verifies against   |
//!
//! ## Errors
//!
//! Every failure is a JSON body `{ "error": <kind>, "message": <text> }`.
//! `error` is the stable code from [`AssessmentError::kind`]; `message`
//! never contains the private value.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use riskproof_protocol::storage::StoreError;
use riskproof_protocol::zkp::ProofBundle;
use riskproof_protocol::{AssessmentError, AssessmentService};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone. Everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Circuit the service proves with.
    pub circuit_id: String,
    /// The assessment workflow.
    pub service: Arc<AssessmentService>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/assessments", post(submit_handler))
        .route("/assessments/:subject_id", get(history_handler))
        .route("/records/:id", get(record_handler))
        .route("/verify", post(verify_handler))
        .route("/verification-key", get(verification_key_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /assessments`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub subject_id: String,
    pub private_value: i64,
    pub min_bound: i64,
    pub max_bound: i64,
}

/// Response for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub circuit_id: String,
    pub vk_fingerprint: String,
}

/// Response for `GET /verification-key`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKeyResponse {
    pub circuit_id: String,
    pub fingerprint: String,
    pub public_inputs: usize,
    /// Compressed arkworks encoding, hex.
    pub key: String,
}

/// Standard error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler error, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    Assessment(AssessmentError),
    BadRequest(String),
    NotFound(String),
}

impl From<AssessmentError> for ApiError {
    fn from(e: AssessmentError) -> Self {
        ApiError::Assessment(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// HTTP status for a workflow error.
fn status_for(err: &AssessmentError) -> StatusCode {
    match err {
        AssessmentError::InvalidSubject(_)
        | AssessmentError::Encoding(_)
        | AssessmentError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        AssessmentError::RangeViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentError::Storage(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        AssessmentError::ProvingTimeout { .. } | AssessmentError::ArtifactFetch(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AssessmentError::Proving(_)
        | AssessmentError::Cancelled
        | AssessmentError::IllegalTransition { .. }
        | AssessmentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Assessment(e) => (
                status_for(&e),
                ErrorResponse {
                    error: e.kind().to_string(),
                    message: e.to_string(),
                },
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "malformed_request".into(),
                    message,
                },
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "not_found".into(),
                    message,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` returns a simple liveness check.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
        circuit_id: state.circuit_id.clone(),
        vk_fingerprint: state.service.verification_key().fingerprint().to_string(),
    })
}

/// `POST /assessments` runs a full assessment.
///
/// Returns 201 with the receipt whether or not the proof verified; an
/// invalid proof is a result, not an error.
async fn submit_handler(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let metrics = &state.metrics;
    metrics.assessments_submitted_total.inc();
    let in_flight = metrics.start_assessment();

    let result = state
        .service
        .submit_assessment(&req.subject_id, req.private_value, req.min_bound, req.max_bound)
        .await;
    drop(in_flight);

    match result {
        Ok(receipt) => {
            if receipt.is_valid {
                metrics.assessments_valid_total.inc();
            }
            Ok((StatusCode::CREATED, Json(receipt)))
        }
        Err(e) => {
            metrics
                .assessments_failed_total
                .with_label_values(&[e.kind()])
                .inc();
            Err(e.into())
        }
    }
}

/// `GET /assessments/:subject_id` lists a subject's records.
async fn history_handler(
    Path(subject_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.history(&subject_id)?))
}

/// `GET /records/:id` returns one record.
async fn record_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.record(id)? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(format!("no record with id {id}"))),
    }
}

/// `POST /verify` checks a caller-supplied proof against this node's key.
async fn verify_handler(
    State(state): State<AppState>,
    body: Result<Json<ProofBundle>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(bundle) = body?;
    state.metrics.verifications_total.inc();
    let outcome = state
        .service
        .verify_existing(&bundle.proof, &bundle.public_signals)?;
    Ok(Json(outcome))
}

/// `GET /verification-key` exports the verification key.
async fn verification_key_handler(State(state): State<AppState>) -> impl IntoResponse {
    let vk = state.service.verification_key();
    Json(VerificationKeyResponse {
        circuit_id: state.circuit_id.clone(),
        fingerprint: vk.fingerprint().to_string(),
        public_inputs: vk.num_public_inputs(),
        key: vk.to_hex(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::OnceLock;
    use tower::ServiceExt;

    use riskproof_protocol::assessment::{AssessmentReceipt, AssessmentRecord, AssessmentState};
    use riskproof_protocol::config::{ServiceConfig, RANGE_BITS};
    use riskproof_protocol::storage::MemoryRecordStore;
    use riskproof_protocol::zkp::{
        setup_circuit, ArtifactCache, CircuitSetup, FetchPolicy, Groth16Backend,
        VerificationDiagnostic, VerificationOutcome,
    };

    const CIRCUIT: &str = "api_test";

    fn setup() -> &'static CircuitSetup {
        static SETUP: OnceLock<CircuitSetup> = OnceLock::new();
        SETUP.get_or_init(|| {
            setup_circuit(CIRCUIT, RANGE_BITS, &mut StdRng::seed_from_u64(9851)).unwrap()
        })
    }

    /// Creates a minimal AppState over an in-memory store.
    fn test_app_state() -> AppState {
        let setup = setup();
        let config = ServiceConfig {
            circuit_id: CIRCUIT.into(),
            ..Default::default()
        };
        let cache = Arc::new(ArtifactCache::new(
            Arc::new(setup.memory_source().unwrap()),
            FetchPolicy::from_config(&config),
        ));
        let service = AssessmentService::new(
            Arc::new(Groth16Backend::new()),
            cache,
            Arc::new(setup.verification_key.clone()),
            Arc::new(MemoryRecordStore::new()),
            &config,
        );
        AppState {
            version: "0.1.0-test".into(),
            circuit_id: CIRCUIT.into(),
            service: Arc::new(service),
            metrics: Arc::new(crate::metrics::NodeMetrics::new()),
        }
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        send(router, req).await
    }

    /// Sends a POST request with a JSON body and returns the (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: &impl Serialize,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        send(router, req).await
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn submit(subject: &str, value: i64, min: i64, max: i64) -> SubmitRequest {
        SubmitRequest {
            subject_id: subject.into(),
            private_value: value,
            min_bound: min,
            max_bound: max,
        }
    }

    // -- 1. Health -------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let state = test_app_state();
        let fingerprint = state.service.verification_key().fingerprint().to_string();
        let router = create_router(state);
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let resp: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.circuit_id, CIRCUIT);
        assert_eq!(resp.vk_fingerprint, fingerprint);
    }

    // -- 2. Submission -----------------------------------------------------------

    #[tokio::test]
    async fn submit_in_range_returns_valid_receipt() {
        let router = create_router(test_app_state());
        let (status, body) =
            post_json(&router, "/assessments", &submit("patient-42", 55, 0, 100)).await;

        assert_eq!(status, StatusCode::CREATED);
        let receipt: AssessmentReceipt = serde_json::from_slice(&body).unwrap();
        assert!(receipt.is_valid);
        assert_eq!(receipt.public_signals.as_slice()[0], "1");
        assert_eq!(receipt.public_signals.bounds(), Some((0, 100)));

        let (status, body) = get(&router, "/assessments/patient-42").await;
        assert_eq!(status, StatusCode::OK);
        let history: Vec<AssessmentRecord> = serde_json::from_slice(&body).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, receipt.record_id);
        assert_eq!(history[0].state, AssessmentState::Verified);
    }

    #[tokio::test]
    async fn negative_lower_bound_is_accepted() {
        let router = create_router(test_app_state());
        let (status, body) =
            post_json(&router, "/assessments", &submit("sensor-3", 5, -10, 10)).await;

        assert_eq!(status, StatusCode::CREATED);
        let receipt: AssessmentReceipt = serde_json::from_slice(&body).unwrap();
        assert!(receipt.is_valid);
        assert_eq!(receipt.public_signals.bounds(), Some((-10, 10)));

        let bundle = ProofBundle {
            proof: receipt.proof,
            public_signals: receipt.public_signals,
        };
        let (status, body) = post_json(&router, "/verify", &bundle).await;
        assert_eq!(status, StatusCode::OK);
        let outcome: VerificationOutcome = serde_json::from_slice(&body).unwrap();
        assert!(outcome.is_valid);
    }

    #[tokio::test]
    async fn out_of_range_is_unprocessable_and_hides_value() {
        let router = create_router(test_app_state());
        let (status, body) =
            post_json(&router, "/assessments", &submit("patient-42", 150, 0, 100)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "range_violation");
        assert!(!err.message.contains("150"));

        let (_, body) = get(&router, "/assessments/patient-42").await;
        let history: Vec<AssessmentRecord> = serde_json::from_slice(&body).unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn empty_subject_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(&router, "/assessments", &submit("", 1, 0, 2)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "invalid_subject");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/assessments",
            &serde_json::json!({ "subjectId": "p", "privateValue": "fifty" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "malformed_request");
    }

    // -- 3. Records --------------------------------------------------------------

    #[tokio::test]
    async fn record_lookup_by_id() {
        let router = create_router(test_app_state());
        let (_, body) = post_json(&router, "/assessments", &submit("patient-7", 7, 0, 10)).await;
        let receipt: AssessmentReceipt = serde_json::from_slice(&body).unwrap();

        let (status, body) = get(&router, &format!("/records/{}", receipt.record_id)).await;
        assert_eq!(status, StatusCode::OK);
        let record: AssessmentRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.commitment, receipt.commitment);
        assert_eq!(record.is_valid, Some(true));

        let (status, body) = get(&router, &format!("/records/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "not_found");
    }

    // -- 4. Verification ---------------------------------------------------------

    #[tokio::test]
    async fn verify_accepts_receipt_and_rejects_tampering() {
        let router = create_router(test_app_state());
        let (_, body) = post_json(&router, "/assessments", &submit("patient-9", 30, 10, 90)).await;
        let receipt: AssessmentReceipt = serde_json::from_slice(&body).unwrap();

        let bundle = ProofBundle {
            proof: receipt.proof.clone(),
            public_signals: receipt.public_signals.clone(),
        };
        let (status, body) = post_json(&router, "/verify", &bundle).await;
        assert_eq!(status, StatusCode::OK);
        let outcome: VerificationOutcome = serde_json::from_slice(&body).unwrap();
        assert!(outcome.is_valid);

        let mut tampered = serde_json::to_value(&bundle).unwrap();
        tampered["publicSignals"][2] = serde_json::json!("11");
        let (status, body) = post_json(&router, "/verify", &tampered).await;
        assert_eq!(status, StatusCode::OK);
        let outcome: VerificationOutcome = serde_json::from_slice(&body).unwrap();
        assert!(!outcome.is_valid);
        assert_eq!(outcome.diagnostic, VerificationDiagnostic::PairingCheckFailed);
    }

    #[tokio::test]
    async fn verify_with_short_signals_is_malformed() {
        let router = create_router(test_app_state());
        let (_, body) = post_json(&router, "/assessments", &submit("patient-3", 3, 0, 10)).await;
        let receipt: AssessmentReceipt = serde_json::from_slice(&body).unwrap();

        let short = serde_json::json!({
            "proof": receipt.proof,
            "publicSignals": &receipt.public_signals.as_slice()[..2],
        });
        let (status, body) = post_json(&router, "/verify", &short).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "malformed_input");
    }

    #[tokio::test]
    async fn verification_key_is_exported() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/verification-key").await;

        assert_eq!(status, StatusCode::OK);
        let resp: VerificationKeyResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.public_inputs, 4);
        assert_eq!(resp.fingerprint, setup().verification_key.fingerprint());
        assert_eq!(
            riskproof_protocol::zkp::VerificationKey::from_hex(&resp.key).unwrap(),
            setup().verification_key
        );
    }

    // -- 5. Metrics --------------------------------------------------------------

    #[tokio::test]
    async fn submissions_are_counted() {
        let state = test_app_state();
        let metrics = state.metrics.clone();
        let router = create_router(state);

        post_json(&router, "/assessments", &submit("patient-1", 5, 0, 10)).await;
        post_json(&router, "/assessments", &submit("patient-1", 50, 0, 10)).await;

        assert_eq!(metrics.assessments_submitted_total.get(), 2);
        assert_eq!(metrics.assessments_valid_total.get(), 1);
        assert_eq!(
            metrics
                .assessments_failed_total
                .with_label_values(&["range_violation"])
                .get(),
            1
        );
        assert_eq!(metrics.assessments_in_flight.get(), 0);
    }
}
