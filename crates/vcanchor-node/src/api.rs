//! HTTP API for the issuer node.
//!
//! `POST /api/issueVC` runs the issuance pipeline and returns the anchored
//! credential. `GET /api/health` and `GET /api/issuer` describe the node.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use vcanchor_core::Credential;
use vcanchor_credentials::{IssuanceError, IssuanceRequest, IssuanceService, OracleError};

/// Shared state for HTTP handlers.
pub struct AppState {
    pub service: Arc<IssuanceService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: Arc<IssuanceService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

// --- Response types ---

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sequence_id: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerResponse {
    pub did: String,
    pub namespace: String,
    pub public_key: String,
    pub ledger: String,
    pub anchored_properties: Vec<String>,
    pub default_threshold: String,
    pub default_operator: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// HTTP status for each issuance failure.
pub fn status_for(err: &IssuanceError) -> StatusCode {
    match err {
        IssuanceError::Validation(_) | IssuanceError::Authentication(_) => StatusCode::BAD_REQUEST,
        IssuanceError::Oracle(OracleError::InvalidAddress(_))
        | IssuanceError::Oracle(OracleError::InvalidQuantity(_)) => StatusCode::BAD_REQUEST,
        IssuanceError::Oracle(_) => StatusCode::BAD_GATEWAY,
        IssuanceError::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
        IssuanceError::Sequence(_) | IssuanceError::Signing(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// --- Handlers ---

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let last_sequence_id = state.service.sequence().current().ok().flatten();
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        last_sequence_id,
    })
}

async fn handle_issuer(State(state): State<Arc<AppState>>) -> Json<IssuerResponse> {
    let did = state.service.authority().issuer_did();
    let policy = state.service.policy();
    Json(IssuerResponse {
        did: did.to_string(),
        namespace: did.namespace().to_string(),
        public_key: did.public_key_hex().to_string(),
        ledger: state.service.anchor().client_id().to_string(),
        anchored_properties: IssuanceService::anchored_properties()
            .iter()
            .map(|k| k.to_string())
            .collect(),
        default_threshold: policy.default_threshold.clone(),
        default_operator: policy.default_operator.to_string(),
    })
}

async fn handle_issue(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IssuanceRequest>, JsonRejection>,
) -> Result<Json<Credential>, ApiError> {
    let Json(req) = body.map_err(|e| error(StatusCode::BAD_REQUEST, e.body_text()))?;

    match state.service.issue(req).await {
        Ok(credential) => Ok(Json(credential)),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, %status, "issuance failed");
            } else {
                tracing::info!(error = %e, %status, "issuance rejected");
            }
            Err(error(status, e.to_string()))
        }
    }
}

async fn handle_method_not_allowed() -> ApiError {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/issuer", get(handle_issuer))
        .route(
            "/api/issueVC",
            post(handle_issue).fallback(handle_method_not_allowed),
        )
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
