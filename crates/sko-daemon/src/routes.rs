//! Axum router and all HTTP handlers for sko-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. All handlers are `pub(crate)` so the
//! scenario tests in `tests/` can compose the router directly.
//!
//! Error mapping: auth failure → 401, validation → 422, storage → 500.
//! Shortages are report content inside a 200 response, never an error.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use sko_pantry::{login, AuthError, PantryError, Session};

use crate::api_types::{
    AdjustResponse, ErrorResponse, HealthResponse, InventoryResponse, LoginRequest,
    LoginResponse, MovementsResponse, ReconcileRequest, ReconcileResponse,
};
use crate::state::{uptime_secs, AppState};

pub const SESSION_HEADER: &str = "x-session-token";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/login", post(login_handler))
        .route("/v1/inventory", get(inventory))
        .route("/v1/movements", get(movements))
        .route("/v1/adjust", post(adjust))
        .route("/v1/reconcile", post(reconcile))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse { error: msg.into() }),
    )
        .into_response()
}

fn map_pantry_error(err: PantryError) -> Response {
    match &err {
        PantryError::Validation(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        PantryError::Storage(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Resolve the caller's session from the `X-Session-Token` header.
async fn require_session(st: &AppState, headers: &HeaderMap) -> Result<Session, Response> {
    let token = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| {
            error_response(StatusCode::UNAUTHORIZED, "missing or malformed session token")
        })?;

    st.session_for(token)
        .await
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "unknown session token"))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/login
// ---------------------------------------------------------------------------

pub(crate) async fn login_handler(
    State(st): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    match login(st.service.pool(), &req.username, &req.password).await {
        Ok(session) => {
            let username = session.username.clone();
            let role = session.role.as_str().to_string();
            let token = st.insert_session(session).await;
            info!(user = %username, "login");
            (
                StatusCode::OK,
                Json(LoginResponse {
                    token,
                    username,
                    role,
                }),
            )
                .into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            error_response(StatusCode::UNAUTHORIZED, "invalid credentials")
        }
        Err(AuthError::Storage(e)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("storage failure: {e:#}"))
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/inventory
// ---------------------------------------------------------------------------

pub(crate) async fn inventory(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = require_session(&st, &headers).await {
        return resp;
    }

    match st.service.inventory().await {
        Ok(rows) => (StatusCode::OK, Json(InventoryResponse { rows })).into_response(),
        Err(e) => map_pantry_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/movements
// ---------------------------------------------------------------------------

pub(crate) async fn movements(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = require_session(&st, &headers).await {
        return resp;
    }

    match st.service.movements(None, 200).await {
        Ok(movements) => {
            (StatusCode::OK, Json(MovementsResponse { movements })).into_response()
        }
        Err(e) => map_pantry_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/adjust
// ---------------------------------------------------------------------------

pub(crate) async fn adjust(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<sko_pantry::AdjustRequest>,
) -> Response {
    let session = match require_session(&st, &headers).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match st.service.adjust(&session, &req).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(AdjustResponse {
                movement_id: outcome.movement_id,
                new_qty_milli: outcome.new_qty_milli,
            }),
        )
            .into_response(),
        Err(e) => map_pantry_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/reconcile
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    let session = match require_session(&st, &headers).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    // Boundary decode: raw ids/sentinels become tagged variants here;
    // malformed lines are a 422 before any store contact.
    let planned = match sko_planning::resolve::decode_plan_lines(&req.lines) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    match st.service.reconcile(&session, &planned).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ReconcileResponse {
                fully_met: outcome.plan.is_fully_met(),
                consumed: outcome.plan.consumed_lines(),
                shortages: outcome.plan.shortage_lines(),
                movement_ids: outcome.movement_ids,
            }),
        )
            .into_response(),
        Err(e) => map_pantry_error(e),
    }
}
