//! Request and response types for all sko-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use serde::{Deserialize, Serialize};
use sko_schemas::{InventoryRow, MovementRecord, PlanLine};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

/// Serialize-only: the `&'static str` build fields come from the binary,
/// never from a payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Uniform error body: 401 for auth, 422 for validation, 500 for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token; pass back via the `X-Session-Token` header.
    pub token: Uuid,
    pub username: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// /v1/inventory  /v1/movements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub rows: Vec<InventoryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementsResponse {
    pub movements: Vec<MovementRecord>,
}

// ---------------------------------------------------------------------------
// /v1/adjust
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustResponse {
    pub movement_id: i64,
    /// `null` when the stock row was removed.
    pub new_qty_milli: Option<i64>,
}

// ---------------------------------------------------------------------------
// /v1/reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub lines: Vec<PlanLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub fully_met: bool,
    pub consumed: Vec<String>,
    pub shortages: Vec<String>,
    pub movement_ids: Vec<i64>,
}
