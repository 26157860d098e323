//! Health check handler

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub credential_store: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// GET /api/health
///
/// Public; checks DB connectivity when a database is configured
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = match &state.pool {
        Some(pool) => {
            let start = Instant::now();
            let db_result = sqlx::query("SELECT 1").fetch_one(pool).await;
            let latency_ms = Some(start.elapsed().as_millis() as u64);

            match db_result {
                Ok(_) => CheckResult {
                    status: "ok",
                    backend: "postgres",
                    latency_ms,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Health check query failed");
                    CheckResult {
                        status: "error",
                        backend: "postgres",
                        latency_ms,
                    }
                }
            }
        }
        None => CheckResult {
            status: "ok",
            backend: "memory",
            latency_ms: None,
        },
    };

    let (status, code) = if store.status == "ok" {
        ("healthy", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: "gateway-api",
            checks: HealthChecks {
                credential_store: store,
            },
        }),
    )
}
