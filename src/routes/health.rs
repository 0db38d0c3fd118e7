//! Health check endpoints
//!
//! Provides Kubernetes-style health probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (can the record store be reached?)

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// 'online' or 'degraded'
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: &'static str,
    /// Record store status
    pub store: StoreHealth,
    /// Sessions held in memory, including ones not yet swept
    pub sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StoreHealth {
    /// "mongodb" or "memory"
    pub backend: &'static str,
    /// Only probed by the readiness check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

fn build_health_response(state: &AppState, connected: Option<bool>, error: Option<String>) -> HealthResponse {
    let degraded = connected == Some(false);

    HealthResponse {
        healthy: true,
        status: if degraded { "degraded" } else { "online" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        store: StoreHealth {
            backend: state.store.backend(),
            connected,
        },
        sessions: state.sessions.len(),
        error,
    }
}

fn health_json(status: StatusCode, response: &HealthResponse) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle liveness probe (/health, /healthz)
///
/// Returns 200 whenever the process is serving requests.
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    health_json(StatusCode::OK, &build_health_response(state, None, None))
}

/// Handle readiness probe (/ready, /readyz)
///
/// Pings the record store; 503 when it cannot be reached.
pub async fn readiness_check(state: &AppState) -> Response<Full<Bytes>> {
    let (connected, error) = match state.store.ping().await {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    health_json(status, &build_health_response(state, Some(connected), error))
}
