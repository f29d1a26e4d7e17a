/// Health check endpoints for liveness and readiness probes
use crate::{context::AppContext, jobs, metrics};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_handler))
}

/// Basic liveness check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: database and object storage must answer
pub async fn readiness_probe(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let check = match jobs::tasks::health_check(&ctx).await {
        Ok(()) => ComponentHealth {
            name: "storage".to_string(),
            status: "healthy".to_string(),
            response_time_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "readiness_probe_failed");
            ComponentHealth {
                name: "storage".to_string(),
                status: "unhealthy".to_string(),
                response_time_ms: start.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            }
        }
    };

    let checks = vec![check];
    let status = determine_overall_status(&checks);
    let code = if status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }),
    )
}

/// Prometheus text exposition
async fn metrics_handler() -> String {
    metrics::render_metrics()
}

fn determine_overall_status(checks: &[ComponentHealth]) -> &'static str {
    if checks.iter().any(|c| c.status != "healthy") {
        "unhealthy"
    } else {
        "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: &str) -> ComponentHealth {
        ComponentHealth {
            name: "storage".to_string(),
            status: status.to_string(),
            response_time_ms: 1,
            error: None,
        }
    }

    #[test]
    fn test_determine_overall_status() {
        assert_eq!(determine_overall_status(&[check("healthy")]), "healthy");
        assert_eq!(
            determine_overall_status(&[check("healthy"), check("unhealthy")]),
            "unhealthy"
        );
    }
}
