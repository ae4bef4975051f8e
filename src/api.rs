//! Health-check HTTP server
//!
//! Stateless liveness endpoint for hosting platforms. It shares nothing
//! with the dispatcher and runs as its own task.

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

/// =============================
/// Router
/// =============================

pub fn create_router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server<F>(port: u16, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    info!("Health server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_status(uri: &str) -> (StatusCode, Option<HealthStatus>) {
        let response = create_router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        for uri in ["/", "/health"] {
            let (status, body) = get_status(uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body.unwrap().status, "ok");
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get_status("/api/chat").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let server = tokio::spawn(start_server(0, async {}));
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
