//! HTTP route handlers for the mock backend.

pub mod products;
pub mod simulate;
pub mod stats;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::any;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", any(hello))
        .merge(products::routes())
        .merge(stats::routes())
        .merge(simulate::routes())
        .method_not_allowed_fallback(fallback)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// ANY / — liveness greeting.
async fn hello() -> &'static str {
    "Hello, World!"
}

/// Anything unrouted, including a known path with an unsupported method, is
/// reported as a server failure rather than a 404 or 405.
async fn fallback() -> impl IntoResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message })))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::response::Response;
    use mockserve_core::MockServeConfig;
    use tower::ServiceExt;

    pub fn app(config: MockServeConfig) -> Router {
        let state = Arc::new(AppState::new(config).unwrap());
        build_router(state)
    }

    pub async fn send_get(app: Router, uri: &str) -> Response {
        send(app, Method::GET, uri).await
    }

    pub async fn send(app: Router, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::Method;
    use super::*;
    use mockserve_core::MockServeConfig;

    #[tokio::test]
    async fn test_hello() {
        let response = send_get(app(MockServeConfig::default()), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Hello, World!");
    }

    #[tokio::test]
    async fn test_unknown_path_is_server_error() {
        let response = send_get(app(MockServeConfig::default()), "/nope").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_hello_any_method() {
        let response = send(app(MockServeConfig::default()), Method::POST, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_method_is_server_error() {
        for uri in ["/stats", "/stats/coordinator", "/slow", "/error"] {
            let response = send(app(MockServeConfig::default()), Method::DELETE, uri).await;
            assert_eq!(
                response.status(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "DELETE {}",
                uri
            );
            assert_eq!(body_json(response).await["error"], "Internal server error");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_any_method() {
        let response = send(app(MockServeConfig::default()), Method::POST, "/nope").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
