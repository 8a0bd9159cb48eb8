//! HTTP surface for the metrics aggregator.
//!
//! Builds the axum router, applies CORS, tracing and timeout middleware,
//! and runs the server until Ctrl-C.

pub mod handlers;

use crate::config::{Config, CorsConfig};
use crate::models::Dataset;
use anyhow::{Context, Result};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every request. Cloning only bumps the table's `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dataset: Dataset,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

/// Create the router with all endpoints and middleware.
pub fn create_router(state: AppState, config: &Config) -> Result<Router> {
    let cors = build_cors(&config.cors)?;

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )));

    Ok(Router::new()
        .route("/api", post(handlers::compute_metrics))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(cors)
        .layer(middleware))
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v.trim() == "*")
}

/// Translate the `[cors]` section into a tower-http layer.
pub fn build_cors(cors: &CorsConfig) -> Result<CorsLayer> {
    let origins = if is_wildcard(&cors.allow_origins) {
        AllowOrigin::any()
    } else {
        let origins = cors
            .allow_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim())
                    .with_context(|| format!("Invalid CORS origin: {}", origin))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    let methods = if is_wildcard(&cors.allow_methods) {
        AllowMethods::any()
    } else {
        let methods = cors
            .allow_methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.trim().to_uppercase().as_bytes())
                    .with_context(|| format!("Invalid CORS method: {}", method))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowMethods::list(methods)
    };

    let headers = if is_wildcard(&cors.allow_headers) {
        AllowHeaders::any()
    } else {
        let headers = cors
            .allow_headers
            .iter()
            .map(|header| {
                HeaderName::from_bytes(header.trim().as_bytes())
                    .with_context(|| format!("Invalid CORS header: {}", header))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowHeaders::list(headers)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers))
}

/// Bind the configured address and serve until shutdown.
pub async fn serve(config: &Config, dataset: Dataset) -> Result<()> {
    let router = create_router(AppState::new(dataset), config)?;
    let address = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("Listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cors_preflight_any_origin() {
        let router = create_router(AppState::new(Dataset::Unavailable), &Config::default()).unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api")
                    .header(header::ORIGIN, "https://dashboard.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
    }

    #[tokio::test]
    async fn test_cors_origin_list() {
        let mut config = Config::default();
        config.cors.allow_origins = vec!["https://allowed.example.com".to_string()];
        let router = create_router(AppState::new(Dataset::Unavailable), &config).unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api")
                    .header(header::ORIGIN, "https://allowed.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://allowed.example.com"
        );
    }

    #[test]
    fn test_build_cors_rejects_bad_values() {
        let cors = CorsConfig {
            allow_origins: vec!["bad\norigin".to_string()],
            ..CorsConfig::default()
        };
        assert!(build_cors(&cors).is_err());

        let cors = CorsConfig {
            allow_methods: vec!["GET POST".to_string()],
            ..CorsConfig::default()
        };
        assert!(build_cors(&cors).is_err());

        let cors = CorsConfig {
            allow_methods: vec!["post".to_string(), "OPTIONS".to_string()],
            allow_headers: vec!["content-type".to_string()],
            ..CorsConfig::default()
        };
        assert!(build_cors(&cors).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let router = create_router(AppState::new(Dataset::Unavailable), &Config::default()).unwrap();

        let response = router
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
