pub mod server;
pub mod smb;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::state::AppState;

/// CORS from the configured allow-list; empty or "*" allows any origin / 跨域配置
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if cors.allowed_origins.is_empty() || cors.allowed_origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the HTTP router / 构建路由
pub fn router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    let body_limit = usize::try_from(state.max_request_size).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/smb/test-connection", post(smb::test_connection))
        .route("/api/smb/upload", post(smb::upload))
        .route("/api/smb/folder-formats", get(smb::folder_formats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::drivers::smb::testing::RecordingMounter;
    use crate::drivers::smb::LocalShareWriter;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn preflight(allowed: Vec<String>, origin: &str) -> Option<HeaderValue> {
        let share = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.cors.allowed_origins = allowed;
        let state = Arc::new(AppState::with_capabilities(
            &config,
            Arc::new(RecordingMounter::new(share.path())),
            Arc::new(LocalShareWriter),
        ));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/smb/upload")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = router(state, &config.cors).oneshot(request).await.unwrap();
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).cloned()
    }

    #[tokio::test]
    async fn test_cors_allow_list() {
        let allowed = vec!["http://localhost:3131".to_string()];
        assert_eq!(
            preflight(allowed.clone(), "http://localhost:3131").await.unwrap(),
            "http://localhost:3131"
        );
        assert!(preflight(allowed, "http://evil.example").await.is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard() {
        assert_eq!(preflight(vec!["*".to_string()], "http://any.example").await.unwrap(), "*");
        assert_eq!(preflight(Vec::new(), "http://any.example").await.unwrap(), "*");
    }
}
