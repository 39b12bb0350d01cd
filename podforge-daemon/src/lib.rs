//! Podforge daemon library: app builder for testing and serving.

mod state;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use podforge_core::{PipelineError, PodcastRequest};
use tower_http::cors::CorsLayer;
use tracing::error;

pub use state::AppState;

/// Build the axum Router with the given state (used by main and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-podcast", post(generate_podcast))
        .route("/audio/:filename", get(get_audio))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn generate_podcast(
    State(state): State<AppState>,
    Json(request): Json<PodcastRequest>,
) -> impl IntoResponse {
    match state.pipeline.run(request).await {
        Ok(response) => (StatusCode::OK, Json(serde_json::json!(response))),
        Err(e) if e.is_client_error() => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        Err(e) => {
            error!("podcast generation failed: {}", e);
            let message = match e {
                PipelineError::ScriptFormat(_) => "script generation returned an unusable script",
                _ => "podcast generation failed",
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": message})),
            )
        }
    }
}

async fn get_audio(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    // Only bare filenames are served; anything path-like is rejected.
    if filename.contains('/') || filename.contains("..") || filename.contains('\\') {
        return (StatusCode::BAD_REQUEST, "invalid filename").into_response();
    }
    match tokio::fs::read(state.audio_dir.join(&filename)).await {
        Ok(bytes) => {
            let mut res = Response::new(Body::from(bytes));
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("audio/mpeg"),
            );
            res
        }
        Err(_) => (StatusCode::NOT_FOUND, "audio file not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use podforge_core::{
        Pipeline, PipelineResult, ScriptGenerator, SynthesisBackend, SynthesisRequest,
    };
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct CannedGenerator(String);

    #[async_trait]
    impl ScriptGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> PipelineResult<String> {
            Ok(self.0.clone())
        }
    }

    struct NoopBackend;

    #[async_trait]
    impl SynthesisBackend for NoopBackend {
        fn name(&self) -> &'static str {
            "noop"
        }
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
            output: &Path,
        ) -> PipelineResult<()> {
            std::fs::write(output, b"mp3")?;
            Ok(())
        }
    }

    fn test_state(dir: &Path, generator_output: &str) -> AppState {
        AppState {
            pipeline: Arc::new(Pipeline::new(
                Arc::new(CannedGenerator(generator_output.to_string())),
                Arc::new(NoopBackend),
                dir,
            )),
            audio_dir: dir.to_path_buf(),
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_topic_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(dir.path(), "[]"));
        let res = app
            .oneshot(post_json("/api/generate-podcast", r#"{"host":"Mia"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("topic"));
    }

    #[tokio::test]
    async fn missing_host_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(dir.path(), "[]"));
        let res = app
            .oneshot(post_json("/api/generate-podcast", r#"{"topic":"AI"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_json_script_returns_500_and_no_audio() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(dir.path(), "Sorry, here's an essay instead."));
        let res = app
            .oneshot(post_json(
                "/api/generate-podcast",
                r#"{"topic":"AI","host":"Mia"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn audio_404_for_unknown_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(dir.path(), "[]"));
        let req = Request::builder()
            .uri("/audio/nonexistent.mp3")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audio_serves_existing_file_as_mpeg() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("podcast_x.mp3"), b"ID3data").unwrap();
        let app = build_app(test_state(dir.path(), "[]"));
        let req = Request::builder()
            .uri("/audio/podcast_x.mp3")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "audio/mpeg"
        );
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ID3data");
    }

    #[tokio::test]
    async fn audio_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(test_state(dir.path(), "[]"));
        let req = Request::builder()
            .uri("/audio/..%2Fsecret.mp3")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
