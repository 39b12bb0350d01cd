//! Podforge daemon: podcast generation REST API. Resolves the synthesis
//! backend once at startup and serves the pipeline over axum.

use podforge_daemon::{build_app, AppState};
use podforge_core::{resolve_backend, BackendSettings, GeminiGenerator, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let audio_dir = PathBuf::from(
        std::env::var("AUDIO_DIR").unwrap_or_else(|_| "audio".to_string()),
    );
    std::fs::create_dir_all(&audio_dir)?;

    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
    let keep_failed_clips = std::env::var("KEEP_FAILED_CLIPS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let backend = resolve_backend(&BackendSettings::from_env());
    let pipeline = Pipeline::new(Arc::new(GeminiGenerator::new(api_key)), backend, &audio_dir)
        .keep_failed_clips(keep_failed_clips);

    let app = build_app(AppState {
        pipeline: Arc::new(pipeline),
        audio_dir,
    });
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Podforge daemon listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
