use podforge_core::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared daemon state: the assembled pipeline plus the directory final
/// audio files are served from. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub audio_dir: PathBuf,
}
