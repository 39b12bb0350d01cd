//! Clip synthesis: one temp clip per dialogue line, strictly in speaking
//! order. Sequential on purpose: concurrent local voice-engine invocations
//! are unreliable, and ordering falls out of the loop for free.

use crate::backend::{SynthesisBackend, SynthesisRequest};
use crate::error::PipelineResult;
use crate::script::DialogueLine;
use crate::voice::GenderMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Synthesize every line into `out_dir`, returning clip paths in line order.
///
/// Clip names combine the per-request id with the line index so concurrent
/// requests sharing the output directory cannot collide. Any single-line
/// failure aborts the batch; clips already produced are removed unless
/// `keep_failed_clips` asks to leave them for inspection.
pub async fn synthesize_clips(
    backend: &dyn SynthesisBackend,
    lines: &[DialogueLine],
    genders: &GenderMap,
    out_dir: &Path,
    request_id: &str,
    keep_failed_clips: bool,
) -> PipelineResult<Vec<PathBuf>> {
    let mut clips = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        let gender = genders.get(&line.speaker).copied().unwrap_or_default();
        let clip = out_dir.join(format!("{}_clip_{}.mp3", request_id, index));
        let request = SynthesisRequest {
            line: line.clone(),
            gender,
        };
        debug!(index, speaker = line.speaker.as_str(), "synthesizing clip");
        if let Err(e) = backend.synthesize(&request, &clip).await {
            if keep_failed_clips {
                warn!("clip {} failed; keeping {} earlier clip(s)", index, clips.len());
            } else {
                remove_clips(&clips);
            }
            return Err(e);
        }
        clips.push(clip);
    }
    Ok(clips)
}

/// Best-effort removal; a clip that cannot be deleted is only worth a log.
pub(crate) fn remove_clips(clips: &[PathBuf]) {
    for clip in clips {
        if let Err(e) = std::fs::remove_file(clip) {
            warn!("failed to remove clip {}: {}", clip.display(), e);
        }
    }
}
