//! Clip concatenation: one ffmpeg concat-demuxer run over the ordered clip
//! list, deleting every intermediate on success. The final file only ever
//! appears after all clips succeeded.

use crate::error::{PipelineError, PipelineResult};
use crate::synthesizer::remove_clips;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Merges ordered clips into one output file via an external media tool.
pub struct Merger {
    ffmpeg: String,
    /// Leave input clips on disk when a merge fails, for inspection.
    pub keep_failed_clips: bool,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Merger {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            keep_failed_clips: false,
        }
    }

    /// Concatenate `clips` in order into `output`. On success every input
    /// clip and the list file are deleted; on failure no output exists and
    /// inputs follow the `keep_failed_clips` policy.
    pub async fn merge(&self, clips: &[PathBuf], output: &Path) -> PipelineResult<()> {
        if clips.is_empty() {
            return Err(PipelineError::Merge("no clips to merge".into()));
        }

        let list_path = output.with_extension("txt");
        let mut list = String::new();
        for clip in clips {
            // concat demuxer entry; single quotes in paths need escaping
            let escaped = clip.to_string_lossy().replace('\'', "'\\''");
            list.push_str(&format!("file '{}'\n", escaped));
        }
        tokio::fs::write(&list_path, list).await?;

        debug!(clips = clips.len(), output = %output.display(), "merging clips");
        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&list_path)
            .arg("-c")
            .arg("copy")
            .arg(output)
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&list_path).await {
            warn!("failed to remove concat list {}: {}", list_path.display(), e);
        }

        let cmd_output = result.map_err(|e| PipelineError::Merge(format!("spawn ffmpeg: {}", e)))?;
        if !cmd_output.status.success() {
            if self.keep_failed_clips {
                warn!("merge failed; keeping {} clip(s) on disk", clips.len());
            } else {
                remove_clips(clips);
            }
            let stderr = String::from_utf8_lossy(&cmd_output.stderr);
            return Err(PipelineError::Merge(format!(
                "ffmpeg exited with {}: {}",
                cmd_output.status,
                stderr.trim()
            )));
        }

        remove_clips(clips);
        Ok(())
    }
}
