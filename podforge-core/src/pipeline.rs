//! Pipeline orchestrator: Validate -> Prompt -> GenerateScript ->
//! ParseScript -> Synthesize -> Merge -> Respond. One instance per process,
//! shared read-only across requests; each run carries request-scoped state.

use crate::backend::SynthesisBackend;
use crate::error::{PipelineError, PipelineResult};
use crate::generator::{build_prompt, ScriptGenerator};
use crate::merger::Merger;
use crate::script::{parse_script, DialogueLine};
use crate::synthesizer::synthesize_clips;
use crate::voice::{Gender, GenderMap};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Incoming generation request. `guestname` accepts a single name or a list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodcastRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub guestname: Option<OneOrMany>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default, rename = "hostGender")]
    pub host_gender: Option<Gender>,
    #[serde(default, rename = "guestGender")]
    pub guest_gender: Option<Gender>,
}

/// A JSON field that is either one string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Successful pipeline result: the script plus a relative audio URL.
#[derive(Debug, Clone, Serialize)]
pub struct PodcastResponse {
    pub topic: String,
    pub host: String,
    pub guestname: Vec<String>,
    pub script: Vec<DialogueLine>,
    pub audio: String,
}

/// The assembled pipeline. Built once at startup from the resolved backend
/// and generator, then shared across requests.
pub struct Pipeline {
    generator: Arc<dyn ScriptGenerator>,
    backend: Arc<dyn SynthesisBackend>,
    merger: Merger,
    audio_dir: PathBuf,
    keep_failed_clips: bool,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn ScriptGenerator>,
        backend: Arc<dyn SynthesisBackend>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generator,
            backend,
            merger: Merger::default(),
            audio_dir: audio_dir.into(),
            keep_failed_clips: false,
        }
    }

    /// Swap the media tool invocation (alternate binary, test stub).
    pub fn with_merger(mut self, merger: Merger) -> Self {
        self.merger = merger;
        self
    }

    /// Leave temp clips on disk when synthesis or merge fails.
    pub fn keep_failed_clips(mut self, keep: bool) -> Self {
        self.keep_failed_clips = keep;
        self.merger.keep_failed_clips = keep;
        self
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: PodcastRequest) -> PipelineResult<PodcastResponse> {
        // Validate
        if request.topic.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("topic is required".into()));
        }
        if request.host.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("host is required".into()));
        }

        let guests = request.guestname.map(OneOrMany::into_vec).unwrap_or_default();
        let genders =
            build_gender_map(&request.host, request.host_gender, &guests, request.guest_gender);

        // Prompt + GenerateScript
        let prompt = build_prompt(&request.topic, &request.host, &guests, request.info.as_deref());
        let raw = self.generator.generate(&prompt).await?;

        // ParseScript
        let script = parse_script(&raw)?;

        // Synthesize + Merge
        let request_id = uuid::Uuid::new_v4().to_string();
        let clips = synthesize_clips(
            self.backend.as_ref(),
            &script,
            &genders,
            &self.audio_dir,
            &request_id,
            self.keep_failed_clips,
        )
        .await?;
        let file_name = format!("podcast_{}.mp3", request_id);
        let output = self.audio_dir.join(&file_name);
        self.merger.merge(&clips, &output).await?;

        info!(
            lines = script.len(),
            backend = self.backend.name(),
            file = file_name.as_str(),
            "podcast generated"
        );
        Ok(PodcastResponse {
            topic: request.topic,
            host: request.host,
            guestname: guests,
            script,
            audio: format!("/audio/{}", file_name),
        })
    }
}

/// Per-request speaker-name to gender mapping. All guests share the
/// request's single guest gender attribute.
fn build_gender_map(
    host: &str,
    host_gender: Option<Gender>,
    guests: &[String],
    guest_gender: Option<Gender>,
) -> GenderMap {
    let mut map = GenderMap::new();
    map.insert(host.to_string(), host_gender.unwrap_or_default());
    for guest in guests {
        map.insert(guest.clone(), guest_gender.unwrap_or_default());
    }
    map
}
