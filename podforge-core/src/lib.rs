//! Podforge core: script generation, voice selection, synthesis backends,
//! clip merge pipeline.

pub mod backend;
pub mod credentials;
pub mod error;
pub mod generator;
pub mod merger;
pub mod pipeline;
pub mod script;
pub mod synthesizer;
pub mod voice;

pub use backend::{resolve_backend, CloudBackend, LocalBackend, SynthesisBackend, SynthesisRequest};
pub use credentials::{BackendSettings, ServiceAccountKey};
pub use error::{PipelineError, PipelineResult};
pub use generator::{build_prompt, GeminiGenerator, ScriptGenerator};
pub use merger::Merger;
pub use pipeline::{OneOrMany, Pipeline, PodcastRequest, PodcastResponse};
pub use script::{parse_script, strip_code_fences, DialogueLine};
pub use synthesizer::synthesize_clips;
pub use voice::{local_voice, Gender, GenderMap, Platform, SsmlGender};
