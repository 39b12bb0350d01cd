//! Synthesis backends: cloud TTS over REST, or a local OS voice engine with
//! an ffmpeg transcode step. One backend is resolved at startup and shared
//! read-only across requests.

use crate::credentials::{discover_key, BackendSettings, ServiceAccountKey};
use crate::error::{PipelineError, PipelineResult};
use crate::script::DialogueLine;
use crate::voice::{local_voice, Gender, Platform, SsmlGender};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

const LANGUAGE_CODE: &str = "en-US";
const TTS_BASE_URL: &str = "https://texttospeech.googleapis.com";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const TTS_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Unit of work handed to a backend: one dialogue line plus the resolved
/// gender attribute for its speaker.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub line: DialogueLine,
    pub gender: Gender,
}

/// Capability interface over the two synthesis strategies.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Render one line of speech to an MP3 file at `output`.
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> PipelineResult<()>;
}

/// Resolve the process-wide backend once at startup.
///
/// Cloud wins when explicitly forced or credentials are discoverable and the
/// client constructs; any construction failure downgrades to the local voice
/// engine with a non-fatal warning. Never retried within a process lifetime.
pub fn resolve_backend(settings: &BackendSettings) -> Arc<dyn SynthesisBackend> {
    if settings.cloud_intended() {
        match discover_key(settings).and_then(CloudBackend::new) {
            Ok(cloud) => {
                info!("using cloud TTS backend");
                return Arc::new(cloud);
            }
            Err(e) => warn!("cloud TTS unavailable, falling back to local voice engine: {}", e),
        }
    }
    let local = LocalBackend::new();
    info!(engine = local.engine.as_str(), "using local TTS backend");
    Arc::new(local)
}

// --- Cloud variant ---

/// Google Cloud TTS REST client authenticated with a service account key.
pub struct CloudBackend {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: jsonwebtoken::EncodingKey,
    base_url: String,
    token_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl CloudBackend {
    /// Construct from a parsed service account key. Fails early on unusable
    /// key material so the selector can fall back at startup.
    pub fn new(key: ServiceAccountKey) -> PipelineResult<Self> {
        let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| PipelineError::Credentials(format!("invalid RSA private key: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            token_url: key.token_uri.clone().unwrap_or_else(|| TOKEN_URL.to_string()),
            key,
            encoding_key,
            base_url: TTS_BASE_URL.to_string(),
        })
    }

    /// Exchange a signed service-account JWT for an OAuth2 access token.
    async fn fetch_access_token(&self) -> PipelineResult<String> {
        #[derive(serde::Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            exp: u64,
            iat: u64,
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| PipelineError::Synthesis(e.to_string()))?
            .as_secs();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: TTS_SCOPE,
            aud: &self.token_url,
            exp: now + 3600,
            iat: now,
        };
        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let jwt = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| PipelineError::Synthesis(format!("sign token request: {}", e)))?;

        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::Synthesis(format!("token exchange: {}", e)))?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::Synthesis(format!("token response: {}", e)))?;
        Ok(token.access_token)
    }
}

/// The service returns `audioContent` base64-encoded, but some client stacks
/// deliver raw bytes; handle both.
fn decode_audio_content(content: &str) -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(content)
        .unwrap_or_else(|_| content.as_bytes().to_vec())
}

#[async_trait]
impl SynthesisBackend for CloudBackend {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> PipelineResult<()> {
        let token = self.fetch_access_token().await?;
        let gender = SsmlGender::from(request.gender);
        let body = serde_json::json!({
            "input": { "text": request.line.text },
            "voice": { "languageCode": LANGUAGE_CODE, "ssmlGender": gender.as_str() },
            "audioConfig": { "audioEncoding": "MP3" },
        });

        debug!(speaker = request.line.speaker.as_str(), "cloud synthesis");
        let resp = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::Synthesis(format!("cloud TTS request: {}", e)))?;
        let data: SynthesizeResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::Synthesis(format!("cloud TTS response: {}", e)))?;

        tokio::fs::write(output, decode_audio_content(&data.audio_content)).await?;
        Ok(())
    }
}

// --- Local variant ---

/// OS voice engine backend: renders a WAV via `say`, `espeak`, or Windows
/// SAPI, then transcodes to MP3 with ffmpeg. The two steps are sequential;
/// the transcoder needs the completed WAV as input.
pub struct LocalBackend {
    platform: Platform,
    engine: String,
    ffmpeg: String,
}

impl LocalBackend {
    pub fn new() -> Self {
        let platform = Platform::current();
        Self::with_commands(platform, default_engine(platform), "ffmpeg")
    }

    /// Override engine and ffmpeg programs (alternate binaries, test stubs).
    pub fn with_commands(
        platform: Platform,
        engine: impl Into<String>,
        ffmpeg: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            engine: engine.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Render `text` to a WAV file at the default 1.0x speaking rate.
    async fn render_wav(&self, text: &str, voice: &str, wav: &Path) -> PipelineResult<()> {
        let mut cmd = Command::new(&self.engine);
        match self.platform {
            Platform::MacOs => {
                cmd.arg("-v")
                    .arg(voice)
                    .arg("-o")
                    .arg(wav)
                    .arg("--data-format=LEI16@22050")
                    .arg(text);
            }
            Platform::Other => {
                cmd.arg("-v").arg(voice).arg("-w").arg(wav).arg(text);
            }
            Platform::Windows => {
                let script = format!(
                    "Add-Type -AssemblyName System.Speech; \
                     $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                     $s.SelectVoice('{}'); \
                     $s.SetOutputToWaveFile('{}'); \
                     $s.Speak('{}'); \
                     $s.Dispose()",
                    voice,
                    wav.display(),
                    text.replace('\'', "''"),
                );
                cmd.arg("-NoProfile").arg("-Command").arg(script);
            }
        }
        run_checked(cmd, "voice engine").await
    }

    /// Transcode the intermediate WAV to MP3 at the final clip path.
    async fn transcode(&self, wav: &Path, output: &Path) -> PipelineResult<()> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-y")
            .arg("-i")
            .arg(wav)
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-qscale:a")
            .arg("4")
            .arg(output);
        run_checked(cmd, "transcode").await
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn default_engine(platform: Platform) -> &'static str {
    match platform {
        Platform::MacOs => "say",
        Platform::Windows => "powershell",
        Platform::Other => "espeak",
    }
}

/// Run a subprocess to completion, folding a non-zero exit and its stderr
/// into a synthesis error.
async fn run_checked(mut cmd: Command, what: &str) -> PipelineResult<()> {
    let output = cmd
        .output()
        .await
        .map_err(|e| PipelineError::Synthesis(format!("{} spawn: {}", what, e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Synthesis(format!(
            "{} exited with {}: {}",
            what,
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

#[async_trait]
impl SynthesisBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> PipelineResult<()> {
        let voice = local_voice(request.gender, self.platform);
        let wav = output.with_extension("wav");

        debug!(speaker = request.line.speaker.as_str(), voice, "local synthesis");
        self.render_wav(&request.line.text, voice, &wav).await?;
        self.transcode(&wav, output).await?;
        tokio::fs::remove_file(&wav).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::key_from_string;
    use std::fs;

    fn request(text: &str, gender: Gender) -> SynthesisRequest {
        SynthesisRequest {
            line: DialogueLine {
                speaker: "Host".into(),
                text: text.into(),
            },
            gender,
        }
    }

    #[test]
    fn decode_audio_content_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"MP3DATA");
        assert_eq!(decode_audio_content(&encoded), b"MP3DATA");
    }

    #[test]
    fn decode_audio_content_raw_passthrough() {
        // Not valid base64 (odd length, illegal chars): treated as raw bytes.
        assert_eq!(decode_audio_content("ID3\u{4}!"), "ID3\u{4}!".as_bytes());
    }

    #[test]
    fn cloud_backend_rejects_garbage_key() {
        let key = key_from_string(
            r#"{"client_email":"a@b.c","private_key":"not a pem"}"#,
        )
        .unwrap();
        assert!(matches!(
            CloudBackend::new(key),
            Err(PipelineError::Credentials(_))
        ));
    }

    #[test]
    fn resolve_backend_defaults_to_local() {
        let backend = resolve_backend(&BackendSettings::default());
        assert_eq!(backend.name(), "local");
    }

    #[test]
    fn resolve_backend_falls_back_on_bad_credentials() {
        let settings = BackendSettings {
            force_cloud: true,
            credentials_path: None,
            credentials: Some("not-a-key".into()),
        };
        let backend = resolve_backend(&settings);
        assert_eq!(backend.name(), "local");
    }

    /// Stub voice engine: finds the `-w <path>` argument and writes a fake
    /// WAV there. Stub ffmpeg: copies the `-i` input to the last argument.
    #[cfg(unix)]
    fn write_stubs(dir: &Path) -> (String, String) {
        use std::os::unix::fs::PermissionsExt;
        let engine = dir.join("engine.sh");
        fs::write(
            &engine,
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-w\" ]; then out=$2; fi\n  shift\ndone\nprintf 'WAV' > \"$out\"\n",
        )
        .unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

        let ffmpeg = dir.join("ffmpeg.sh");
        fs::write(
            &ffmpeg,
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-i\" ]; then src=$2; fi\n  out=$1\n  shift\ndone\ncp \"$src\" \"$out\"\n",
        )
        .unwrap();
        fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();
        (
            engine.to_string_lossy().into_owned(),
            ffmpeg.to_string_lossy().into_owned(),
        )
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn local_backend_renders_and_removes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, ffmpeg) = write_stubs(dir.path());
        let backend = LocalBackend::with_commands(Platform::Other, engine, ffmpeg);

        let clip = dir.path().join("clip_0.mp3");
        backend.synthesize(&request("Hello", Gender::Male), &clip).await.unwrap();

        assert!(clip.exists());
        assert!(!clip.with_extension("wav").exists());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn local_backend_engine_failure_propagates() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.sh");
        fs::write(&bad, "#!/bin/sh\necho 'no voice' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&bad, fs::Permissions::from_mode(0o755)).unwrap();
        let backend = LocalBackend::with_commands(
            Platform::Other,
            bad.to_string_lossy().into_owned(),
            "ffmpeg",
        );

        let clip = dir.path().join("clip_0.mp3");
        let err = backend.synthesize(&request("Hello", Gender::Female), &clip).await.unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis(_)));
        assert!(err.to_string().contains("no voice"));
        assert!(!clip.exists());
    }
}
