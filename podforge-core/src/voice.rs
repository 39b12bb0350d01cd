//! Voice selection: gender + platform to a local voice id, gender to the
//! cloud SSML gender enum. Pure lookups, no error path.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Speaker gender attribute as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl<'de> Deserialize<'de> for Gender {
    /// Anything other than male/female is treated as unspecified rather than
    /// rejecting the whole request.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Unspecified,
        })
    }
}

/// Per-request mapping from speaker name to gender attribute.
pub type GenderMap = HashMap<String, Gender>;

/// Host platform bucket for local voice selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    /// Linux and everything else (espeak voices).
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

/// SSML gender enum used by the cloud TTS service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SsmlGender {
    Male,
    Female,
    Neutral,
}

impl SsmlGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            SsmlGender::Male => "MALE",
            SsmlGender::Female => "FEMALE",
            SsmlGender::Neutral => "NEUTRAL",
        }
    }
}

impl From<Gender> for SsmlGender {
    fn from(g: Gender) -> Self {
        match g {
            Gender::Male => SsmlGender::Male,
            Gender::Female => SsmlGender::Female,
            Gender::Unspecified => SsmlGender::Neutral,
        }
    }
}

/// Local voice id for a gender on a platform. Unspecified gender falls back
/// to the female-coded voice for the platform.
pub fn local_voice(gender: Gender, platform: Platform) -> &'static str {
    match (platform, gender) {
        (Platform::Windows, Gender::Male) => "Microsoft David Desktop",
        (Platform::Windows, _) => "Microsoft Zira Desktop",
        (Platform::MacOs, Gender::Male) => "Daniel",
        (Platform::MacOs, _) => "Samantha",
        (Platform::Other, Gender::Male) => "en+m3",
        (Platform::Other, _) => "en+f3",
    }
}
