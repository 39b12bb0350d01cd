//! Dialogue script types and parsing of raw generator output.
//!
//! Generators frequently wrap their JSON in Markdown code fences; parsing
//! strips the fences (with an optional `json` tag) before reading the array.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// One line of the podcast script. Order within the script is speaking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

/// Remove surrounding Markdown code fences and whitespace from raw output.
///
/// Handles ```` ```json ... ``` ````, bare ```` ``` ... ``` ```` and
/// unfenced text alike; fence presence must not affect the parsed result.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest).trim_start();
        if let Some(body) = s.strip_suffix("```") {
            s = body;
        }
    }
    s.trim()
}

/// Parse raw generator output into an ordered dialogue script.
pub fn parse_script(raw: &str) -> PipelineResult<Vec<DialogueLine>> {
    let cleaned = strip_code_fences(raw);
    let lines: Vec<DialogueLine> = serde_json::from_str(cleaned)
        .map_err(|e| PipelineError::ScriptFormat(e.to_string()))?;
    if lines.is_empty() {
        return Err(PipelineError::ScriptFormat("script contains no lines".into()));
    }
    Ok(lines)
}
