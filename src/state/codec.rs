//! Embedding pipeline state in free text.
//!
//! The state lives on a single line of the entity description, prefixed by
//! [`STATE_MARKER`] and followed by compact JSON. Every other line belongs to
//! other writers and is preserved verbatim.

use tracing::warn;

use crate::error::Result;

use super::PipelineState;

/// Prefix of the state line.
pub const STATE_MARKER: &str = "autojp_state:";

/// State decoded from a description, together with the raw line it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedState {
    pub state: PipelineState,
    /// The marker line as found, if any. Used to detect concurrent writers.
    pub line: Option<String>,
}

/// Find the state line in a description.
pub fn find_state_line(description: &str) -> Option<&str> {
    description
        .lines()
        .find(|line| line.starts_with(STATE_MARKER))
}

/// Decode the pipeline state from a description.
///
/// Missing or unparsable state yields the default state; the raw line is
/// still reported so a later write can tell whether it changed.
pub fn decode(description: &str) -> DecodedState {
    let Some(line) = find_state_line(description) else {
        return DecodedState::default();
    };

    let payload = line[STATE_MARKER.len()..].trim();
    let state = match serde_json::from_str::<PipelineState>(payload) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "discarding unreadable pipeline state");
            PipelineState::default()
        }
    };

    DecodedState {
        state,
        line: Some(line.to_string()),
    }
}

/// Serialize the state into its marker line.
pub fn encode_line(state: &PipelineState) -> Result<String> {
    Ok(format!("{}{}", STATE_MARKER, serde_json::to_string(state)?))
}

/// Replace any state lines in `description` with `line`.
///
/// The new line is appended after all other content and the result is
/// trimmed of surrounding whitespace.
pub fn splice(description: &str, line: &str) -> String {
    let mut lines: Vec<&str> = description
        .lines()
        .filter(|l| !l.starts_with(STATE_MARKER))
        .collect();
    lines.push(line);
    lines.join("\n").trim().to_string()
}

/// Write `state` into `description`.
pub fn encode(description: &str, state: &PipelineState) -> Result<String> {
    Ok(splice(description, &encode_line(state)?))
}
