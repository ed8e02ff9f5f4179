//! The canonical step result contract.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::entity::EntityId;
use crate::error::{StagehandError, TransportError};

/// Statuses that count as a completed stage when `ok` is true.
pub const SUCCESS_STATUSES: &[&str] = &[
    "success",
    "skipped",
    "no_changes",
    "already_running",
    "skipped_recent",
];

/// Error code of a response no known envelope could be read from.
pub const INVALID_RESPONSE_CODE: &str = "invalid_workflow_response";

/// Start and end of a step, as reported by the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    pub started_at: Value,
    pub finished_at: Value,
}

impl Timestamps {
    /// Both timestamps set to the current time.
    pub fn now() -> Self {
        let ts = Value::String(Utc::now().to_rfc3339());
        Self {
            started_at: ts.clone(),
            finished_at: ts,
        }
    }
}

/// Outcome of one stage invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub ok: bool,
    pub stage: String,
    pub status: String,
    pub product_type_id: Option<EntityId>,
    pub product_id: Value,
    pub metrics: Map<String, Value>,
    pub errors: Vec<Value>,
    pub warnings: Vec<Value>,
    pub timestamps: Timestamps,
}

impl StepResult {
    /// The standard failure for a response that could not be interpreted.
    pub fn invalid_response(stage: &str, entity_id: EntityId) -> Self {
        Self::failure(
            stage,
            entity_id,
            "error",
            vec![json!({ "code": INVALID_RESPONSE_CODE })],
        )
    }

    /// A failure synthesized from a transport error.
    pub fn transport_failure(stage: &str, entity_id: EntityId, err: &TransportError) -> Self {
        let status = match err {
            TransportError::Timeout { .. } => "timeout",
            _ => "error",
        };
        let mut descriptor = json!({
            "code": "transport_error",
            "kind": err.kind(),
            "message": err.to_string(),
        });
        if let Some(http_status) = err.status() {
            descriptor["http_status"] = json!(http_status);
        }
        Self::failure(stage, entity_id, status, vec![descriptor])
    }

    /// A failure raised by the orchestrator itself, before or instead of
    /// invoking the stage.
    pub fn from_error(stage: &str, entity_id: EntityId, err: &StagehandError) -> Self {
        let descriptor = json!({ "code": err.code(), "message": err.to_string() });
        Self::failure(stage, entity_id, "error", vec![descriptor])
    }

    fn failure(stage: &str, entity_id: EntityId, status: &str, errors: Vec<Value>) -> Self {
        Self {
            ok: false,
            stage: stage.to_string(),
            status: status.to_string(),
            product_type_id: Some(entity_id),
            product_id: Value::Null,
            metrics: Map::new(),
            errors,
            warnings: Vec::new(),
            timestamps: Timestamps::now(),
        }
    }

    /// Whether the stage completed.
    pub fn is_success(&self) -> bool {
        self.ok && SUCCESS_STATUSES.contains(&self.status.as_str())
    }

    /// The `code` of the first structured error, if any.
    pub fn first_error_code(&self) -> Option<&str> {
        self.errors
            .iter()
            .find_map(|e| e.get("code").and_then(Value::as_str))
    }
}
