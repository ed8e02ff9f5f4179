//! Normalization of raw stage responses.
//!
//! The workflow server wraps the stage's own result in different envelopes
//! depending on how the workflow ends. [`detect_shape`] probes a fixed list
//! of [`Envelope`]s for an object carrying both `ok` and `status`;
//! [`normalize`] turns whatever it finds into a [`StepResult`], or into the
//! standard invalid-response failure when nothing matches.

use serde_json::{Map, Value};

use crate::entity::EntityId;

use super::result::{StepResult, Timestamps};

/// Known places a step result can sit inside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{"json": {...}}`
    Json,
    /// `{"data": [{"json": {...}}, ...]}`
    ExecutionItems,
    /// `[{"json": {...}}, ...]`
    ItemList,
    /// `{"data": {...}}`
    Data,
    /// The response itself.
    Root,
}

impl Envelope {
    /// Probe order. Earlier entries win.
    pub const PROBE_ORDER: [Envelope; 5] = [
        Envelope::Json,
        Envelope::ExecutionItems,
        Envelope::ItemList,
        Envelope::Data,
        Envelope::Root,
    ];

    /// JSON pointer to the candidate object.
    pub fn pointer(&self) -> &'static str {
        match self {
            Envelope::Json => "/json",
            Envelope::ExecutionItems => "/data/0/json",
            Envelope::ItemList => "/0/json",
            Envelope::Data => "/data",
            Envelope::Root => "",
        }
    }
}

/// What a raw response turned out to be.
#[derive(Debug, PartialEq)]
pub enum ResponseShape<'a> {
    Recognized {
        envelope: Envelope,
        payload: &'a Map<String, Value>,
    },
    Unrecognized,
}

/// Find the step result inside a raw response.
pub fn detect_shape(raw: &Value) -> ResponseShape<'_> {
    for envelope in Envelope::PROBE_ORDER {
        if let Some(Value::Object(payload)) = raw.pointer(envelope.pointer()) {
            if payload.contains_key("ok") && payload.contains_key("status") {
                return ResponseShape::Recognized { envelope, payload };
            }
        }
    }
    ResponseShape::Unrecognized
}

/// Convert a raw response into a [`StepResult`].
///
/// Missing fields are filled with defaults: the fallback stage, the entity
/// id, empty collections, and the current time.
pub fn normalize(raw: &Value, fallback_stage: &str, entity_id: EntityId) -> StepResult {
    let payload = match detect_shape(raw) {
        ResponseShape::Recognized { payload, .. } => payload,
        ResponseShape::Unrecognized => {
            return StepResult::invalid_response(fallback_stage, entity_id)
        }
    };

    StepResult {
        ok: truthy(payload.get("ok")),
        stage: payload
            .get("stage")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback_stage)
            .to_string(),
        status: match payload.get("status") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "error".to_string(),
            Some(other) => other.to_string(),
        },
        product_type_id: payload
            .get("product_type_id")
            .and_then(as_entity_id)
            .or(Some(entity_id)),
        product_id: payload.get("product_id").cloned().unwrap_or(Value::Null),
        metrics: match payload.get("metrics") {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        },
        errors: as_list(payload.get("errors")),
        warnings: as_list(payload.get("warnings")),
        timestamps: timestamps(payload.get("timestamps")),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn as_entity_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single.clone()],
    }
}

fn timestamps(value: Option<&Value>) -> Timestamps {
    let fallback = Timestamps::now();
    match value {
        Some(Value::Object(ts)) => Timestamps {
            started_at: ts.get("started_at").cloned().unwrap_or(fallback.started_at),
            finished_at: ts.get("finished_at").cloned().unwrap_or(fallback.finished_at),
        },
        _ => fallback,
    }
}
