//! The JSON report printed at the end of a run.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::entity::EntityId;
use crate::error::StagehandError;
use crate::state::PipelineStatus;
use crate::steps::{Timestamps, Verdict};

use super::executor::ExecutionOutcome;

/// Stage name the orchestrator reports its own work under.
pub const MASTER_STAGE: &str = "WF_MASTER";

/// Aggregate counters of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchMetrics {
    pub processed: usize,
    pub failed: usize,
}

/// Report for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub ok: bool,
    pub stage: String,
    pub product_type_id: Option<EntityId>,
    pub product_id: Value,
    pub status: String,
    pub metrics: BatchMetrics,
    pub errors: Vec<Value>,
    pub warnings: Vec<Value>,
    pub timestamps: Timestamps,
    pub items: Vec<EntityReport>,
}

impl BatchReport {
    /// An empty, successful report started now.
    pub fn start() -> Self {
        Self {
            ok: true,
            stage: MASTER_STAGE.to_string(),
            product_type_id: None,
            product_id: Value::Null,
            status: "success".to_string(),
            metrics: BatchMetrics::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
            timestamps: Timestamps::now(),
            items: Vec::new(),
        }
    }

    /// A failed report for an error that stopped the run before any entity
    /// was processed.
    pub fn aborted(err: &StagehandError) -> Self {
        let mut descriptor = json!({ "code": err.code(), "message": err.to_string() });
        if let StagehandError::MissingStageTargets { stages } = err {
            descriptor["details"] = json!(stages);
        }
        let mut report = Self::start();
        report.ok = false;
        report.errors.push(descriptor);
        report.finish()
    }

    /// Add an entity's outcome.
    pub fn push(&mut self, item: EntityReport) {
        if !item.status.is_ok() {
            self.ok = false;
            self.metrics.failed += 1;
        }
        self.items.push(item);
    }

    /// Fill the summary fields.
    pub fn finish(mut self) -> Self {
        self.metrics.processed = self.items.len();
        self.status = if self.ok { "success" } else { "error" }.to_string();
        self.timestamps.finished_at = Timestamps::now().finished_at;
        self
    }
}

/// Outcome of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub product_type_id: EntityId,
    pub status: PipelineStatus,
    pub steps: Vec<StepReport>,
}

impl EntityReport {
    pub fn new(id: EntityId) -> Self {
        Self {
            product_type_id: id,
            status: PipelineStatus::Idle,
            steps: Vec::new(),
        }
    }
}

/// One stage executed (or attempted) for an entity.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub stage: String,
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RawSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StepReport {
    /// Report a stage execution.
    pub fn from_outcome(stage: &str, outcome: &ExecutionOutcome) -> Self {
        Self {
            stage: stage.to_string(),
            status: outcome.result.status.clone(),
            attempts: Some(outcome.attempts),
            verdict: outcome.verdict,
            trace_id: Some(outcome.trace_id.clone()),
            summary: Some(RawSummary::of(outcome.raw.as_ref())),
            metrics: Some(outcome.result.metrics.clone()),
            errors: outcome.result.errors.clone(),
            details: None,
        }
    }

    /// Report an error raised by the orchestrator for `stage`.
    pub fn error(stage: &str, err: &StagehandError) -> Self {
        Self {
            stage: stage.to_string(),
            status: "error".to_string(),
            attempts: None,
            verdict: None,
            trace_id: None,
            summary: None,
            metrics: None,
            errors: vec![json!({ "code": err.code() })],
            details: Some(err.to_string()),
        }
    }
}

/// A few facts about a raw workflow response, kept for debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSummary {
    pub has_data: bool,
    pub data_items: usize,
    pub execution_id: Value,
    pub status: Value,
}

impl RawSummary {
    pub fn of(raw: Option<&Value>) -> Self {
        let Some(Value::Object(raw)) = raw else {
            return Self::default();
        };
        let data_items = raw.get("data").and_then(Value::as_array).map_or(0, Vec::len);
        let execution_id = ["id", "executionId"]
            .iter()
            .filter_map(|key| raw.get(*key))
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            has_data: data_items > 0,
            data_items,
            execution_id,
            status: raw.get("status").cloned().unwrap_or(Value::Null),
        }
    }
}
