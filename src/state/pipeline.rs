//! The persisted pipeline state of one entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::steps::{StepResult, Verdict};

/// Overall status of an entity's pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Running,
    Success,
    /// Stopped on a failure that needs a human.
    Failed,
    /// Stopped after exhausting transient retries; a later run will likely succeed.
    Error,
    SkippedNoChange,
}

impl PipelineStatus {
    /// Whether this status counts as a successful outcome of a run.
    pub fn is_ok(&self) -> bool {
        matches!(self, PipelineStatus::Success | PipelineStatus::SkippedNoChange)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Idle => "idle",
            PipelineStatus::Running => "running",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Error => "error",
            PipelineStatus::SkippedNoChange => "skipped_no_change",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The most recent failure of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastError {
    pub stage: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default)]
    pub errors: Vec<Value>,

    /// Classification of the failure. Absent in state written by older
    /// tooling, which is treated as fatal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl LastError {
    /// Whether retrying without a change will not help.
    pub fn is_fatal(&self) -> bool {
        self.verdict.unwrap_or(Verdict::Fatal) == Verdict::Fatal
    }
}

/// Pipeline progress, embedded in the entity description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    pub current_stage: Option<String>,
    pub last_success_stage: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<LastError>,
    pub retry_count: u32,
    pub pipeline_status: PipelineStatus,
    pub input_hash: Option<String>,
    pub last_success_input_hash: Option<String>,
}

impl PipelineState {
    /// Whether the whole pipeline already succeeded for this fingerprint and
    /// nothing is outstanding.
    pub fn is_settled(&self, fingerprint: &str, final_stage: &str) -> bool {
        self.last_success_input_hash.as_deref() == Some(fingerprint)
            && self.last_success_stage.as_deref() == Some(final_stage)
            && self.last_error.is_none()
    }

    /// Whether the stored progress belongs to a different fingerprint.
    pub fn is_stale(&self, fingerprint: &str) -> bool {
        self.input_hash.as_deref() != Some(fingerprint)
    }

    /// Clear every progress marker so the pipeline restarts from the top.
    pub fn reset_progress(&mut self) {
        self.current_stage = None;
        self.last_success_stage = None;
        self.last_error = None;
        self.retry_count = 0;
    }

    /// Whether a fatal failure has already been retried as often as allowed.
    pub fn is_durably_failed(&self, max_retries: u32) -> bool {
        let fatal = self.last_error.as_ref().is_some_and(LastError::is_fatal);
        fatal && self.retry_count >= max_retries
    }

    /// Mark the start of a run for `fingerprint`.
    pub fn begin_run(&mut self, fingerprint: &str) {
        self.input_hash = Some(fingerprint.to_string());
        self.pipeline_status = PipelineStatus::Running;
    }

    /// Record a skipped run for an unchanged, already completed entity.
    pub fn mark_skipped(&mut self, fingerprint: &str, now: DateTime<Utc>) {
        self.input_hash = Some(fingerprint.to_string());
        self.pipeline_status = PipelineStatus::SkippedNoChange;
        self.last_run_at = Some(now);
    }

    /// Stop without running anything because of an outstanding fatal error.
    pub fn mark_durably_failed(&mut self, now: DateTime<Utc>) {
        self.pipeline_status = PipelineStatus::Failed;
        self.last_run_at = Some(now);
    }

    /// Record a successful stage.
    ///
    /// `next` is the stage to run afterwards, `None` when `stage` was the
    /// last one, in which case the pipeline is complete for `fingerprint`.
    pub fn record_success(
        &mut self,
        stage: &str,
        next: Option<&str>,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) {
        self.last_run_at = Some(now);
        self.last_success_stage = Some(stage.to_string());
        self.last_error = None;
        self.retry_count = 0;
        match next {
            Some(next) => self.current_stage = Some(next.to_string()),
            None => {
                self.current_stage = None;
                self.last_success_input_hash = Some(fingerprint.to_string());
                self.pipeline_status = PipelineStatus::Success;
            }
        }
    }

    /// Record a failed stage and return the resulting pipeline status.
    ///
    /// The pipeline stays at `stage`. A transient failure records the retries
    /// spent in this run; a fatal one extends the streak of fatal failures
    /// at the same stage across runs.
    pub fn record_failure(
        &mut self,
        stage: &str,
        result: &StepResult,
        verdict: Verdict,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> PipelineStatus {
        let fatal_streak = match &self.last_error {
            Some(prev) if prev.stage == stage && prev.is_fatal() => self.retry_count,
            _ => 0,
        };

        self.last_run_at = Some(now);
        self.current_stage = Some(stage.to_string());
        self.last_error = Some(LastError {
            stage: stage.to_string(),
            status: Some(result.status.clone()),
            code: result.first_error_code().map(String::from),
            errors: result.errors.clone(),
            verdict: Some(verdict),
        });

        let status = match verdict {
            Verdict::Fatal => {
                self.retry_count = fatal_streak.saturating_add(1);
                PipelineStatus::Failed
            }
            Verdict::Transient => {
                self.retry_count = attempts.saturating_sub(1);
                PipelineStatus::Error
            }
        };
        self.pipeline_status = status;
        status
    }
}
