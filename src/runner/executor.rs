//! Stage invocation with bounded retries.

use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info_span, warn};

use crate::config::RetryPolicy;
use crate::entity::EntityId;
use crate::error::TransportError;
use crate::steps::{normalize, RetryClassifier, StepResult, Verdict};

/// Something that can run a stage's workflow.
///
/// Returns the raw response; interpreting it is left to the normalizer.
pub trait StageRunner {
    fn run_stage(&self, workflow_id: &str, payload: &Value) -> Result<Value, TransportError>;
}

/// Final outcome of one logical stage call.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Result of the last attempt.
    pub result: StepResult,
    /// Raw response of the last attempt, if one arrived.
    pub raw: Option<Value>,
    /// Number of invocations made.
    pub attempts: u32,
    /// Classification of the last attempt. `None` on success.
    pub verdict: Option<Verdict>,
    /// Correlation id shared by all attempts.
    pub trace_id: String,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

type Sleep<'a> = Box<dyn Fn(Duration) + 'a>;

/// Runs stages through a [`StageRunner`], retrying transient failures with
/// exponential backoff.
pub struct WorkflowExecutor<'a> {
    runner: &'a dyn StageRunner,
    classifier: RetryClassifier,
    policy: RetryPolicy,
    sleep: Sleep<'a>,
}

impl<'a> WorkflowExecutor<'a> {
    pub fn new(runner: &'a dyn StageRunner, classifier: RetryClassifier, policy: RetryPolicy) -> Self {
        Self {
            runner,
            classifier,
            policy,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the function used to wait between attempts.
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `stage` via `workflow_id` for an entity.
    ///
    /// Never fails: transport errors become failed results. At most
    /// `max_retries + 1` invocations are made.
    pub fn execute(&self, stage: &str, workflow_id: &str, entity_id: EntityId) -> ExecutionOutcome {
        let trace_id = format!("master-{}-{}", entity_id, Utc::now().format("%Y%m%d%H%M%S"));
        let span = info_span!("stage", entity_id, stage, trace_id = %trace_id);
        let _guard = span.enter();

        let mut attempt = 0u32;
        loop {
            let payload = build_payload(stage, entity_id, &trace_id, attempt);
            debug!(attempt, workflow_id, run_id = %payload["run_id"], "invoking stage");

            let (result, raw, verdict) = match self.runner.run_stage(workflow_id, &payload) {
                Ok(raw) => {
                    let result = normalize(&raw, stage, entity_id);
                    let verdict = if result.is_success() {
                        None
                    } else {
                        Some(self.classifier.classify_result(&result))
                    };
                    (result, Some(raw), verdict)
                }
                Err(err) => {
                    let verdict = self.classifier.classify_transport(&err);
                    warn!(attempt, error = %err, %verdict, "stage call failed");
                    (
                        StepResult::transport_failure(stage, entity_id, &err),
                        None,
                        Some(verdict),
                    )
                }
            };

            if verdict == Some(Verdict::Transient) && attempt < self.policy.max_retries {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    attempt,
                    status = %result.status,
                    delay_ms = delay.as_millis() as u64,
                    "transient stage failure, retrying"
                );
                (self.sleep)(delay);
                attempt += 1;
                continue;
            }

            return ExecutionOutcome {
                result,
                raw,
                attempts: attempt + 1,
                verdict,
                trace_id,
            };
        }
    }
}

/// Payload sent with one attempt. `run_id` is unique per attempt.
fn build_payload(stage: &str, entity_id: EntityId, trace_id: &str, attempt: u32) -> Value {
    json!({
        "entity_id": entity_id,
        "product_type_id": entity_id,
        "stage": stage,
        "attempt": attempt,
        "trace_id": trace_id,
        "run_id": format!("pt-{}-{}-{}", entity_id, Utc::now().timestamp_millis(), attempt),
    })
}
