//! The per-entity control loop.
//!
//! For every entity the orchestrator:
//!
//! 1. reads the entity and decodes its pipeline state,
//! 2. skips it entirely when the pipeline already completed for the
//!    current input fingerprint,
//! 3. restarts from the first stage when the fingerprint changed,
//! 4. stops without work when a fatal error at this fingerprint has been
//!    retried across runs as often as allowed,
//! 5. otherwise runs stages from the current one, persisting state after
//!    every stage, until the pipeline completes or a stage fails.
//!
//! Entities are processed one at a time. An error on one entity is recorded
//! in its report item and the next entity is processed.

use chrono::Utc;
use tracing::{error, info, info_span, warn};

use crate::config::RetryPolicy;
use crate::entity::{EntityId, EntityStore};
use crate::error::Result;
use crate::state::{decode, detect_change, fingerprint, ChangeStatus, PipelineStatus, StateWriter};
use crate::steps::{RetryClassifier, StageSequencer, StepResult, Transition, Verdict};

use super::executor::{StageRunner, WorkflowExecutor};
use super::report::{BatchReport, EntityReport, StepReport, MASTER_STAGE};

/// Drives entities through the stage pipeline.
pub struct Orchestrator<'a> {
    store: &'a dyn EntityStore,
    executor: WorkflowExecutor<'a>,
    sequencer: StageSequencer,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        runner: &'a dyn StageRunner,
        sequencer: StageSequencer,
        policy: RetryPolicy,
    ) -> Self {
        Self::with_classifier(store, runner, sequencer, policy, RetryClassifier::default())
    }

    /// Create an orchestrator with a custom classification table.
    pub fn with_classifier(
        store: &'a dyn EntityStore,
        runner: &'a dyn StageRunner,
        sequencer: StageSequencer,
        policy: RetryPolicy,
        classifier: RetryClassifier,
    ) -> Self {
        Self {
            store,
            executor: WorkflowExecutor::new(runner, classifier, policy),
            sequencer,
        }
    }

    /// Process every entity in order and build the batch report.
    pub fn run(&self, ids: &[EntityId]) -> BatchReport {
        info!(entities = ids.len(), "starting orchestrator run");
        let mut report = BatchReport::start();
        for &id in ids {
            report.push(self.process_entity(id));
        }
        let report = report.finish();
        info!(
            processed = report.metrics.processed,
            failed = report.metrics.failed,
            "orchestrator run finished"
        );
        report
    }

    /// Process one entity. Never fails; errors end up in the report.
    pub fn process_entity(&self, id: EntityId) -> EntityReport {
        let span = info_span!("entity", entity_id = id);
        let _guard = span.enter();

        let mut item = EntityReport::new(id);
        item.status = match self.drive(id, &mut item) {
            Ok(status) => status,
            Err(err) => {
                error!(error = %err, "entity processing aborted");
                item.steps.push(StepReport::error(MASTER_STAGE, &err));
                PipelineStatus::Error
            }
        };
        info!(status = %item.status, "entity finished");
        item
    }

    fn drive(&self, id: EntityId, item: &mut EntityReport) -> Result<PipelineStatus> {
        let entity = self.store.get_entity(id)?;
        let decoded = decode(&entity.description);
        let mut state = decoded.state;
        let mut writer = StateWriter::new(self.store, id, decoded.line);
        let fp = fingerprint(&entity);

        if state.is_settled(&fp, self.sequencer.final_stage()) {
            info!("pipeline already complete for current inputs");
            state.mark_skipped(&fp, Utc::now());
            writer.write(&state)?;
            return Ok(PipelineStatus::SkippedNoChange);
        }

        match detect_change(state.input_hash.as_deref(), &fp) {
            ChangeStatus::Current => {}
            ChangeStatus::NeverRun => state.reset_progress(),
            ChangeStatus::Changed { previous, .. } => {
                info!(%previous, current = %fp, "inputs changed, restarting pipeline");
                state.reset_progress();
            }
        }

        let max_retries = self.executor.policy().max_retries;
        if state.is_durably_failed(max_retries) {
            warn!(
                retry_count = state.retry_count,
                max_retries, "fatal error outstanding, not retrying"
            );
            state.mark_durably_failed(Utc::now());
            writer.write(&state)?;
            return Ok(PipelineStatus::Failed);
        }

        state.begin_run(&fp);
        loop {
            let stage = self.sequencer.current(&state).to_string();

            let target = match self.sequencer.target(&stage) {
                Ok(target) => target,
                Err(err) => {
                    error!(%stage, error = %err, "stage cannot be resolved");
                    item.steps.push(StepReport::error(&stage, &err));
                    let result = StepResult::from_error(&stage, id, &err);
                    let status =
                        state.record_failure(&stage, &result, Verdict::Fatal, 0, Utc::now());
                    writer.write(&state)?;
                    return Ok(status);
                }
            };

            let outcome = self.executor.execute(&stage, target, id);
            item.steps.push(StepReport::from_outcome(&stage, &outcome));
            let now = Utc::now();

            if !outcome.is_success() {
                let verdict = outcome.verdict.unwrap_or(Verdict::Fatal);
                let status =
                    state.record_failure(&stage, &outcome.result, verdict, outcome.attempts, now);
                warn!(%stage, %verdict, attempts = outcome.attempts, %status, "stage failed");
                writer.write(&state)?;
                return Ok(status);
            }

            match self.sequencer.advance(&stage) {
                Transition::Next(next) => {
                    info!(%stage, %next, "stage succeeded");
                    state.record_success(&stage, Some(&next), &fp, now);
                    writer.write(&state)?;
                }
                Transition::Complete => {
                    info!(%stage, "final stage succeeded");
                    state.record_success(&stage, None, &fp, now);
                    writer.write(&state)?;
                    return Ok(PipelineStatus::Success);
                }
            }
        }
    }
}
