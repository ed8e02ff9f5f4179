//! Status command implementation.
//!
//! The `stagehand status` command reads each entity and prints its decoded
//! pipeline state without changing anything.

use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;
use tracing::warn;

use crate::cli::args::StatusArgs;
use crate::config::OrchestratorConfig;
use crate::entity::{EntityId, EntityStore, TrackerClient};
use crate::error::{Result, StagehandError};
use crate::runner::BatchReport;
use crate::state::{decode, detect_change, fingerprint, ChangeStatus, PipelineState};
use crate::steps::StageSequencer;

use super::common::{layered_config, parse_entity_ids, write_json};
use super::dispatcher::{Command, CommandResult, EXIT_CONFIG_ERROR, EXIT_RUNTIME_FAILURE};

/// Status of one entity.
#[derive(Debug, Serialize)]
pub struct EntityStatus {
    pub product_type_id: EntityId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// `never_run`, `current` or `changed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_stage: Option<String>,

    /// A fatal error was retried as often as allowed; runs skip the entity
    /// until its inputs change.
    pub durably_failed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PipelineState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Output of the status command.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub ok: bool,
    pub items: Vec<EntityStatus>,
}

/// The status command implementation.
pub struct StatusCommand {
    args: StatusArgs,
}

impl StatusCommand {
    /// Create a new status command.
    pub fn new(args: StatusArgs) -> Self {
        Self { args }
    }

    fn prepare(&self) -> Result<(Vec<EntityId>, OrchestratorConfig)> {
        let ids = parse_entity_ids(&self.args.tracker.entity_ids)?;
        let mut config = layered_config(&self.args.tracker)?;
        if !self.args.stages.is_empty() {
            config.select_stages(&self.args.stages);
        }
        if let Some(retries) = self.args.max_retries {
            config.retry.max_retries = retries;
        }
        if config.tracker.base_url.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(StagehandError::ConfigValidationError {
                message: "tracking platform base URL is required".to_string(),
            });
        }
        Ok((ids, config))
    }

    /// Describe each entity using `store`.
    ///
    /// `max_retries` decides, as in a run, whether an outstanding fatal error
    /// stops the entity.
    pub fn collect(
        store: &dyn EntityStore,
        sequencer: &StageSequencer,
        max_retries: u32,
        ids: &[EntityId],
    ) -> StatusReport {
        let items: Vec<EntityStatus> = ids
            .iter()
            .map(|&id| describe(store, sequencer, max_retries, id))
            .collect();
        StatusReport {
            ok: items.iter().all(|item| item.error.is_none()),
            items,
        }
    }

    fn status(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let (ids, config) = self.prepare()?;
        let base_url = config.tracker.base_url.clone().unwrap_or_default();
        let store = TrackerClient::new(&base_url, config.tracker.token.clone(), config.timeout)?;
        let max_retries = config.retry.max_retries;
        let sequencer = StageSequencer::new(config.stages)?;

        let report = Self::collect(&store, &sequencer, max_retries, &ids);
        write_json(out, &report)?;
        if report.ok {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(EXIT_RUNTIME_FAILURE))
        }
    }
}

fn describe(
    store: &dyn EntityStore,
    sequencer: &StageSequencer,
    max_retries: u32,
    id: EntityId,
) -> EntityStatus {
    let entity = match store.get_entity(id) {
        Ok(entity) => entity,
        Err(err) => {
            warn!(entity_id = id, error = %err, "could not read entity");
            return EntityStatus {
                product_type_id: id,
                fingerprint: None,
                inputs: None,
                next_stage: None,
                durably_failed: false,
                state: None,
                error: Some(json!({ "code": err.code(), "message": err.to_string() })),
            };
        }
    };

    let state = decode(&entity.description).state;
    let fp = fingerprint(&entity);
    let inputs = match detect_change(state.input_hash.as_deref(), &fp) {
        ChangeStatus::NeverRun => "never_run",
        ChangeStatus::Current => "current",
        ChangeStatus::Changed { .. } => "changed",
    };
    let mut durably_failed = false;
    let next_stage = if state.is_settled(&fp, sequencer.final_stage()) {
        None
    } else if state.is_stale(&fp) {
        Some(sequencer.first().to_string())
    } else if state.is_durably_failed(max_retries) {
        durably_failed = true;
        None
    } else {
        Some(sequencer.current(&state).to_string())
    };

    EntityStatus {
        product_type_id: id,
        fingerprint: Some(fp),
        inputs: Some(inputs),
        next_stage,
        durably_failed,
        state: Some(state),
        error: None,
    }
}

impl Command for StatusCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        match self.status(out) {
            Ok(result) => Ok(result),
            Err(err) => {
                write_json(out, &BatchReport::aborted(&err))?;
                let code = if err.is_config_error() {
                    EXIT_CONFIG_ERROR
                } else {
                    EXIT_RUNTIME_FAILURE
                };
                Ok(CommandResult::failure(code))
            }
        }
    }
}
