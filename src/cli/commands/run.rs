//! Run command implementation.
//!
//! The `stagehand run` command drives every given entity through the
//! pipeline and prints the batch report.

use std::io::Write;
use tracing::{debug, error};

use crate::cli::args::RunArgs;
use crate::config::{backoff_from_secs, validate, OrchestratorConfig};
use crate::entity::{EntityId, TrackerClient};
use crate::error::{Result, StagehandError};
use crate::runner::{BatchReport, N8nClient, Orchestrator};
use crate::steps::StageSequencer;

use super::common::{layered_config, parse_entity_ids, write_json};
use super::dispatcher::{Command, CommandResult, EXIT_CONFIG_ERROR, EXIT_RUNTIME_FAILURE};

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// The run command implementation.
pub struct RunCommand {
    args: RunArgs,
    env: EnvLookup,
}

impl RunCommand {
    /// Create a new run command reading stage ids from the process env.
    pub fn new(args: RunArgs) -> Self {
        Self {
            args,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the environment used for `N8N_<STAGE>_ID` lookups.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Resolve the entity ids and the validated configuration.
    pub fn prepare(&self) -> Result<(Vec<EntityId>, OrchestratorConfig)> {
        let ids = parse_entity_ids(&self.args.tracker.entity_ids)?;
        let mut config = layered_config(&self.args.tracker)?;

        if !self.args.stages.is_empty() {
            config.select_stages(&self.args.stages);
        }
        config.apply_stage_env(|key| (self.env)(key));
        for (stage, workflow_id) in &self.args.stage_targets {
            if !config.set_stage_target(stage, workflow_id) {
                return Err(StagehandError::ConfigValidationError {
                    message: format!("--stage-target names unknown stage '{}'", stage),
                });
            }
        }

        if let Some(url) = &self.args.n8n_base_url {
            config.workflows.base_url = url.clone();
        }
        if let Some(key) = &self.args.n8n_api_key {
            config.workflows.api_key = Some(key.clone()).filter(|k| !k.is_empty());
        }
        if let Some(retries) = self.args.max_retries {
            config.retry.max_retries = retries;
        }
        if let Some(secs) = self.args.retry_backoff_seconds {
            config.retry.backoff_base = backoff_from_secs(secs)?;
        }

        validate(&config)?;
        Ok((ids, config))
    }

    fn run(&self) -> Result<BatchReport> {
        let (ids, config) = self.prepare()?;
        debug!(
            stages = ?config.stage_names(),
            max_retries = config.retry.max_retries,
            timeout_secs = config.timeout.as_secs(),
            "resolved configuration"
        );

        let base_url = config.tracker.base_url.clone().unwrap_or_default();
        let store = TrackerClient::new(&base_url, config.tracker.token.clone(), config.timeout)?;
        let runner = N8nClient::new(
            &config.workflows.base_url,
            config.workflows.api_key.clone(),
            config.timeout,
        )?;
        let sequencer = StageSequencer::new(config.stages)?;

        let orchestrator = Orchestrator::new(&store, &runner, sequencer, config.retry);
        Ok(orchestrator.run(&ids))
    }
}

impl Command for RunCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        match self.run() {
            Ok(report) => {
                write_json(out, &report)?;
                if report.ok {
                    Ok(CommandResult::success())
                } else {
                    Ok(CommandResult::failure(EXIT_RUNTIME_FAILURE))
                }
            }
            Err(err) => {
                error!(error = %err, "run aborted before processing entities");
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
