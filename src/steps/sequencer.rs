//! Ordering of pipeline stages.

use std::collections::HashSet;

use crate::config::StageConfig;
use crate::error::{Result, StagehandError};
use crate::state::PipelineState;

/// Where the pipeline goes after a stage succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Run this stage next.
    Next(String),
    /// The final stage completed.
    Complete,
}

/// The ordered stage list of a pipeline.
#[derive(Debug, Clone)]
pub struct StageSequencer {
    stages: Vec<StageConfig>,
}

impl StageSequencer {
    /// Create a sequencer. The list must be non-empty with unique names.
    pub fn new(stages: Vec<StageConfig>) -> Result<Self> {
        if stages.is_empty() {
            return Err(StagehandError::ConfigValidationError {
                message: "at least one stage must be configured".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(StagehandError::ConfigValidationError {
                    message: format!("stage '{}' is listed more than once", stage.name),
                });
            }
        }
        Ok(Self { stages })
    }

    pub fn first(&self) -> &str {
        &self.stages[0].name
    }

    pub fn final_stage(&self) -> &str {
        &self.stages[self.stages.len() - 1].name
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.position(stage).is_some()
    }

    /// Stage names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// The stage to run next for `state`.
    ///
    /// A missing or unknown `current_stage` starts from the first stage.
    pub fn current(&self, state: &PipelineState) -> &str {
        state
            .current_stage
            .as_deref()
            .and_then(|name| self.position(name))
            .map(|idx| self.stages[idx].name.as_str())
            .unwrap_or_else(|| self.first())
    }

    /// Workflow id a stage runs.
    pub fn target(&self, stage: &str) -> Result<&str> {
        self.position(stage)
            .and_then(|idx| self.stages[idx].workflow_id.as_deref())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| StagehandError::MissingStageTarget {
                stage: stage.to_string(),
            })
    }

    /// The transition after `completed` succeeds.
    pub fn advance(&self, completed: &str) -> Transition {
        match self.position(completed) {
            Some(idx) if idx + 1 < self.stages.len() => {
                Transition::Next(self.stages[idx + 1].name.clone())
            }
            _ => Transition::Complete,
        }
    }

    fn position(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == stage)
    }
}
