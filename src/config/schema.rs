//! Configuration schema definitions for Stagehand.
//!
//! [`ConfigFile`] maps to the optional YAML file. [`OrchestratorConfig`] is
//! the fully layered result the orchestrator runs with.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, StagehandError};

/// Stage names used when none are configured.
pub const DEFAULT_STAGES: [&str; 4] = ["WF_A", "WF_B", "WF_C", "WF_D"];

/// Default per-call network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Default workflow server URL.
pub const DEFAULT_WORKFLOW_URL: &str = "http://localhost:5678";

/// Root structure of `stagehand.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Ordered stage definitions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageConfig>,

    /// Per-call timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Retries after the first attempt of a stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Backoff base in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff_seconds: Option<f64>,

    /// Tracking platform base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Workflow server base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n8n_base_url: Option<String>,
}

/// One named stage and the workflow it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage name, as persisted in `current_stage`
    pub name: String,

    /// Workflow identifier on the workflow server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

impl StageConfig {
    /// Create a stage with a resolved workflow id.
    pub fn new(name: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workflow_id: Some(workflow_id.into()),
        }
    }

    /// Create a stage whose workflow id is not known yet.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workflow_id: None,
        }
    }

    /// Environment variable consulted for this stage's workflow id.
    ///
    /// `WF_A` becomes `N8N_WF_A_ID`.
    pub fn env_key(&self) -> String {
        let normalized: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("N8N_{}_ID", normalized)
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every further retry.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Delay before retrying after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_BASE)
    }
}

/// Convert a backoff given in (fractional) seconds.
pub fn backoff_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| StagehandError::ConfigValidationError {
        message: format!(
            "retry backoff must be a finite, non-negative number of seconds, got {}",
            secs
        ),
    })
}

/// Connection settings for the tracking platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Connection settings for the workflow server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WORKFLOW_URL.to_string(),
            api_key: None,
        }
    }
}

/// Fully resolved orchestrator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Ordered stages
    pub stages: Vec<StageConfig>,

    /// Per-call network timeout
    pub timeout: Duration,

    /// Retry behaviour of the workflow executor
    pub retry: RetryPolicy,

    /// Tracking platform connection
    pub tracker: TrackerSettings,

    /// Workflow server connection
    pub workflows: WorkflowSettings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stages: DEFAULT_STAGES
                .iter()
                .map(|name| StageConfig::unresolved(*name))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            tracker: TrackerSettings::default(),
            workflows: WorkflowSettings::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Stage names in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Apply values from a parsed config file.
    pub fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if !file.stages.is_empty() {
            self.stages = file.stages;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = file.max_retries {
            self.retry.max_retries = retries;
        }
        if let Some(secs) = file.retry_backoff_seconds {
            self.retry.backoff_base = backoff_from_secs(secs)?;
        }
        if file.base_url.is_some() {
            self.tracker.base_url = file.base_url;
        }
        if let Some(url) = file.n8n_base_url {
            self.workflows.base_url = url;
        }
        Ok(())
    }

    /// Replace the stage list by `names`, keeping known workflow ids.
    pub fn select_stages(&mut self, names: &[String]) {
        self.stages = names
            .iter()
            .map(|name| {
                self.stages
                    .iter()
                    .find(|s| &s.name == name)
                    .cloned()
                    .unwrap_or_else(|| StageConfig::unresolved(name.as_str()))
            })
            .collect();
    }

    /// Take workflow ids from `N8N_<STAGE>_ID` variables where set.
    pub fn apply_stage_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for stage in &mut self.stages {
            if let Some(id) = lookup(&stage.env_key()).filter(|v| !v.trim().is_empty()) {
                stage.workflow_id = Some(id);
            }
        }
    }

    /// Set a workflow id for a stage, adding nothing if the stage is unknown.
    ///
    /// Returns `false` when no stage has that name.
    pub fn set_stage_target(&mut self, name: &str, workflow_id: &str) -> bool {
        match self.stages.iter_mut().find(|s| s.name == name) {
            Some(stage) => {
                stage.workflow_id = Some(workflow_id.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_four_unresolved_stages() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.stage_names(), vec!["WF_A", "WF_B", "WF_C", "WF_D"]);
        assert!(config.stages.iter().all(|s| s.workflow_id.is_none()));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.delay_for(64), Duration::from_secs(u32::MAX as u64));
    }

    #[test]
    fn env_key_normalizes_stage_name() {
        assert_eq!(StageConfig::unresolved("WF_A").env_key(), "N8N_WF_A_ID");
        assert_eq!(StageConfig::unresolved("scan-speed").env_key(), "N8N_SCAN_SPEED_ID");
    }

    #[test]
    fn stage_env_overrides_file_targets() {
        let mut config = OrchestratorConfig::default();
        config.set_stage_target("WF_A", "from-file");
        config.set_stage_target("WF_C", "kept");
        config.apply_stage_env(|key| match key {
            "N8N_WF_A_ID" => Some("from-env-a".to_string()),
            "N8N_WF_B_ID" => Some("from-env-b".to_string()),
            "N8N_WF_C_ID" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.stages[0].workflow_id.as_deref(), Some("from-env-a"));
        assert_eq!(config.stages[1].workflow_id.as_deref(), Some("from-env-b"));
        assert_eq!(config.stages[2].workflow_id.as_deref(), Some("kept"));
        assert_eq!(config.stages[3].workflow_id, None);
    }

    #[test]
    fn apply_file_overrides_defaults() {
        let mut config = OrchestratorConfig::default();
        config.apply_file(ConfigFile {
            stages: vec![StageConfig::new("discover", "wf-1")],
            timeout_secs: Some(5),
            max_retries: Some(4),
            retry_backoff_seconds: Some(0.25),
            base_url: Some("https://tracker.example/api/v2".into()),
            n8n_base_url: None,
        })
        .unwrap();
        assert_eq!(config.stage_names(), vec!["discover"]);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry, RetryPolicy::new(4, Duration::from_millis(250)));
        assert_eq!(
            config.tracker.base_url.as_deref(),
            Some("https://tracker.example/api/v2")
        );
        assert_eq!(config.workflows.base_url, DEFAULT_WORKFLOW_URL);
    }

    #[test]
    fn negative_backoff_is_rejected() {
        let mut config = OrchestratorConfig::default();
        let result = config.apply_file(ConfigFile {
            retry_backoff_seconds: Some(-1.0),
            ..Default::default()
        });
        assert!(matches!(result, Err(StagehandError::ConfigValidationError { .. })));
        assert!(backoff_from_secs(f64::NAN).is_err());
    }

    #[test]
    fn select_stages_keeps_known_targets() {
        let mut config = OrchestratorConfig::default();
        config.set_stage_target("WF_B", "wf-b");
        config.select_stages(&["WF_B".to_string(), "extra".to_string()]);
        assert_eq!(config.stage_names(), vec!["WF_B", "extra"]);
        assert_eq!(config.stages[0].workflow_id.as_deref(), Some("wf-b"));
        assert_eq!(config.stages[1].workflow_id, None);
    }

    #[test]
    fn set_stage_target_reports_unknown_stage() {
        let mut config = OrchestratorConfig::default();
        assert!(!config.set_stage_target("WF_Z", "x"));
    }
}
