//! Configuration validation rules.
//!
//! This module validates configuration for correctness:
//! - At least one stage, with unique names
//! - Every stage resolves to a workflow id
//! - A usable timeout and tracking platform URL

use crate::config::schema::OrchestratorConfig;
use crate::error::{Result, StagehandError};
use std::collections::HashSet;
use std::time::Duration;

/// Validate a configuration, failing on the first class of problem found.
///
/// All stages missing a workflow id are reported together.
pub fn validate(config: &OrchestratorConfig) -> Result<()> {
    if config.stages.is_empty() {
        return Err(invalid("at least one stage is required"));
    }

    let mut seen = HashSet::new();
    for stage in &config.stages {
        if stage.name.trim().is_empty() {
            return Err(invalid("stage names must not be empty"));
        }
        if !seen.insert(stage.name.as_str()) {
            return Err(invalid(&format!("stage '{}' is listed twice", stage.name)));
        }
    }

    if config.timeout == Duration::ZERO {
        return Err(invalid("timeout must be greater than zero"));
    }

    let missing: Vec<String> = config
        .stages
        .iter()
        .filter(|s| s.workflow_id.as_deref().is_none_or(|id| id.trim().is_empty()))
        .map(|s| s.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(StagehandError::MissingStageTargets { stages: missing });
    }

    match config.tracker.base_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Ok(()),
        _ => Err(invalid("tracking platform base URL is required")),
    }
}

fn invalid(message: &str) -> StagehandError {
    StagehandError::ConfigValidationError {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StageConfig;

    fn valid_config() -> OrchestratorConfig {
        let mut config = OrchestratorConfig {
            stages: vec![StageConfig::new("WF_A", "1"), StageConfig::new("WF_B", "2")],
            ..Default::default()
        };
        config.tracker.base_url = Some("https://tracker.example/api/v2".into());
        config
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let mut config = valid_config();
        config.stages.clear();
        assert!(matches!(
            validate(&config),
            Err(StagehandError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn duplicate_stage_is_rejected() {
        let mut config = valid_config();
        config.stages.push(StageConfig::new("WF_A", "3"));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("WF_A"));
    }

    #[test]
    fn all_missing_targets_reported_together() {
        let mut config = valid_config();
        config.stages = vec![
            StageConfig::unresolved("WF_A"),
            StageConfig::new("WF_B", "2"),
            StageConfig::new("WF_C", " "),
        ];
        match validate(&config) {
            Err(StagehandError::MissingStageTargets { stages }) => {
                assert_eq!(stages, vec!["WF_A".to_string(), "WF_C".to_string()]);
            }
            other => panic!("expected MissingStageTargets, got {:?}", other),
        }
    }

    #[test]
    fn missing_base_url_is_rejected() {
        let mut config = valid_config();
        config.tracker.base_url = None;
        assert!(validate(&config).unwrap_err().is_config_error());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = valid_config();
        config.timeout = Duration::ZERO;
        assert!(validate(&config).is_err());
    }
}
