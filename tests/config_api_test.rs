//! Integration tests for config module public API.

use stagehand::config::{
    load_config_file, validate, ConfigFile, OrchestratorConfig, RetryPolicy, DEFAULT_STAGES,
};
use stagehand::StagehandError;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn public_api_is_accessible() {
    let _config = OrchestratorConfig::default();
    let _file = ConfigFile::default();
    let _policy = RetryPolicy::default();
    assert_eq!(DEFAULT_STAGES.len(), 4);
}

#[test]
fn full_config_workflow() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagehand.yml");
    fs::write(
        &path,
        r#"
base_url: https://tracker.example/api/v2
n8n_base_url: https://n8n.example
timeout_secs: 15
max_retries: 1
retry_backoff_seconds: 0.25
stages:
  - name: discover
    workflow_id: wf-discover
  - name: enrich
"#,
    )
    .unwrap();

    let mut config = OrchestratorConfig::default();
    config.apply_file(load_config_file(&path).unwrap()).unwrap();

    assert_eq!(config.stage_names(), vec!["discover", "enrich"]);
    assert_eq!(config.timeout, Duration::from_secs(15));
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.retry.backoff_base, Duration::from_millis(250));
    assert_eq!(config.workflows.base_url, "https://n8n.example");

    match validate(&config).unwrap_err() {
        StagehandError::MissingStageTargets { stages } => assert_eq!(stages, vec!["enrich"]),
        other => panic!("unexpected error: {other}"),
    }

    config.apply_stage_env(|key| (key == "N8N_ENRICH_ID").then(|| "wf-enrich".to_string()));
    validate(&config).unwrap();
}

#[test]
fn env_overrides_file_targets() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagehand.yml");
    fs::write(
        &path,
        "base_url: https://tracker.example\nstages:\n  - name: WF_A\n    workflow_id: from-file\n",
    )
    .unwrap();

    let mut config = OrchestratorConfig::default();
    config.apply_file(load_config_file(&path).unwrap()).unwrap();
    config.apply_stage_env(|key| (key == "N8N_WF_A_ID").then(|| "from-env".to_string()));
    assert_eq!(config.stages[0].workflow_id.as_deref(), Some("from-env"));

    assert!(config.set_stage_target("WF_A", "from-flag"));
    assert_eq!(config.stages[0].workflow_id.as_deref(), Some("from-flag"));
}

#[test]
fn negative_backoff_in_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagehand.yml");
    fs::write(&path, "retry_backoff_seconds: -1\n").unwrap();

    let mut config = OrchestratorConfig::default();
    let err = config
        .apply_file(load_config_file(&path).unwrap())
        .unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn empty_file_keeps_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagehand.yml");
    fs::write(&path, "\n").unwrap();

    let mut config = OrchestratorConfig::default();
    config.apply_file(load_config_file(&path).unwrap()).unwrap();
    assert_eq!(config, OrchestratorConfig::default());
}

#[test]
fn duplicate_stage_names_fail_validation() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagehand.yml");
    fs::write(
        &path,
        r#"
base_url: https://tracker.example
stages:
  - name: WF_A
    workflow_id: "1"
  - name: WF_A
    workflow_id: "2"
"#,
    )
    .unwrap();

    let mut config = OrchestratorConfig::default();
    config.apply_file(load_config_file(&path).unwrap()).unwrap();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("listed twice"));
}
