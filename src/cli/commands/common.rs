//! Helpers shared by the commands.

use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::cli::args::TrackerArgs;
use crate::config::{load_config_file, OrchestratorConfig};
use crate::entity::EntityId;
use crate::error::{Result, StagehandError};

/// Parse the `--entity-ids` values. Blank entries are ignored.
pub(crate) fn parse_entity_ids(raw: &[String]) -> Result<Vec<EntityId>> {
    let ids = raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<EntityId>()
                .map_err(|_| StagehandError::ConfigValidationError {
                    message: format!("invalid entity id '{}'", s),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    if ids.is_empty() {
        return Err(StagehandError::ConfigValidationError {
            message: "no entity ids given (use --entity-ids)".to_string(),
        });
    }
    Ok(ids)
}

/// Defaults, then the config file, then tracker flags and their env vars.
pub(crate) fn layered_config(args: &TrackerArgs) -> Result<OrchestratorConfig> {
    let mut config = OrchestratorConfig::default();
    if let Some(path) = &args.config {
        config.apply_file(load_config_file(path)?)?;
    }
    if let Some(url) = &args.base_url {
        config.tracker.base_url = Some(url.clone());
    }
    if let Some(token) = &args.token {
        config.tracker.token = Some(token.clone()).filter(|t| !t.is_empty());
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

/// Write `value` as one line of JSON.
pub(crate) fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).map_err(|e| StagehandError::Io(e.into()))?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_ids_and_skips_blanks() {
        let ids = parse_entity_ids(&strings(&["1", " 2", "", "30"])).unwrap();
        assert_eq!(ids, vec![1, 2, 30]);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = parse_entity_ids(&strings(&["1", "abc"])).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn rejects_empty_id_list() {
        assert!(parse_entity_ids(&[]).unwrap_err().is_config_error());
    }

    #[test]
    fn flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stagehand.yml");
        fs::write(
            &path,
            "base_url: https://file.example/api/v2\ntimeout_secs: 30\nmax_retries: 4\n",
        )
        .unwrap();

        let args = TrackerArgs {
            config: Some(path),
            base_url: Some("https://flag.example/api/v2".into()),
            ..Default::default()
        };
        let config = layered_config(&args).unwrap();
        assert_eq!(
            config.tracker.base_url.as_deref(),
            Some("https://flag.example/api/v2")
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 4);
    }

    #[test]
    fn write_json_emits_one_line() {
        let mut out = Vec::new();
        write_json(&mut out, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"ok\":true}\n");
    }
}
