//! Configuration file loading.

use crate::config::schema::ConfigFile;
use crate::error::{Result, StagehandError};
use std::fs;
use std::path::Path;

/// Load and parse a single YAML config file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StagehandError::ConfigValidationError {
                message: format!("config file not found: {}", path.display()),
            }
        } else {
            StagehandError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into a [`ConfigFile`].
///
/// # Arguments
///
/// * `content` - The YAML content to parse
/// * `source_path` - Path for error reporting
pub fn parse_config(content: &str, source_path: &Path) -> Result<ConfigFile> {
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(content).map_err(|e| StagehandError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_file_parses_stages() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("stagehand.yml");
        fs::write(
            &config_path,
            r#"
stages:
  - name: discover
    workflow_id: abc123
  - name: sync
max_retries: 3
retry_backoff_seconds: 0.5
"#,
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.stages[0].workflow_id.as_deref(), Some("abc123"));
        assert_eq!(config.stages[1].workflow_id, None);
        assert_eq!(config.max_retries, Some(3));
        assert_eq!(config.retry_backoff_seconds, Some(0.5));
    }

    #[test]
    fn load_config_file_missing_is_config_error() {
        let result = load_config_file(Path::new("/nonexistent/stagehand.yml"));
        let err = result.unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("/nonexistent/stagehand.yml"));
    }

    #[test]
    fn parse_config_returns_parse_error_for_invalid_yaml() {
        let result = parse_config("stages: [", Path::new("test.yml"));
        assert!(matches!(result, Err(StagehandError::ConfigParseError { .. })));
    }

    #[test]
    fn parse_config_handles_empty_content() {
        let config = parse_config("", Path::new("empty.yml")).unwrap();
        assert!(config.stages.is_empty());
        assert!(config.timeout_secs.is_none());
    }
}
