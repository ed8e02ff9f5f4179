//! Configuration loading, layering, and validation for Stagehand.
//!
//! - Schema definitions and layering in [`schema`]
//! - YAML file loading in [`loader`]
//! - Validation in [`validator`]
//!
//! Values are layered lowest to highest: built-in defaults, the optional
//! YAML file, environment variables, then command-line flags.
//!
//! # Example
//!
//! ```
//! use stagehand::config::{validate, OrchestratorConfig};
//!
//! let mut config = OrchestratorConfig::default();
//! config.tracker.base_url = Some("https://tracker.example/api/v2".into());
//! for (i, name) in ["WF_A", "WF_B", "WF_C", "WF_D"].iter().enumerate() {
//!     config.set_stage_target(name, &format!("wf-{}", i));
//! }
//! validate(&config).unwrap();
//! ```

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{load_config_file, parse_config};
pub use schema::{
    backoff_from_secs, ConfigFile, OrchestratorConfig, RetryPolicy, StageConfig,
    TrackerSettings, WorkflowSettings, DEFAULT_STAGES,
};
pub use validator::validate;
