//! Stagehand - a staged workflow pipeline orchestrator.
//!
//! Stagehand walks entities of a tracking platform through an ordered list
//! of workflow stages. Progress is kept as one marker line in each entity's
//! description, so a run can be repeated at any time: completed entities are
//! skipped, interrupted ones resume where they stopped, and entities whose
//! inputs changed start over.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, layering, and validation
//! - [`entity`] - Entities and the stores they live in
//! - [`error`] - Error types and result aliases
//! - [`runner`] - Stage execution, retries, and the orchestrator loop
//! - [`state`] - Persisted pipeline state and change detection
//! - [`steps`] - Step results, failure classification, and stage order
//!
//! # Example
//!
//! ```
//! use stagehand::state::{decode, encode, PipelineState};
//!
//! let state = PipelineState {
//!     current_stage: Some("WF_B".into()),
//!     ..Default::default()
//! };
//! let description = encode("Owner: sec-team", &state).unwrap();
//!
//! assert!(description.starts_with("Owner: sec-team\n"));
//! assert_eq!(decode(&description).state, state);
//! ```

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
mod http;
pub mod runner;
pub mod state;
pub mod steps;

pub use error::{Result, StagehandError};
