//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. Every command writes exactly one
//! JSON document to its output, including when it fails.

pub mod common;
pub mod dispatcher;
pub mod run;
pub mod status;

pub use dispatcher::{
    Command, CommandDispatcher, CommandResult, EXIT_CONFIG_ERROR, EXIT_RUNTIME_FAILURE,
};
pub use run::RunCommand;
pub use status::{StatusCommand, StatusReport};
