//! Stage execution orchestration.
//!
//! - [`executor`] invokes one stage with bounded retries
//! - [`n8n`] runs stages on the workflow server
//! - [`orchestrator`] walks entities through the pipeline
//! - [`report`] is the JSON report of a run
//!
//! Entities are processed sequentially. A worker pool would give each
//! entity its own task sharing one classifier and executor; state writes
//! are already per entity.

pub mod executor;
pub mod n8n;
pub mod orchestrator;
pub mod report;

pub use executor::{ExecutionOutcome, StageRunner, WorkflowExecutor};
pub use n8n::N8nClient;
pub use orchestrator::Orchestrator;
pub use report::{BatchMetrics, BatchReport, EntityReport, RawSummary, StepReport, MASTER_STAGE};
