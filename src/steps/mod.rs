//! Stage results and the decisions made from them.
//!
//! This module provides the pure, I/O-free parts of stage handling:
//!
//! - [`StepResult`] - The canonical outcome of one stage invocation
//! - [`normalize`] - Read a [`StepResult`] out of a raw workflow response
//! - [`RetryClassifier`] - Decide whether a failure is worth retrying
//! - [`StageSequencer`] - Walk the ordered list of stages
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use stagehand::steps::{normalize, RetryClassifier, Verdict};
//!
//! let raw = json!({"data": [{"json": {"ok": false, "status": "timeout"}}]});
//! let result = normalize(&raw, "WF_A", 7);
//!
//! assert!(!result.is_success());
//! assert_eq!(
//!     RetryClassifier::default().classify_result(&result),
//!     Verdict::Transient
//! );
//! ```

pub mod classify;
pub mod normalize;
pub mod result;
pub mod sequencer;

pub use classify::{ErrorRule, RetryClassifier, Verdict, DEFAULT_RULES};
pub use normalize::{detect_shape, normalize, Envelope, ResponseShape};
pub use result::{StepResult, Timestamps, INVALID_RESPONSE_CODE, SUCCESS_STATUSES};
pub use sequencer::{StageSequencer, Transition};
