//! Pipeline state: what is persisted, how, and when it is stale.
//!
//! - [`pipeline`] defines [`PipelineState`] and its transitions
//! - [`codec`] embeds the state as one line of free text
//! - [`fingerprint`] detects changes to the entity's inputs
//! - [`persist`] writes state back with a concurrent-writer check

pub mod codec;
pub mod fingerprint;
pub mod persist;
pub mod pipeline;

pub use codec::{decode, encode, DecodedState, STATE_MARKER};
pub use fingerprint::{detect_change, fingerprint, ChangeStatus};
pub use persist::StateWriter;
pub use pipeline::{LastError, PipelineState, PipelineStatus};
