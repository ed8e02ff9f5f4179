//! Input change detection for entities.
//!
//! A fingerprint is a SHA-256 digest over a canonical encoding of the
//! entity attributes that decide whether the pipeline must run again:
//! its `name` and `updated` timestamp. Nothing else is hashed.
//!
//! The encoding is a JSON object with sorted keys and `", "` / `": "`
//! separators, non-ASCII kept as UTF-8. Hashes persisted by earlier
//! tooling use the same bytes, so they keep matching.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::entity::Entity;

/// Whether an entity changed since the state was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No run has been recorded yet.
    NeverRun,
    /// The fingerprint matches the stored one.
    Current,
    /// The fingerprint differs from the stored one.
    Changed { previous: String, current: String },
}

/// Compute the fingerprint of an entity.
pub fn fingerprint(entity: &Entity) -> String {
    let name = entity
        .name
        .as_ref()
        .map(|n| Value::String(n.clone()))
        .unwrap_or(Value::Null);
    let updated = Value::String(entity.updated.clone().unwrap_or_default());

    let canonical = canonical_json(&[("name", &name), ("updated", &updated)]);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..])
}

/// Compare a fingerprint with the one stored on the state.
pub fn detect_change(stored: Option<&str>, current: &str) -> ChangeStatus {
    match stored {
        None => ChangeStatus::NeverRun,
        Some(previous) if previous == current => ChangeStatus::Current,
        Some(previous) => ChangeStatus::Changed {
            previous: previous.to_string(),
            current: current.to_string(),
        },
    }
}

fn canonical_json(fields: &[(&str, &Value)]) -> String {
    let mut sorted: Vec<_> = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let body: Vec<String> = sorted
        .iter()
        .map(|(key, value)| format!("{}: {}", Value::String((*key).to_string()), value))
        .collect();
    format!("{{{}}}", body.join(", "))
}
