//! Entities the pipeline runs against and where they are stored.
//!
//! An [`Entity`] is owned by the tracking platform. The orchestrator reads
//! it, and writes back only its free-text `description`, which is where the
//! pipeline state lives.
//!
//! - [`tracker`] talks to the tracking platform over HTTP
//! - [`memory`] keeps entities in process, for tests and dry runs

pub mod memory;
pub mod tracker;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StagehandError};

pub use memory::InMemoryEntityStore;
pub use tracker::TrackerClient;

/// Identifier of an entity on the tracking platform.
pub type EntityId = u64;

/// The attributes of an entity the orchestrator cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: Option<String>,
    pub updated: Option<String>,
    pub description: String,
}

impl Entity {
    /// Create an entity with an empty description.
    pub fn new(id: EntityId, name: impl Into<String>, updated: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            updated: Some(updated.into()),
            description: String::new(),
        }
    }

    /// Replace the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Build an entity from the platform's JSON representation.
    ///
    /// `updated` falls back to `updated_at`; a null description is empty.
    pub fn from_json(id: EntityId, value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| StagehandError::InvalidEntity {
            id,
            message: "expected a JSON object".to_string(),
        })?;

        let text = |key: &str| match obj.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            id,
            name: text("name"),
            updated: text("updated")
                .filter(|s| !s.is_empty())
                .or_else(|| text("updated_at")),
            description: text("description").unwrap_or_default(),
        })
    }
}

/// Read and update access to entities.
///
/// Implementations perform blocking I/O; every call is bounded by the
/// implementation's own timeout.
pub trait EntityStore {
    /// Fetch an entity.
    fn get_entity(&self, id: EntityId) -> Result<Entity>;

    /// Replace an entity's description.
    fn update_description(&self, id: EntityId, description: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_reads_fields() {
        let entity = Entity::from_json(
            4,
            &json!({
                "id": 4,
                "name": "Acme Corp",
                "updated": "2024-05-01T10:00:00Z",
                "description": "owner: sec-team"
            }),
        )
        .unwrap();
        assert_eq!(entity.name.as_deref(), Some("Acme Corp"));
        assert_eq!(entity.updated.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(entity.description, "owner: sec-team");
    }

    #[test]
    fn from_json_falls_back_to_updated_at() {
        let entity = Entity::from_json(
            1,
            &json!({"name": "x", "updated_at": "2024-01-01", "description": null}),
        )
        .unwrap();
        assert_eq!(entity.updated.as_deref(), Some("2024-01-01"));
        assert_eq!(entity.description, "");
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let err = Entity::from_json(9, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, StagehandError::InvalidEntity { id: 9, .. }));
    }
}
