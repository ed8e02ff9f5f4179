//! In-process entity store.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::{Result, StagehandError};

use super::{Entity, EntityId, EntityStore};

/// Keeps entities in memory and counts writes.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    entities: RefCell<HashMap<EntityId, Entity>>,
    writes: Cell<usize>,
}

impl InMemoryEntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entity.
    pub fn insert(&self, entity: Entity) {
        self.entities.borrow_mut().insert(entity.id, entity);
    }

    /// Current copy of an entity.
    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.borrow().get(&id).cloned()
    }

    /// Change an entity's attributes as another system would.
    pub fn touch(&self, id: EntityId, updated: &str) {
        if let Some(entity) = self.entities.borrow_mut().get_mut(&id) {
            entity.updated = Some(updated.to_string());
        }
    }

    /// Number of description updates performed.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get_entity(&self, id: EntityId) -> Result<Entity> {
        self.get(id).ok_or_else(|| StagehandError::InvalidEntity {
            id,
            message: "not found".to_string(),
        })
    }

    fn update_description(&self, id: EntityId, description: &str) -> Result<()> {
        let mut entities = self.entities.borrow_mut();
        let entity = entities
            .get_mut(&id)
            .ok_or_else(|| StagehandError::InvalidEntity {
                id,
                message: "not found".to_string(),
            })?;
        entity.description = description.to_string();
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
