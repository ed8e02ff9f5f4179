//! Writing pipeline state back to its entity.
//!
//! The tracking platform has no conditional update, so a write re-reads the
//! entity first and compares its current state line with the line this run
//! last saw or wrote. A mismatch means another writer got there first and
//! the write is refused with [`StagehandError::StateConflict`]. Lines that
//! are not state lines may change freely between reads.

use tracing::{debug, warn};

use crate::entity::{EntityId, EntityStore};
use crate::error::{Result, StagehandError};

use super::codec::{encode_line, find_state_line, splice};
use super::PipelineState;

/// Tracks the state line of one entity across the writes of a run.
pub struct StateWriter<'a> {
    store: &'a dyn EntityStore,
    id: EntityId,
    expected_line: Option<String>,
    writes: usize,
}

impl<'a> StateWriter<'a> {
    /// Start tracking an entity whose description held `observed_line`.
    pub fn new(store: &'a dyn EntityStore, id: EntityId, observed_line: Option<String>) -> Self {
        Self {
            store,
            id,
            expected_line: observed_line,
            writes: 0,
        }
    }

    /// Persist `state`, preserving the rest of the description.
    pub fn write(&mut self, state: &PipelineState) -> Result<()> {
        let entity = self.store.get_entity(self.id)?;
        let current_line = find_state_line(&entity.description);

        if current_line != self.expected_line.as_deref() {
            warn!(entity_id = self.id, "pipeline state changed underneath this run");
            return Err(StagehandError::StateConflict { id: self.id });
        }

        let line = encode_line(state)?;
        let description = splice(&entity.description, &line);
        self.store.update_description(self.id, &description)?;

        self.writes += 1;
        debug!(
            entity_id = self.id,
            status = %state.pipeline_status,
            writes = self.writes,
            "pipeline state persisted"
        );
        self.expected_line = Some(line);
        Ok(())
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}
