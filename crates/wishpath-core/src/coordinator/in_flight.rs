//! Per-entity in-flight tracking.
//!
//! At most one coordinator operation may target a given path, milestone or
//! plan at a time. Claiming returns an RAII guard that releases the entity
//! when dropped, including when the operation future is dropped mid-await.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::error::{CoordinatorError, Entity};

#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    ids: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlight {
    pub(crate) fn claim(&self, entity: Entity, id: Uuid) -> Result<InFlightGuard, CoordinatorError> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id) {
            return Err(CoordinatorError::Busy { entity, id });
        }
        Ok(InFlightGuard {
            ids: Arc::clone(&self.ids),
            id,
        })
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: Uuid) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

#[derive(Debug)]
pub(crate) struct InFlightGuard {
    ids: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
