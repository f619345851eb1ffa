use std::collections::HashSet;

use crate::id::EntityId;

/// The set of smokables currently lit.
///
/// Membership is the only signal that an entity needs per-firing work, so
/// the tick engine never scans unlit or burnt items. Order is irrelevant.
#[derive(Debug, Clone, Default)]
pub struct ActiveSmokables {
    entities: HashSet<EntityId>,
}

impl ActiveSmokables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the entity was not already present.
    pub fn insert(&mut self, entity: EntityId) -> bool {
        self.entities.insert(entity)
    }

    /// Returns `true` if the entity was present.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        self.entities.remove(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    /// Detached copy of the members, so a firing can mutate the set while
    /// walking it.
    pub fn snapshot(&self) -> Vec<EntityId> {
        self.entities.iter().copied().collect()
    }
}
