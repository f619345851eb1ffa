//! In-memory reservoir storage for hosts without their own.

use std::collections::HashMap;

use crate::fixed::Fixed64;
use crate::host::SolutionContainers;
use crate::id::EntityId;
use crate::solution::Solution;

/// Named reservoirs keyed by `(entity, name)`.
#[derive(Debug, Clone, Default)]
pub struct SolutionStore {
    reservoirs: HashMap<(EntityId, String), Solution>,
}

impl SolutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: EntityId, name: &str) -> Option<&Solution> {
        self.reservoirs.get(&(entity, name.to_string()))
    }

    pub fn get_mut(&mut self, entity: EntityId, name: &str) -> Option<&mut Solution> {
        self.reservoirs.get_mut(&(entity, name.to_string()))
    }

    pub fn insert(&mut self, entity: EntityId, name: &str, solution: Solution) -> Option<Solution> {
        self.reservoirs.insert((entity, name.to_string()), solution)
    }

    pub fn remove(&mut self, entity: EntityId, name: &str) -> Option<Solution> {
        self.reservoirs.remove(&(entity, name.to_string()))
    }

    /// Drop every reservoir the entity owns. Returns how many were removed.
    pub fn remove_entity(&mut self, entity: EntityId) -> usize {
        let before = self.reservoirs.len();
        self.reservoirs.retain(|(owner, _), _| *owner != entity);
        before - self.reservoirs.len()
    }

    pub fn len(&self) -> usize {
        self.reservoirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservoirs.is_empty()
    }
}

impl SolutionContainers for SolutionStore {
    fn solution(&self, entity: EntityId, name: &str) -> Option<&Solution> {
        self.get(entity, name)
    }

    fn split_solution(
        &mut self,
        entity: EntityId,
        name: &str,
        amount: Fixed64,
    ) -> Option<Solution> {
        self.get_mut(entity, name).map(|solution| solution.split(amount))
    }

    fn insert_solution(&mut self, entity: EntityId, name: &str, solution: Solution) {
        self.insert(entity, name, solution);
    }
}
