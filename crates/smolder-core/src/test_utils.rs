//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. [`TestWorld`]
//! is an in-memory host that implements every collaborator trait and
//! records the calls the engine makes so tests can assert on them.

use std::collections::{HashMap, HashSet};

use slotmap::{SecondaryMap, SlotMap};

use crate::fixed::{Fixed64, Volume};
use crate::host::{
    Appearance, Atmosphere, Bloodstream, Containers, Entities, HeatSources, Inventory,
    MapCoordinates, ReactionMethod, Reactions, SolutionContainers, TilePos, Transforms,
};
use crate::id::{EntityId, GridId};
use crate::profile::{ProfileRegistry, ProfileRegistryBuilder, SmokableProfile};
use crate::smokable::{DEFAULT_SOLUTION, Smokable, SmokableState};
use crate::solution::Solution;
use crate::store::SolutionStore;
use crate::system::SmokingSystem;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Recorded calls
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotCall {
    pub grid: GridId,
    pub tile: TilePos,
    pub temperature: Fixed64,
    pub volume: Fixed64,
    pub sustained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropCall {
    pub wearer: EntityId,
    pub entity: EntityId,
    pub at: MapCoordinates,
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppearanceRecord {
    pub visual: Option<SmokableState>,
    pub equipped_prefix: Option<String>,
    pub held_prefix: Option<String>,
    pub calls: usize,
}

// ===========================================================================
// TestWorld
// ===========================================================================

#[derive(Debug, Default)]
pub struct TestWorld {
    entities: SlotMap<EntityId, ()>,
    reservoirs: SolutionStore,
    grid_tiles: SecondaryMap<EntityId, (GridId, TilePos)>,
    coordinates: SecondaryMap<EntityId, MapCoordinates>,
    /// Item -> owner of the container holding it.
    container_owners: SecondaryMap<EntityId, EntityId>,
    /// (wearer, slot) -> item.
    slots: HashMap<(EntityId, String), EntityId>,
    bloodstreams: SecondaryMap<EntityId, Solution>,
    appearance: SecondaryMap<EntityId, AppearanceRecord>,
    heat_sources: HashSet<EntityId>,
    pub hotspots: Vec<HotspotCall>,
    pub drops: Vec<DropCall>,
    pub reactions: Vec<(EntityId, ReactionMethod, Solution)>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an entity with appearance support.
    pub fn spawn(&mut self) -> EntityId {
        let entity = self.entities.insert(());
        self.appearance.insert(entity, AppearanceRecord::default());
        entity
    }

    /// Delete the entity without notifying anyone.
    pub fn despawn(&mut self, entity: EntityId) {
        self.entities.remove(entity);
    }

    pub fn strip_appearance(&mut self, entity: EntityId) {
        self.appearance.remove(entity);
    }

    pub fn place_on_grid(&mut self, entity: EntityId, grid: GridId, tile: TilePos) {
        self.grid_tiles.insert(entity, (grid, tile));
    }

    pub fn set_coordinates(&mut self, entity: EntityId, at: MapCoordinates) {
        self.coordinates.insert(entity, at);
    }

    /// Put `item` in the wearer's slot and the wearer's container.
    pub fn equip(&mut self, wearer: EntityId, slot: &str, item: EntityId) {
        self.slots.insert((wearer, slot.to_string()), item);
        self.container_owners.insert(item, wearer);
    }

    /// Put `item` in the wearer's container without equipping it (e.g. a pocket).
    pub fn stow(&mut self, wearer: EntityId, item: EntityId) {
        self.container_owners.insert(item, wearer);
    }

    pub fn give_bloodstream(&mut self, entity: EntityId) {
        self.bloodstreams.insert(entity, Solution::new());
    }

    pub fn bloodstream(&self, entity: EntityId) -> Option<&Solution> {
        self.bloodstreams.get(entity)
    }

    pub fn set_heat_source(&mut self, entity: EntityId, hot: bool) {
        if hot {
            self.heat_sources.insert(entity);
        } else {
            self.heat_sources.remove(&entity);
        }
    }

    /// Volume of the default reservoir; zero if it does not exist.
    pub fn reservoir_volume(&self, entity: EntityId) -> Volume {
        self.solution(entity, DEFAULT_SOLUTION)
            .map(|s| s.total_volume())
            .unwrap_or(Volume::ZERO)
    }

    /// Fill the default reservoir with `volume` of nicotine.
    pub fn insert_reservoir(&mut self, entity: EntityId, volume: f64) {
        self.insert_solution(
            entity,
            DEFAULT_SOLUTION,
            Solution::new().with_reagent("nicotine", fixed(volume)),
        );
    }

    pub fn remove_reservoir(&mut self, entity: EntityId) {
        self.reservoirs.remove(entity, DEFAULT_SOLUTION);
    }

    pub fn item_in_slot(&self, wearer: EntityId, slot: &str) -> Option<EntityId> {
        self.slots.get(&(wearer, slot.to_string())).copied()
    }

    pub fn visual_state(&self, entity: EntityId) -> Option<SmokableState> {
        self.appearance.get(entity).and_then(|a| a.visual)
    }

    pub fn equipped_prefix(&self, entity: EntityId) -> Option<&str> {
        self.appearance
            .get(entity)
            .and_then(|a| a.equipped_prefix.as_deref())
    }

    pub fn held_prefix(&self, entity: EntityId) -> Option<&str> {
        self.appearance
            .get(entity)
            .and_then(|a| a.held_prefix.as_deref())
    }

    /// Forget recorded hotspot, drop, and reaction calls.
    pub fn clear_logs(&mut self) {
        self.hotspots.clear();
        self.drops.clear();
        self.reactions.clear();
    }

    /// Number of visual-state updates applied to the entity.
    pub fn appearance_calls(&self, entity: EntityId) -> usize {
        self.appearance.get(entity).map(|a| a.calls).unwrap_or(0)
    }
}

impl Entities for TestWorld {
    fn exists(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }
}

impl SolutionContainers for TestWorld {
    fn solution(&self, entity: EntityId, name: &str) -> Option<&Solution> {
        self.reservoirs.solution(entity, name)
    }

    fn split_solution(
        &mut self,
        entity: EntityId,
        name: &str,
        amount: Fixed64,
    ) -> Option<Solution> {
        self.reservoirs.split_solution(entity, name, amount)
    }

    fn insert_solution(&mut self, entity: EntityId, name: &str, solution: Solution) {
        self.reservoirs.insert_solution(entity, name, solution);
    }
}

impl Atmosphere for TestWorld {
    fn hotspot_expose(
        &mut self,
        grid: GridId,
        tile: TilePos,
        temperature: Fixed64,
        volume: Fixed64,
        sustained: bool,
    ) {
        self.hotspots.push(HotspotCall {
            grid,
            tile,
            temperature,
            volume,
            sustained,
        });
    }
}

impl Transforms for TestWorld {
    fn grid_tile(&self, entity: EntityId) -> Option<(GridId, TilePos)> {
        self.grid_tiles.get(entity).copied()
    }

    fn coordinates(&self, entity: EntityId) -> Option<MapCoordinates> {
        self.coordinates.get(entity).copied()
    }
}

impl Containers for TestWorld {
    fn container_owner(&self, entity: EntityId) -> Option<EntityId> {
        self.container_owners.get(entity).copied()
    }
}

impl Inventory for TestWorld {
    fn is_in_slot(&self, wearer: EntityId, entity: EntityId, slot: &str) -> bool {
        self.item_in_slot(wearer, slot) == Some(entity)
    }

    fn try_unequip(&mut self, wearer: EntityId, slot: &str) -> bool {
        match self.slots.remove(&(wearer, slot.to_string())) {
            Some(item) => {
                self.container_owners.remove(item);
                true
            }
            None => false,
        }
    }

    fn drop_at(&mut self, wearer: EntityId, entity: EntityId, at: MapCoordinates, force: bool) {
        self.coordinates.insert(entity, at);
        self.drops.push(DropCall {
            wearer,
            entity,
            at,
            force,
        });
    }
}

impl Bloodstream for TestWorld {
    fn has_bloodstream(&self, entity: EntityId) -> bool {
        self.bloodstreams.contains_key(entity)
    }

    fn try_add_chemicals(&mut self, entity: EntityId, solution: &Solution) -> bool {
        match self.bloodstreams.get_mut(entity) {
            Some(blood) => {
                blood.merge(solution.clone());
                true
            }
            None => false,
        }
    }
}

impl Reactions for TestWorld {
    fn react(&mut self, entity: EntityId, method: ReactionMethod, solution: &Solution) {
        self.reactions.push((entity, method, solution.clone()));
    }
}

impl Appearance for TestWorld {
    fn set_visual_state(&mut self, entity: EntityId, state: SmokableState) -> bool {
        match self.appearance.get_mut(entity) {
            Some(record) => {
                record.visual = Some(state);
                record.calls += 1;
                true
            }
            None => false,
        }
    }

    fn set_equipped_prefix(&mut self, entity: EntityId, prefix: Option<&str>) -> bool {
        match self.appearance.get_mut(entity) {
            Some(record) => {
                record.equipped_prefix = prefix.map(str::to_string);
                true
            }
            None => false,
        }
    }

    fn set_held_prefix(&mut self, entity: EntityId, prefix: Option<&str>) -> bool {
        match self.appearance.get_mut(entity) {
            Some(record) => {
                record.held_prefix = prefix.map(str::to_string);
                true
            }
            None => false,
        }
    }
}

impl HeatSources for TestWorld {
    fn is_hot(&self, entity: EntityId) -> bool {
        self.heat_sources.contains(&entity)
    }
}

// ===========================================================================
// Scenario builders
// ===========================================================================

/// Spawn an unlit cigar whose default reservoir holds `volume` of nicotine.
pub fn spawn_cigar(
    world: &mut TestWorld,
    system: &mut SmokingSystem,
    volume: f64,
    inhale_rate: f64,
) -> EntityId {
    let cigar = world.spawn();
    world.insert_reservoir(cigar, volume);
    system.add_smokable(cigar, Smokable::new(fixed(inhale_rate)));
    cigar
}

/// Spawn a wearer with a bloodstream and coordinates, and a cigar equipped
/// in their mask slot. Returns `(wearer, cigar)`.
pub fn spawn_worn_cigar(
    world: &mut TestWorld,
    system: &mut SmokingSystem,
    volume: f64,
    inhale_rate: f64,
) -> (EntityId, EntityId) {
    let wearer = world.spawn();
    world.give_bloodstream(wearer);
    world.set_coordinates(wearer, MapCoordinates::new(fixed(4.5), fixed(-2.0)));
    let cigar = spawn_cigar(world, system, volume, inhale_rate);
    let mask = system.config().mask_slot.clone();
    world.equip(wearer, &mask, cigar);
    (wearer, cigar)
}

/// Profiles used across tests: a 30u cigar and a 15u cigarette.
pub fn test_profiles() -> ProfileRegistry {
    let mut builder = ProfileRegistryBuilder::new();
    builder.register(
        SmokableProfile::new("cigar", fixed(2.0))
            .with_content("nicotine", fixed(20.0))
            .with_content("tar", fixed(10.0)),
    );
    builder.register(
        SmokableProfile::new("cigarette", fixed(1.0))
            .with_content("nicotine", fixed(15.0))
            .with_exposure(fixed(700.0), fixed(5.0)),
    );
    match builder.build() {
        Ok(registry) => registry,
        Err(err) => panic!("test profiles are invalid: {err}"),
    }
}

// ===========================================================================
// Assertions
// ===========================================================================

/// Every lit smokable is active and every active entity is a lit smokable.
pub fn assert_active_invariant(system: &SmokingSystem) {
    for (entity, smokable) in system.iter() {
        assert_eq!(
            smokable.state() == SmokableState::Lit,
            system.active().contains(entity),
            "state/active mismatch for {entity:?}: {:?}",
            smokable.state()
        );
    }
    for entity in system.active().iter() {
        assert_eq!(
            system.state(entity),
            Some(SmokableState::Lit),
            "active entity {entity:?} is not a lit smokable"
        );
    }
}
