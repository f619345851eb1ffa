//! Collaborator traits implemented by the host world.
//!
//! The combustion core owns only its components and the active set. Heat,
//! reservoirs, positions, containers, equipment, and bodies live elsewhere;
//! the engine reaches them through these traits, bundled as [`SmokingHost`].
//! Capabilities an entity may lack are modelled as `Option` or `bool`
//! returns so each step can skip cleanly.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::id::{EntityId, GridId};
use crate::smokable::SmokableState;
use crate::solution::Solution;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Tile position relative to a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Continuous world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCoordinates {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl MapCoordinates {
    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }
}

/// How a solution enters a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionMethod {
    Touch,
    Ingestion,
    Injection,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

pub trait Entities {
    /// Whether the entity is still alive in the host world.
    fn exists(&self, entity: EntityId) -> bool;
}

/// Named reagent reservoirs attached to entities.
pub trait SolutionContainers {
    fn solution(&self, entity: EntityId, name: &str) -> Option<&Solution>;

    /// Withdraw up to `amount` from the named reservoir. `None` if the
    /// reservoir does not resolve.
    fn split_solution(&mut self, entity: EntityId, name: &str, amount: Fixed64)
    -> Option<Solution>;

    /// Create or replace a reservoir.
    fn insert_solution(&mut self, entity: EntityId, name: &str, solution: Solution);
}

/// Heat exposure. Fire-and-forget.
pub trait Atmosphere {
    fn hotspot_expose(
        &mut self,
        grid: GridId,
        tile: TilePos,
        temperature: Fixed64,
        volume: Fixed64,
        sustained: bool,
    );
}

pub trait Transforms {
    /// Grid and tile the entity currently occupies, if it is on a grid.
    fn grid_tile(&self, entity: EntityId) -> Option<(GridId, TilePos)>;

    fn coordinates(&self, entity: EntityId) -> Option<MapCoordinates>;
}

pub trait Containers {
    /// Owner of the container the entity sits in (e.g. the mob whose
    /// inventory holds it).
    fn container_owner(&self, entity: EntityId) -> Option<EntityId>;
}

/// Equipment slots.
pub trait Inventory {
    fn is_in_slot(&self, wearer: EntityId, entity: EntityId, slot: &str) -> bool;

    /// Returns `true` if the slot was emptied.
    fn try_unequip(&mut self, wearer: EntityId, slot: &str) -> bool;

    fn drop_at(&mut self, wearer: EntityId, entity: EntityId, at: MapCoordinates, force: bool);
}

pub trait Bloodstream {
    fn has_bloodstream(&self, entity: EntityId) -> bool;

    /// Returns `false` when the chemicals could not be taken up.
    fn try_add_chemicals(&mut self, entity: EntityId, solution: &Solution) -> bool;
}

pub trait Reactions {
    fn react(&mut self, entity: EntityId, method: ReactionMethod, solution: &Solution);
}

/// Cosmetic state. Every call is best-effort; `false` means the entity lacks
/// that visual capability.
pub trait Appearance {
    fn set_visual_state(&mut self, entity: EntityId, state: SmokableState) -> bool;

    fn set_equipped_prefix(&mut self, entity: EntityId, prefix: Option<&str>) -> bool;

    fn set_held_prefix(&mut self, entity: EntityId, prefix: Option<&str>) -> bool;
}

/// Heat sources that are not smokables (lighters, welders, matches).
pub trait HeatSources {
    fn is_hot(&self, entity: EntityId) -> bool;
}

/// Everything the combustion core needs from the host world.
pub trait SmokingHost:
    Entities
    + SolutionContainers
    + Atmosphere
    + Transforms
    + Containers
    + Inventory
    + Bloodstream
    + Reactions
    + Appearance
    + HeatSources
{
}

impl<T> SmokingHost for T where
    T: Entities
        + SolutionContainers
        + Atmosphere
        + Transforms
        + Containers
        + Inventory
        + Bloodstream
        + Reactions
        + Appearance
        + HeatSources
{
}
