//! Smolder Core -- combustion simulation for smokable items.
//!
//! This crate tracks which smokables are burning, advances their combustion
//! on a coarse fixed cadence, and asks host-world collaborators to expose
//! heat, drain reservoirs, and dose whoever is wearing the item.
//!
//! # Firing Pipeline
//!
//! Each firing of [`system::SmokingSystem::update`] walks the active set and,
//! per burning item:
//!
//! 1. **Validate** -- prune items whose entity, component, or reservoir is gone.
//! 2. **Expose** -- heat the surrounding tile when both exposure parameters
//!    are positive.
//! 3. **Consume** -- split `inhale_rate * elapsed` out of the reservoir; raise
//!    the emptied event when nothing is left, discarding burnt items from the
//!    wearer's mask slot.
//! 4. **Transfer** -- dose the mask-slot wearer through ingestion and the
//!    bloodstream.
//!
//! # Key Types
//!
//! - [`system::SmokingSystem`] -- Component storage, state setter, and the
//!   combustion tick engine.
//! - [`active::ActiveSmokables`] -- The set of currently lit items.
//! - [`smokable::Smokable`] -- Per-item combustion component.
//! - [`solution::Solution`] -- Reagent mixture with clamped proportional split.
//! - [`store::SolutionStore`] -- In-memory reservoirs for hosts without their own.
//! - [`host::SmokingHost`] -- Collaborator traits the host world implements.
//! - [`event::EventBus`] -- Buffered passive delivery plus synchronous
//!   reactive handlers.
//! - [`profile::ProfileRegistry`] -- Named smokable templates.

pub mod active;
pub mod burnout;
pub mod event;
pub mod fixed;
pub mod host;
pub mod id;
pub mod profile;
pub mod sim;
pub mod smokable;
pub mod solution;
pub mod store;
pub mod system;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
