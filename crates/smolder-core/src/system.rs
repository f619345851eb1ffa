//! The smoking system: owns smokable components and the active set, and
//! runs the combustion tick engine.
//!
//! # Architecture
//!
//! The `SmokingSystem` owns:
//! - Per-entity [`Smokable`] components (SoA, keyed by [`EntityId`])
//! - The [`ActiveSmokables`] set; an entity is a member iff its state is Lit
//! - A [`TickAccumulator`] that decides when a firing is due
//! - An [`EventBus`] for combustion events
//!
//! Everything else (reservoirs, heat, equipment, bodies, cosmetics) is
//! reached through the [`SmokingHost`] collaborator traits.
//!
//! # Firing
//!
//! Each firing walks a snapshot of the active set. Per entity:
//! 1. **Validate** -- prune entries whose entity, component, or reservoir is gone
//! 2. **Expose** -- heat the tile when both exposure parameters are positive
//! 3. **Consume** -- split `inhale_rate * elapsed` from the reservoir; on an
//!    empty reservoir raise `SolutionEmptied` (reactive handlers apply first)
//!    and discard burnt items from the wearer's mask slot
//! 4. **Transfer** -- dose the mask-slot wearer via ingestion and bloodstream

use std::collections::VecDeque;

use slotmap::SecondaryMap;
use tracing::{debug, error, trace, warn};

use crate::active::ActiveSmokables;
use crate::event::{Event, EventBus, EventKind, PruneReason, SmokableMutation};
use crate::fixed::{Fixed64, Volume, saturating_mul};
use crate::host::{Appearance, ReactionMethod, SmokingHost, SolutionContainers};
use crate::id::EntityId;
use crate::profile::ProfileRegistry;
use crate::sim::{ConsumptionScaling, SmokingConfig, TickAccumulator, TickReport};
use crate::smokable::{Smokable, SmokableState};

/// Upper bound on mutations applied in response to a single emission.
/// Guards against reactive handlers that keep re-triggering each other.
const MAX_CASCADE: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmokingError {
    #[error("entity {0:?} has no smokable component")]
    NotSmokable(EntityId),
    #[error("unknown smokable profile '{0}'")]
    UnknownProfile(String),
}

// ---------------------------------------------------------------------------
// SmokingSystem
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SmokingSystem {
    smokables: SecondaryMap<EntityId, Smokable>,
    active: ActiveSmokables,
    accumulator: TickAccumulator,
    config: SmokingConfig,
    /// Typed event bus for combustion events.
    pub event_bus: EventBus,
    firings: u64,
}

/// Fields of a smokable needed across collaborator calls within one firing.
struct Burning {
    inhale_rate: Volume,
    exposure: Option<(Fixed64, Fixed64)>,
    solution: String,
}

impl SmokingSystem {
    /// Create a system with no reactive handlers registered.
    pub fn new(config: SmokingConfig) -> Self {
        Self {
            smokables: SecondaryMap::new(),
            active: ActiveSmokables::new(),
            accumulator: TickAccumulator::new(config.quantum),
            event_bus: EventBus::new(config.event_capacity),
            config,
            firings: 0,
        }
    }

    /// Create a system with the standard burn-out handler registered, so an
    /// emptied reservoir turns its smokable Burnt.
    pub fn with_defaults(config: SmokingConfig) -> Self {
        let mut system = Self::new(config);
        system.on_reactive(
            EventKind::SolutionEmptied,
            crate::burnout::burn_out_on_empty(),
        );
        system
    }

    pub fn config(&self) -> &SmokingConfig {
        &self.config
    }

    pub fn accumulator(&self) -> &TickAccumulator {
        &self.accumulator
    }

    pub fn active(&self) -> &ActiveSmokables {
        &self.active
    }

    /// Number of firings so far.
    pub fn firing_count(&self) -> u64 {
        self.firings
    }

    // -----------------------------------------------------------------------
    // Component management
    // -----------------------------------------------------------------------

    /// Attach (or replace) a smokable component. Active-set membership
    /// follows the component's state.
    pub fn add_smokable(&mut self, entity: EntityId, smokable: Smokable) {
        if smokable.state.is_lit() {
            self.active.insert(entity);
        } else {
            self.active.remove(entity);
        }
        self.smokables.insert(entity, smokable);
    }

    /// Attach a smokable built from a named profile and seed its reservoir.
    ///
    /// An unknown profile is a configuration error: it is logged, nothing is
    /// attached, and no other smokable is affected.
    pub fn spawn_from_profile<H: SolutionContainers + ?Sized>(
        &mut self,
        entity: EntityId,
        profile_name: &str,
        profiles: &ProfileRegistry,
        host: &mut H,
    ) -> Result<(), SmokingError> {
        let Some(profile) = profiles.get_by_name(profile_name) else {
            error!(?entity, profile = profile_name, "unknown smokable profile");
            return Err(SmokingError::UnknownProfile(profile_name.to_string()));
        };

        host.insert_solution(entity, &profile.solution, profile.initial_solution());
        self.add_smokable(entity, profile.to_smokable());
        debug!(?entity, profile = profile_name, "spawned smokable");
        Ok(())
    }

    /// Detach the component, running the shutdown handler first.
    pub fn remove_smokable(&mut self, entity: EntityId) -> Option<Smokable> {
        self.on_shutdown(entity);
        self.smokables.remove(entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&Smokable> {
        self.smokables.get(entity)
    }

    /// Mutable access for tuning rates and exposure. The state cannot be
    /// changed this way; use [`set_state`](Self::set_state).
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut Smokable> {
        self.smokables.get_mut(entity)
    }

    pub fn state(&self, entity: EntityId) -> Option<SmokableState> {
        self.smokables.get(entity).map(|s| s.state)
    }

    pub fn smokable_count(&self) -> usize {
        self.smokables.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Smokable)> {
        self.smokables.iter()
    }

    // -----------------------------------------------------------------------
    // Event system
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: crate::event::PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: crate::event::ReactiveHandler) {
        self.event_bus.on_reactive(kind, handler);
    }

    // -----------------------------------------------------------------------
    // State setter, hot query, shutdown
    // -----------------------------------------------------------------------

    /// Set a smokable's state, apply cosmetics, and sync the active set.
    ///
    /// Cosmetics are best-effort: missing visual capabilities are skipped.
    /// Setting the state it already has re-applies cosmetics only.
    pub fn set_state<H: Appearance + ?Sized>(
        &mut self,
        entity: EntityId,
        state: SmokableState,
        host: &mut H,
    ) -> Result<(), SmokingError> {
        let mutations = self.apply_state(entity, state, host)?;
        self.apply_mutations(mutations, host);
        Ok(())
    }

    /// True iff the entity is a lit smokable.
    pub fn is_hot(&self, entity: EntityId) -> bool {
        self.smokables
            .get(entity)
            .is_some_and(|s| s.state.is_lit())
    }

    /// Destruction/removal notification. Always drops the entity from the
    /// active set so no firing targets it afterwards. A component that
    /// survives the call is demoted to `Unlit` without cosmetics, the same
    /// way a prune demotes it.
    pub fn on_shutdown(&mut self, entity: EntityId) {
        let was_active = self.active.remove(entity);
        if let Some(smokable) = self.smokables.get_mut(entity)
            && smokable.state.is_lit()
        {
            smokable.state = SmokableState::Unlit;
        }
        if was_active {
            debug!(?entity, "lit smokable shut down");
        }
    }

    fn apply_state<H: Appearance + ?Sized>(
        &mut self,
        entity: EntityId,
        state: SmokableState,
        host: &mut H,
    ) -> Result<Vec<SmokableMutation>, SmokingError> {
        let smokable = self
            .smokables
            .get_mut(entity)
            .ok_or(SmokingError::NotSmokable(entity))?;
        let previous = smokable.state;
        smokable.state = state;

        let prefix = smokable.prefixes.for_state(state);
        let visual = host.set_visual_state(entity, state);
        let equipped = host.set_equipped_prefix(entity, prefix);
        let held = host.set_held_prefix(entity, prefix);
        if !(visual && equipped && held) {
            trace!(?entity, visual, equipped, held, "cosmetics partially applied");
        }

        if state.is_lit() {
            self.active.insert(entity);
        } else {
            self.active.remove(entity);
        }

        let firing = self.firings;
        let event = match (previous.is_lit(), state.is_lit()) {
            (false, true) => Event::Ignited { entity, firing },
            (true, false) => Event::Extinguished {
                entity,
                state,
                firing,
            },
            _ => return Ok(Vec::new()),
        };
        Ok(self.event_bus.emit(event))
    }

    /// Apply reactive mutations, including any they trigger in turn.
    fn apply_mutations<H: Appearance + ?Sized>(
        &mut self,
        initial: Vec<SmokableMutation>,
        host: &mut H,
    ) {
        let mut queue: VecDeque<SmokableMutation> = initial.into();
        let mut applied = 0usize;

        while let Some(mutation) = queue.pop_front() {
            if applied == MAX_CASCADE {
                warn!(
                    dropped = queue.len() + 1,
                    "reactive mutation cascade limit reached"
                );
                break;
            }
            applied += 1;

            match mutation {
                SmokableMutation::SetState { entity, state } => {
                    match self.apply_state(entity, state, host) {
                        Ok(more) => queue.extend(more),
                        Err(err) => debug!(%err, "reactive state change skipped"),
                    }
                }
                SmokableMutation::Shutdown { entity } => self.on_shutdown(entity),
            }
        }
    }

    fn emit<H: Appearance + ?Sized>(&mut self, event: Event, host: &mut H) {
        let mutations = self.event_bus.emit(event);
        self.apply_mutations(mutations, host);
    }

    // -----------------------------------------------------------------------
    // Tick engine
    // -----------------------------------------------------------------------

    /// Accumulate `dt` and, if a quantum has built up, run one firing.
    /// Buffered events are delivered to passive listeners on every call.
    pub fn update<H: SmokingHost + ?Sized>(&mut self, dt: Fixed64, host: &mut H) -> TickReport {
        let report = if self.accumulator.accumulate(dt) {
            let order = self.active.snapshot();
            self.fire(order, host)
        } else {
            TickReport::default()
        };
        self.event_bus.deliver();
        report
    }

    /// [`update`](Self::update) with a caller-chosen visiting order. Active
    /// members missing from `order` are visited last.
    #[cfg(any(test, feature = "test-utils"))]
    #[doc(hidden)]
    pub fn update_in_order<H: SmokingHost + ?Sized>(
        &mut self,
        dt: Fixed64,
        order: &[EntityId],
        host: &mut H,
    ) -> TickReport {
        let report = if self.accumulator.accumulate(dt) {
            let mut snapshot = self.active.snapshot();
            snapshot.sort_by_key(|entity| {
                order
                    .iter()
                    .position(|candidate| candidate == entity)
                    .unwrap_or(usize::MAX)
            });
            self.fire(snapshot, host)
        } else {
            TickReport::default()
        };
        self.event_bus.deliver();
        report
    }

    fn fire<H: SmokingHost + ?Sized>(&mut self, order: Vec<EntityId>, host: &mut H) -> TickReport {
        let elapsed = match self.config.scaling {
            ConsumptionScaling::AccumulatedTime => self.accumulator.elapsed(),
            ConsumptionScaling::Quantum => self.accumulator.quantum(),
        };
        self.firings += 1;

        let mut report = TickReport {
            fired: true,
            ..TickReport::default()
        };

        for entity in order {
            // Removed earlier in this firing (shutdown by a handler, etc.).
            if !self.active.contains(entity) {
                continue;
            }
            self.fire_one(entity, elapsed, host, &mut report);
        }

        self.accumulator.consume_quantum();
        trace!(
            firing = self.firings,
            processed = report.processed,
            pruned = report.pruned,
            "combustion firing"
        );
        report
    }

    fn fire_one<H: SmokingHost + ?Sized>(
        &mut self,
        entity: EntityId,
        elapsed: Fixed64,
        host: &mut H,
        report: &mut TickReport,
    ) {
        // 1. Validity.
        let burning = match self.validate(entity, host) {
            Ok(burning) => burning,
            Err(reason) => {
                self.prune(entity, reason, host);
                report.pruned += 1;
                return;
            }
        };

        // 2. Environmental exposure.
        if let Some((temperature, volume)) = burning.exposure
            && let Some((grid, tile)) = host.grid_tile(entity)
        {
            host.hotspot_expose(grid, tile, temperature, volume, true);
        }

        // 3. Consumption.
        let amount = saturating_mul(burning.inhale_rate, elapsed);
        let Some(inhaled) = host.split_solution(entity, &burning.solution, amount) else {
            self.prune(entity, PruneReason::SolutionGone, host);
            report.pruned += 1;
            return;
        };
        report.processed += 1;
        report.withdrawn += inhaled.total_volume();

        let owner = host.container_owner(entity);
        let remaining = host
            .solution(entity, &burning.solution)
            .map(|s| s.total_volume());

        if remaining == Some(Volume::ZERO) {
            report.emptied += 1;
            let firing = self.firings;
            self.emit(Event::SolutionEmptied { entity, firing }, host);

            if self.state(entity) == Some(SmokableState::Burnt)
                && let Some(wearer) = owner
                && self.discard_from_mask(entity, wearer, host)
            {
                report.discarded += 1;
            }
        }

        // 4. Transfer to wearer.
        if inhaled.is_empty() {
            return;
        }
        let mask = self.config.mask_slot.as_str();
        let Some(wearer) = owner.filter(|&wearer| host.is_in_slot(wearer, entity, mask)) else {
            trace!(?entity, "not worn in mask slot; transfer skipped");
            return;
        };
        if !host.has_bloodstream(wearer) {
            trace!(?entity, ?wearer, "wearer has no bloodstream; transfer skipped");
            return;
        }

        host.react(wearer, ReactionMethod::Ingestion, &inhaled);
        if !host.try_add_chemicals(wearer, &inhaled) {
            trace!(?entity, ?wearer, "bloodstream rejected inhaled chemicals");
        }
        let firing = self.firings;
        self.emit(
            Event::Inhaled {
                entity,
                wearer,
                volume: inhaled.total_volume(),
                firing,
            },
            host,
        );
    }

    fn validate<H: SmokingHost + ?Sized>(
        &self,
        entity: EntityId,
        host: &H,
    ) -> Result<Burning, PruneReason> {
        if !host.exists(entity) {
            return Err(PruneReason::EntityGone);
        }
        let smokable = self
            .smokables
            .get(entity)
            .ok_or(PruneReason::ComponentGone)?;
        if host.solution(entity, &smokable.solution).is_none() {
            return Err(PruneReason::SolutionGone);
        }

        Ok(Burning {
            inhale_rate: smokable.inhale_rate,
            exposure: smokable
                .exposes_heat()
                .then_some((smokable.expose_temperature, smokable.expose_volume)),
            solution: smokable.solution.clone(),
        })
    }

    /// Self-healing removal. The stored state is demoted alongside so the
    /// component never claims Lit while absent from the active set.
    fn prune<H: SmokingHost + ?Sized>(&mut self, entity: EntityId, reason: PruneReason, host: &mut H) {
        self.active.remove(entity);
        match reason {
            PruneReason::EntityGone => {
                self.smokables.remove(entity);
            }
            PruneReason::SolutionGone => {
                if let Some(smokable) = self.smokables.get_mut(entity) {
                    smokable.state = SmokableState::Unlit;
                }
            }
            PruneReason::ComponentGone => {}
        }
        debug!(?entity, ?reason, "pruned from active smokables");

        let firing = self.firings;
        self.emit(
            Event::Pruned {
                entity,
                reason,
                firing,
            },
            host,
        );
    }

    /// Unequip a burnt item from the wearer's mask slot and drop it at the
    /// wearer's feet. Returns `true` if it left the slot.
    fn discard_from_mask<H: SmokingHost + ?Sized>(
        &mut self,
        entity: EntityId,
        wearer: EntityId,
        host: &mut H,
    ) -> bool {
        let mask = self.config.mask_slot.as_str();
        if !host.is_in_slot(wearer, entity, mask) || !host.try_unequip(wearer, mask) {
            return false;
        }

        match host.coordinates(wearer) {
            Some(at) => host.drop_at(wearer, entity, at, true),
            None => debug!(?entity, ?wearer, "wearer has no coordinates; item left unequipped"),
        }

        let firing = self.firings;
        self.emit(
            Event::Discarded {
                entity,
                wearer,
                firing,
            },
            host,
        );
        true
    }
}

impl Default for SmokingSystem {
    fn default() -> Self {
        Self::with_defaults(SmokingConfig::default())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
