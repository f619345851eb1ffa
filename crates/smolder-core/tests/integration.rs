//! Integration tests for the combustion engine.
//!
//! These tests drive full lifecycles through the public API: lighting,
//! consumption over many firings, burn-out, mask discard, heat exposure,
//! and self-healing of the active set.

use std::cell::RefCell;
use std::rc::Rc;

use smolder_core::burnout::LightOutcome;
use smolder_core::event::{Event, EventKind, PruneReason};
use smolder_core::host::{ReactionMethod, TilePos};
use smolder_core::id::{EntityId, GridId, ReagentId};
use smolder_core::sim::{ConsumptionScaling, SmokingConfig};
use smolder_core::smokable::{Smokable, SmokableState};
use smolder_core::system::SmokingSystem;
use smolder_core::test_utils::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Route engine logs to the test harness. Set `RUST_LOG=smolder_core=trace`
/// to see per-item decisions.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

fn light(system: &mut SmokingSystem, world: &mut TestWorld, entity: EntityId) {
    system
        .set_state(entity, SmokableState::Lit, world)
        .expect("entity should be smokable");
}

fn record(system: &mut SmokingSystem, kind: EventKind) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    system.on_passive(kind, Box::new(move |event: &Event| sink.borrow_mut().push(event.clone())));
    log
}

// ===========================================================================
// Consumption
// ===========================================================================

#[test]
fn single_firing_consumes_rate_times_quantum() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let cigar = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    light(&mut system, &mut world, cigar);

    let report = system.update(fixed(3.0), &mut world);

    assert!(report.fired);
    assert_eq!(report.processed, 1);
    assert_eq!(report.withdrawn, fixed(6.0));
    assert_eq!(world.reservoir_volume(cigar), fixed(24.0));
    assert_eq!(system.state(cigar), Some(SmokableState::Lit));
}

#[test]
fn short_reservoir_empties_and_burns_out() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let cigar = spawn_cigar(&mut world, &mut system, 5.0, 2.0);
    light(&mut system, &mut world, cigar);
    let emptied = record(&mut system, EventKind::SolutionEmptied);

    let report = system.update(fixed(3.0), &mut world);

    assert_eq!(report.withdrawn, fixed(5.0));
    assert_eq!(report.emptied, 1);
    assert_eq!(world.reservoir_volume(cigar), fixed(0.0));
    assert_eq!(system.state(cigar), Some(SmokableState::Burnt));
    assert!(system.active().is_empty());
    assert_eq!(emptied.borrow().len(), 1);
    assert_eq!(world.equipped_prefix(cigar), Some("burnt"));
}

#[test]
fn without_burn_out_handler_empty_smokable_stays_lit() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::new(SmokingConfig::default());
    let cigar = spawn_cigar(&mut world, &mut system, 5.0, 2.0);
    light(&mut system, &mut world, cigar);

    let first = system.update(fixed(3.0), &mut world);
    assert_eq!(first.emptied, 1);
    assert_eq!(system.state(cigar), Some(SmokableState::Lit));

    // Still processed on later firings; nothing left to withdraw, but the
    // reservoir keeps reporting empty.
    let second = system.update(fixed(3.0), &mut world);
    assert_eq!(second.processed, 1);
    assert_eq!(second.withdrawn, fixed(0.0));
    assert_eq!(second.emptied, 1);
}

#[test]
fn small_frames_accumulate_into_one_firing() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let cigar = spawn_cigar(&mut world, &mut system, 30.0, 1.0);
    light(&mut system, &mut world, cigar);

    let mut fired = 0;
    for _ in 0..12 {
        if system.update(fixed(0.25), &mut world).fired {
            fired += 1;
        }
    }

    assert_eq!(fired, 1);
    assert_eq!(system.firing_count(), 1);
    assert_eq!(world.reservoir_volume(cigar), fixed(27.0));
}

#[test]
fn quantum_scaling_withdraws_fixed_amount() {
    let mut world = TestWorld::new();
    let config = SmokingConfig {
        scaling: ConsumptionScaling::Quantum,
        ..SmokingConfig::default()
    };
    let mut system = SmokingSystem::with_defaults(config);
    let cigar = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    light(&mut system, &mut world, cigar);

    let report = system.update(fixed(5.0), &mut world);
    assert_eq!(report.withdrawn, fixed(6.0));
}

#[test]
fn unlit_and_burnt_smokables_are_never_processed() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let unlit = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    let burnt = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    system
        .set_state(burnt, SmokableState::Burnt, &mut world)
        .unwrap();

    let report = system.update(fixed(3.0), &mut world);
    assert!(report.fired);
    assert_eq!(report.processed, 0);
    assert_eq!(world.reservoir_volume(unlit), fixed(30.0));
    assert_eq!(world.reservoir_volume(burnt), fixed(30.0));
}

// ===========================================================================
// Wearer transfer and discard
// ===========================================================================

#[test]
fn worn_cigar_doses_wearer_until_discarded() {
    init_tracing();
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let (wearer, cigar) = spawn_worn_cigar(&mut world, &mut system, 30.0, 2.0);
    light(&mut system, &mut world, cigar);
    let discarded = record(&mut system, EventKind::Discarded);

    for _ in 0..5 {
        system.update(fixed(3.0), &mut world);
    }

    // Four doses reached the wearer; the last one was withdrawn after the
    // item had already left the mask slot.
    let blood = world.bloodstream(wearer).unwrap();
    assert_eq!(blood.total_volume(), fixed(24.0));
    assert_eq!(blood.quantity(&ReagentId::new("nicotine")), fixed(24.0));
    assert_eq!(world.reactions.len(), 4);
    assert!(
        world
            .reactions
            .iter()
            .all(|(target, method, _)| *target == wearer && *method == ReactionMethod::Ingestion)
    );

    assert_eq!(system.state(cigar), Some(SmokableState::Burnt));
    assert_eq!(world.item_in_slot(wearer, "mask"), None);
    assert_eq!(world.drops.len(), 1);
    assert_eq!(world.drops[0].entity, cigar);
    assert!(world.drops[0].force);
    assert_eq!(discarded.borrow().len(), 1);
    assert_active_invariant(&system);
}

#[test]
fn no_transfer_when_not_in_mask_slot() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let pocket_owner = world.spawn();
    world.give_bloodstream(pocket_owner);
    let cigar = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    world.stow(pocket_owner, cigar);
    light(&mut system, &mut world, cigar);

    let report = system.update(fixed(3.0), &mut world);

    assert_eq!(report.withdrawn, fixed(6.0));
    assert_eq!(world.bloodstream(pocket_owner).unwrap().total_volume(), fixed(0.0));
    assert!(world.reactions.is_empty());
}

#[test]
fn no_transfer_without_bloodstream() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let mannequin = world.spawn();
    let cigar = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    world.equip(mannequin, "mask", cigar);
    light(&mut system, &mut world, cigar);

    let report = system.update(fixed(3.0), &mut world);

    assert_eq!(report.processed, 1);
    assert!(world.reactions.is_empty());
    assert_eq!(world.reservoir_volume(cigar), fixed(24.0));
}

#[test]
fn burnt_cigar_in_pocket_is_not_dropped() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let owner = world.spawn();
    let cigar = spawn_cigar(&mut world, &mut system, 2.0, 2.0);
    world.stow(owner, cigar);
    light(&mut system, &mut world, cigar);

    let report = system.update(fixed(3.0), &mut world);

    assert_eq!(report.emptied, 1);
    assert_eq!(report.discarded, 0);
    assert!(world.drops.is_empty());
    assert_eq!(system.state(cigar), Some(SmokableState::Burnt));
}

#[test]
fn custom_mask_slot_name() {
    let mut world = TestWorld::new();
    let config = SmokingConfig {
        mask_slot: "mouth".to_string(),
        ..SmokingConfig::default()
    };
    let mut system = SmokingSystem::with_defaults(config);
    let (wearer, cigar) = spawn_worn_cigar(&mut world, &mut system, 30.0, 2.0);
    light(&mut system, &mut world, cigar);

    system.update(fixed(3.0), &mut world);
    assert_eq!(world.item_in_slot(wearer, "mouth"), Some(cigar));
    assert_eq!(world.bloodstream(wearer).unwrap().total_volume(), fixed(6.0));
}

// ===========================================================================
// Heat exposure
// ===========================================================================

#[test]
fn exposure_heats_tile_on_grid() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let cigar = world.spawn();
    world.insert_reservoir(cigar, 30.0);
    world.place_on_grid(cigar, GridId(7), TilePos::new(3, -1));
    system.add_smokable(
        cigar,
        Smokable::new(fixed(1.0)).with_exposure(fixed(700.0), fixed(5.0)),
    );
    light(&mut system, &mut world, cigar);

    system.update(fixed(3.0), &mut world);

    assert_eq!(
        world.hotspots,
        vec![HotspotCall {
            grid: GridId(7),
            tile: TilePos::new(3, -1),
            temperature: fixed(700.0),
            volume: fixed(5.0),
            sustained: true,
        }]
    );
}

#[test]
fn exposure_skipped_off_grid_or_without_heat() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());

    // Exposing, but not on any grid.
    let floating = world.spawn();
    world.insert_reservoir(floating, 30.0);
    system.add_smokable(
        floating,
        Smokable::new(fixed(1.0)).with_exposure(fixed(700.0), fixed(5.0)),
    );
    // On a grid, but zero temperature.
    let cool = world.spawn();
    world.insert_reservoir(cool, 30.0);
    world.place_on_grid(cool, GridId(1), TilePos::new(0, 0));
    system.add_smokable(
        cool,
        Smokable::new(fixed(1.0)).with_exposure(fixed(0.0), fixed(5.0)),
    );
    light(&mut system, &mut world, floating);
    light(&mut system, &mut world, cool);

    let report = system.update(fixed(3.0), &mut world);

    assert_eq!(report.processed, 2);
    assert!(world.hotspots.is_empty());
}

// ===========================================================================
// Self-healing
// ===========================================================================

#[test]
fn destroyed_while_lit_is_never_processed() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let cigar = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    light(&mut system, &mut world, cigar);

    system.remove_smokable(cigar);
    world.despawn(cigar);

    let report = system.update(fixed(3.0), &mut world);
    assert!(report.fired);
    assert_eq!(report.processed, 0);
    assert_eq!(report.pruned, 0);
    assert!(system.active().is_empty());
}

#[test]
fn stale_entries_are_pruned_and_others_keep_burning() {
    init_tracing();
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let gone = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    let dry = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    let healthy = spawn_cigar(&mut world, &mut system, 30.0, 2.0);
    for entity in [gone, dry, healthy] {
        light(&mut system, &mut world, entity);
    }
    let pruned = record(&mut system, EventKind::Pruned);

    world.despawn(gone);
    world.remove_reservoir(dry);

    let report = system.update(fixed(3.0), &mut world);

    assert_eq!(report.pruned, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(world.reservoir_volume(healthy), fixed(24.0));
    assert_eq!(system.active().len(), 1);
    assert!(system.active().contains(healthy));

    let reasons: Vec<PruneReason> = pruned
        .borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Pruned { reason, .. } => Some(*reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons.contains(&PruneReason::EntityGone));
    assert!(reasons.contains(&PruneReason::SolutionGone));
    assert_active_invariant(&system);

    // Pruned entries stay pruned.
    let again = system.update(fixed(3.0), &mut world);
    assert_eq!(again.pruned, 0);
    assert_eq!(again.processed, 1);
}

// ===========================================================================
// Profiles and lighting
// ===========================================================================

#[test]
fn profile_spawned_cigar_full_lifecycle() {
    init_tracing();
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    let profiles = test_profiles();
    let cigar = world.spawn();
    let lighter = world.spawn();
    world.set_heat_source(lighter, true);

    system
        .spawn_from_profile(cigar, "cigar", &profiles, &mut world)
        .unwrap();
    assert_eq!(system.try_light(cigar, lighter, &mut world), LightOutcome::Lit);

    let mut firings = 0;
    while system.is_hot(cigar) {
        if system.update(fixed(1.0), &mut world).fired {
            firings += 1;
        }
        assert!(firings <= 5, "cigar should burn out within five firings");
    }

    assert_eq!(firings, 5);
    assert_eq!(system.state(cigar), Some(SmokableState::Burnt));
    assert_eq!(system.try_light(cigar, lighter, &mut world), LightOutcome::Spent);
    assert_eq!(system.event_bus.total_emitted(EventKind::Ignited), 1);
    assert_eq!(system.event_bus.total_emitted(EventKind::Extinguished), 1);
}

#[test]
fn suppressed_events_still_burn_out() {
    let mut world = TestWorld::new();
    let mut system = SmokingSystem::with_defaults(SmokingConfig::default());
    system.suppress_event(EventKind::SolutionEmptied);
    let cigar = spawn_cigar(&mut world, &mut system, 2.0, 2.0);
    light(&mut system, &mut world, cigar);

    system.update(fixed(3.0), &mut world);

    assert_eq!(system.state(cigar), Some(SmokableState::Burnt));
    assert_eq!(system.event_bus.buffered_count(EventKind::SolutionEmptied), 0);
}
