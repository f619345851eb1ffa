//! Typed events with pre-allocated ring buffers.
//!
//! Events are emitted by the state setter and during firings. Each event kind
//! has its own [`EventBuffer`] ring buffer with a configurable capacity.
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only; buffered events are delivered in batch
//!   at the end of each `update()` (UI, audio, analytics).
//! - **Reactive handlers**: run synchronously at the moment of emission and
//!   return [`SmokableMutation`]s that the system applies before it moves on.
//!   Burn-out on an emptied reservoir is a reactive handler.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or buffering for that kind. Reactive handlers still run for
//! suppressed kinds because they drive simulation state.

use crate::fixed::Volume;
use crate::id::EntityId;
use crate::smokable::SmokableState;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why an entry was dropped from the active set during a firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PruneReason {
    /// The host no longer knows the entity.
    EntityGone,
    /// The entity no longer carries a smokable component.
    ComponentGone,
    /// The named reservoir no longer resolves.
    SolutionGone,
}

/// A combustion event. All events carry the firing count at which they
/// occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Ignited {
        entity: EntityId,
        firing: u64,
    },
    Extinguished {
        entity: EntityId,
        state: SmokableState,
        firing: u64,
    },
    SolutionEmptied {
        entity: EntityId,
        firing: u64,
    },
    Inhaled {
        entity: EntityId,
        wearer: EntityId,
        volume: Volume,
        firing: u64,
    },
    Discarded {
        entity: EntityId,
        wearer: EntityId,
        firing: u64,
    },
    Pruned {
        entity: EntityId,
        reason: PruneReason,
        firing: u64,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ignited,
    Extinguished,
    SolutionEmptied,
    Inhaled,
    Discarded,
    Pruned,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 6;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ignited { .. } => EventKind::Ignited,
            Event::Extinguished { .. } => EventKind::Extinguished,
            Event::SolutionEmptied { .. } => EventKind::SolutionEmptied,
            Event::Inhaled { .. } => EventKind::Inhaled,
            Event::Discarded { .. } => EventKind::Discarded,
            Event::Pruned { .. } => EventKind::Pruned,
        }
    }

    /// The smokable the event is about.
    pub fn entity(&self) -> EntityId {
        match self {
            Event::Ignited { entity, .. }
            | Event::Extinguished { entity, .. }
            | Event::SolutionEmptied { entity, .. }
            | Event::Inhaled { entity, .. }
            | Event::Discarded { entity, .. }
            | Event::Pruned { entity, .. } => *entity,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Mutations (returned by reactive handlers)
// ---------------------------------------------------------------------------

/// A change a reactive handler wants applied immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokableMutation {
    /// Route through the state setter (keeps the active set in sync).
    SetState {
        entity: EntityId,
        state: SmokableState,
    },
    /// Treat the entity as shut down.
    Shutdown { entity: EntityId },
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
    dropped: u64,
}

impl EventBuffer {
    /// Create a ring buffer. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    /// Push an event. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        } else {
            self.dropped += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate over events from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        // When full, head is the next write position, which is the oldest entry.
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |offset| {
            self.events[(start + offset) % self.capacity()].as_ref()
        })
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// A passive listener receives buffered events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// A reactive handler runs at emission time and returns mutations to apply
/// immediately.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<SmokableMutation>>;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Holds one ring buffer per event kind, subscriber lists, and suppression
/// flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    passive: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    reactive: [Vec<ReactiveHandler>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a bus with the given buffer capacity per event kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            passive: Default::default(),
            reactive: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind for buffering and passive delivery.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.passive[kind.index()].push(listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.reactive[kind.index()].push(handler);
    }

    /// Emit an event: run reactive handlers in registration order, buffer
    /// the event for passive delivery unless suppressed, and return the
    /// mutations the handlers asked for.
    pub fn emit(&mut self, event: Event) -> Vec<SmokableMutation> {
        let idx = event.kind().index();

        let mut mutations = Vec::new();
        for handler in &mut self.reactive[idx] {
            mutations.extend(handler(&event));
        }

        if !self.suppressed[idx] {
            let capacity = self.default_capacity;
            self.buffers[idx]
                .get_or_insert_with(|| EventBuffer::new(capacity))
                .push(event);
        }

        mutations
    }

    /// Deliver all buffered events to passive listeners, oldest first, then
    /// clear the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            for event in buffer.iter() {
                for listener in &mut self.passive[idx] {
                    listener(event);
                }
            }
            buffer.clear();
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::sim::DEFAULT_EVENT_CAPACITY)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_entity() -> EntityId {
        let mut sm = SlotMap::<EntityId, ()>::with_key();
        sm.insert(())
    }

    fn emptied(entity: EntityId, firing: u64) -> Event {
        Event::SolutionEmptied { entity, firing }
    }

    #[test]
    fn ring_buffer_wraps_and_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        let entity = make_entity();
        for firing in 0..5u64 {
            buf.push(emptied(entity, firing));
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped_count(), 2);

        let firings: Vec<u64> = buf
            .iter()
            .map(|e| match e {
                Event::SolutionEmptied { firing, .. } => *firing,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(firings, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn reactive_handlers_run_at_emit() {
        let mut bus = EventBus::new(8);
        let entity = make_entity();
        bus.on_reactive(
            EventKind::SolutionEmptied,
            Box::new(|event: &Event| {
                vec![SmokableMutation::SetState {
                    entity: event.entity(),
                    state: SmokableState::Burnt,
                }]
            }),
        );

        let mutations = bus.emit(emptied(entity, 1));
        assert_eq!(
            mutations,
            vec![SmokableMutation::SetState {
                entity,
                state: SmokableState::Burnt
            }]
        );
        assert_eq!(bus.buffered_count(EventKind::SolutionEmptied), 1);
    }

    #[test]
    fn passive_listeners_see_events_on_deliver() {
        let mut bus = EventBus::new(8);
        let entity = make_entity();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_passive(
            EventKind::Ignited,
            Box::new(move |event: &Event| sink.borrow_mut().push(event.clone())),
        );

        bus.emit(Event::Ignited { entity, firing: 0 });
        assert!(seen.borrow().is_empty());

        bus.deliver();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(bus.buffered_count(EventKind::Ignited), 0);
    }

    #[test]
    fn suppressed_kind_is_not_buffered_but_reacts() {
        let mut bus = EventBus::new(8);
        let entity = make_entity();
        bus.suppress(EventKind::SolutionEmptied);
        bus.on_reactive(
            EventKind::SolutionEmptied,
            Box::new(|event: &Event| vec![SmokableMutation::Shutdown { entity: event.entity() }]),
        );

        let mutations = bus.emit(emptied(entity, 0));
        assert_eq!(mutations.len(), 1);
        assert!(bus.buffer(EventKind::SolutionEmptied).is_none());
        assert_eq!(bus.total_emitted(EventKind::SolutionEmptied), 0);
    }

    #[test]
    fn event_entity_accessor() {
        let entity = make_entity();
        let event = Event::Pruned {
            entity,
            reason: PruneReason::SolutionGone,
            firing: 3,
        };
        assert_eq!(event.entity(), entity);
        assert_eq!(event.kind(), EventKind::Pruned);
    }
}
