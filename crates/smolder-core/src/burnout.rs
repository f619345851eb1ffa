//! Lighting, extinguishing, and burn-out.
//!
//! The tick engine never moves a smokable from Lit to Burnt on its own; the
//! reactive handler here does, in response to an emptied reservoir. Because
//! reactive handlers run at emission time, the state is already Burnt when
//! the engine checks whether to discard the item from a mask slot.

use tracing::debug;

use crate::event::{Event, ReactiveHandler, SmokableMutation};
use crate::host::{Appearance, HeatSources};
use crate::id::EntityId;
use crate::smokable::SmokableState;
use crate::system::SmokingSystem;

/// Reactive handler: an emptied reservoir burns its smokable out.
pub fn burn_out_on_empty() -> ReactiveHandler {
    Box::new(|event: &Event| match event {
        Event::SolutionEmptied { entity, .. } => vec![SmokableMutation::SetState {
            entity: *entity,
            state: SmokableState::Burnt,
        }],
        _ => Vec::new(),
    })
}

/// Result of [`SmokingSystem::try_light`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightOutcome {
    Lit,
    AlreadyLit,
    /// Burnt smokables cannot be relit.
    Spent,
    IgniterCold,
    NotSmokable,
}

impl SmokingSystem {
    /// Light `target` with `igniter`. The igniter counts as hot if it is a
    /// lit smokable or the host reports it as a heat source.
    pub fn try_light<H: Appearance + HeatSources + ?Sized>(
        &mut self,
        target: EntityId,
        igniter: EntityId,
        host: &mut H,
    ) -> LightOutcome {
        match self.state(target) {
            None => return LightOutcome::NotSmokable,
            Some(SmokableState::Lit) => return LightOutcome::AlreadyLit,
            Some(SmokableState::Burnt) => return LightOutcome::Spent,
            Some(SmokableState::Unlit) => {}
        }

        if !(self.is_hot(igniter) || host.is_hot(igniter)) {
            return LightOutcome::IgniterCold;
        }

        match self.set_state(target, SmokableState::Lit, host) {
            Ok(()) => {
                debug!(?target, ?igniter, "smokable lit");
                LightOutcome::Lit
            }
            Err(_) => LightOutcome::NotSmokable,
        }
    }

    /// Put out a lit smokable. Returns `true` if it was lit.
    pub fn extinguish<H: Appearance + ?Sized>(&mut self, target: EntityId, host: &mut H) -> bool {
        if !self.is_hot(target) {
            return false;
        }
        self.set_state(target, SmokableState::Unlit, host).is_ok()
    }
}
