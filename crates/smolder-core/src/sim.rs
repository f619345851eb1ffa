//! Cadence, configuration, and per-firing reports.
//!
//! The tick engine does not run every frame. Elapsed time is accumulated and
//! a firing happens once a full quantum has built up; the quantum is then
//! subtracted so any overshoot carries into the next interval.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Volume};

/// Default firing interval, in simulation time units.
pub const DEFAULT_QUANTUM: i32 = 3;

/// Default mask slot name.
pub const DEFAULT_MASK_SLOT: &str = "mask";

/// Default ring buffer capacity per event kind.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Consumption scaling
// ---------------------------------------------------------------------------

/// What elapsed time a firing scales `inhale_rate` by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionScaling {
    /// Everything accumulated at the moment of firing, overshoot included.
    #[default]
    AccumulatedTime,
    /// Exactly one quantum per firing.
    Quantum,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for [`SmokingSystem`](crate::system::SmokingSystem).
///
/// Data files describe this with plain numbers; `smolder-data` converts them.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokingConfig {
    /// Interval between firings.
    pub quantum: Fixed64,
    pub scaling: ConsumptionScaling,
    /// Equipment slot treated as "worn over the face".
    pub mask_slot: String,
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
}

impl Default for SmokingConfig {
    fn default() -> Self {
        Self {
            quantum: Fixed64::from_num(DEFAULT_QUANTUM),
            scaling: ConsumptionScaling::default(),
            mask_slot: DEFAULT_MASK_SLOT.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Coarse fixed-point timer owned by the tick engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickAccumulator {
    quantum: Fixed64,
    elapsed: Fixed64,
}

impl TickAccumulator {
    /// Create an accumulator. A non-positive quantum is clamped to the
    /// smallest representable positive step.
    pub fn new(quantum: Fixed64) -> Self {
        Self {
            quantum: quantum.max(Fixed64::DELTA),
            elapsed: Fixed64::ZERO,
        }
    }

    /// Add elapsed time. Returns `true` when a firing is due.
    pub fn accumulate(&mut self, dt: Fixed64) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt.max(Fixed64::ZERO));
        self.is_due()
    }

    pub fn is_due(&self) -> bool {
        self.elapsed >= self.quantum
    }

    /// Subtract exactly one quantum after a firing. Never resets to zero.
    pub(crate) fn consume_quantum(&mut self) {
        self.elapsed -= self.quantum;
    }

    /// Time accumulated since the last firing, overshoot included.
    pub fn elapsed(&self) -> Fixed64 {
        self.elapsed
    }

    pub fn quantum(&self) -> Fixed64 {
        self.quantum
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Summary of one `update()` call. All counters are zero when no firing
/// happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fired: bool,
    /// Smokables that passed validation and were processed.
    pub processed: usize,
    /// Entries dropped from the active set during validation.
    pub pruned: usize,
    /// Total volume withdrawn across all processed smokables.
    pub withdrawn: Volume,
    /// Reservoirs that reached exactly zero.
    pub emptied: usize,
    /// Burnt items dropped out of a mask slot.
    pub discarded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64 as fx;

    #[test]
    fn accumulator_starts_empty() {
        let acc = TickAccumulator::new(fx(3.0));
        assert_eq!(acc.elapsed(), Fixed64::ZERO);
        assert!(!acc.is_due());
    }

    #[test]
    fn fires_at_quantum_boundary() {
        let mut acc = TickAccumulator::new(fx(3.0));
        assert!(!acc.accumulate(fx(1.0)));
        assert!(!acc.accumulate(fx(1.0)));
        assert!(acc.accumulate(fx(1.0)));
    }

    #[test]
    fn overshoot_carries_over() {
        let mut acc = TickAccumulator::new(fx(3.0));
        acc.accumulate(fx(2.0));
        assert!(acc.accumulate(fx(2.0)));
        acc.consume_quantum();
        assert_eq!(acc.elapsed(), fx(1.0));
    }

    #[test]
    fn negative_dt_is_ignored() {
        let mut acc = TickAccumulator::new(fx(3.0));
        acc.accumulate(fx(-5.0));
        assert_eq!(acc.elapsed(), Fixed64::ZERO);
    }

    #[test]
    fn zero_quantum_is_clamped() {
        let acc = TickAccumulator::new(Fixed64::ZERO);
        assert!(acc.quantum() > Fixed64::ZERO);
    }

    #[test]
    fn config_defaults() {
        let config = SmokingConfig::default();
        assert_eq!(config.quantum, fx(3.0));
        assert_eq!(config.scaling, ConsumptionScaling::AccumulatedTime);
        assert_eq!(config.mask_slot, "mask");
    }
}
