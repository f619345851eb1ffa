//! Serde data file structs for smokable content and engine tuning.
//!
//! These structs define the on-disk format. Numbers are plain `f64` here and
//! are converted to fixed-point by the loader, which rejects values that do
//! not fit.

use serde::Deserialize;
use smolder_core::sim::ConsumptionScaling;
use smolder_core::smokable::{DEFAULT_SOLUTION, SmokablePrefixes};

// ===========================================================================
// Profiles
// ===========================================================================

/// A smokable profile definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileData {
    pub name: String,
    pub inhale_rate: f64,
    #[serde(default)]
    pub expose_temperature: f64,
    #[serde(default)]
    pub expose_volume: f64,
    #[serde(default = "default_solution")]
    pub solution: String,
    /// Reservoir capacity; unbounded when absent.
    #[serde(default)]
    pub max_volume: Option<f64>,
    #[serde(default)]
    pub contents: Vec<ContentData>,
    /// Omitted entries fall back to the standard "lit"/"burnt" prefixes.
    #[serde(default)]
    pub prefixes: SmokablePrefixes,
}

fn default_solution() -> String {
    DEFAULT_SOLUTION.to_string()
}

/// A reservoir entry, supporting both short tuple form and full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentData {
    /// Short form: `("nicotine", 20.0)`.
    Short(String, f64),
    Full { reagent: String, quantity: f64 },
}

impl ContentData {
    pub fn reagent(&self) -> &str {
        match self {
            ContentData::Short(reagent, _) | ContentData::Full { reagent, .. } => reagent,
        }
    }

    pub fn quantity(&self) -> f64 {
        match self {
            ContentData::Short(_, quantity) | ContentData::Full { quantity, .. } => *quantity,
        }
    }
}

/// A tweak applied on top of a previously defined profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileOverrideData {
    pub name: String,
    #[serde(default)]
    pub inhale_rate: Option<f64>,
    #[serde(default)]
    pub expose_temperature: Option<f64>,
    #[serde(default)]
    pub expose_volume: Option<f64>,
    #[serde(default)]
    pub max_volume: Option<f64>,
}

// ===========================================================================
// Engine configuration
// ===========================================================================

/// Engine tuning. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigData {
    #[serde(default = "default_quantum")]
    pub quantum: f64,
    #[serde(default)]
    pub scaling: ConsumptionScaling,
    #[serde(default = "default_mask_slot")]
    pub mask_slot: String,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_quantum() -> f64 {
    f64::from(smolder_core::sim::DEFAULT_QUANTUM)
}

fn default_mask_slot() -> String {
    smolder_core::sim::DEFAULT_MASK_SLOT.to_string()
}

fn default_event_capacity() -> usize {
    smolder_core::sim::DEFAULT_EVENT_CAPACITY
}
