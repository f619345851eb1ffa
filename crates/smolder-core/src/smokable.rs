use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Volume};

/// Name of the reservoir a smokable draws from when none is configured.
pub const DEFAULT_SOLUTION: &str = "smokable";

/// Combustion phase of a smokable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokableState {
    #[default]
    Unlit,
    Lit,
    Burnt,
}

impl SmokableState {
    /// Whether this state belongs in the active set.
    pub fn is_lit(self) -> bool {
        self == SmokableState::Lit
    }
}

/// Visual prefixes applied to held/equipped sprites per state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokablePrefixes {
    #[serde(default)]
    pub unlit: Option<String>,
    #[serde(default = "default_lit_prefix")]
    pub lit: Option<String>,
    #[serde(default = "default_burnt_prefix")]
    pub burnt: Option<String>,
}

fn default_lit_prefix() -> Option<String> {
    Some("lit".to_string())
}

fn default_burnt_prefix() -> Option<String> {
    Some("burnt".to_string())
}

impl Default for SmokablePrefixes {
    fn default() -> Self {
        Self {
            unlit: None,
            lit: default_lit_prefix(),
            burnt: default_burnt_prefix(),
        }
    }
}

impl SmokablePrefixes {
    /// Prefix for the given state.
    pub fn for_state(&self, state: SmokableState) -> Option<&str> {
        match state {
            SmokableState::Lit => self.lit.as_deref(),
            SmokableState::Burnt => self.burnt.as_deref(),
            SmokableState::Unlit => self.unlit.as_deref(),
        }
    }
}

/// Per-entity combustion component.
///
/// `state` is private to the crate: only
/// [`SmokingSystem::set_state`](crate::system::SmokingSystem::set_state) may
/// change it, because the active set must change with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Smokable {
    pub(crate) state: SmokableState,
    /// Volume drawn from the reservoir per unit of elapsed time while lit.
    pub inhale_rate: Volume,
    /// Hotspot temperature applied to the tile while lit. Zero disables exposure.
    pub expose_temperature: Fixed64,
    /// Hotspot volume applied to the tile while lit. Zero disables exposure.
    pub expose_volume: Fixed64,
    /// Name of the reservoir on the entity.
    pub solution: String,
    pub prefixes: SmokablePrefixes,
}

impl Smokable {
    /// An unlit smokable with the given inhale rate and no heat exposure.
    pub fn new(inhale_rate: Volume) -> Self {
        Self {
            state: SmokableState::Unlit,
            inhale_rate,
            expose_temperature: Fixed64::ZERO,
            expose_volume: Fixed64::ZERO,
            solution: DEFAULT_SOLUTION.to_string(),
            prefixes: SmokablePrefixes::default(),
        }
    }

    pub fn with_exposure(mut self, temperature: Fixed64, volume: Fixed64) -> Self {
        self.expose_temperature = temperature;
        self.expose_volume = volume;
        self
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = solution.into();
        self
    }

    pub fn with_prefixes(mut self, prefixes: SmokablePrefixes) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn state(&self) -> SmokableState {
        self.state
    }

    /// Both exposure parameters must be positive for the tile to be heated.
    pub fn exposes_heat(&self) -> bool {
        self.expose_temperature > Fixed64::ZERO && self.expose_volume > Fixed64::ZERO
    }
}

impl Default for Smokable {
    fn default() -> Self {
        Self::new(Volume::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64 as fx;

    #[test]
    fn new_smokable_is_unlit() {
        let smokable = Smokable::new(fx(2.0));
        assert_eq!(smokable.state(), SmokableState::Unlit);
        assert_eq!(smokable.solution, DEFAULT_SOLUTION);
    }

    #[test]
    fn exposure_requires_both_parameters() {
        let base = Smokable::new(fx(1.0));
        assert!(!base.exposes_heat());
        assert!(!base.clone().with_exposure(Fixed64::ZERO, fx(5.0)).exposes_heat());
        assert!(!base.clone().with_exposure(fx(700.0), Fixed64::ZERO).exposes_heat());
        assert!(!base.clone().with_exposure(fx(-1.0), fx(5.0)).exposes_heat());
        assert!(base.with_exposure(fx(700.0), fx(5.0)).exposes_heat());
    }

    #[test]
    fn prefixes_per_state() {
        let prefixes = SmokablePrefixes::default();
        assert_eq!(prefixes.for_state(SmokableState::Unlit), None);
        assert_eq!(prefixes.for_state(SmokableState::Lit), Some("lit"));
        assert_eq!(prefixes.for_state(SmokableState::Burnt), Some("burnt"));
    }

    #[test]
    fn only_lit_is_active() {
        assert!(SmokableState::Lit.is_lit());
        assert!(!SmokableState::Unlit.is_lit());
        assert!(!SmokableState::Burnt.is_lit());
    }
}
