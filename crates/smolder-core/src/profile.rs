use std::collections::HashMap;

use crate::fixed::{Fixed64, Volume};
use crate::id::{ProfileId, ReagentId};
use crate::smokable::{DEFAULT_SOLUTION, Smokable, SmokablePrefixes};
use crate::solution::Solution;

/// A named template for a kind of smokable (cigar, cigarette, pipe load).
#[derive(Debug, Clone, PartialEq)]
pub struct SmokableProfile {
    pub name: String,
    pub inhale_rate: Volume,
    pub expose_temperature: Fixed64,
    pub expose_volume: Fixed64,
    /// Reservoir name on spawned entities.
    pub solution: String,
    /// Reservoir capacity. `None` leaves the reservoir unbounded.
    pub max_volume: Option<Volume>,
    /// Initial reservoir contents.
    pub contents: Vec<(ReagentId, Volume)>,
    pub prefixes: SmokablePrefixes,
}

impl SmokableProfile {
    /// A profile with no exposure, no contents, and default prefixes.
    pub fn new(name: &str, inhale_rate: Volume) -> Self {
        Self {
            name: name.to_string(),
            inhale_rate,
            expose_temperature: Fixed64::ZERO,
            expose_volume: Fixed64::ZERO,
            solution: DEFAULT_SOLUTION.to_string(),
            max_volume: None,
            contents: Vec::new(),
            prefixes: SmokablePrefixes::default(),
        }
    }

    pub fn with_content(mut self, reagent: impl Into<ReagentId>, quantity: Volume) -> Self {
        self.contents.push((reagent.into(), quantity));
        self
    }

    pub fn with_max_volume(mut self, max_volume: Volume) -> Self {
        self.max_volume = Some(max_volume);
        self
    }

    pub fn with_exposure(mut self, temperature: Fixed64, volume: Fixed64) -> Self {
        self.expose_temperature = temperature;
        self.expose_volume = volume;
        self
    }

    /// An unlit component configured from this profile.
    pub fn to_smokable(&self) -> Smokable {
        Smokable::new(self.inhale_rate)
            .with_exposure(self.expose_temperature, self.expose_volume)
            .with_solution(self.solution.clone())
            .with_prefixes(self.prefixes.clone())
    }

    /// Total of the configured contents.
    pub fn contents_volume(&self) -> Volume {
        self.contents
            .iter()
            .fold(Volume::ZERO, |total, (_, quantity)| total.saturating_add(*quantity))
    }

    /// A fresh reservoir: `max_volume` as its capacity, filled with the
    /// configured contents.
    pub fn initial_solution(&self) -> Solution {
        let empty = match self.max_volume {
            Some(max) => Solution::with_capacity(max),
            None => Solution::new(),
        };
        self.contents
            .iter()
            .fold(empty, |solution, (reagent, quantity)| {
                solution.with_reagent(reagent.clone(), *quantity)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("duplicate profile name: {0}")]
    DuplicateName(String),
    #[error("profile '{name}' has a negative {field}")]
    Negative { name: String, field: &'static str },
    #[error("profile '{name}' holds {contents} but max_volume is {max_volume}")]
    Overfilled {
        name: String,
        contents: Volume,
        max_volume: Volume,
    },
}

/// Builder for an immutable [`ProfileRegistry`]. Validation happens in
/// [`build`](ProfileRegistryBuilder::build).
#[derive(Debug, Default)]
pub struct ProfileRegistryBuilder {
    profiles: Vec<SmokableProfile>,
}

impl ProfileRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile. Returns its ID.
    pub fn register(&mut self, profile: SmokableProfile) -> ProfileId {
        let id = ProfileId(self.profiles.len() as u32);
        self.profiles.push(profile);
        id
    }

    /// Mutate an already-registered profile by name, e.g. to apply a mod
    /// override on top of base data.
    pub fn mutate<F>(&mut self, name: &str, f: F) -> Option<()>
    where
        F: FnOnce(&mut SmokableProfile),
    {
        let profile = self.profiles.iter_mut().find(|p| p.name == name)?;
        f(profile);
        Some(())
    }

    pub fn build(self) -> Result<ProfileRegistry, ProfileError> {
        let mut name_to_id = HashMap::with_capacity(self.profiles.len());

        for (index, profile) in self.profiles.iter().enumerate() {
            let negative = [
                ("inhale_rate", profile.inhale_rate),
                ("expose_temperature", profile.expose_temperature),
                ("expose_volume", profile.expose_volume),
            ]
            .into_iter()
            .chain(profile.max_volume.map(|max| ("max_volume", max)))
            .chain(profile.contents.iter().map(|(_, q)| ("content quantity", *q)))
            .find(|(_, value)| *value < Fixed64::ZERO);

            if let Some((field, _)) = negative {
                return Err(ProfileError::Negative {
                    name: profile.name.clone(),
                    field,
                });
            }

            if let Some(max_volume) = profile.max_volume {
                let contents = profile.contents_volume();
                if contents > max_volume {
                    return Err(ProfileError::Overfilled {
                        name: profile.name.clone(),
                        contents,
                        max_volume,
                    });
                }
            }

            if name_to_id
                .insert(profile.name.clone(), ProfileId(index as u32))
                .is_some()
            {
                return Err(ProfileError::DuplicateName(profile.name.clone()));
            }
        }

        Ok(ProfileRegistry {
            profiles: self.profiles,
            name_to_id,
        })
    }
}

/// Immutable set of profiles. Frozen after `build()`.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<SmokableProfile>,
    name_to_id: HashMap<String, ProfileId>,
}

impl ProfileRegistry {
    pub fn get(&self, id: ProfileId) -> Option<&SmokableProfile> {
        self.profiles.get(id.0 as usize)
    }

    pub fn id_of(&self, name: &str) -> Option<ProfileId> {
        self.name_to_id.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&SmokableProfile> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmokableProfile> {
        self.profiles.iter()
    }
}
