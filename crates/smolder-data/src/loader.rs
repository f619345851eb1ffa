//! Reads `smoking`, `smokables` and `overrides` from a data directory in any
//! of RON, TOML or JSON, converts numbers to fixed-point and builds the
//! profile registry and engine configuration.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use smolder_core::fixed::Fixed64;
use smolder_core::profile::{ProfileError, ProfileRegistry, ProfileRegistryBuilder, SmokableProfile};
use smolder_core::sim::SmokingConfig;
use tracing::{debug, error, info};

use crate::schema::{ConfigData, ProfileData, ProfileOverrideData};

/// Base name of the engine configuration file.
pub const CONFIG_FILE: &str = "smoking";
/// Base name of the profile list.
pub const PROFILES_FILE: &str = "smokables";
/// Base name of the optional profile override list.
pub const OVERRIDES_FILE: &str = "overrides";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A number that cannot be represented, or a value out of range.
    #[error("invalid value for {field} of '{name}' in {file}: {value}")]
    InvalidValue {
        file: PathBuf,
        name: String,
        field: &'static str,
        value: f64,
    },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The assembled profiles failed registry validation.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Data files
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ron,
    Toml,
    Json,
}

/// Extensions probed for every base name, in lookup order.
const FORMATS: [(&str, Format); 3] = [
    ("ron", Format::Ron),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

/// One located data file. Errors raised while reading it carry its path.
#[derive(Debug, Clone)]
struct DataFile {
    path: PathBuf,
    format: Format,
}

impl DataFile {
    /// The file `dir/{base}.{ron,toml,json}`, if exactly one exists.
    fn find(dir: &Path, base: &str) -> Result<Option<Self>, DataLoadError> {
        let mut present = FORMATS.iter().filter_map(|&(ext, format)| {
            let path = dir.join(format!("{base}.{ext}"));
            path.is_file().then_some(DataFile { path, format })
        });
        let first = present.next();
        match (first, present.next()) {
            (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats {
                a: a.path,
                b: b.path,
            }),
            (first, _) => Ok(first),
        }
    }

    fn require(dir: &Path, base: &str) -> Result<Self, DataLoadError> {
        Self::find(dir, base)?.ok_or_else(|| DataLoadError::MissingRequired {
            file: base.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    fn parse_error(&self, detail: impl ToString) -> DataLoadError {
        DataLoadError::Parse {
            file: self.path.clone(),
            detail: detail.to_string(),
        }
    }

    /// Deserialize the whole document.
    fn read<T: DeserializeOwned>(&self) -> Result<T, DataLoadError> {
        let text = std::fs::read_to_string(&self.path)?;
        match self.format {
            Format::Ron => ron::from_str(&text).map_err(|e| self.parse_error(e)),
            Format::Toml => toml::from_str(&text).map_err(|e| self.parse_error(e)),
            Format::Json => serde_json::from_str(&text).map_err(|e| self.parse_error(e)),
        }
    }

    /// Deserialize a list of entries. TOML cannot have a top-level array, so
    /// there the list lives under `[[toml_key]]`.
    fn read_list<T: DeserializeOwned>(&self, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
        if self.format != Format::Toml {
            return self.read();
        }
        let mut table: toml::Table = self.read()?;
        let entries = table
            .remove(toml_key)
            .ok_or_else(|| self.parse_error(format!("missing [[{toml_key}]] entries")))?;
        entries.try_into().map_err(|e| self.parse_error(e))
    }

    /// A data-file number as fixed-point. NaN, infinities and values
    /// outside the Q32.32 range are rejected rather than saturated.
    fn fixed(&self, value: f64, name: &str, field: &'static str) -> Result<Fixed64, DataLoadError> {
        Fixed64::checked_from_num(value).ok_or_else(|| self.invalid(name, field, value))
    }

    fn fixed_opt(
        &self,
        value: Option<f64>,
        name: &str,
        field: &'static str,
    ) -> Result<Option<Fixed64>, DataLoadError> {
        value.map(|v| self.fixed(v, name, field)).transpose()
    }

    fn invalid(&self, name: &str, field: &'static str, value: f64) -> DataLoadError {
        DataLoadError::InvalidValue {
            file: self.path.clone(),
            name: name.to_string(),
            field,
            value,
        }
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn resolve_profile(data: ProfileData, file: &DataFile) -> Result<SmokableProfile, DataLoadError> {
    let name = data.name.as_str();
    let mut profile = SmokableProfile::new(name, file.fixed(data.inhale_rate, name, "inhale_rate")?)
        .with_exposure(
            file.fixed(data.expose_temperature, name, "expose_temperature")?,
            file.fixed(data.expose_volume, name, "expose_volume")?,
        );
    profile.max_volume = file.fixed_opt(data.max_volume, name, "max_volume")?;
    for content in &data.contents {
        profile = profile.with_content(
            content.reagent(),
            file.fixed(content.quantity(), name, "content quantity")?,
        );
    }
    profile.solution = data.solution;
    profile.prefixes = data.prefixes;
    Ok(profile)
}

fn apply_override(
    builder: &mut ProfileRegistryBuilder,
    data: &ProfileOverrideData,
    file: &DataFile,
) -> Result<(), DataLoadError> {
    let name = data.name.as_str();
    let inhale_rate = file.fixed_opt(data.inhale_rate, name, "inhale_rate")?;
    let expose_temperature = file.fixed_opt(data.expose_temperature, name, "expose_temperature")?;
    let expose_volume = file.fixed_opt(data.expose_volume, name, "expose_volume")?;
    let max_volume = file.fixed_opt(data.max_volume, name, "max_volume")?;

    builder
        .mutate(name, |profile| {
            if let Some(rate) = inhale_rate {
                profile.inhale_rate = rate;
            }
            if let Some(temperature) = expose_temperature {
                profile.expose_temperature = temperature;
            }
            if let Some(volume) = expose_volume {
                profile.expose_volume = volume;
            }
            if max_volume.is_some() {
                profile.max_volume = max_volume;
            }
        })
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.path.clone(),
            name: name.to_string(),
            expected_kind: "profile",
        })
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug)]
pub struct SmokingData {
    pub config: SmokingConfig,
    pub profiles: ProfileRegistry,
}

/// Load engine tuning from `smoking.{ron,toml,json}`. A missing file yields
/// the defaults.
pub fn load_config(dir: &Path) -> Result<SmokingConfig, DataLoadError> {
    let Some(file) = DataFile::find(dir, CONFIG_FILE)? else {
        debug!(dir = %dir.display(), "no engine config file; using defaults");
        return Ok(SmokingConfig::default());
    };

    let data: ConfigData = file.read()?;
    let quantum = file.fixed(data.quantum, CONFIG_FILE, "quantum")?;
    if quantum <= Fixed64::ZERO {
        return Err(file.invalid(CONFIG_FILE, "quantum", data.quantum));
    }

    info!(file = %file.path.display(), "loaded engine config");
    Ok(SmokingConfig {
        quantum,
        scaling: data.scaling,
        mask_slot: data.mask_slot,
        event_capacity: data.event_capacity,
    })
}

/// Load profiles from `smokables.{ron,toml,json}` (required), then apply
/// `overrides.{ron,toml,json}` if present.
pub fn load_profiles(dir: &Path) -> Result<ProfileRegistry, DataLoadError> {
    let file = DataFile::require(dir, PROFILES_FILE)?;
    let entries: Vec<ProfileData> = file.read_list("smokable")?;

    let mut seen = HashSet::with_capacity(entries.len());
    let mut builder = ProfileRegistryBuilder::new();
    for data in entries {
        if !seen.insert(data.name.clone()) {
            return Err(DataLoadError::DuplicateName {
                file: file.path.clone(),
                name: data.name,
            });
        }
        builder.register(resolve_profile(data, &file)?);
    }

    if let Some(overrides) = DataFile::find(dir, OVERRIDES_FILE)? {
        let entries: Vec<ProfileOverrideData> = overrides.read_list("override")?;
        for data in &entries {
            apply_override(&mut builder, data, &overrides)?;
        }
        debug!(count = entries.len(), "applied profile overrides");
    }

    let registry = builder.build().inspect_err(|err| {
        error!(file = %file.path.display(), %err, "invalid smokable profiles");
    })?;
    info!(file = %file.path.display(), count = registry.len(), "loaded smokable profiles");
    Ok(registry)
}

/// Load both the engine config and the profile registry from one directory.
pub fn load_smoking_data(dir: &Path) -> Result<SmokingData, DataLoadError> {
    Ok(SmokingData {
        config: load_config(dir)?,
        profiles: load_profiles(dir)?,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
