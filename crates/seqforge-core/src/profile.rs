//! # Validation Profiles
//!
//! Named presets of rule flags and thresholds.
//!
//! The built-in catalog is compiled in from `profiles.toml`. Callers may merge
//! additional documents (TOML or JSON) on top of it; a profile with the same
//! name replaces the built-in one.
//!
//! A document either carries a `profiles` table keyed by name, or is a single
//! profile whose name is taken from the file stem.

use crate::SeqforgeError;
use crate::config::{ConfigOverrides, GeneratorConfig, RuleOverrides, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_PROFILES: &str = include_str!("profiles.toml");

// =============================================================================
// PROFILE
// =============================================================================

/// Optional threshold values; `None` keeps the value from the layer below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileParams {
    pub min_gc: Option<f64>,
    pub max_gc: Option<f64>,
    pub min_tm: Option<f64>,
    pub max_tm: Option<f64>,
    pub max_hairpin_tm: Option<f64>,
    pub max_homodimer_tm: Option<f64>,
    pub window_size: Option<usize>,
    pub max_homopolymer_length: Option<usize>,
    pub max_dinucleotide_repeats: Option<usize>,
    pub max_3prime_gc: Option<usize>,
}

impl ProfileParams {
    /// Overlay the present values on `thresholds`.
    pub fn apply(&self, thresholds: &mut Thresholds) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    thresholds.$field = value;
                })*
            };
        }
        overlay!(
            min_gc,
            max_gc,
            min_tm,
            max_tm,
            max_hairpin_tm,
            max_homodimer_tm,
            window_size,
            max_homopolymer_length,
            max_dinucleotide_repeats,
            max_3prime_gc,
        );
    }
}

/// A named preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    /// Catalog key. Filled from the document key or file stem when absent.
    pub name: String,
    pub description: String,
    pub rules: RuleOverrides,
    pub params: ProfileParams,
    /// Overrides the default heuristic ranking flag.
    pub heuristics: Option<bool>,
}

impl Profile {
    /// Resolve against defaults and report inconsistencies.
    pub fn check(&self) -> Result<(), SeqforgeError> {
        GeneratorConfig::resolve(Some(self), &ConfigOverrides::default())
            .map(|_| ())
            .map_err(|e| {
                SeqforgeError::InvalidProfile(format!("profile '{}': {e}", self.name))
            })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProfileDocument {
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
}

// =============================================================================
// CATALOG
// =============================================================================

/// Profiles keyed by name, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileCatalog {
    /// The compiled-in profiles.
    pub fn builtin() -> Result<Self, SeqforgeError> {
        let mut catalog = Self::default();
        catalog.merge_toml(BUILTIN_PROFILES, None)?;
        Ok(catalog)
    }

    /// Built-in profiles with `path` merged on top.
    pub fn with_file(path: &Path) -> Result<Self, SeqforgeError> {
        let mut catalog = Self::builtin()?;
        catalog.merge_file(path)?;
        Ok(catalog)
    }

    /// Look a profile up by name.
    pub fn get(&self, name: &str) -> Result<&Profile, SeqforgeError> {
        self.profiles
            .get(name)
            .ok_or_else(|| SeqforgeError::UnknownProfile {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Known profile names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// All profiles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Add or replace one profile after checking it.
    pub fn insert(&mut self, profile: Profile) -> Result<(), SeqforgeError> {
        if profile.name.trim().is_empty() {
            return Err(SeqforgeError::InvalidProfile(
                "profile name cannot be empty".to_string(),
            ));
        }
        profile.check()?;
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Merge a profile document from disk.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML. Returns the
    /// names the document defined.
    pub fn merge_file(&mut self, path: &Path) -> Result<Vec<String>, SeqforgeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SeqforgeError::IoError(format!("{}: {e}", path.display())))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let names = if is_json {
            self.merge_json(&text, stem.as_deref())?
        } else {
            self.merge_toml(&text, stem.as_deref())?
        };

        tracing::debug!(path = %path.display(), profiles = ?names, "merged profile document");
        Ok(names)
    }

    /// Merge a TOML profile document.
    pub fn merge_toml(
        &mut self,
        text: &str,
        single_name: Option<&str>,
    ) -> Result<Vec<String>, SeqforgeError> {
        let document: ProfileDocument =
            toml::from_str(text).map_err(|e| SeqforgeError::InvalidProfile(e.to_string()))?;
        if !document.profiles.is_empty() {
            return self.merge_document(document);
        }
        let profile: Profile =
            toml::from_str(text).map_err(|e| SeqforgeError::InvalidProfile(e.to_string()))?;
        self.merge_single(profile, single_name)
    }

    /// Merge a JSON profile document.
    pub fn merge_json(
        &mut self,
        text: &str,
        single_name: Option<&str>,
    ) -> Result<Vec<String>, SeqforgeError> {
        let document: ProfileDocument = serde_json::from_str(text)
            .map_err(|e| SeqforgeError::InvalidProfile(e.to_string()))?;
        if !document.profiles.is_empty() {
            return self.merge_document(document);
        }
        let profile: Profile = serde_json::from_str(text)
            .map_err(|e| SeqforgeError::InvalidProfile(e.to_string()))?;
        self.merge_single(profile, single_name)
    }

    fn merge_document(&mut self, document: ProfileDocument) -> Result<Vec<String>, SeqforgeError> {
        let mut names = Vec::with_capacity(document.profiles.len());
        for (key, mut profile) in document.profiles {
            if profile.name.is_empty() {
                profile.name.clone_from(&key);
            }
            names.push(profile.name.clone());
            self.insert(profile)?;
        }
        Ok(names)
    }

    fn merge_single(
        &mut self,
        mut profile: Profile,
        single_name: Option<&str>,
    ) -> Result<Vec<String>, SeqforgeError> {
        if profile.name.is_empty() {
            profile.name = single_name.unwrap_or_default().to_string();
        }
        let name = profile.name.clone();
        self.insert(profile)?;
        Ok(vec![name])
    }
}

// =============================================================================
// TESTS
// =============================================================================
