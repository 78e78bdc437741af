//! Device-local preset tier
//!
//! Three records live in the local store:
//!
//! - the working preset, restored when the lab opens
//! - a library of named presets, newest first
//! - per-type default props applied with one click
//!
//! Reads never fail: a missing or unreadable record is treated as empty.

use std::collections::{BTreeMap, HashSet};

use layoutlab_common::{read_json, write_json, KeyValueStore};
use layoutlab_editor::{fields_from_object, PatchFields, Preset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PresetError;

pub const LOCAL_PRESET_KEY: &str = "layout_tuning_lab_v1";
pub const PRESET_LIBRARY_KEY: &str = "lab_presets_v2";
pub const TYPE_DEFAULTS_KEY: &str = "lab_type_defaults_v1";

/// A preset saved under a user-facing name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPreset {
    pub id: String,
    pub name: String,
    pub data: Preset,
}

/// Per-section-type default props, keyed by type tag
pub type TypeDefaults = BTreeMap<String, Map<String, Value>>;

pub struct LocalPresetCache {
    store: Box<dyn KeyValueStore + Send>,
    key: String,
}

impl LocalPresetCache {
    pub fn new(store: Box<dyn KeyValueStore + Send>) -> Self {
        Self::with_key(store, LOCAL_PRESET_KEY)
    }

    pub fn with_key(store: Box<dyn KeyValueStore + Send>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn save(&mut self, preset: &Preset) -> Result<(), PresetError> {
        write_json(&mut *self.store, &self.key, preset)?;
        tracing::debug!("[LocalPreset] saved key={}", self.key);
        Ok(())
    }

    pub fn load(&self) -> Option<Preset> {
        read_json(&*self.store, &self.key)
    }

    pub fn clear(&mut self) -> Result<(), PresetError> {
        self.store.remove(&self.key)?;
        Ok(())
    }

    /// Named presets, newest first
    pub fn library(&self) -> Vec<NamedPreset> {
        read_json(&*self.store, PRESET_LIBRARY_KEY).unwrap_or_default()
    }

    /// Prepend `preset` to the library; a blank name becomes `Preset N`
    pub fn save_named(
        &mut self,
        name: Option<&str>,
        preset: &Preset,
    ) -> Result<NamedPreset, PresetError> {
        let mut library = self.library();

        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Preset {}", library.len() + 1),
        };

        let taken: HashSet<&str> = library.iter().map(|p| p.id.as_str()).collect();
        let entry = NamedPreset {
            id: next_library_id(&taken),
            name,
            data: preset.clone(),
        };

        library.insert(0, entry.clone());
        write_json(&mut *self.store, PRESET_LIBRARY_KEY, &library)?;

        tracing::info!("[LocalPreset] library add id={} name={:?}", entry.id, entry.name);
        Ok(entry)
    }

    pub fn load_named(&self, id: &str) -> Option<NamedPreset> {
        self.library().into_iter().find(|p| p.id == id)
    }

    /// Returns `true` if an entry was removed
    pub fn delete_named(&mut self, id: &str) -> Result<bool, PresetError> {
        let mut library = self.library();
        let before = library.len();
        library.retain(|p| p.id != id);
        if library.len() == before {
            return Ok(false);
        }
        write_json(&mut *self.store, PRESET_LIBRARY_KEY, &library)?;
        Ok(true)
    }

    pub fn type_defaults(&self) -> TypeDefaults {
        read_json(&*self.store, TYPE_DEFAULTS_KEY).unwrap_or_default()
    }

    /// Default props for one section type as set-only patch fields
    pub fn type_default(&self, section_type: &str) -> Option<PatchFields> {
        self.type_defaults()
            .get(section_type)
            .map(fields_from_object)
    }

    /// Replace the defaults stored for `section_type`
    pub fn save_type_default(
        &mut self,
        section_type: &str,
        props: Map<String, Value>,
    ) -> Result<(), PresetError> {
        let mut defaults = self.type_defaults();
        defaults.insert(section_type.to_string(), props);
        write_json(&mut *self.store, TYPE_DEFAULTS_KEY, &defaults)?;
        Ok(())
    }
}

fn next_library_id(taken: &HashSet<&str>) -> String {
    let base = format!("{:x}", chrono::Utc::now().timestamp_millis());
    if !taken.contains(base.as_str()) {
        return base;
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.clone())
}
