//! Two-tier preset persistence: a device-local cache and the company
//! settings document on the backend.

mod backend;
mod local;

pub use backend::{
    find_preset, merge_preset, BackendPresetOptions, BackendPresetStore, LoadMode, PresetSaveSaga,
    PresetShape, SaveStep, BACKEND_PRESET_FIELD,
};
pub use local::{
    LocalPresetCache, NamedPreset, TypeDefaults, LOCAL_PRESET_KEY, PRESET_LIBRARY_KEY,
    TYPE_DEFAULTS_KEY,
};

use layoutlab_common::StoreError;
use layoutlab_editor::EditorError;
use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Preset save failed during {step}: {source}")]
    Transport {
        step: SaveStep,
        #[source]
        source: RepositoryError,
    },

    #[error("Saved, but the server did not return the preset. Check the backend settings mapping.")]
    Verification,

    #[error("No backend preset found.")]
    NotFound,

    #[error("Failed to load preset: {0}")]
    LoadFailed(#[source] RepositoryError),

    #[error("Stored preset is malformed: {0}")]
    Malformed(#[from] EditorError),

    #[error("Local preset storage failed: {0}")]
    Store(#[from] StoreError),
}

impl PresetError {
    /// Text for the preset status channel
    pub fn user_message(&self) -> String {
        match self {
            PresetError::Transport { source, .. } => source.user_message("Failed to save preset"),
            PresetError::LoadFailed(source) => source.user_message("Failed to load preset"),
            other => other.to_string(),
        }
    }
}
