//! Backend preset tier
//!
//! The preset is stored inside the company settings document. Backends
//! differ in where they keep extra fields, so the preset is written to every
//! configured shape at once:
//!
//! ```text
//! { "layout_lab_preset": P,
//!   "settings": { ..., "layout_lab_preset": P },
//!   "website":  { ..., "layout_lab_preset": P } }
//! ```
//!
//! Saving is a read-merge-write-verify sequence. The backend may replace
//! the whole settings object on write, so the current settings are fetched
//! first and every unrelated key is carried through. The stored value is
//! then read back; a save only counts once the preset is visible there.

use std::fmt;
use std::sync::Arc;

use layoutlab_editor::Preset;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PresetError;
use crate::repository::{CompanyId, SaveSettingsOptions, SettingsRepository};

pub const BACKEND_PRESET_FIELD: &str = "layout_lab_preset";

/// Where inside the settings document the preset is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresetShape {
    /// Top level of the settings object
    Root,
    /// Nested under `settings`
    Settings,
    /// Nested under `website`
    Website,
}

impl PresetShape {
    pub const ALL: [PresetShape; 3] = [PresetShape::Root, PresetShape::Settings, PresetShape::Website];

    fn container(&self) -> Option<&'static str> {
        match self {
            PresetShape::Root => None,
            PresetShape::Settings => Some("settings"),
            PresetShape::Website => Some("website"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPresetOptions {
    #[serde(default = "default_field")]
    pub field: String,

    #[serde(default = "default_shapes")]
    pub shapes: Vec<PresetShape>,
}

fn default_field() -> String {
    BACKEND_PRESET_FIELD.to_string()
}

fn default_shapes() -> Vec<PresetShape> {
    PresetShape::ALL.to_vec()
}

impl Default for BackendPresetOptions {
    fn default() -> Self {
        Self {
            field: default_field(),
            shapes: default_shapes(),
        }
    }
}

/// Merge `preset` into every configured shape, keeping all other keys
///
/// A non-object base is treated as empty, and a non-object container is
/// replaced by one holding only the preset.
pub fn merge_preset(settings: &Value, preset: &Value, options: &BackendPresetOptions) -> Value {
    let mut merged = settings.as_object().cloned().unwrap_or_default();

    for shape in &options.shapes {
        match shape.container() {
            None => {
                merged.insert(options.field.clone(), preset.clone());
            }
            Some(container) => {
                let mut inner = merged
                    .get(container)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_else(Map::new);
                inner.insert(options.field.clone(), preset.clone());
                merged.insert(container.to_string(), Value::Object(inner));
            }
        }
    }

    Value::Object(merged)
}

/// First non-null preset found, checking shapes in configured order
pub fn find_preset<'a>(settings: &'a Value, options: &BackendPresetOptions) -> Option<&'a Value> {
    options.shapes.iter().find_map(|shape| {
        let holder = match shape.container() {
            None => settings,
            Some(container) => settings.get(container)?,
        };
        holder.get(&options.field).filter(|v| !v.is_null())
    })
}

/// Steps of a backend preset save, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStep {
    Fetch,
    Merge,
    Write,
    ReadBack,
    Verify,
    Done,
}

impl fmt::Display for SaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveStep::Fetch => "fetch",
            SaveStep::Merge => "merge",
            SaveStep::Write => "write",
            SaveStep::ReadBack => "read-back",
            SaveStep::Verify => "verify",
            SaveStep::Done => "done",
        };
        f.write_str(name)
    }
}

/// How absence of a backend preset is reported on load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Absence is a normal empty result (background checks)
    Quiet,
    /// Absence is an error the user should see
    #[default]
    Reporting,
}

/// One backend preset save, driven a step at a time
pub struct PresetSaveSaga<'a> {
    settings: &'a dyn SettingsRepository,
    company: &'a CompanyId,
    options: &'a BackendPresetOptions,
    preset: Value,
    step: SaveStep,
    fetched: Option<Value>,
    merged: Option<Value>,
    read_back: Option<Value>,
    verified: Option<Preset>,
}

impl<'a> PresetSaveSaga<'a> {
    pub fn new(
        settings: &'a dyn SettingsRepository,
        company: &'a CompanyId,
        options: &'a BackendPresetOptions,
        preset: &Preset,
    ) -> Self {
        Self {
            settings,
            company,
            options,
            preset: preset.to_value(),
            step: SaveStep::Fetch,
            fetched: None,
            merged: None,
            read_back: None,
            verified: None,
        }
    }

    /// Step that runs on the next [`advance`](Self::advance)
    pub fn step(&self) -> SaveStep {
        self.step
    }

    /// Payload that the write step sends, once merged
    pub fn merged(&self) -> Option<&Value> {
        self.merged.as_ref()
    }

    /// Run the current step; returns the step that runs next
    ///
    /// A failed step leaves the saga where it was.
    pub async fn advance(&mut self) -> Result<SaveStep, PresetError> {
        match self.step {
            SaveStep::Fetch => {
                let current = self
                    .settings
                    .get_settings(self.company)
                    .await
                    .map_err(|source| self.transport(source))?;
                self.fetched = Some(current);
                self.step = SaveStep::Merge;
            }

            SaveStep::Merge => {
                let base = self.fetched.take().unwrap_or_default();
                self.merged = Some(merge_preset(&base, &self.preset, self.options));
                self.step = SaveStep::Write;
            }

            SaveStep::Write => {
                let payload = self.merged.clone().unwrap_or_default();
                self.settings
                    .save_settings(self.company, payload, SaveSettingsOptions { publish: false })
                    .await
                    .map_err(|source| self.transport(source))?;
                self.step = SaveStep::ReadBack;
            }

            SaveStep::ReadBack => {
                let stored = self
                    .settings
                    .get_settings(self.company)
                    .await
                    .map_err(|source| self.transport(source))?;
                self.read_back = Some(stored);
                self.step = SaveStep::Verify;
            }

            SaveStep::Verify => {
                let found = self
                    .read_back
                    .as_ref()
                    .and_then(|stored| find_preset(stored, self.options))
                    .cloned();

                let Some(found) = found else {
                    tracing::warn!(
                        "[PresetSave] company={} preset missing from read-back",
                        self.company
                    );
                    return Err(PresetError::Verification);
                };

                self.verified = Some(Preset::from_value(found)?);
                self.step = SaveStep::Done;
            }

            SaveStep::Done => {}
        }

        Ok(self.step)
    }

    /// Run every remaining step; yields the preset as the backend stored it
    pub async fn run(mut self) -> Result<Preset, PresetError> {
        while self.step != SaveStep::Done {
            self.advance().await?;
        }
        self.verified.ok_or(PresetError::Verification)
    }

    fn transport(&self, source: crate::repository::RepositoryError) -> PresetError {
        tracing::warn!(
            "[PresetSave] company={} step={} failed: {}",
            self.company,
            self.step,
            source
        );
        PresetError::Transport {
            step: self.step,
            source,
        }
    }
}

/// Backend preset persistence for one settings service
#[derive(Clone)]
pub struct BackendPresetStore {
    settings: Arc<dyn SettingsRepository>,
    options: BackendPresetOptions,
}

impl BackendPresetStore {
    pub fn new(settings: Arc<dyn SettingsRepository>, options: BackendPresetOptions) -> Self {
        Self { settings, options }
    }

    pub fn options(&self) -> &BackendPresetOptions {
        &self.options
    }

    pub fn saga<'a>(&'a self, company: &'a CompanyId, preset: &Preset) -> PresetSaveSaga<'a> {
        PresetSaveSaga::new(&*self.settings, company, &self.options, preset)
    }

    pub async fn save(&self, company: &CompanyId, preset: &Preset) -> Result<Preset, PresetError> {
        tracing::info!("[PresetSave] company={} shapes={:?}", company, self.options.shapes);
        let stored = self.saga(company, preset).run().await?;
        tracing::info!("[PresetSave] company={} verified", company);
        Ok(stored)
    }

    /// Look up the stored preset; see [`LoadMode`] for how absence is treated
    pub async fn load(
        &self,
        company: &CompanyId,
        mode: LoadMode,
    ) -> Result<Option<Preset>, PresetError> {
        let settings = self
            .settings
            .get_settings(company)
            .await
            .map_err(PresetError::LoadFailed)?;

        match find_preset(&settings, &self.options) {
            Some(found) => Ok(Some(Preset::from_value(found.clone())?)),
            None => match mode {
                LoadMode::Quiet => Ok(None),
                LoadMode::Reporting => Err(PresetError::NotFound),
            },
        }
    }
}
