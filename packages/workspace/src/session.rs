//! # Live Page Session
//!
//! Orchestrates one editing session against a company's live pages.
//!
//! ## Lifecycle
//!
//! ```text
//! Unloaded ──load_live_page──▶ Loaded ──edit──▶ Dirty ──begin_save──▶ Saving
//!     ▲                          ▲                 ▲                     │
//!     │                          └──── success ────┼─────────────────────┤
//!     │                                            └────── failure ──────┘
//!     └── select a different page (from any state)
//! ```
//!
//! Page saves are split into [`begin_save`](LivePageSession::begin_save) and
//! [`complete_save`](LivePageSession::complete_save) so a caller can keep
//! working while the request is out. A response that arrives after the user
//! moved to another page is discarded instead of clobbering the new page.
//! Edits made while the request is out survive it: the page stays `Dirty`
//! and only the page list takes the server's copy.
//!
//! Page and preset operations are independent: neither waits on the other,
//! and they report on separate status channels.

use std::sync::Arc;

use layoutlab_common::KeyValueStore;
use layoutlab_editor::{
    apply_patch, apply_section_patch_with, build_meta_patch, build_props_patch, builtin_preset,
    demo_page, ensure_section_ids, revert_change, serialize_page, DiffEntry, KnobState, Page,
    PageId, PatchFields, Preset, RenderInput, Scope, Snapshot,
};
use serde_json::{json, Map, Value};

use crate::errors::{SessionError, SessionResult};
use crate::presets::{
    BackendPresetOptions, BackendPresetStore, LoadMode, LocalPresetCache, NamedPreset,
    PresetError, LOCAL_PRESET_KEY,
};
use crate::repository::{
    CompanyId, PageRepository, PublishStatus, Publisher, RepositoryError, SaveSettingsOptions,
    SettingsRepository,
};
use crate::status::{Channel, StatusBoard};

/// Remote services the session talks to
#[derive(Clone)]
pub struct Collaborators {
    pub pages: Arc<dyn PageRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub publisher: Arc<dyn Publisher>,
}

impl Collaborators {
    pub fn new(
        pages: Arc<dyn PageRepository>,
        settings: Arc<dyn SettingsRepository>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            pages,
            settings,
            publisher,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub local_key: String,
    pub backend: BackendPresetOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            local_key: LOCAL_PRESET_KEY.to_string(),
            backend: BackendPresetOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loaded,
    Dirty,
    Saving,
}

/// Where knob-derived props are pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyTarget {
    PageMeta,
    /// The currently selected section
    Selected,
    All,
    OfType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Nothing to apply to, or the page was already in that state
    Noop,
}

/// An outstanding page save
#[derive(Debug, Clone)]
pub struct SaveTicket {
    token: u64,
    page_id: PageId,
    payload: Page,
}

impl SaveTicket {
    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    /// Serialized page to send to the backend
    pub fn payload(&self) -> &Page {
        &self.payload
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The backend stored the page; the working page holds this copy unless
    /// it was edited while the save was out
    Saved(Page),
    /// The response no longer matches the loaded page and was dropped
    Discarded,
}

/// Result of saving the backend preset and then the page
///
/// The page save runs even when the preset save fails; `page` is `None`
/// when no live page was loaded.
#[derive(Debug)]
pub struct CompoundSave {
    pub preset: SessionResult<Preset>,
    pub page: Option<SessionResult<SaveOutcome>>,
}

/// Bookkeeping for the save that is currently out
#[derive(Debug, Clone, Copy)]
struct InFlight {
    token: u64,
    /// Edit count of the working page the payload was taken from
    edits: u64,
}

pub struct LivePageSession {
    collaborators: Collaborators,
    local: LocalPresetCache,
    backend: BackendPresetStore,

    company: Option<CompanyId>,
    pages: Vec<Page>,
    selected_page: Option<PageId>,
    working: Option<Page>,
    selected_section: Option<usize>,
    state: SessionState,

    knobs: KnobState,
    snapshot: Option<Snapshot>,
    status: StatusBoard,

    in_flight: Option<InFlight>,
    next_token: u64,
    edits: u64,
}

impl LivePageSession {
    pub fn new(collaborators: Collaborators, store: Box<dyn KeyValueStore + Send>) -> Self {
        Self::with_options(collaborators, store, SessionOptions::default())
    }

    /// Knobs start from the locally cached preset when one exists
    pub fn with_options(
        collaborators: Collaborators,
        store: Box<dyn KeyValueStore + Send>,
        options: SessionOptions,
    ) -> Self {
        let local = LocalPresetCache::with_key(store, options.local_key);
        let knobs = local
            .load()
            .map(|preset| KnobState::from_preset(&preset))
            .unwrap_or_default();
        let backend = BackendPresetStore::new(collaborators.settings.clone(), options.backend);

        Self {
            collaborators,
            local,
            backend,
            company: None,
            pages: Vec::new(),
            selected_page: None,
            working: None,
            selected_section: None,
            state: SessionState::Unloaded,
            knobs,
            snapshot: None,
            status: StatusBoard::new(),
            in_flight: None,
            next_token: 0,
            edits: 0,
        }
    }

    // ========== Accessors ==========

    pub fn company(&self) -> Option<&CompanyId> {
        self.company.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn selected_page_id(&self) -> Option<&PageId> {
        self.selected_page.as_ref()
    }

    pub fn working_page(&self) -> Option<&Page> {
        self.working.as_ref()
    }

    pub fn selected_section(&self) -> Option<usize> {
        self.selected_section
    }

    pub fn knobs(&self) -> &KnobState {
        &self.knobs
    }

    pub fn knobs_mut(&mut self) -> &mut KnobState {
        &mut self.knobs
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusBoard {
        &mut self.status
    }

    pub fn local_presets(&self) -> &LocalPresetCache {
        &self.local
    }

    /// The working page, or a demo page built from the knobs when none is loaded
    pub fn preview_page(&self) -> Page {
        match &self.working {
            Some(page) => page.clone(),
            None => demo_page(&self.knobs),
        }
    }

    pub fn render_input(&self) -> RenderInput {
        self.preview_page().render_input()
    }

    pub fn device_width(&self) -> u32 {
        self.knobs.device.width()
    }

    // ========== Page selection ==========

    /// Switching company drops everything tied to the previous one
    pub fn set_company(&mut self, company: Option<CompanyId>) {
        if self.company == company {
            return;
        }
        self.company = company;
        self.pages.clear();
        self.selected_page = None;
        self.unload();
    }

    pub async fn load_pages(&mut self) -> SessionResult<usize> {
        let company = self.company.clone().ok_or(SessionError::NoCompany)?;

        match self.collaborators.pages.list_pages(&company).await {
            Ok(pages) => {
                self.pages = pages.iter().map(ensure_section_ids).collect();
                if self.selected_page.is_none() {
                    self.selected_page = self.pages.first().and_then(|p| p.id.clone());
                }
                tracing::info!("[LoadPages] company={} count={}", company, self.pages.len());
                Ok(self.pages.len())
            }
            Err(source) => {
                let message = source.user_message("Failed to load pages");
                tracing::error!("[LoadPages] company={} failed: {}", company, source);
                self.status.error(Channel::Page, message.clone());
                Err(SessionError::LoadFailure { message, source })
            }
        }
    }

    /// Selecting a page other than the loaded one unloads the working page
    pub fn select_page(&mut self, page_id: PageId) {
        if self.selected_page.as_ref() == Some(&page_id) {
            return;
        }

        let loaded = self.working.as_ref().and_then(|p| p.id.as_ref());
        if loaded != Some(&page_id) {
            self.unload();
        }
        self.selected_page = Some(page_id);
    }

    /// Copy the selected page from the list into the working slot
    pub fn load_live_page(&mut self) -> SessionResult<()> {
        let page_id = self
            .selected_page
            .clone()
            .ok_or(SessionError::NoPageSelected)?;
        let page = self
            .pages
            .iter()
            .find(|p| p.id.as_ref() == Some(&page_id))
            .ok_or_else(|| SessionError::PageNotFound(page_id.clone()))?;
        let reloading = self.working.as_ref().and_then(|p| p.id.as_ref()) == Some(&page_id);

        self.working = Some(ensure_section_ids(page));
        self.selected_section = None;
        self.snapshot = None;

        // A pending save for the same page still settles into the reloaded copy
        let edits = self.edits;
        self.in_flight = self
            .in_flight
            .take()
            .filter(|_| reloading)
            .map(|flight| InFlight { edits, ..flight });
        self.state = if self.in_flight.is_some() {
            SessionState::Saving
        } else {
            SessionState::Loaded
        };

        tracing::info!("[LoadLivePage] page_id={}", page_id);
        Ok(())
    }

    /// Returns `false` when the index is past the end of the working page
    pub fn select_section(&mut self, index: Option<usize>) -> bool {
        match index {
            None => {
                self.selected_section = None;
                true
            }
            Some(index) => {
                let in_range = self
                    .working
                    .as_ref()
                    .is_some_and(|page| index < page.sections().len());
                if in_range {
                    self.selected_section = Some(index);
                }
                in_range
            }
        }
    }

    fn unload(&mut self) {
        self.working = None;
        self.selected_section = None;
        self.snapshot = None;
        self.in_flight = None;
        self.state = SessionState::Unloaded;
    }

    // ========== Editing ==========

    /// Push the current knob values into the working page
    pub fn apply_knobs(&mut self, target: ApplyTarget) -> ApplyOutcome {
        let Some(page) = self.working.as_ref() else {
            return ApplyOutcome::Noop;
        };

        let scope = match target {
            ApplyTarget::PageMeta => {
                let next = apply_patch(page, &Scope::PageMeta, &build_meta_patch(&self.knobs));
                return self.replace_working(next);
            }
            ApplyTarget::Selected => match self.selected_section {
                Some(index) => Scope::Selected(i64::try_from(index).unwrap_or(i64::MAX)),
                None => return ApplyOutcome::Noop,
            },
            ApplyTarget::All => Scope::All,
            ApplyTarget::OfType(tag) => Scope::OfType(tag),
        };

        let knobs = &self.knobs;
        let next = apply_section_patch_with(page, &scope, |section| {
            build_props_patch(&section.section_type, knobs)
        });
        self.replace_working(next)
    }

    pub fn apply_patch(&mut self, scope: &Scope, fields: &PatchFields) -> ApplyOutcome {
        let Some(page) = self.working.as_ref() else {
            return ApplyOutcome::Noop;
        };
        let next = apply_patch(page, scope, fields);
        self.replace_working(next)
    }

    /// Apply the stored defaults for `section_type` to every section of that type
    pub fn apply_type_defaults(&mut self, section_type: &str) -> ApplyOutcome {
        let Some(fields) = self.local.type_default(section_type) else {
            return ApplyOutcome::Noop;
        };
        self.apply_patch(&Scope::OfType(section_type.to_string()), &fields)
    }

    /// Store the current knob props as the defaults for `section_type`
    pub fn save_knobs_as_type_default(&mut self, section_type: &str) -> SessionResult<()> {
        let props: Map<String, Value> = build_props_patch(section_type, &self.knobs)
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        let result = self.local.save_type_default(section_type, props);
        self.report_preset(result, format!("Saved defaults for {}.", section_type))
    }

    fn replace_working(&mut self, next: Page) -> ApplyOutcome {
        if self.working.as_ref() == Some(&next) {
            return ApplyOutcome::Noop;
        }
        self.working = Some(next);
        self.edits += 1;
        if self.state != SessionState::Saving {
            self.state = SessionState::Dirty;
        }
        ApplyOutcome::Applied
    }

    // ========== Snapshot ==========

    /// Returns `false` when there is no working page to copy
    pub fn take_snapshot(&mut self) -> bool {
        match &self.working {
            Some(page) => {
                self.snapshot = Some(Snapshot::take(page));
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn discard_snapshot(&mut self) {
        self.snapshot = None;
    }

    /// Changes since the snapshot; empty without a snapshot or working page
    pub fn changes(&self) -> Vec<DiffEntry> {
        match (&self.snapshot, &self.working) {
            (Some(snapshot), Some(page)) => snapshot.diff(page),
            _ => Vec::new(),
        }
    }

    pub fn revert_change(&mut self, entry: &DiffEntry) -> ApplyOutcome {
        let Some(page) = self.working.as_ref() else {
            return ApplyOutcome::Noop;
        };
        let next = revert_change(page, entry);
        self.replace_working(next)
    }

    // ========== Page persistence ==========

    /// Mark the working page as saving and hand out its payload
    pub fn begin_save(&mut self) -> SessionResult<SaveTicket> {
        if self.company.is_none() {
            return Err(self.page_error(SessionError::NoCompany));
        }
        if self.in_flight.is_some() {
            return Err(SessionError::SaveInFlight);
        }

        let Some((page_id, payload)) = self
            .working
            .as_ref()
            .and_then(|page| Some((page.id.clone()?, serialize_page(page))))
        else {
            return Err(self.page_error(SessionError::NoLivePage));
        };

        let token = self.next_token;
        self.next_token += 1;
        self.in_flight = Some(InFlight {
            token,
            edits: self.edits,
        });
        self.state = SessionState::Saving;

        tracing::info!("[SavePage] page_id={} token={}", page_id, token);
        Ok(SaveTicket {
            token,
            page_id,
            payload,
        })
    }

    /// Settle a save started with [`begin_save`](Self::begin_save)
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Page, RepositoryError>,
    ) -> SessionResult<SaveOutcome> {
        let flight = self.in_flight.filter(|flight| flight.token == ticket.token);
        let current = flight.is_some()
            && self.working.as_ref().and_then(|p| p.id.as_ref()) == Some(&ticket.page_id);

        match result {
            Ok(saved) => {
                let mut saved = ensure_section_ids(&saved);
                if saved.id.is_none() {
                    saved.id = Some(ticket.page_id.clone());
                }
                self.sync_page_list(&saved);

                if !current {
                    tracing::info!("[SavePage] page_id={} stale response discarded", ticket.page_id);
                    return Ok(SaveOutcome::Discarded);
                }

                self.in_flight = None;
                self.status.success(Channel::Page, "Page saved.");

                if flight.is_some_and(|flight| flight.edits != self.edits) {
                    tracing::info!(
                        "[SavePage] page_id={} saved, keeping edits made during the save",
                        ticket.page_id
                    );
                    self.state = SessionState::Dirty;
                    return Ok(SaveOutcome::Saved(saved));
                }

                self.working = Some(saved.clone());
                self.state = SessionState::Loaded;
                tracing::info!("[SavePage] page_id={} saved", ticket.page_id);
                Ok(SaveOutcome::Saved(saved))
            }

            Err(source) => {
                let message = source.user_message("Failed to save page");
                tracing::error!("[SavePage] page_id={} failed: {}", ticket.page_id, source);

                if current {
                    self.in_flight = None;
                    self.state = SessionState::Dirty;
                }
                self.status.error(Channel::Page, message.clone());
                Err(SessionError::SaveFailure { message, source })
            }
        }
    }

    pub async fn save(&mut self) -> SessionResult<SaveOutcome> {
        let ticket = self.begin_save()?;
        let company = self.company.clone().ok_or(SessionError::NoCompany)?;

        let result = self
            .collaborators
            .pages
            .update_page(&company, &ticket.page_id, &ticket.payload)
            .await;

        self.complete_save(ticket, result)
    }

    pub async fn apply_and_save(&mut self, target: ApplyTarget) -> SessionResult<SaveOutcome> {
        self.apply_knobs(target);
        self.save().await
    }

    /// Save the working page, then set the site live
    pub async fn publish(&mut self) -> SessionResult<PublishStatus> {
        self.save().await?;
        let company = self.company.clone().ok_or(SessionError::NoCompany)?;

        match self.collaborators.publisher.publish(&company, true).await {
            Ok(status) => {
                tracing::info!("[Publish] company={} live={}", company, status.is_live);
                self.status.success(Channel::Page, "Page saved and published.");
                Ok(status)
            }
            Err(source) => {
                let message = source.user_message("Failed to publish");
                tracing::error!("[Publish] company={} failed: {}", company, source);
                let error = SessionError::PublishFailure { message, source };
                self.status.error(Channel::Page, error.to_string());
                Err(error)
            }
        }
    }

    pub async fn save_theme_overrides(&mut self, overrides: Value) -> SessionResult<()> {
        let company = self
            .company
            .clone()
            .ok_or_else(|| self.page_error(SessionError::NoCompany))?;

        let result = self
            .collaborators
            .settings
            .save_settings(
                &company,
                json!({ "theme_overrides": overrides }),
                SaveSettingsOptions { publish: false },
            )
            .await;

        match result {
            Ok(_) => {
                self.status.success(Channel::Page, "Theme overrides saved.");
                Ok(())
            }
            Err(source) => {
                let message = source.user_message("Failed to save theme");
                self.status.error(Channel::Page, message.clone());
                Err(SessionError::ThemeSaveFailure { message, source })
            }
        }
    }

    /// Replace the matching list entry, or put a new page at the front
    fn sync_page_list(&mut self, saved: &Page) {
        match self.pages.iter_mut().find(|p| p.id == saved.id) {
            Some(slot) => *slot = saved.clone(),
            None => self.pages.insert(0, saved.clone()),
        }
    }

    fn page_error(&mut self, error: SessionError) -> SessionError {
        self.status.error(Channel::Page, error.to_string());
        error
    }

    // ========== Presets ==========

    pub fn save_preset_local(&mut self) -> SessionResult<()> {
        let result = self.local.save(&self.knobs.to_preset());
        self.report_preset(result, "Saved preset locally.")
    }

    /// Returns `false` when no local preset is stored
    pub fn load_preset_local(&mut self) -> bool {
        match self.local.load() {
            Some(preset) => {
                self.knobs = KnobState::from_preset(&preset);
                true
            }
            None => false,
        }
    }

    /// Apply a built-in layout preset and remember it locally
    pub fn apply_builtin_preset(&mut self, name: &str) -> SessionResult<bool> {
        let Some(preset) = builtin_preset(name) else {
            return Ok(false);
        };
        self.knobs.apply_layout_preset(preset);
        self.save_preset_local()?;
        Ok(true)
    }

    pub fn named_presets(&self) -> Vec<NamedPreset> {
        self.local.library()
    }

    pub fn save_named_preset(&mut self, name: Option<&str>) -> SessionResult<NamedPreset> {
        let result = self.local.save_named(name, &self.knobs.to_preset());
        let message = match &result {
            Ok(entry) => format!("Saved preset {}.", entry.name),
            Err(_) => String::new(),
        };
        self.report_preset(result, message)
    }

    /// Load a library preset into the knobs and make it the local preset
    pub fn load_named_preset(&mut self, id: &str) -> SessionResult<bool> {
        let Some(entry) = self.local.load_named(id) else {
            return Ok(false);
        };
        self.knobs = KnobState::from_preset(&entry.data);
        let result = self.local.save(&entry.data);
        self.report_preset(result, format!("Loaded preset {}.", entry.name))?;
        Ok(true)
    }

    /// Save the knobs to the backend; on success the knobs follow what the
    /// backend actually stored
    pub async fn save_preset_backend(&mut self) -> SessionResult<Preset> {
        let Some(company) = self.company.clone() else {
            return Err(self.preset_error(SessionError::NoCompany));
        };

        let preset = self.knobs.to_preset();
        match self.backend.save(&company, &preset).await {
            Ok(stored) => {
                self.knobs = KnobState::from_preset(&stored);
                self.status.success(Channel::Preset, "Preset saved to backend.");
                Ok(stored)
            }
            Err(error) => {
                self.status.error(Channel::Preset, error.user_message());
                Err(error.into())
            }
        }
    }

    /// Quiet loads post no notices and treat a missing preset as `Ok(None)`
    pub async fn load_preset_backend(&mut self, mode: LoadMode) -> SessionResult<Option<Preset>> {
        let reporting = mode == LoadMode::Reporting;

        let Some(company) = self.company.clone() else {
            if reporting {
                return Err(self.preset_error(SessionError::NoCompany));
            }
            return Err(SessionError::NoCompany);
        };

        match self.backend.load(&company, mode).await {
            Ok(Some(preset)) => {
                self.knobs = KnobState::from_preset(&preset);
                if reporting {
                    self.status.success(Channel::Preset, "Preset loaded from backend.");
                }
                Ok(Some(preset))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                if reporting {
                    self.status.error(Channel::Preset, error.user_message());
                }
                Err(error.into())
            }
        }
    }

    /// Save the backend preset, then the page; a failure of either is
    /// reported without stopping the other
    pub async fn save_preset_then_page(&mut self) -> CompoundSave {
        let preset = self.save_preset_backend().await;

        let page = match self.working {
            Some(_) => Some(self.save().await),
            None => None,
        };

        if let Some(Err(error)) = &page {
            tracing::warn!("[SavePresetThenPage] page save failed after preset: {}", error);
        }

        CompoundSave { preset, page }
    }

    fn report_preset<T>(
        &mut self,
        result: Result<T, PresetError>,
        success: impl Into<String>,
    ) -> SessionResult<T> {
        match result {
            Ok(value) => {
                self.status.success(Channel::Preset, success);
                Ok(value)
            }
            Err(error) => {
                self.status.error(Channel::Preset, error.user_message());
                Err(error.into())
            }
        }
    }

    fn preset_error(&mut self, error: SessionError) -> SessionError {
        self.status.error(Channel::Preset, error.to_string());
        error
    }
}
