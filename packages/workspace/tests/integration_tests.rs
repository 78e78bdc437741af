//! End-to-end session tests against in-memory backends
//!
//! This tests:
//! - Page load, edit, save and publish flows
//! - Backend preset saves that must keep foreign settings keys
//! - Failure reporting on the page and preset channels

use std::sync::Arc;

use async_trait::async_trait;
use layoutlab_common::MemoryStore;
use layoutlab_editor::{Density, Page, PageId, Section};
use layoutlab_workspace::{
    ApplyTarget, Channel, Collaborators, CompanyId, InMemoryPageRepository, InMemoryPublisher,
    InMemorySettingsRepository, LivePageSession, LoadMode, PageRepository, PresetError,
    PublishStatus, Publisher, RepositoryError, RepositoryResult, SaveOutcome, SaveSettingsOptions,
    SessionError, SessionState, SettingsRepository,
};
use serde_json::{json, Map, Value};

fn acme() -> CompanyId {
    CompanyId::new("acme")
}

fn landing() -> Page {
    Page::new(42_i64)
        .with_meta("sectionSpacing", json!(6))
        .with_section(Section::new("hero").with_prop("heading", json!("Welcome")))
        .with_section(Section::new("gallery"))
}

struct Backend {
    pages: Arc<InMemoryPageRepository>,
    settings: Arc<InMemorySettingsRepository>,
    publisher: Arc<InMemoryPublisher>,
}

impl Backend {
    async fn new() -> Self {
        let pages = Arc::new(InMemoryPageRepository::new());
        pages.insert(&acme(), landing()).await;

        let settings = Arc::new(InMemorySettingsRepository::new());
        let mut seeded = Map::new();
        seeded.insert("foo".into(), json!(1));
        seeded.insert("settings".into(), json!({ "theme": "dark" }));
        settings.seed(&acme(), seeded).await;

        Self {
            pages,
            settings,
            publisher: Arc::new(InMemoryPublisher::new()),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.pages.clone(),
            self.settings.clone(),
            self.publisher.clone(),
        )
    }
}

async fn open(collaborators: Collaborators) -> LivePageSession {
    let mut session = LivePageSession::new(collaborators, Box::new(MemoryStore::new()));
    session.set_company(Some(acme()));
    session.load_pages().await.unwrap();
    session.load_live_page().unwrap();
    session
}

struct RejectingPublisher;

#[async_trait]
impl Publisher for RejectingPublisher {
    async fn publish(&self, _company: &CompanyId, _live: bool) -> RepositoryResult<PublishStatus> {
        Err(RepositoryError::Rejected {
            status: 403,
            message: Some("Plan does not allow publishing".into()),
        })
    }
}

/// Lists pages but refuses every update
struct ReadOnlyPages(Arc<InMemoryPageRepository>);

#[async_trait]
impl PageRepository for ReadOnlyPages {
    async fn list_pages(&self, company: &CompanyId) -> RepositoryResult<Vec<Page>> {
        self.0.list_pages(company).await
    }

    async fn update_page(
        &self,
        _company: &CompanyId,
        _page_id: &PageId,
        _page: &Page,
    ) -> RepositoryResult<Page> {
        Err(RepositoryError::Transport("network down".into()))
    }
}

/// Accepts settings writes but silently drops unknown fields
struct StrictSettings(Arc<InMemorySettingsRepository>);

#[async_trait]
impl SettingsRepository for StrictSettings {
    async fn get_settings(&self, company: &CompanyId) -> RepositoryResult<Value> {
        self.0.get_settings(company).await
    }

    async fn save_settings(
        &self,
        company: &CompanyId,
        partial: Value,
        options: SaveSettingsOptions,
    ) -> RepositoryResult<Value> {
        let kept: Map<String, Value> = partial
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| key.as_str() == "foo" || key.as_str() == "theme_overrides")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        self.0.save_settings(company, Value::Object(kept), options).await
    }
}

#[tokio::test]
async fn test_edit_save_persists_ids_and_props() {
    let backend = Backend::new().await;
    let mut session = open(backend.collaborators()).await;

    session.knobs_mut().gutter_x = 24;
    session.apply_knobs(ApplyTarget::All);
    assert_eq!(session.state(), SessionState::Dirty);

    let outcome = session.save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    assert_eq!(session.state(), SessionState::Loaded);

    let stored = backend.pages.get(&acme(), &PageId::from(42_i64)).await.unwrap();
    assert_eq!(stored.extra.get("revision"), Some(&json!(1)));
    assert!(stored.sections().iter().all(|s| s.has_id()));
    assert!(stored
        .sections()
        .iter()
        .all(|s| s.props.get("gutterX") == Some(&json!(24))));
    assert_eq!(stored.sections()[0].props.get("heading"), Some(&json!("Welcome")));

    // The working page is the server's copy, derived fields included
    assert_eq!(session.working_page(), Some(&stored));
}

#[tokio::test]
async fn test_apply_and_save_persists_applied_props() {
    let backend = Backend::new().await;
    let mut session = open(backend.collaborators()).await;

    session.knobs_mut().gutter_x = 32;
    let outcome = session.apply_and_save(ApplyTarget::All).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    assert_eq!(session.state(), SessionState::Loaded);

    let stored = backend.pages.get(&acme(), &PageId::from(42_i64)).await.unwrap();
    assert!(stored
        .sections()
        .iter()
        .all(|s| s.props.get("gutterX") == Some(&json!(32))));
    assert_eq!(session.working_page(), Some(&stored));
}

#[tokio::test]
async fn test_backend_preset_keeps_foreign_settings() {
    let backend = Backend::new().await;
    let mut session = open(backend.collaborators()).await;

    session.knobs_mut().set_density(Density::Comfortable);
    let stored = session.save_preset_backend().await.unwrap();
    assert_eq!(stored.density, Some(Density::Comfortable));

    let settings = backend.settings.get_settings(&acme()).await.unwrap();
    assert_eq!(settings["foo"], json!(1));
    assert_eq!(settings["settings"]["theme"], json!("dark"));
    assert_eq!(settings["layout_lab_preset"]["density"], json!("comfortable"));
    assert_eq!(settings["settings"]["layout_lab_preset"]["density"], json!("comfortable"));
    assert_eq!(settings["website"]["layout_lab_preset"]["density"], json!("comfortable"));

    let notice = session.status().get(Channel::Preset).unwrap();
    assert_eq!(notice.message, "Preset saved to backend.");

    // A fresh session picks the preset back up
    let mut other = open(backend.collaborators()).await;
    assert_eq!(other.knobs().density, Density::Standard);
    other.load_preset_backend(LoadMode::Reporting).await.unwrap();
    assert_eq!(other.knobs().density, Density::Comfortable);
    assert_eq!(other.knobs().section_spacing, 8);
}

#[tokio::test]
async fn test_dropped_preset_is_verification_failure() {
    let backend = Backend::new().await;
    let collaborators = Collaborators::new(
        backend.pages.clone(),
        Arc::new(StrictSettings(backend.settings.clone())),
        backend.publisher.clone(),
    );
    let mut session = open(collaborators).await;

    let result = session.save_preset_backend().await;
    assert!(matches!(
        result,
        Err(SessionError::Preset(PresetError::Verification))
    ));

    let notice = session.status().get(Channel::Preset).unwrap();
    assert!(notice.is_error());
    assert!(notice.message.contains("did not return the preset"));

    // Page channel is untouched
    assert!(session.status().get(Channel::Page).is_none());
}

#[tokio::test]
async fn test_publish_saves_then_goes_live() {
    let backend = Backend::new().await;
    let mut session = open(backend.collaborators()).await;

    session.apply_knobs(ApplyTarget::PageMeta);
    let status = session.publish().await.unwrap();

    assert!(status.is_live);
    assert!(backend.publisher.is_live(&acme()).await);
    let stored = backend.pages.get(&acme(), &PageId::from(42_i64)).await.unwrap();
    assert_eq!(stored.meta().get("layout"), Some(&json!("boxed")));
}

#[tokio::test]
async fn test_publish_failure_is_distinct_from_save_failure() {
    let backend = Backend::new().await;
    let collaborators = Collaborators::new(
        backend.pages.clone(),
        backend.settings.clone(),
        Arc::new(RejectingPublisher),
    );
    let mut session = open(collaborators).await;

    let result = session.publish().await;
    match result {
        Err(SessionError::PublishFailure { message, .. }) => {
            assert_eq!(message, "Plan does not allow publishing")
        }
        other => panic!("expected publish failure, got {:?}", other),
    }

    // The save half went through
    let stored = backend.pages.get(&acme(), &PageId::from(42_i64)).await.unwrap();
    assert_eq!(stored.extra.get("revision"), Some(&json!(1)));
    assert_eq!(session.state(), SessionState::Loaded);
}

#[tokio::test]
async fn test_save_failure_stops_publish() {
    let backend = Backend::new().await;
    let collaborators = Collaborators::new(
        Arc::new(ReadOnlyPages(backend.pages.clone())),
        backend.settings.clone(),
        backend.publisher.clone(),
    );
    let mut session = open(collaborators).await;
    session.apply_knobs(ApplyTarget::All);

    let result = session.publish().await;
    match result {
        Err(SessionError::SaveFailure { message, .. }) => assert_eq!(message, "network down"),
        other => panic!("expected save failure, got {:?}", other),
    }

    assert_eq!(session.state(), SessionState::Dirty);
    assert!(!backend.publisher.is_live(&acme()).await);
}

#[tokio::test]
async fn test_preset_failure_does_not_block_page_save() {
    let backend = Backend::new().await;
    let collaborators = Collaborators::new(
        backend.pages.clone(),
        Arc::new(StrictSettings(backend.settings.clone())),
        backend.publisher.clone(),
    );
    let mut session = open(collaborators).await;
    session.apply_knobs(ApplyTarget::All);

    let outcome = session.save_preset_then_page().await;
    assert!(outcome.preset.is_err());
    assert!(matches!(outcome.page, Some(Ok(SaveOutcome::Saved(_)))));

    assert!(session.status().get(Channel::Preset).unwrap().is_error());
    assert!(!session.status().get(Channel::Page).unwrap().is_error());
}

#[tokio::test]
async fn test_theme_overrides_merge_into_settings() {
    let backend = Backend::new().await;
    let mut session = open(backend.collaborators()).await;

    session
        .save_theme_overrides(json!({ "primary": "#3366ff" }))
        .await
        .unwrap();

    let settings = backend.settings.get_settings(&acme()).await.unwrap();
    assert_eq!(settings["theme_overrides"]["primary"], json!("#3366ff"));
    assert_eq!(settings["foo"], json!(1));
}

#[tokio::test]
async fn test_response_after_page_switch_is_dropped() {
    let backend = Backend::new().await;
    backend.pages.insert(&acme(), Page::new("contact")).await;
    let mut session = open(backend.collaborators()).await;

    session.apply_knobs(ApplyTarget::All);
    let ticket = session.begin_save().unwrap();

    // The preset channel keeps working while the page save is out
    session.save_preset_backend().await.unwrap();

    session.select_page(PageId::from("contact"));
    session.load_live_page().unwrap();

    let response = backend
        .pages
        .update_page(&acme(), ticket.page_id(), ticket.payload())
        .await;
    let outcome = session.complete_save(ticket, response).unwrap();

    assert_eq!(outcome, SaveOutcome::Discarded);
    assert_eq!(
        session.working_page().and_then(|p| p.id.clone()),
        Some(PageId::from("contact"))
    );
}

#[tokio::test]
async fn test_switching_company_resets_session() {
    let backend = Backend::new().await;
    let mut session = open(backend.collaborators()).await;
    assert!(session.take_snapshot());

    session.set_company(Some(CompanyId::new("globex")));
    assert!(session.pages().is_empty());
    assert!(session.working_page().is_none());
    assert!(session.snapshot().is_none());
    assert_eq!(session.state(), SessionState::Unloaded);

    assert_eq!(session.load_pages().await.unwrap(), 0);
    assert!(matches!(
        session.load_live_page(),
        Err(SessionError::NoPageSelected)
    ));
}
