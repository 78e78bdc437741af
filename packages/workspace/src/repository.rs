//! Backend collaborators
//!
//! The session talks to three remote services: page storage, company
//! settings, and publishing. Each is an async trait so the transport can be
//! swapped out; in-memory implementations back the tests and the CLI.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use layoutlab_editor::{Page, PageId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;

/// Tenant identifier; every backend call is scoped to one company
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server rejected request with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl RepositoryError {
    /// Message supplied by the server, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RepositoryError::Rejected {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Server message, then the transport's own message, then `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            RepositoryError::Transport(message) if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSettingsOptions {
    pub publish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatus {
    pub is_live: bool,
}

#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn list_pages(&self, company: &CompanyId) -> RepositoryResult<Vec<Page>>;

    /// Persist `page` and return the server's representation of it
    async fn update_page(
        &self,
        company: &CompanyId,
        page_id: &PageId,
        page: &Page,
    ) -> RepositoryResult<Page>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_settings(&self, company: &CompanyId) -> RepositoryResult<Value>;

    /// Save a partial settings object; returns the stored settings
    async fn save_settings(
        &self,
        company: &CompanyId,
        partial: Value,
        options: SaveSettingsOptions,
    ) -> RepositoryResult<Value>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, company: &CompanyId, live: bool) -> RepositoryResult<PublishStatus>;
}

/// Page storage held in memory, one list per company
///
/// Saved pages get a server-side `revision` counter, standing in for the
/// derived fields a real backend adds.
#[derive(Debug, Default)]
pub struct InMemoryPageRepository {
    pages: Mutex<HashMap<CompanyId, Vec<Page>>>,
}

impl InMemoryPageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, company: &CompanyId, page: Page) {
        self.pages
            .lock()
            .await
            .entry(company.clone())
            .or_default()
            .push(page);
    }

    pub async fn get(&self, company: &CompanyId, page_id: &PageId) -> Option<Page> {
        let pages = self.pages.lock().await;
        pages
            .get(company)?
            .iter()
            .find(|p| p.id.as_ref() == Some(page_id))
            .cloned()
    }
}

#[async_trait]
impl PageRepository for InMemoryPageRepository {
    async fn list_pages(&self, company: &CompanyId) -> RepositoryResult<Vec<Page>> {
        Ok(self
            .pages
            .lock()
            .await
            .get(company)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_page(
        &self,
        company: &CompanyId,
        page_id: &PageId,
        page: &Page,
    ) -> RepositoryResult<Page> {
        let mut pages = self.pages.lock().await;
        let list = pages.entry(company.clone()).or_default();
        let slot = list
            .iter_mut()
            .find(|p| p.id.as_ref() == Some(page_id))
            .ok_or_else(|| RepositoryError::NotFound(format!("page {}", page_id)))?;

        let revision = slot
            .extra
            .get("revision")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let mut stored = page.clone();
        stored.id = Some(page_id.clone());
        stored
            .extra
            .insert("revision".to_string(), Value::from(revision + 1));
        *slot = stored.clone();

        tracing::debug!("[InMemoryPages] page_id={} revision={}", page_id, revision + 1);
        Ok(stored)
    }
}

/// Settings held in memory; saves shallow-merge top-level keys
#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    settings: Mutex<HashMap<CompanyId, Map<String, Value>>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a company's settings wholesale
    pub async fn seed(&self, company: &CompanyId, settings: Map<String, Value>) {
        self.settings.lock().await.insert(company.clone(), settings);
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get_settings(&self, company: &CompanyId) -> RepositoryResult<Value> {
        let settings = self.settings.lock().await;
        Ok(Value::Object(settings.get(company).cloned().unwrap_or_default()))
    }

    async fn save_settings(
        &self,
        company: &CompanyId,
        partial: Value,
        _options: SaveSettingsOptions,
    ) -> RepositoryResult<Value> {
        let Value::Object(partial) = partial else {
            return Err(RepositoryError::Malformed(
                "settings payload must be an object".to_string(),
            ));
        };

        let mut settings = self.settings.lock().await;
        let stored = settings.entry(company.clone()).or_default();
        for (key, value) in partial {
            stored.insert(key, value);
        }

        Ok(Value::Object(stored.clone()))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    live: Mutex<HashMap<CompanyId, bool>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_live(&self, company: &CompanyId) -> bool {
        self.live
            .lock()
            .await
            .get(company)
            .copied()
            .unwrap_or(false)
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn publish(&self, company: &CompanyId, live: bool) -> RepositoryResult<PublishStatus> {
        self.live.lock().await.insert(company.clone(), live);
        Ok(PublishStatus { is_live: live })
    }
}
