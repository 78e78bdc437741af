//! Error types for the live page session

use layoutlab_editor::PageId;
use thiserror::Error;

use crate::presets::PresetError;
use crate::repository::RepositoryError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Sign in as a manager first.")]
    NoCompany,

    #[error("Load a live page first.")]
    NoLivePage,

    #[error("Select a page first.")]
    NoPageSelected,

    #[error("Page {0} is not in the page list")]
    PageNotFound(PageId),

    #[error("A save is already in flight for this page")]
    SaveInFlight,

    #[error("{message}")]
    LoadFailure {
        message: String,
        #[source]
        source: RepositoryError,
    },

    #[error("{message}")]
    SaveFailure {
        message: String,
        #[source]
        source: RepositoryError,
    },

    #[error("Page saved, but publish failed: {message}")]
    PublishFailure {
        message: String,
        #[source]
        source: RepositoryError,
    },

    #[error("{message}")]
    ThemeSaveFailure {
        message: String,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Preset(#[from] PresetError),
}

pub type SessionResult<T> = Result<T, SessionError>;
