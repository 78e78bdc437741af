//! # Layout Lab Workspace
//!
//! Live page sessions: loading a company's pages, editing one through the
//! editor engine, saving and publishing it, and persisting layout presets on
//! the device and on the backend.

mod errors;
pub mod presets;
pub mod repository;
pub mod session;
pub mod status;

pub use errors::{SessionError, SessionResult};
pub use presets::{
    BackendPresetOptions, BackendPresetStore, LoadMode, LocalPresetCache, NamedPreset,
    PresetError, PresetSaveSaga, PresetShape, SaveStep,
};
pub use repository::{
    CompanyId, InMemoryPageRepository, InMemoryPublisher, InMemorySettingsRepository,
    PageRepository, PublishStatus, Publisher, RepositoryError, RepositoryResult,
    SaveSettingsOptions, SettingsRepository,
};
pub use session::{
    ApplyOutcome, ApplyTarget, Collaborators, CompoundSave, LivePageSession, SaveOutcome,
    SaveTicket, SessionOptions, SessionState,
};
pub use status::{Channel, Notice, NoticeKind, StatusBoard};
