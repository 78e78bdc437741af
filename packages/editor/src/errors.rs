//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid scope: {0:?} (expected page, all, selected:<index> or type:<name>)")]
    InvalidScope(String),

    #[error("Invalid page document: {0}")]
    InvalidPage(#[from] serde_json::Error),

    #[error("Invalid preset: {0}")]
    InvalidPreset(serde_json::Error),

    #[error("Invalid knob value for {knob}: {value}")]
    InvalidKnob { knob: &'static str, value: String },
}
