//! # Layout Lab Editor
//!
//! Pure editing engine for layout pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ normalize: stable section ids, lifted layout│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ knobs: editing controls → patch fields      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ mutations: apply fields to a scope          │
//! │  - page meta / selected / all / of type     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ snapshot: baseline, diff, selective revert  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Pages are values**: every operation returns a new page
//! 2. **Total functions**: odd input (bad index, bad path) degrades to a no-op
//! 3. **Opaque props**: section properties are JSON bags, never validated
//!
//! ## Usage
//!
//! ```rust,ignore
//! use layoutlab_editor::{apply_patch, ensure_section_ids, Page, Scope, Snapshot};
//!
//! let page = ensure_section_ids(&Page::from_json(&raw)?);
//! let snapshot = Snapshot::take(&page);
//!
//! let edited = apply_patch(&page, &Scope::All, &fields);
//! let changes = snapshot.diff(&edited);
//! ```

mod document;
mod errors;
mod knobs;
mod mutations;
mod normalize;
mod snapshot;

pub use document::{Layout, Page, PageContent, PageId, PageMeta, RenderInput, Section};
pub use errors::EditorError;
pub use knobs::{
    build_meta_patch, build_props_patch, builtin_preset, demo_page, ContentMaxWidth, Density,
    Device, KnobState, LayoutPreset, Preset, BUILTIN_PRESETS, HERO_TYPE,
};
pub use mutations::{
    apply_patch, apply_section_patch_with, fields_from_object, merge_fields, Patch, PatchFields,
    Scope,
};
pub use normalize::{
    ensure_section_ids, ensure_section_ids_with, lift_layout, serialize_page, SectionIdGenerator,
};
pub use snapshot::{diff, revert_change, ChangePath, DiffEntry, Snapshot};
