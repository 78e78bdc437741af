//! # Scoped Patches
//!
//! A patch is a partial property map pushed into one of four targets.
//!
//! ## Scope Semantics
//!
//! ### PageMeta
//! - Merges into `content.meta`
//! - A `layout` field also becomes the explicit page layout; layout is re-lifted
//!
//! ### Selected(i)
//! - Merges into `sections[i].props`
//! - Out-of-range index is a no-op, not an error
//!
//! ### All
//! - Merges into every section, order and untouched props preserved
//!
//! ### OfType(tag)
//! - Merges only where `type == tag`; other sections are left as they were
//!
//! ## Field Semantics
//!
//! - key absent: leave untouched
//! - `Some(value)`: set (including JSON `null`)
//! - `None`: clear (remove the key)
//!
//! Every application is idempotent and returns a new page.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Layout, Page, PageMeta, Section};
use crate::errors::EditorError;
use crate::normalize::lift_layout;

/// Partial property map; `None` clears a key
pub type PatchFields = BTreeMap<String, Option<Value>>;

/// Targeting rule for a patch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    PageMeta,
    Selected(i64),
    All,
    OfType(String),
}

impl Scope {
    pub fn targets_sections(&self) -> bool {
        !matches!(self, Scope::PageMeta)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::PageMeta => f.write_str("page"),
            Scope::Selected(index) => write!(f, "selected:{}", index),
            Scope::All => f.write_str("all"),
            Scope::OfType(tag) => write!(f, "type:{}", tag),
        }
    }
}

impl FromStr for Scope {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" | "meta" => return Ok(Scope::PageMeta),
            "all" => return Ok(Scope::All),
            _ => {}
        }

        if let Some(index) = s.strip_prefix("selected:") {
            return index
                .parse()
                .map(Scope::Selected)
                .map_err(|_| EditorError::InvalidScope(s.to_string()));
        }

        if let Some(tag) = s.strip_prefix("type:") {
            if !tag.is_empty() {
                return Ok(Scope::OfType(tag.to_string()));
            }
        }

        Err(EditorError::InvalidScope(s.to_string()))
    }
}

/// A scope plus the fields to merge into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub scope: Scope,
    pub fields: PatchFields,
}

impl Patch {
    pub fn new(scope: Scope, fields: PatchFields) -> Self {
        Self { scope, fields }
    }

    /// Set a field
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), Some(value));
        self
    }

    /// Clear a field
    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.fields.insert(key.into(), None);
        self
    }

    pub fn apply(&self, page: &Page) -> Page {
        apply_patch(page, &self.scope, &self.fields)
    }
}

/// Apply `fields` to the target selected by `scope`
pub fn apply_patch(page: &Page, scope: &Scope, fields: &PatchFields) -> Page {
    if scope.targets_sections() {
        apply_section_patch_with(page, scope, |_| fields.clone())
    } else {
        apply_to_meta(page, fields)
    }
}

/// Apply per-section fields computed from each targeted section
///
/// `PageMeta` has no sections to target, so the page is returned unchanged.
pub fn apply_section_patch_with<F>(page: &Page, scope: &Scope, fields_for: F) -> Page
where
    F: Fn(&Section) -> PatchFields,
{
    let mut next = page.clone();
    let sections = &mut next.content.sections;

    match scope {
        Scope::PageMeta => {}

        Scope::Selected(index) => {
            let Some(section) = usize::try_from(*index)
                .ok()
                .and_then(|i| sections.get_mut(i))
            else {
                tracing::debug!("[ApplyPatch] selected index {} out of range, no-op", index);
                return next;
            };
            let fields = fields_for(section);
            merge_fields(&mut section.props, &fields);
        }

        Scope::All => {
            for section in sections.iter_mut() {
                let fields = fields_for(section);
                merge_fields(&mut section.props, &fields);
            }
        }

        Scope::OfType(tag) => {
            for section in sections.iter_mut().filter(|s| &s.section_type == tag) {
                let fields = fields_for(section);
                merge_fields(&mut section.props, &fields);
            }
        }
    }

    next
}

fn apply_to_meta(page: &Page, fields: &PatchFields) -> Page {
    let mut next = page.clone();
    merge_fields(&mut next.content.meta.0, fields);

    if let Some(layout) = fields.get(PageMeta::LAYOUT) {
        next.layout = layout.as_ref().and_then(Layout::from_value);
    }

    lift_layout(&next)
}

/// Shallow merge; `None` removes the key
pub fn merge_fields(target: &mut Map<String, Value>, fields: &PatchFields) {
    for (key, value) in fields {
        match value {
            Some(value) => {
                target.insert(key.clone(), value.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }
}

/// Convert a JSON object into set-only patch fields
pub fn fields_from_object(object: &Map<String, Value>) -> PatchFields {
    object
        .iter()
        .map(|(k, v)| (k.clone(), Some(v.clone())))
        .collect()
}
