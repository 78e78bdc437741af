//! # Snapshot, Diff and Selective Revert
//!
//! A snapshot is a deep copy of a page taken on request. Diffing the current
//! page against it yields one entry per changed field; any single entry can be
//! reverted without touching the others.
//!
//! ## Design
//!
//! - Meta: union of keys present on either side
//! - Sections: compared by array index up to the longer list; an index
//!   missing on either side is skipped
//! - A field is reported only when its JSON form differs
//!
//! Sections are matched by position, not by id. Inserting or removing a
//! section between snapshot and diff shifts every later index, so changes
//! get attributed to the wrong neighbour.
//!
//! ## Example
//!
//! ```rust,ignore
//! let snapshot = Snapshot::take(&page);
//! let edited = apply_patch(&page, &Scope::PageMeta, &fields);
//!
//! for change in snapshot.diff(&edited) {
//!     println!("{}: {:?} -> {:?}", change.path, change.before, change.after);
//! }
//!
//! let restored = revert_change(&edited, &changes[0]);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Page;
use crate::mutations::{apply_patch, PatchFields, Scope};

/// Immutable baseline copy of a page
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    page: Page,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Deep copy of `page`
    pub fn take(page: &Page) -> Self {
        Self {
            page: page.clone(),
            taken_at: Utc::now(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Changes from this snapshot to `current`
    pub fn diff(&self, current: &Page) -> Vec<DiffEntry> {
        diff(&self.page, current)
    }
}

/// One changed field; `None` means the key was absent on that side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl DiffEntry {
    pub fn new(path: ChangePath, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.to_string(),
            before,
            after,
        }
    }

    pub fn change_path(&self) -> Option<ChangePath> {
        ChangePath::parse(&self.path)
    }
}

/// Parsed form of a diff path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePath {
    /// `meta.<key>`
    Meta { key: String },

    /// `sections[<index>].props.<key>`
    SectionProp { index: usize, key: String },
}

impl ChangePath {
    /// Parse a diff path; anything unrecognized yields `None`
    pub fn parse(path: &str) -> Option<Self> {
        if let Some(key) = path.strip_prefix("meta.") {
            if key.is_empty() {
                return None;
            }
            return Some(ChangePath::Meta { key: key.to_string() });
        }

        let rest = path.strip_prefix("sections[")?;
        let (index, rest) = rest.split_once(']')?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = index.parse().ok()?;
        let key = rest.strip_prefix(".props.")?;
        if key.is_empty() {
            return None;
        }

        Some(ChangePath::SectionProp {
            index,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for ChangePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePath::Meta { key } => write!(f, "meta.{}", key),
            ChangePath::SectionProp { index, key } => write!(f, "sections[{}].props.{}", index, key),
        }
    }
}

/// Field-level differences between two pages
pub fn diff(before: &Page, after: &Page) -> Vec<DiffEntry> {
    let mut changes = Vec::new();

    diff_bag(&before.content.meta.0, &after.content.meta.0, &mut changes, |key| {
        ChangePath::Meta {
            key: key.to_string(),
        }
    });

    let before_sections = before.sections();
    let after_sections = after.sections();
    let len = before_sections.len().max(after_sections.len());

    for index in 0..len {
        let (Some(b), Some(a)) = (before_sections.get(index), after_sections.get(index)) else {
            continue;
        };

        diff_bag(&b.props, &a.props, &mut changes, |key| ChangePath::SectionProp {
            index,
            key: key.to_string(),
        });
    }

    changes
}

fn diff_bag<F>(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    changes: &mut Vec<DiffEntry>,
    path_for: F,
) where
    F: Fn(&str) -> ChangePath,
{
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    for key in keys {
        let b = before.get(key);
        let a = after.get(key);
        if b != a {
            changes.push(DiffEntry::new(path_for(key), b.cloned(), a.cloned()));
        }
    }
}

/// Restore the `before` side of one change, leaving everything else alone
///
/// Unparseable paths and indices past the end of the page are no-ops.
pub fn revert_change(page: &Page, entry: &DiffEntry) -> Page {
    match entry.change_path() {
        Some(ChangePath::Meta { key }) => {
            let mut fields = PatchFields::new();
            fields.insert(key, entry.before.clone());
            apply_patch(page, &Scope::PageMeta, &fields)
        }

        Some(ChangePath::SectionProp { index, key }) => {
            let mut next = page.clone();
            if let Some(section) = next.content.sections.get_mut(index) {
                match &entry.before {
                    Some(value) => {
                        section.props.insert(key, value.clone());
                    }
                    None => {
                        section.props.remove(&key);
                    }
                }
            }
            next
        }

        None => {
            tracing::debug!("[Revert] ignoring unrecognized path {:?}", entry.path);
            page.clone()
        }
    }
}
