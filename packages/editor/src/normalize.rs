//! # Document Normalizer
//!
//! Structural invariants every loaded page must satisfy before editing:
//!
//! - every section carries a non-empty id, and an existing id is never replaced
//! - `page.layout` and `content.meta.layout` agree (explicit layout wins,
//!   `boxed` when neither is set)
//!
//! Both passes are idempotent.

use std::collections::HashSet;

use crate::document::{Page, PageMeta};

/// Generates section ids of the form `<type>-<index>-<seed>`
#[derive(Debug, Clone)]
pub struct SectionIdGenerator {
    seed: String,
    count: u32,
}

impl SectionIdGenerator {
    /// Seed from the current wall-clock time (milliseconds)
    pub fn new() -> Self {
        Self::from_seed(chrono::Utc::now().timestamp_millis().to_string())
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Next id for a section at `index`, avoiding anything in `taken`
    pub fn next_id(&mut self, section_type: &str, index: usize, taken: &HashSet<String>) -> String {
        let prefix = if section_type.is_empty() {
            "section"
        } else {
            section_type
        };

        let base = format!("{}-{}-{}", prefix, index, self.seed);
        if !taken.contains(&base) {
            return base;
        }

        loop {
            self.count += 1;
            let candidate = format!("{}-{}", base, self.count);
            if !taken.contains(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for SectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror the page layout into `content.meta.layout`
pub fn lift_layout(page: &Page) -> Page {
    let mut next = page.clone();
    let layout = next.effective_layout();

    next.layout = Some(layout);
    next.content
        .meta
        .0
        .insert(PageMeta::LAYOUT.to_string(), layout.to_value());

    next
}

/// Assign ids to sections that lack one, then lift the layout
pub fn ensure_section_ids(page: &Page) -> Page {
    ensure_section_ids_with(page, &mut SectionIdGenerator::new())
}

pub fn ensure_section_ids_with(page: &Page, ids: &mut SectionIdGenerator) -> Page {
    let mut next = page.clone();

    let mut taken: HashSet<String> = next
        .content
        .sections
        .iter()
        .filter_map(|s| s.id.clone())
        .collect();

    for (index, section) in next.content.sections.iter_mut().enumerate() {
        if section.has_id() {
            continue;
        }

        let id = ids.next_id(&section.section_type, index, &taken);
        tracing::debug!("[Normalize] assigned id {} to section #{}", id, index);
        taken.insert(id.clone());
        section.id = Some(id);
    }

    lift_layout(&next)
}

/// Outbound form of a page for saving
pub fn serialize_page(page: &Page) -> Page {
    ensure_section_ids(&lift_layout(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Layout, Section};
    use serde_json::json;

    #[test]
    fn test_lift_layout_defaults_to_boxed() {
        let page = lift_layout(&Page::default());
        assert_eq!(page.layout, Some(Layout::Boxed));
        assert_eq!(page.meta().get("layout"), Some(&json!("boxed")));
    }

    #[test]
    fn test_lift_layout_explicit_wins() {
        let page = Page::default()
            .with_layout(Layout::Full)
            .with_meta("layout", json!("boxed"));

        let lifted = lift_layout(&page);
        assert_eq!(lifted.layout, Some(Layout::Full));
        assert_eq!(lifted.meta().layout(), Some(Layout::Full));
    }

    #[test]
    fn test_lift_layout_reads_meta_when_no_explicit() {
        let page = Page::default().with_meta("layout", json!("full"));
        assert_eq!(lift_layout(&page).layout, Some(Layout::Full));
    }

    #[test]
    fn test_ensure_ids_assigns_missing_only() {
        let page = Page::default()
            .with_section(Section::new("hero").with_id("keep-me"))
            .with_section(Section::new("richText"))
            .with_section(Section::new(""));

        let mut ids = SectionIdGenerator::from_seed("42");
        let normalized = ensure_section_ids_with(&page, &mut ids);

        let got: Vec<_> = normalized
            .sections()
            .iter()
            .map(|s| s.id.clone().unwrap())
            .collect();
        assert_eq!(got, vec!["keep-me", "richText-1-42", "section-2-42"]);
    }

    #[test]
    fn test_ensure_ids_replaces_empty_id() {
        let page = Page::default().with_section(Section::new("hero").with_id(""));
        let normalized = ensure_section_ids_with(&page, &mut SectionIdGenerator::from_seed("1"));
        assert_eq!(normalized.sections()[0].id.as_deref(), Some("hero-0-1"));
    }

    #[test]
    fn test_ensure_ids_avoids_collisions() {
        let page = Page::default()
            .with_section(Section::new("hero").with_id("hero-1-7"))
            .with_section(Section::new("hero"));

        let normalized = ensure_section_ids_with(&page, &mut SectionIdGenerator::from_seed("7"));
        assert_eq!(normalized.sections()[1].id.as_deref(), Some("hero-1-7-1"));
    }

    #[test]
    fn test_ensure_ids_is_idempotent() {
        let page = Page::default()
            .with_section(Section::new("hero"))
            .with_section(Section::new("gallery"));

        let once = ensure_section_ids(&page);
        let twice = ensure_section_ids(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_serialize_page_normalizes() {
        let page = Page::new("p1")
            .with_meta("layout", json!("full"))
            .with_section(Section::new("hero"));

        let out = serialize_page(&page);
        assert_eq!(out.layout, Some(Layout::Full));
        assert!(out.sections()[0].has_id());
    }
}
