//! Tests for longer edit sequences
//!
//! This tests:
//! - Chains of scoped patches against one snapshot
//! - Reverting changes in arbitrary order
//! - Stale diff entries after later edits
//! - Page integrity after operations

use layoutlab_editor::{
    apply_patch, diff, ensure_section_ids, revert_change, Layout, Page, PatchFields, Scope,
    Section, Snapshot,
};
use serde_json::{json, Value};

fn one(key: &str, value: Value) -> PatchFields {
    let mut fields = PatchFields::new();
    fields.insert(key.to_string(), Some(value));
    fields
}

fn landing_page() -> Page {
    ensure_section_ids(
        &Page::new("landing")
            .with_meta("sectionSpacing", json!(6))
            .with_meta("defaultGutterX", json!(16))
            .with_section(Section::new("hero").with_id("hero-a").with_prop("heading", json!("Hi")))
            .with_section(Section::new("gallery").with_id("gal-a"))
            .with_section(Section::new("hero").with_id("hero-b"))
            .with_section(Section::new("richText").with_id("txt-a")),
    )
}

#[test]
fn test_chain_then_revert_everything() {
    let page = landing_page();
    let snapshot = Snapshot::take(&page);

    let mut edited = apply_patch(&page, &Scope::OfType("hero".into()), &one("safeTop", json!(false)));
    edited = apply_patch(&edited, &Scope::Selected(1), &one("autoplay", json!(true)));
    edited = apply_patch(&edited, &Scope::PageMeta, &one("layout", json!("full")));
    edited = apply_patch(&edited, &Scope::All, &one("gutterX", json!(8)));

    let changes = snapshot.diff(&edited);
    // 2 hero safeTop + 1 autoplay + layout + 4 gutterX
    assert_eq!(changes.len(), 8);

    // Revert in reverse order of discovery
    let mut restored = edited.clone();
    for change in changes.iter().rev() {
        restored = revert_change(&restored, change);
    }

    assert_eq!(restored, page);
    assert!(snapshot.diff(&restored).is_empty());
}

#[test]
fn test_layout_revert_keeps_page_and_meta_in_sync() {
    let page = landing_page();
    let snapshot = Snapshot::take(&page);

    let edited = apply_patch(&page, &Scope::PageMeta, &one("layout", json!("full")));
    assert_eq!(edited.layout, Some(Layout::Full));

    let changes = snapshot.diff(&edited);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "meta.layout");

    let restored = revert_change(&edited, &changes[0]);
    assert_eq!(restored.layout, Some(Layout::Boxed));
    assert_eq!(restored.meta().layout(), Some(Layout::Boxed));
}

#[test]
fn test_stale_entry_only_touches_its_own_path() {
    let page = landing_page();
    let snapshot = Snapshot::take(&page);

    let first = apply_patch(&page, &Scope::Selected(0), &one("gutterX", json!(40)));
    let stale = snapshot.diff(&first).remove(0);

    // Unrelated edits after the entry was produced
    let later = apply_patch(&first, &Scope::Selected(3), &one("title", json!("New")));
    let later = apply_patch(&later, &Scope::PageMeta, &one("sectionSpacing", json!(10)));

    let reverted = revert_change(&later, &stale);

    assert!(reverted.sections()[0].props.get("gutterX").is_none());
    assert_eq!(reverted.sections()[3].props.get("title"), Some(&json!("New")));
    assert_eq!(reverted.meta().get("sectionSpacing"), Some(&json!(10)));
}

#[test]
fn test_scope_isolation_across_sequence() {
    let page = landing_page();

    let edited = apply_patch(&page, &Scope::Selected(2), &one("heroHeight", json!(50)));
    let edited = apply_patch(&edited, &Scope::Selected(2), &one("safeTop", json!(true)));

    for (index, (before, after)) in page.sections().iter().zip(edited.sections()).enumerate() {
        if index == 2 {
            assert_ne!(before.props, after.props);
        } else {
            assert_eq!(before.props, after.props);
        }
    }
}

#[test]
fn test_insert_between_snapshot_and_diff_shifts_attribution() {
    let page = landing_page();
    let snapshot = Snapshot::take(&page);

    let mut edited = page.clone();
    edited
        .content
        .sections
        .insert(0, Section::new("banner").with_id("new").with_prop("heading", json!("Hi")));

    let changes = diff(snapshot.page(), &edited);
    let paths: Vec<_> = changes.iter().map(|c| c.path.as_str()).collect();

    // The unchanged hero's heading shows up as moved between positions 0 and 1
    assert!(paths.contains(&"sections[1].props.heading"));
    assert!(!paths.contains(&"sections[0].props.heading"));
}
