use super::{emit, print_changes, read_page, resolve, OutputArgs};
use anyhow::{anyhow, Result};
use clap::Args;
use layoutlab_editor::{diff as diff_pages, revert_change, serialize_page, Snapshot};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Baseline page JSON
    pub before: PathBuf,

    /// Edited page JSON
    pub after: PathBuf,

    /// Print the changes as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

pub fn diff(args: DiffArgs, cwd: &Path) -> Result<()> {
    let before = read_page(&resolve(cwd, &args.before))?;
    let after = read_page(&resolve(cwd, &args.after))?;
    let changes = diff_pages(&before, &after);

    if args.json {
        emit(&changes, None)
    } else {
        print_changes(&changes);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct RevertArgs {
    /// Edited page JSON
    pub page: PathBuf,

    /// Baseline page JSON the change is measured against
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Change path, e.g. meta.sectionSpacing or sections[0].props.gutterX
    #[arg(long)]
    pub path: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Undo one field of `page` back to its snapshot value
pub fn revert(args: RevertArgs, cwd: &Path) -> Result<()> {
    let input = resolve(cwd, &args.page);
    let page = read_page(&input)?;
    let snapshot = Snapshot::take(&read_page(&resolve(cwd, &args.snapshot))?);

    let changes = snapshot.diff(&page);
    let entry = changes
        .iter()
        .find(|c| c.path == args.path)
        .ok_or_else(|| anyhow!("No change at {} (try `layoutlab diff`)", args.path))?;

    let reverted = revert_change(&page, entry);
    print_changes(std::slice::from_ref(entry));

    emit(&serialize_page(&reverted), args.output.target(&input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_revert_single_field() {
        let dir = tempfile::tempdir().unwrap();
        let before = dir.path().join("before.json");
        let after = dir.path().join("after.json");

        let base = json!({
            "id": "p1",
            "content": {
                "meta": { "layout": "boxed", "sectionSpacing": 6 },
                "sections": [{ "id": "s1", "type": "hero", "props": { "gutterX": 16 } }]
            }
        });
        let mut edited = base.clone();
        edited["content"]["meta"]["sectionSpacing"] = json!(8);
        edited["content"]["sections"][0]["props"]["gutterX"] = json!(24);

        fs::write(&before, base.to_string()).unwrap();
        fs::write(&after, edited.to_string()).unwrap();

        revert(
            RevertArgs {
                page: after.clone(),
                snapshot: before.clone(),
                path: "meta.sectionSpacing".into(),
                output: OutputArgs { output: None, write: true },
            },
            dir.path(),
        )
        .unwrap();

        let reverted = read_page(&after).unwrap();
        assert_eq!(reverted.meta().get("sectionSpacing"), Some(&json!(6)));
        assert_eq!(reverted.sections()[0].props.get("gutterX"), Some(&json!(24)));
    }

    #[test]
    fn test_revert_unknown_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.json");
        fs::write(&page, json!({ "id": 1 }).to_string()).unwrap();

        let result = revert(
            RevertArgs {
                page: page.clone(),
                snapshot: page,
                path: "meta.layout".into(),
                output: OutputArgs::default(),
            },
            dir.path(),
        );
        assert!(result.is_err());
    }
}
