use super::{emit, read_page, resolve, OutputArgs};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use layoutlab_editor::serialize_page;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Page JSON file
    pub page: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Assign missing section ids and mirror the layout into meta
pub fn normalize(args: NormalizeArgs, cwd: &Path) -> Result<()> {
    let input = resolve(cwd, &args.page);
    let page = read_page(&input)?;
    let normalized = serialize_page(&page);

    let assigned = page
        .sections()
        .iter()
        .zip(normalized.sections())
        .filter(|(before, after)| before.id != after.id)
        .count();
    tracing::info!("[Normalize] page={} assigned={}", input.display(), assigned);
    eprintln!(
        "{} {} section id(s) assigned",
        "🔧 Normalized".bright_blue().bold(),
        assigned
    );

    emit(&normalized, args.output.target(&input))
}
