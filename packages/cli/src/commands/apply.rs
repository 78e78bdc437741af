use super::{emit, load_knobs, open_cache, print_changes, read_page, resolve, KnobArgs, OutputArgs};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use layoutlab_editor::{
    apply_patch, apply_section_patch_with, build_meta_patch, build_props_patch, diff,
    ensure_section_ids, serialize_page, Page, Scope,
};
use layoutlab_workspace::LocalPresetCache;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Page JSON file
    pub page: PathBuf,

    /// Target: page, all, selected:<index> or type:<name>
    #[arg(short, long, default_value = "all")]
    pub scope: String,

    #[command(flatten)]
    pub knobs: KnobArgs,

    /// Also apply the stored defaults for the section type (type:<name> only)
    #[arg(long)]
    pub type_defaults: bool,

    /// Remember the resulting knobs as the local preset
    #[arg(long)]
    pub save_preset: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut cache = open_cache(&config, cwd);

    let mut knobs = load_knobs(&cache);
    args.knobs.apply_to(&mut knobs)?;

    let scope: Scope = args.scope.parse()?;
    let input = resolve(cwd, &args.page);
    let page = ensure_section_ids(&read_page(&input)?);

    tracing::info!("[Apply] scope={} page={}", scope, input.display());

    let mut next = if scope.targets_sections() {
        apply_section_patch_with(&page, &scope, |section| {
            build_props_patch(&section.section_type, &knobs)
        })
    } else {
        apply_patch(&page, &scope, &build_meta_patch(&knobs))
    };

    if args.type_defaults {
        next = apply_type_defaults(&next, &scope, &cache);
    }

    eprintln!(
        "{} {} to {}",
        "🎛  Applying".bright_blue().bold(),
        scope,
        input.display()
    );
    print_changes(&diff(&page, &next));

    if args.save_preset {
        cache.save(&knobs.to_preset())?;
        eprintln!("  {} saved local preset", "✓".green());
    }

    let target = args.output.target(&input);
    emit(&serialize_page(&next), target)
}

fn apply_type_defaults(page: &Page, scope: &Scope, cache: &LocalPresetCache) -> Page {
    let Scope::OfType(tag) = scope else {
        tracing::warn!("[Apply] type defaults ignored for scope={}", scope);
        eprintln!("{}", "⚠️  --type-defaults only applies to type:<name> scopes".yellow());
        return page.clone();
    };

    match cache.type_default(tag) {
        Some(fields) => apply_patch(page, scope, &fields),
        None => {
            eprintln!("{} no stored defaults for {}", "⚠️".yellow(), tag);
            page.clone()
        }
    }
}
