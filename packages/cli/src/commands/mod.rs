pub mod apply;
pub mod diff;
pub mod normalize;
pub mod preset;
pub mod preview;

pub use apply::{apply, ApplyArgs};
pub use diff::{diff, revert, DiffArgs, RevertArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use preset::{preset, PresetArgs};
pub use preview::{preview, PreviewArgs};

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use layoutlab_common::FileStore;
use layoutlab_editor::{
    builtin_preset, ContentMaxWidth, Density, Device, DiffEntry, KnobState, Layout, Page,
};
use layoutlab_workspace::LocalPresetCache;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Knob overrides shared by every command that builds patches
#[derive(Debug, Default, Args)]
pub struct KnobArgs {
    /// Start from a built-in layout preset (Default, Compact, Comfortable, Full-bleed Showcase)
    #[arg(long)]
    pub preset: Option<String>,

    /// Page layout (boxed, full)
    #[arg(long)]
    pub layout: Option<String>,

    /// Density (compact, standard, comfortable); resets section spacing
    #[arg(long)]
    pub density: Option<String>,

    #[arg(long)]
    pub section_spacing: Option<u32>,

    /// Inner horizontal padding in px (0 uses the density default)
    #[arg(long)]
    pub gutter_x: Option<u32>,

    #[arg(long)]
    pub bleed_left: Option<bool>,

    #[arg(long)]
    pub bleed_right: Option<bool>,

    /// Hero height in vh (0 means auto)
    #[arg(long)]
    pub hero_height: Option<u32>,

    #[arg(long)]
    pub safe_top: Option<bool>,

    /// Hero content width (sm, md, lg, xl, full)
    #[arg(long)]
    pub content_max_width: Option<String>,

    #[arg(long)]
    pub max_width_map: Option<bool>,

    /// Preview device (mobile, tablet, desktop)
    #[arg(long)]
    pub device: Option<String>,
}

impl KnobArgs {
    /// Layer the overrides onto `knobs`, preset first and density before spacing
    pub fn apply_to(&self, knobs: &mut KnobState) -> Result<()> {
        if let Some(name) = &self.preset {
            let preset =
                builtin_preset(name).ok_or_else(|| anyhow!("Unknown layout preset: {}", name))?;
            knobs.apply_layout_preset(preset);
        }
        if let Some(layout) = &self.layout {
            knobs.layout =
                Layout::parse(layout).ok_or_else(|| anyhow!("Invalid layout: {}", layout))?;
        }
        if let Some(density) = &self.density {
            knobs.set_density(density.parse::<Density>()?);
        }
        if let Some(spacing) = self.section_spacing {
            knobs.section_spacing = spacing;
        }
        if let Some(gutter) = self.gutter_x {
            knobs.gutter_x = gutter;
        }
        if let Some(bleed) = self.bleed_left {
            knobs.bleed_left = bleed;
        }
        if let Some(bleed) = self.bleed_right {
            knobs.bleed_right = bleed;
        }
        if let Some(height) = self.hero_height {
            knobs.hero_height = height;
        }
        if let Some(safe_top) = self.safe_top {
            knobs.safe_top = safe_top;
        }
        if let Some(width) = &self.content_max_width {
            knobs.content_max_width = width.parse::<ContentMaxWidth>()?;
        }
        if let Some(enabled) = self.max_width_map {
            knobs.max_width_map_enabled = enabled;
        }
        if let Some(device) = &self.device {
            knobs.device = device.parse::<Device>()?;
        }
        Ok(())
    }
}

/// Where a command writes the resulting page
#[derive(Debug, Default, Args)]
pub struct OutputArgs {
    /// Write the result to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite the input file
    #[arg(short, long, conflicts_with = "output")]
    pub write: bool,
}

impl OutputArgs {
    pub fn target<'a>(&'a self, input: &'a Path) -> Option<&'a Path> {
        match (&self.output, self.write) {
            (Some(path), _) => Some(path.as_path()),
            (None, true) => Some(input),
            (None, false) => None,
        }
    }
}

pub fn open_cache(config: &Config, cwd: &Path) -> LocalPresetCache {
    let store = FileStore::new(config.get_store_dir(cwd));
    LocalPresetCache::with_key(Box::new(store), config.local_key.clone())
}

/// Knobs from the local preset, or defaults when none is stored
pub fn load_knobs(cache: &LocalPresetCache) -> KnobState {
    cache
        .load()
        .map(|preset| KnobState::from_preset(&preset))
        .unwrap_or_default()
}

pub fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

pub fn read_page(path: &Path) -> Result<Page> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read page: {}", path.display()))?;
    Page::from_json(&content).with_context(|| format!("Invalid page JSON: {}", path.display()))
}

pub fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON: {}", path.display()))
}

/// Pretty-print `value` to `target`, or to stdout when there is none
pub fn emit<T: Serialize>(value: &T, target: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match target {
        Some(path) => {
            fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("  {} wrote {}", "✓".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn print_changes(changes: &[DiffEntry]) {
    if changes.is_empty() {
        eprintln!("{}", "No changes".dimmed());
        return;
    }

    eprintln!("{} {} change(s)", "Δ".bright_blue().bold(), changes.len());
    for change in changes {
        eprintln!(
            "  {} {} → {}",
            change.path.bright_white(),
            show(&change.before).red(),
            show(&change.after).green()
        );
    }
}

fn show(value: &Option<serde_json::Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(absent)".to_string(),
    }
}
