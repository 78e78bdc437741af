use super::{emit, load_knobs, open_cache, read_page, resolve, KnobArgs};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use layoutlab_editor::{demo_page, ensure_section_ids, RenderInput};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Page JSON file (omit for the demo page built from the knobs)
    pub page: Option<PathBuf>,

    #[command(flatten)]
    pub knobs: KnobArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Preview {
    device_width: u32,
    #[serde(flatten)]
    input: RenderInput,
}

/// Print what the section renderer would receive
pub fn preview(args: PreviewArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut knobs = load_knobs(&open_cache(&config, cwd));
    args.knobs.apply_to(&mut knobs)?;

    let page = match &args.page {
        Some(path) => ensure_section_ids(&read_page(&resolve(cwd, path))?),
        None => demo_page(&knobs),
    };

    let preview = Preview {
        device_width: knobs.device.width(),
        input: page.render_input(),
    };
    emit(&preview, None)
}
