mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, diff, normalize, preset, preview, revert, ApplyArgs, DiffArgs, NormalizeArgs,
    PresetArgs, PreviewArgs, RevertArgs,
};
use tracing_subscriber::EnvFilter;

/// Layout Lab - tune page layouts section by section
#[derive(Parser, Debug)]
#[command(name = "layoutlab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply knob values to a page
    Apply(ApplyArgs),

    /// Compare two versions of a page
    Diff(DiffArgs),

    /// Revert one field back to a baseline page
    Revert(RevertArgs),

    /// Assign section ids and lift the layout into meta
    Normalize(NormalizeArgs),

    /// Show the render input for a page
    Preview(PreviewArgs),

    /// Manage local, named and backend presets
    Preset(PresetArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Apply(args) => apply(args, &cwd),
            Command::Diff(args) => diff(args, &cwd),
            Command::Revert(args) => revert(args, &cwd),
            Command::Normalize(args) => normalize(args, &cwd),
            Command::Preview(args) => preview(args, &cwd),
            Command::Preset(args) => preset(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
