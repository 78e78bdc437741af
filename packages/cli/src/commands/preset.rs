use super::{emit, load_knobs, open_cache, read_json_file, resolve, KnobArgs};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use layoutlab_editor::{KnobState, Preset, BUILTIN_PRESETS};
use layoutlab_workspace::{
    BackendPresetStore, CompanyId, InMemorySettingsRepository, LoadMode, SettingsRepository,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct PresetArgs {
    #[command(subcommand)]
    pub command: PresetCommand,
}

#[derive(Debug, Subcommand)]
pub enum PresetCommand {
    /// Print the local preset
    Show,

    /// Save knobs as the local preset; with --name also add it to the library
    Save {
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        knobs: KnobArgs,
    },

    /// List named presets, newest first
    List,

    /// Make a named preset the local preset
    Load {
        /// Preset id from `layoutlab preset list`
        id: String,
    },

    /// Remove a named preset from the library
    Delete {
        id: String,
    },

    /// List the built-in layout presets
    Builtins,

    /// Store the knob props as defaults for one section type
    TypeDefault {
        section_type: String,

        #[command(flatten)]
        knobs: KnobArgs,
    },

    /// Write the local preset into a settings document and verify it
    Push {
        /// Settings JSON file (created if missing)
        settings: PathBuf,

        /// Company id (overrides config)
        #[arg(long)]
        company: Option<String>,
    },

    /// Read the preset out of a settings document into the local preset
    Pull {
        settings: PathBuf,

        #[arg(long)]
        company: Option<String>,
    },
}

pub fn preset(args: PresetArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut cache = open_cache(&config, cwd);

    match args.command {
        PresetCommand::Show => {
            let preset = cache.load().unwrap_or_else(|| KnobState::default().to_preset());
            emit(&preset, None)?;
        }

        PresetCommand::Save { name, knobs } => {
            let mut state = load_knobs(&cache);
            knobs.apply_to(&mut state)?;
            let preset = state.to_preset();

            cache.save(&preset)?;
            println!("  {} saved local preset", "✓".green());

            if let Some(name) = name {
                let entry = cache.save_named(Some(&name), &preset)?;
                println!("  {} added {} ({})", "✓".green(), entry.name.bright_white(), entry.id);
            }
        }

        PresetCommand::List => {
            let library = cache.library();
            if library.is_empty() {
                println!("{}", "No saved presets".dimmed());
            }
            for entry in library {
                println!("  {}  {}", entry.id.dimmed(), entry.name.bright_white());
            }
        }

        PresetCommand::Load { id } => {
            let entry = cache
                .load_named(&id)
                .ok_or_else(|| anyhow!("No saved preset with id {}", id))?;
            cache.save(&entry.data)?;
            println!("  {} loaded {}", "✓".green(), entry.name.bright_white());
        }

        PresetCommand::Delete { id } => {
            if cache.delete_named(&id)? {
                println!("  {} deleted {}", "✓".green(), id);
            } else {
                println!("{}", format!("No saved preset with id {}", id).yellow());
            }
        }

        PresetCommand::Builtins => {
            for preset in BUILTIN_PRESETS.iter() {
                println!(
                    "  {:<22} layout={} spacing={} gutterX={}",
                    preset.name.bright_white(),
                    preset.layout,
                    preset.section_spacing,
                    preset.default_gutter_x
                );
            }
        }

        PresetCommand::TypeDefault {
            section_type,
            knobs,
        } => {
            let mut state = load_knobs(&cache);
            knobs.apply_to(&mut state)?;

            let props: Map<String, Value> =
                layoutlab_editor::build_props_patch(&section_type, &state)
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key, v)))
                    .collect();
            cache.save_type_default(&section_type, props)?;
            println!("  {} saved defaults for {}", "✓".green(), section_type.bright_white());
        }

        PresetCommand::Push { settings, company } => {
            let path = resolve(cwd, &settings);
            let company = company_id(company, &config);
            let preset = load_knobs(&cache).to_preset();
            tracing::info!("[PresetPush] company={} settings={}", company, path.display());

            let written = runtime()?.block_on(push(&path, &company, &preset, &config))?;
            emit(&written, Some(&path))?;
            println!("  {} preset verified for {}", "✓".green(), company);
        }

        PresetCommand::Pull { settings, company } => {
            let path = resolve(cwd, &settings);
            let company = company_id(company, &config);
            tracing::info!("[PresetPull] company={} settings={}", company, path.display());

            let preset = runtime()?.block_on(pull(&path, &company, &config))?;
            cache.save(&preset)?;
            println!("  {} pulled preset for {}", "✓".green(), company);
        }
    }

    Ok(())
}

fn company_id(flag: Option<String>, config: &Config) -> CompanyId {
    let id = flag
        .or_else(|| config.company_id.clone())
        .unwrap_or_else(|| "local".to_string());
    CompanyId::new(id)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// A settings file loaded into an in-memory settings service
async fn settings_from_file(
    path: &Path,
    company: &CompanyId,
) -> Result<Arc<InMemorySettingsRepository>> {
    let repo = Arc::new(InMemorySettingsRepository::new());
    if path.exists() {
        match read_json_file::<Value>(path)? {
            Value::Object(map) => repo.seed(company, map).await,
            _ => return Err(anyhow!("Settings document must be a JSON object: {}", path.display())),
        }
    }
    Ok(repo)
}

async fn push(path: &Path, company: &CompanyId, preset: &Preset, config: &Config) -> Result<Value> {
    let repo = settings_from_file(path, company).await?;
    let store = BackendPresetStore::new(repo.clone(), config.backend_preset.clone());

    store.save(company, preset).await?;
    Ok(repo.get_settings(company).await?)
}

async fn pull(path: &Path, company: &CompanyId, config: &Config) -> Result<Preset> {
    let repo = settings_from_file(path, company).await?;
    let store = BackendPresetStore::new(repo, config.backend_preset.clone());

    store
        .load(company, LoadMode::Reporting)
        .await?
        .ok_or_else(|| anyhow!("No backend preset found."))
}
