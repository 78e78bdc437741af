use layoutlab_workspace::presets::LOCAL_PRESET_KEY;
use layoutlab_workspace::BackendPresetOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "layoutlab.config.json";

/// Layout Lab configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the local preset store
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Key of the working preset in the local store
    #[serde(default = "default_local_key")]
    pub local_key: String,

    /// Where presets live inside backend settings documents
    #[serde(default)]
    pub backend_preset: BackendPresetOptions,

    /// Company used for backend preset commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

fn default_store_dir() -> String {
    ".layoutlab".to_string()
}

fn default_local_key() -> String {
    LOCAL_PRESET_KEY.to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            tracing::debug!("[Config] loading {}", config_path.display());
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the local preset store
    pub fn get_store_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.store_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            local_key: default_local_key(),
            backend_preset: BackendPresetOptions::default(),
            company_id: None,
        }
    }
}
