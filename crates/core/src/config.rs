//! Application configuration handling.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory under the user's config root holding the configuration file.
pub const CONFIG_DIR: &str = "deckproxy";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Settings controlling the HTTP boundaries and the output layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory for generated sheets, created on demand.
    pub output_root: PathBuf,
    /// Base url of the card database REST API.
    pub scryfall_base_url: String,
    /// Base url of the deck provider REST API.
    pub archidekt_base_url: String,
    /// Per-request timeout in seconds at the HTTP boundaries.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            scryfall_base_url: "https://api.scryfall.com".to_string(),
            archidekt_base_url: "https://archidekt.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional user config file and the
    /// `DECKPROXY_*` environment, falling back to defaults.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default(
                "output_root",
                defaults.output_root.to_string_lossy().to_string(),
            )?
            .set_default("scryfall_base_url", defaults.scryfall_base_url)?
            .set_default("archidekt_base_url", defaults.archidekt_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?;

        if let Some(path) = config_file_path() {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("DECKPROXY"))
            .build()
            .context("failed to assemble configuration")?;
        settings
            .try_deserialize()
            .context("failed to parse configuration")
    }
}

/// Path of the user configuration file, when a config directory exists.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn default_output_root() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("proxies")
}
