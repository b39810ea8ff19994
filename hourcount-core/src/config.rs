//! hourcount configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{HoursError, HoursResult};

static DEFAULT_SOURCES_PATH: &str = "~/.config/hourcount/calendars.json";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

fn default_sources_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCES_PATH)
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_floating_timezone() -> String {
    "UTC".to_string()
}

/// Configuration at ~/.config/hourcount/config.toml, overridable with
/// `HOURCOUNT_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoursConfig {
    /// Where the source list is persisted
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,

    /// Prefix prepended to every feed URL, e.g. "https://corsproxy.io/?"
    #[serde(default)]
    pub relay_prefix: Option<String>,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Zone for all-day and floating times in feeds
    #[serde(default = "default_floating_timezone")]
    pub floating_timezone: String,
}

impl Default for HoursConfig {
    fn default() -> Self {
        HoursConfig {
            sources_path: default_sources_path(),
            relay_prefix: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            floating_timezone: default_floating_timezone(),
        }
    }
}

impl HoursConfig {
    pub fn config_path() -> HoursResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HoursError::Config("Could not determine config directory".into()))?
            .join("hourcount");

        Ok(config_dir.join("config.toml"))
    }

    /// Load ~/.config/hourcount/config.toml (written with commented defaults
    /// on first use) and apply environment overrides.
    pub fn load() -> HoursResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(Environment::with_prefix("HOURCOUNT"))
            .build()
            .map_err(|e| HoursError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| HoursError::Config(e.to_string()))
    }

    /// Load a specific config file without environment overrides.
    pub fn load_from(path: &Path) -> HoursResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .build()
            .map_err(|e| HoursError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| HoursError::Config(e.to_string()))
    }

    /// Source list path with `~` expanded.
    pub fn sources_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.sources_path.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn floating_tz(&self) -> HoursResult<Tz> {
        self.floating_timezone.parse::<Tz>().map_err(|_| {
            HoursError::Config(format!(
                "Unknown time zone '{}' in floating_timezone",
                self.floating_timezone
            ))
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> HoursResult<()> {
        let contents = format!(
            "\
# hourcount configuration

# Where the list of calendars is stored:
# sources_path = \"{}\"

# Route feed requests through a relay, e.g. a CORS proxy:
# relay_prefix = \"https://corsproxy.io/?\"

# Seconds before a feed request is abandoned:
# fetch_timeout_secs = {}

# Time zone for all-day and floating event times:
# floating_timezone = \"UTC\"
",
            DEFAULT_SOURCES_PATH, DEFAULT_FETCH_TIMEOUT_SECS
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HoursError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| HoursError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
