//! Calendar sources and the persisted source list.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{HoursError, HoursResult};

/// One configured feed. The URL is the identity; the name is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl CalendarSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        CalendarSource {
            name: name.into(),
            url: url.into(),
        }
    }

    /// True when `key` names this source either by name or by URL.
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.url == key
    }
}

/// Load/save contract for the source list.
pub trait SourceStore: Send + Sync {
    /// Missing or unreadable data yields an empty list.
    fn load(&self) -> Vec<CalendarSource>;

    fn save(&self, sources: &[CalendarSource]) -> HoursResult<()>;
}

/// Source list stored as a JSON array of `{name, url}` records in one file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

impl SourceStore for JsonFileStore {
    fn load(&self) -> Vec<CalendarSource> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read source list");
                return Vec::new();
            }
        };

        // A stored `null` is treated like a missing list
        match serde_json::from_str::<Option<Vec<CalendarSource>>>(&content) {
            Ok(sources) => sources.unwrap_or_default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt source list");
                Vec::new()
            }
        }
    }

    fn save(&self, sources: &[CalendarSource]) -> HoursResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(sources)
            .map_err(|e| HoursError::Serialization(e.to_string()))?;

        std::fs::write(&self.path, content)?;

        Ok(())
    }
}
