//! Schedule configuration: a TOML file merged with `CHRONOSET_*` environment
//! overrides.

use std::path::Path;

use anyhow::{Context, Result};
use chronoset::{Recurrence, RecurrenceDefinition, TimezoneContext};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChronosetConfig {
    /// IANA identifier; the host timezone when absent.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub recurrences: Vec<RecurrenceDefinition>,
}

impl ChronosetConfig {
    /// Load `path` (optional on disk) with `CHRONOSET_*` overrides on top.
    /// Every recurrence is validated here, so a bad definition fails the load.
    pub fn load(path: &Path) -> Result<Self> {
        let config: ChronosetConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHRONOSET_").split("_"))
            .extract()
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        debug!(
            path = %path.display(),
            recurrences = config.recurrences.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// The timezone to schedule in; `override_id` wins over the file.
    pub fn timezone_context(&self, override_id: Option<&str>) -> TimezoneContext {
        match override_id.or(self.timezone.as_deref()) {
            Some(id) => TimezoneContext::new(id),
            None => TimezoneContext::host(),
        }
    }

    pub fn recurrences(&self) -> Vec<Recurrence> {
        self.recurrences.iter().cloned().map(Recurrence::from).collect()
    }
}
