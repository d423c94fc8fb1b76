//! Configuration (TOML-based)
//!
//! ```toml
//! [sheet]
//! attribute = "data-styled"
//! version_attribute = "data-styled-version"
//! naming = "hashed"
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```
//!
//! Every field has a default. `SC_ATTR` and `DX_STYLED_NAMING` override the
//! file when set.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::StyledError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How names are derived from cache keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// `a, b, c, ...` skipping names already in use. Only stable within one
    /// process, so a client rehydrating a server render would re-emit every
    /// style under a new name. Meant for tests and single-process sheets.
    Sequential,
    /// Hash of the key. Stable across processes, which is what lets a
    /// client reuse the names a server render emitted.
    #[default]
    Hashed,
}

impl std::str::FromStr for NamingStrategy {
    type Err = StyledError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "hashed" => Ok(Self::Hashed),
            other => Err(StyledError::InvalidConfig {
                message: format!("unknown naming strategy {other:?} (expected \"sequential\" or \"hashed\")"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Marking attribute of managed containers; also the marker selector
    #[serde(default = "default_attribute")]
    pub attribute: String,
    /// Attribute carrying the engine version
    #[serde(default = "default_version_attribute")]
    pub version_attribute: String,
    #[serde(default)]
    pub naming: NamingStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or an EnvFilter directive
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON format logging
    #[serde(default)]
    pub json: bool,
}

// --- Defaults ---

fn default_attribute() -> String {
    "data-styled".into()
}
fn default_version_attribute() -> String {
    "data-styled-version".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            attribute: default_attribute(),
            version_attribute: default_version_attribute(),
            naming: NamingStrategy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl StyledConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, StyledError> {
        let content = std::fs::read_to_string(path).map_err(|source| StyledError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| StyledError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, or return defaults
    pub fn load_or_default(path: &Path) -> Result<Self, StyledError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, StyledError> {
        let config: Self = toml::from_str(content).map_err(|source| StyledError::ConfigParse {
            path: Default::default(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SC_ATTR` and `DX_STYLED_NAMING` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, StyledError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StyledError> {
        if let Some(attribute) = lookup("SC_ATTR").filter(|v| !v.trim().is_empty()) {
            self.sheet.attribute = attribute.trim().to_string();
        }
        if let Some(naming) = lookup("DX_STYLED_NAMING") {
            self.sheet.naming = naming.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), StyledError> {
        for (field, value) in [
            ("sheet.attribute", &self.sheet.attribute),
            ("sheet.version_attribute", &self.sheet.version_attribute),
        ] {
            let valid = !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(StyledError::InvalidConfig {
                    message: format!("{field} must be a non-empty attribute name, got {value:?}"),
                });
            }
        }
        if self.sheet.attribute == self.sheet.version_attribute {
            return Err(StyledError::InvalidConfig {
                message: "sheet.attribute and sheet.version_attribute must differ".into(),
            });
        }
        Ok(())
    }
}
