//! Runtime stylesheet registry for DX styled components
//!
//! Turns component-scoped style definitions into deduplicated CSS rules
//! injected into a host document, and resumes from CSS that a server render
//! already emitted without re-emitting or reordering it.
//!
//! This crate is part of the DX ecosystem.

// new_without_default: sheets and generators document their starting state in `new`
#![allow(clippy::new_without_default)]

use std::path::PathBuf;

pub mod adapters;
pub mod config;
pub mod core;
pub mod document;
pub mod logging;
pub mod naming;
pub mod server;

/// Version of the engine. Managed containers carry it in their version
/// attribute and are only rehydrated when it matches.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Separator written after every rule in a managed container.
pub const SPLITTER: &str = "/*!sc*/\n";

/// Re-export commonly used items
pub mod prelude {
    pub use crate::adapters::{
        ComponentIds, ComponentStyle, FlatCompiler, GlobalStyle, Keyframes, RuleCompiler,
        StyleRules,
    };
    pub use crate::config::StyledConfig;
    pub use crate::core::{GroupedTag, HostTarget, RuleTarget, StyleSheet, VirtualTarget};
    pub use crate::document::{HostDocument, SharedDocument, StyleContainer};
    pub use crate::naming::{FixedNames, HashedNames, NameGenerator, SequentialNames};
    pub use crate::server::ServerStyleSheet;
    pub use crate::{StyledError, VERSION};
}

/// Errors surfaced by the styled runtime.
///
/// Malformed or foreign markup is never an error: it is left alone and
/// logged. Only configuration, environment and lifecycle problems end up here.
#[derive(Debug, thiserror::Error)]
pub enum StyledError {
    /// Failed to read a configuration file
    #[error("Failed to read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Configuration file is not valid TOML for [`config::StyledConfig`]
    #[error("Failed to parse config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Configuration parsed but holds an unusable value
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },
    /// Mutex was poisoned
    #[error("Mutex was poisoned - another thread panicked while holding the lock")]
    MutexPoisoned,
    /// The server sheet already produced its style tags
    #[error("Server stylesheet is sealed; create a new one for the next render")]
    SheetSealed,
    /// Logging could not be installed
    #[error("Logging error: {message}")]
    Logging { message: String },
    /// I/O failure outside of config loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Implement From for MutexPoisonedError to allow ? operator with lock_or_recover()
impl From<crate::core::mutex_ext::MutexPoisonedError> for StyledError {
    fn from(_: crate::core::mutex_ext::MutexPoisonedError) -> Self {
        StyledError::MutexPoisoned
    }
}
