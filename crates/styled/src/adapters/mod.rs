//! Style source adapters
//!
//! Thin consumers of the sheet: each one derives an owning id, resolves its
//! CSS, compiles it through a [`RuleCompiler`] and inserts it exactly once.

pub mod compiler;
pub mod component;
pub mod global;

pub use compiler::{FlatCompiler, RuleCompiler};
pub use component::{ComponentIds, ComponentStyle, StyleRules};
pub use global::{GLOBAL_ID_PREFIX, GlobalStyle, KEYFRAMES_ID_PREFIX, Keyframes};
