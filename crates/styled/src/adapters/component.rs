//! Component styles
//!
//! A component owns one group and one name per distinct resolved CSS. Static
//! rules resolve the same way every render, so only the first render touches
//! the sheet; dynamic rules get a new name the first time a resolution is
//! seen.

use std::borrow::Cow;
use std::fmt;

use ahash::AHashMap;

use super::compiler::RuleCompiler;
use crate::core::StyleSheet;
use crate::naming::hash::{SEED, phash};
use crate::naming::{alphabetic_name, escape_identifier};

/// CSS source of a component, resolved against props of type `P`.
pub enum StyleRules<P> {
    Static(String),
    Dynamic(Box<dyn Fn(&P) -> String + Send + Sync>),
}

impl<P> StyleRules<P> {
    pub fn dynamic(resolve: impl Fn(&P) -> String + Send + Sync + 'static) -> Self {
        Self::Dynamic(Box::new(resolve))
    }

    pub fn resolve(&self, props: &P) -> Cow<'_, str> {
        match self {
            Self::Static(css) => Cow::Borrowed(css),
            Self::Dynamic(resolve) => Cow::Owned(resolve(props)),
        }
    }
}

impl<P> fmt::Debug for StyleRules<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(css) => f.debug_tuple("Static").field(css).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug)]
pub struct ComponentStyle<P> {
    component_id: String,
    base_hash: u64,
    rules: StyleRules<P>,
}

impl<P> ComponentStyle<P> {
    pub fn new(component_id: impl Into<String>, rules: StyleRules<P>) -> Self {
        let component_id = component_id.into();
        Self {
            base_hash: phash(*SEED, &component_id),
            component_id,
            rules,
        }
    }

    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn is_static(&self) -> bool {
        matches!(self.rules, StyleRules::Static(_))
    }

    /// Resolve the rules for `props`, inject them unless this exact
    /// resolution was already emitted for the component, and return the name
    /// to put on the element.
    pub fn generate_and_inject(&self, props: &P, sheet: &mut StyleSheet, compiler: &dyn RuleCompiler) -> String {
        let css = self.rules.resolve(props);
        let key = format!("{:x}{:x}", self.base_hash, sheet.hash(&css));
        let name = sheet.name_for_key(&key);

        if !sheet.has_name_for_id(&self.component_id, &name) {
            let rules = compiler.compile(&format!(".{name}"), &css);
            sheet.insert_named(&self.component_id, &name, &rules);
            tracing::debug!(id = %self.component_id, name = %name, "Injected component style");
        }
        name
    }
}

/// Derives stable component ids from display names.
///
/// The n-th id for a display name is the same in every process, which is
/// what lets a client find the groups a server render emitted.
#[derive(Debug, Default, Clone)]
pub struct ComponentIds {
    counts: AHashMap<String, u64>,
}

impl ComponentIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<escaped display name>-<hash>`, unique per call.
    pub fn generate(&mut self, display_name: &str) -> String {
        let mut prefix = escape_identifier(display_name);
        if prefix.is_empty() {
            prefix = "sc".into();
        }
        let count = self.counts.entry(prefix.clone()).or_insert(0);
        let id = format!("{}-{}", prefix, alphabetic_name(phash(*SEED, &format!("{prefix}{count}"))));
        *count += 1;
        id
    }
}
