//! Global styles and keyframes
//!
//! Both are content-addressed: the id derives from a hash of the CSS, so two
//! definitions with identical content share one group and are emitted once.

use super::compiler::RuleCompiler;
use crate::core::StyleSheet;
use crate::naming::alphabetic_name;
use crate::naming::hash::content_hash;

pub const GLOBAL_ID_PREFIX: &str = "sc-global-";
pub const KEYFRAMES_ID_PREFIX: &str = "sc-keyframes-";

/// Unscoped CSS. Nothing reaches the sheet until [`GlobalStyle::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalStyle {
    id: String,
    name: String,
    css: String,
}

impl GlobalStyle {
    pub fn new(css: impl Into<String>) -> Self {
        let css = css.into();
        let name = alphabetic_name(content_hash(&css));
        Self {
            id: format!("{GLOBAL_ID_PREFIX}{name}"),
            name,
            css,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Inject the rules unless they are already in the sheet. Returns whether
    /// anything was inserted.
    pub fn render(&self, sheet: &mut StyleSheet, compiler: &dyn RuleCompiler) -> bool {
        if sheet.has_name_for_id(&self.id, &self.name) {
            return false;
        }
        let rules = compiler.compile_global(&self.css);
        sheet.insert_named(&self.id, &self.name, &rules);
        tracing::debug!(id = %self.id, rules = rules.len(), "Injected global style");
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyframes {
    id: String,
    name: String,
    body: String,
}

impl Keyframes {
    /// `body` is the inside of the `@keyframes` block, e.g.
    /// `from{opacity:0}to{opacity:1}`.
    pub fn new(body: impl Into<String>) -> Self {
        let body = body.into();
        let name = alphabetic_name(content_hash(&body));
        Self {
            id: format!("{KEYFRAMES_ID_PREFIX}{name}"),
            name,
            body,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name without injecting; only safe to reference once injected.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inject(&self, sheet: &mut StyleSheet) {
        if !sheet.has_name_for_id(&self.id, &self.name) {
            let rule = format!("@keyframes {}{{{}}}", self.name, self.body);
            sheet.insert_named(&self.id, &self.name, &[rule]);
        }
    }

    /// Inject, then hand back the animation name.
    pub fn get_name(&self, sheet: &mut StyleSheet) -> String {
        self.inject(sheet);
        self.name.clone()
    }
}
