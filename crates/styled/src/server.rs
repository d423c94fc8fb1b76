//! Server-side collection
//!
//! One [`ServerStyleSheet`] per render: adapters inject into its in-memory
//! sheet, then [`ServerStyleSheet::style_tags`] emits the managed container
//! a client later rehydrates from.

use crate::StyledError;
use crate::config::SheetConfig;
use crate::core::StyleSheet;
use crate::document::{HostDocument, render_style_element};

#[derive(Debug)]
pub struct ServerStyleSheet {
    sheet: StyleSheet,
    sealed: bool,
}

impl ServerStyleSheet {
    pub fn new() -> Self {
        Self::with_config(SheetConfig::default())
    }

    pub fn with_config(config: SheetConfig) -> Self {
        Self {
            sheet: StyleSheet::with_config(config),
            sealed: false,
        }
    }

    /// Sheet to render into. Fails once the tags were produced.
    pub fn sheet_mut(&mut self) -> Result<&mut StyleSheet, StyledError> {
        if self.sealed {
            return Err(StyledError::SheetSealed);
        }
        Ok(&mut self.sheet)
    }

    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn container_attributes(&self) -> Vec<(String, String)> {
        let config = self.sheet.config();
        vec![
            (config.attribute.clone(), "active".to_string()),
            (config.version_attribute.clone(), crate::VERSION.to_string()),
        ]
    }

    /// Render the collected rules as one managed `<style>` element and seal
    /// the sheet.
    pub fn style_tags(&mut self) -> Result<String, StyledError> {
        if self.sealed {
            return Err(StyledError::SheetSealed);
        }
        self.sealed = true;
        let mut out = String::new();
        render_style_element(&mut out, &self.container_attributes(), &self.sheet.to_css());
        tracing::debug!(groups = self.sheet.group_count(), bytes = out.len(), "Rendered style tags");
        Ok(out)
    }

    /// The collected rules as a document with a single managed container.
    pub fn into_document(self) -> HostDocument {
        let mut document = HostDocument::new();
        document.push_style(self.container_attributes(), self.sheet.to_css());
        document
    }
}
