//! Physical rule targets
//!
//! A [`RuleTarget`] is the flat, positional rule list a [`GroupedTag`]
//! writes through. [`VirtualTarget`] keeps rules in memory for server
//! rendering; [`HostTarget`] writes them into managed `<style>` containers
//! of a [`HostDocument`].
//!
//! [`GroupedTag`]: crate::core::GroupedTag

use std::sync::Arc;

use crate::SPLITTER;
use crate::core::mutex_ext::MutexExt;
use crate::document::{ContainerId, HostDocument, SharedDocument};

pub trait RuleTarget: Send + std::fmt::Debug {
    /// Insert `rule` so that it ends up at `index`. Returns false when the
    /// rule could not be written; the caller must not count it.
    fn insert_rule(&mut self, index: usize, rule: &str) -> bool;

    fn delete_rule(&mut self, index: usize);

    fn rule(&self, index: usize) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every rule and any physical storage owned by the target.
    fn clear(&mut self);
}

/// In-memory rule list.
#[derive(Debug, Default, Clone)]
pub struct VirtualTarget {
    rules: Vec<String>,
}

impl VirtualTarget {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleTarget for VirtualTarget {
    fn insert_rule(&mut self, index: usize, rule: &str) -> bool {
        if index > self.rules.len() {
            return false;
        }
        self.rules.insert(index, rule.to_string());
        true
    }

    fn delete_rule(&mut self, index: usize) {
        if index < self.rules.len() {
            self.rules.remove(index);
        }
    }

    fn rule(&self, index: usize) -> Option<String> {
        self.rules.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.rules.len()
    }

    fn clear(&mut self) {
        self.rules.clear();
    }
}

/// One physical rule inside a managed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) text: String,
    /// Unindexed slots come from rehydrated markup that no marker claimed.
    /// They keep their place and bytes but are invisible to the tag.
    pub(crate) indexed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ManagedContainer {
    pub(crate) container: ContainerId,
    pub(crate) slots: Vec<Slot>,
    /// Trailing non-rule text (usually whitespace), kept after the last slot.
    pub(crate) tail: String,
}

impl ManagedContainer {
    fn render(&self) -> String {
        let mut css = String::new();
        for slot in &self.slots {
            css.push_str(&slot.text);
            css.push_str(SPLITTER);
        }
        css.push_str(&self.tail);
        css
    }
}

/// Writes rules into the managed containers of a shared host document.
///
/// Its index space covers only indexed rules. Managed containers are one
/// logical stream in document order; a new rule lands right after the
/// indexed rule preceding its index, so unrelated text never moves relative
/// to the groups around it.
#[derive(Debug)]
pub struct HostTarget {
    document: SharedDocument,
    container_attributes: Vec<(String, String)>,
    containers: Vec<ManagedContainer>,
    indexed: usize,
}

impl HostTarget {
    /// Target with no managed containers yet. The first insertion appends a
    /// container marked with `attribute="active"` and `version_attribute`.
    pub fn new(document: SharedDocument, attribute: &str, version_attribute: &str) -> Self {
        Self::adopt(document, attribute, version_attribute, Vec::new())
    }

    pub(crate) fn adopt(
        document: SharedDocument,
        attribute: &str,
        version_attribute: &str,
        containers: Vec<ManagedContainer>,
    ) -> Self {
        let indexed = containers
            .iter()
            .flat_map(|c| c.slots.iter())
            .filter(|s| s.indexed)
            .count();
        Self {
            document,
            container_attributes: vec![
                (attribute.to_string(), "active".to_string()),
                (version_attribute.to_string(), crate::VERSION.to_string()),
            ],
            containers,
            indexed,
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Handles of the containers this target manages, in document order.
    pub fn managed_containers(&self) -> Vec<ContainerId> {
        self.containers.iter().map(|c| c.container).collect()
    }

    /// Number of rehydrated rules no group owns.
    pub fn unindexed_len(&self) -> usize {
        self.containers
            .iter()
            .flat_map(|c| c.slots.iter())
            .filter(|s| !s.indexed)
            .count()
    }

    /// Container and slot position of the `index`-th indexed rule.
    fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let mut seen = 0usize;
        for (ci, container) in self.containers.iter().enumerate() {
            for (pos, slot) in container.slots.iter().enumerate() {
                if !slot.indexed {
                    continue;
                }
                if seen == index {
                    return Some((ci, pos));
                }
                seen += 1;
            }
        }
        None
    }

    fn insertion_point(&self, index: usize) -> Option<(usize, usize)> {
        if index == 0 {
            if self.indexed > 0 {
                return self.locate(0);
            }
            let last = self.containers.len().checked_sub(1)?;
            return Some((last, self.containers[last].slots.len()));
        }
        self.locate(index - 1).map(|(ci, pos)| (ci, pos + 1))
    }

    fn flush(&self, doc: &mut HostDocument, ci: usize) -> bool {
        let managed = &self.containers[ci];
        match doc.container_mut(managed.container) {
            Some(container) => {
                container.set_css(managed.render());
                true
            }
            None => {
                tracing::warn!(
                    container = ?managed.container,
                    "Managed style container was removed from the document"
                );
                false
            }
        }
    }
}

impl RuleTarget for HostTarget {
    fn insert_rule(&mut self, index: usize, rule: &str) -> bool {
        if index > self.indexed {
            return false;
        }
        let document = Arc::clone(&self.document);
        let Ok(mut doc) = document.lock_or_recover() else {
            return false;
        };

        if self.containers.is_empty() {
            let container = doc.push_style(self.container_attributes.iter().cloned(), String::new());
            tracing::debug!(?container, "Created managed style container");
            self.containers.push(ManagedContainer {
                container,
                slots: Vec::new(),
                tail: String::new(),
            });
        }

        let Some((ci, pos)) = self.insertion_point(index) else {
            return false;
        };
        if doc.container(self.containers[ci].container).is_none() {
            tracing::warn!("Cannot insert rule: managed style container is gone");
            return false;
        }
        self.containers[ci].slots.insert(
            pos,
            Slot {
                text: rule.to_string(),
                indexed: true,
            },
        );
        self.indexed += 1;
        self.flush(&mut doc, ci)
    }

    fn delete_rule(&mut self, index: usize) {
        let Some((ci, pos)) = self.locate(index) else {
            return;
        };
        let document = Arc::clone(&self.document);
        let Ok(mut doc) = document.lock_or_recover() else {
            return;
        };
        self.containers[ci].slots.remove(pos);
        self.indexed -= 1;
        self.flush(&mut doc, ci);
    }

    fn rule(&self, index: usize) -> Option<String> {
        let (ci, pos) = self.locate(index)?;
        Some(self.containers[ci].slots[pos].text.clone())
    }

    fn len(&self) -> usize {
        self.indexed
    }

    fn clear(&mut self) {
        let document = Arc::clone(&self.document);
        match document.lock_or_recover() {
            Ok(mut doc) => {
                for managed in &self.containers {
                    doc.remove(managed.container);
                }
            }
            Err(_) => {
                tracing::error!("Could not discard managed style containers");
            }
        }
        self.containers.clear();
        self.indexed = 0;
    }
}
