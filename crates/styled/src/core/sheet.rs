//! StyleSheet registry
//!
//! The single store every style source goes through. It maps owning ids to
//! group indices and to the ordered set of names already emitted for them,
//! and mediates all insertions through a [`GroupedTag`].
//!
//! Group allocation is first-use-wins: the first `insert` for an id fixes its
//! group, and the group's position in the tag never changes afterwards.

use ahash::{AHashMap, AHashSet};
use indexmap::IndexSet;

use super::marker::{MAX_GROUP, MarkerCodec, is_valid_id, is_valid_name};
use super::rehydrate::{self, Rehydration};
use super::tag::GroupedTag;
use super::target::{HostTarget, RuleTarget, VirtualTarget};
use crate::SPLITTER;
use crate::config::{NamingStrategy, SheetConfig};
use crate::document::SharedDocument;
use crate::naming::hash::{HashFn, content_hash};
use crate::naming::{HashedNames, NameGenerator, SequentialNames};

#[derive(Debug)]
pub struct StyleSheet {
    config: SheetConfig,
    codec: MarkerCodec,
    group_ids: AHashMap<String, usize>,
    next_group: usize,
    names: AHashMap<String, IndexSet<String>>,
    names_in_use: AHashSet<String>,
    /// Memoized `key -> name`, so every strategy is stable within a sheet.
    name_cache: AHashMap<String, String>,
    name_generator: Box<dyn NameGenerator>,
    hasher: HashFn,
    tag: GroupedTag,
}

fn generator_for(strategy: NamingStrategy) -> Box<dyn NameGenerator> {
    match strategy {
        NamingStrategy::Sequential => Box::new(SequentialNames::new()),
        NamingStrategy::Hashed => Box::new(HashedNames::new()),
    }
}

impl StyleSheet {
    /// In-memory sheet with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SheetConfig::default())
    }

    /// In-memory sheet.
    pub fn with_config(config: SheetConfig) -> Self {
        Self::with_target(config, Box::new(VirtualTarget::new()))
    }

    /// Sheet writing through an arbitrary target. The target must be empty.
    pub fn with_target(config: SheetConfig, target: Box<dyn RuleTarget>) -> Self {
        Self::from_parts(config, GroupedTag::new(target))
    }

    /// Sheet writing into a host document, ignoring whatever it already
    /// holds. Use [`StyleSheet::rehydrate`] to resume a server render.
    pub fn for_document(document: SharedDocument, config: SheetConfig) -> Self {
        let target = HostTarget::new(document, &config.attribute, &config.version_attribute);
        Self::with_target(config, Box::new(target))
    }

    /// Resume from the managed containers already in `document`.
    ///
    /// Meant to run once, before any style is inserted.
    pub fn rehydrate(document: SharedDocument, config: SheetConfig) -> Self {
        let rehydration = rehydrate::rehydrate(&document, &config.attribute, &config.version_attribute);
        Self::from_rehydration(config, rehydration)
    }

    fn from_rehydration(config: SheetConfig, rehydration: Rehydration) -> Self {
        let slots = rehydration.group_slots();
        let next_group = rehydration.next_group();
        let Rehydration { groups, target, .. } = rehydration;

        let mut sheet = Self::from_parts(config, GroupedTag::with_groups(Box::new(target), slots));
        sheet.next_group = next_group;
        for group in groups {
            sheet.group_ids.insert(group.id.clone(), group.group);
            for name in group.names {
                sheet.register_name(&group.id, &name);
            }
        }
        sheet
    }

    fn from_parts(config: SheetConfig, tag: GroupedTag) -> Self {
        Self {
            codec: MarkerCodec::new(config.attribute.clone()),
            name_generator: generator_for(config.naming),
            config,
            group_ids: AHashMap::new(),
            next_group: 0,
            names: AHashMap::new(),
            names_in_use: AHashSet::new(),
            name_cache: AHashMap::new(),
            hasher: content_hash,
            tag,
        }
    }

    /// Swap the naming strategy.
    pub fn with_name_generator(mut self, generator: Box<dyn NameGenerator>) -> Self {
        self.name_generator = generator;
        self
    }

    /// Swap the hash used by adapters to derive keys and synthetic ids.
    pub fn with_hasher(mut self, hasher: HashFn) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub fn hash(&self, input: &str) -> u64 {
        (self.hasher)(input)
    }

    pub fn has_name_for_id(&self, id: &str, name: &str) -> bool {
        self.names.get(id).is_some_and(|names| names.contains(name))
    }

    /// Record `name` as emitted for `id`. Repeating a pair is a no-op.
    pub fn register_name(&mut self, id: &str, name: &str) {
        assert!(is_valid_name(name), "invalid style name {name:?}");
        if !self.names.contains_key(id) {
            self.names.insert(id.to_string(), IndexSet::new());
        }
        if let Some(names) = self.names.get_mut(id) {
            names.insert(name.to_string());
        }
        self.names_in_use.insert(name.to_string());
    }

    /// Names emitted for `id`, in emission order.
    pub fn names_for_id(&self, id: &str) -> impl Iterator<Item = &str> {
        self.names.get(id).into_iter().flat_map(|names| names.iter().map(String::as_str))
    }

    pub fn is_name_in_use(&self, name: &str) -> bool {
        self.names_in_use.contains(name)
    }

    pub fn group_for_id(&self, id: &str) -> Option<usize> {
        self.group_ids.get(id).copied()
    }

    /// Ids with a group, ordered by group index.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<(&str, usize)> = self.group_ids.iter().map(|(id, g)| (id.as_str(), *g)).collect();
        ids.sort_by_key(|(_, g)| *g);
        ids.into_iter().map(|(id, _)| id).collect()
    }

    /// Next group index that a new id would get.
    pub fn next_group(&self) -> usize {
        self.next_group
    }

    /// Name for a cache key; the same key always maps to the same name.
    pub fn name_for_key(&mut self, key: &str) -> String {
        if let Some(name) = self.name_cache.get(key) {
            return name.clone();
        }
        let in_use = &self.names_in_use;
        let name = self.name_generator.generate(key, &|candidate: &str| in_use.contains(candidate));
        self.name_cache.insert(key.to_string(), name.clone());
        name
    }

    fn group_for_insert(&mut self, id: &str) -> usize {
        if let Some(group) = self.group_ids.get(id) {
            return *group;
        }
        assert!(is_valid_id(id), "invalid style id {id:?}");
        let group = self.next_group;
        assert!(group < MAX_GROUP, "style group limit of {MAX_GROUP} reached");
        // A fresh index must not already own rules; anything else means the
        // tag and the id map have diverged.
        assert_eq!(
            self.tag.group_size(group),
            0,
            "group {group} allocated for {id:?} already holds rules"
        );
        self.next_group += 1;
        self.group_ids.insert(id.to_string(), group);
        tracing::debug!(id, group, "Allocated style group");
        group
    }

    /// Append `rules` to the group of `id` (allocating it on first use) and
    /// rewrite the group's marker with every name registered so far.
    pub fn insert<S: AsRef<str>>(&mut self, id: &str, rules: &[S]) {
        let group = self.group_for_insert(id);
        self.tag.insert_rules(group, rules);
        let marker = self.codec.encode(group, id, self.names_for_id(id));
        self.tag.set_marker(group, &marker);
        tracing::trace!(id, group, rules = rules.len(), "Inserted rules");
    }

    /// Register `name` for `id`, then insert its rules.
    pub fn insert_named<S: AsRef<str>>(&mut self, id: &str, name: &str, rules: &[S]) {
        self.register_name(id, name);
        self.insert(id, rules);
    }

    pub fn tag(&self) -> &GroupedTag {
        &self.tag
    }

    /// Number of group slots in the tag, including empty ones.
    pub fn group_count(&self) -> usize {
        self.tag.group_count()
    }

    /// Every indexed rule followed by the splitter, as written to a managed
    /// container.
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        for rule in self.tag.rules() {
            css.push_str(&rule);
            css.push_str(SPLITTER);
        }
        css
    }

    /// Drop all registry state and the managed physical containers together,
    /// and rewind the group counter and the name sequence.
    pub fn reset(&mut self) {
        self.tag.clear();
        self.group_ids.clear();
        self.names.clear();
        self.names_in_use.clear();
        self.name_cache.clear();
        self.next_group = 0;
        self.name_generator.reset();
        tracing::debug!("Stylesheet reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::FixedNames;
    use pretty_assertions::assert_eq;

    fn sequential_sheet() -> StyleSheet {
        StyleSheet::new().with_name_generator(Box::new(SequentialNames::new()))
    }

    #[test]
    fn test_insert_allocates_groups_in_first_use_order() {
        let mut sheet = StyleSheet::new();
        sheet.insert_named("B", "b", &[".b{}"]);
        sheet.insert_named("A", "a", &[".a{}"]);
        sheet.insert_named("B", "b2", &[".b2{}"]);

        assert_eq!(sheet.group_for_id("B"), Some(0));
        assert_eq!(sheet.group_for_id("A"), Some(1));
        assert_eq!(sheet.ids(), vec!["B", "A"]);
        assert_eq!(
            sheet.to_css(),
            concat!(
                ".b{}/*!sc*/\n",
                ".b2{}/*!sc*/\n",
                "data-styled.g0[id=\"B\"]{content:\"b,b2,\"}/*!sc*/\n",
                ".a{}/*!sc*/\n",
                "data-styled.g1[id=\"A\"]{content:\"a,\"}/*!sc*/\n",
            )
        );
    }

    #[test]
    fn test_register_name_is_idempotent() {
        let mut sheet = StyleSheet::new();
        sheet.register_name("A", "a");
        sheet.register_name("A", "a");
        sheet.register_name("A", "b");
        assert_eq!(sheet.names_for_id("A").collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(sheet.has_name_for_id("A", "a"));
        assert!(!sheet.has_name_for_id("B", "a"));
        assert!(sheet.is_name_in_use("b"));
    }

    #[test]
    fn test_name_for_key_is_memoized() {
        let mut sheet = StyleSheet::new().with_name_generator(Box::new(FixedNames::new(["x", "y"])));
        assert_eq!(sheet.name_for_key("k1"), "x");
        assert_eq!(sheet.name_for_key("k1"), "x");
        assert_eq!(sheet.name_for_key("k2"), "y");
    }

    #[test]
    fn test_sequential_names_skip_emitted_names() {
        let mut sheet = sequential_sheet();
        sheet.register_name("X", "a");
        assert_eq!(sheet.name_for_key("k"), "b");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut sheet = sequential_sheet();
        let name = sheet.name_for_key("k");
        sheet.insert_named("A", &name, &[".a{}"]);
        sheet.reset();

        assert_eq!(sheet.group_for_id("A"), None);
        assert!(!sheet.has_name_for_id("A", &name));
        assert_eq!(sheet.next_group(), 0);
        assert!(sheet.tag().is_empty());
        assert_eq!(sheet.name_for_key("k"), "a");
    }

    #[test]
    fn test_sequential_strategy_from_config() {
        let config = SheetConfig {
            naming: NamingStrategy::Sequential,
            ..SheetConfig::default()
        };
        let mut sheet = StyleSheet::with_config(config);
        assert_eq!(sheet.name_for_key("k1"), "a");
        assert_eq!(sheet.name_for_key("k2"), "b");
    }

    #[test]
    #[should_panic(expected = "invalid style id")]
    fn test_insert_rejects_ids_that_break_markers() {
        let mut sheet = StyleSheet::new();
        sheet.insert("bad\"id", &[".a{}"]);
    }

    #[test]
    fn test_default_names_are_stable_across_sheets() {
        let mut one = StyleSheet::new();
        let mut two = StyleSheet::new();
        two.register_name("X", &one.name_for_key("k"));
        assert_eq!(one.name_for_key("k"), two.name_for_key("k"));
    }
}
