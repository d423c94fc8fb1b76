//! Grouped tag
//!
//! Splits a flat [`RuleTarget`] into contiguous groups ordered by group
//! index. Physical order is cascade order, so a rule inserted for group `n`
//! always lands after every rule of groups `< n` and before every rule of
//! groups `> n`, whatever order the groups were first written in.
//!
//! Each group may end with a marker rule. Real rules are inserted before it;
//! [`GroupedTag::set_marker`] swaps it for an updated one.

use super::target::RuleTarget;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroupSlot {
    /// Physical rules attributed to the group, marker included.
    pub size: usize,
    pub marked: bool,
}

#[derive(Debug)]
pub struct GroupedTag {
    groups: Vec<GroupSlot>,
    target: Box<dyn RuleTarget>,
}

impl GroupedTag {
    pub fn new(target: Box<dyn RuleTarget>) -> Self {
        Self::with_groups(target, Vec::new())
    }

    /// Tag over a target that already holds rules, e.g. after rehydration.
    ///
    /// The slot sizes must add up to the target's length.
    pub fn with_groups(target: Box<dyn RuleTarget>, groups: Vec<GroupSlot>) -> Self {
        assert_eq!(
            groups.iter().map(|g| g.size).sum::<usize>(),
            target.len(),
            "group sizes must cover the target exactly"
        );
        Self { groups, target }
    }

    pub fn target(&self) -> &dyn RuleTarget {
        self.target.as_ref()
    }

    /// Number of group slots, including empty ones.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_size(&self, group: usize) -> usize {
        self.groups.get(group).map_or(0, |g| g.size)
    }

    pub fn is_marked(&self, group: usize) -> bool {
        self.groups.get(group).is_some_and(|g| g.marked)
    }

    pub fn groups(&self) -> &[GroupSlot] {
        &self.groups
    }

    /// Physical index of the group's first rule.
    pub fn index_of_group(&self, group: usize) -> usize {
        self.groups.iter().take(group).map(|g| g.size).sum()
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    fn ensure_group(&mut self, group: usize) {
        if group >= self.groups.len() {
            self.groups.resize(group + 1, GroupSlot::default());
        }
    }

    /// Append real rules to `group`, ahead of its marker.
    pub fn insert_rules<S: AsRef<str>>(&mut self, group: usize, rules: &[S]) {
        self.ensure_group(group);
        let slot = self.groups[group];
        let mut at = self.index_of_group(group) + slot.size - usize::from(slot.marked);

        for rule in rules {
            if self.target.insert_rule(at, rule.as_ref()) {
                self.groups[group].size += 1;
                at += 1;
            } else {
                tracing::warn!(group, rule = rule.as_ref(), "Failed to insert rule");
            }
        }
    }

    /// Replace (or append) the trailing marker of `group`.
    pub fn set_marker(&mut self, group: usize, marker: &str) {
        self.ensure_group(group);
        let end = self.index_of_group(group) + self.groups[group].size;

        let at = if self.groups[group].marked {
            self.target.delete_rule(end - 1);
            self.groups[group].size -= 1;
            self.groups[group].marked = false;
            end - 1
        } else {
            end
        };

        if self.target.insert_rule(at, marker) {
            self.groups[group].size += 1;
            self.groups[group].marked = true;
        } else {
            tracing::warn!(group, "Failed to write group marker");
        }
    }

    /// Rules of one group in physical order, marker included.
    pub fn group_rules(&self, group: usize) -> Vec<String> {
        let start = self.index_of_group(group);
        (start..start + self.group_size(group))
            .filter_map(|i| self.target.rule(i))
            .collect()
    }

    /// Every rule in physical order.
    pub fn rules(&self) -> Vec<String> {
        (0..self.target.len()).filter_map(|i| self.target.rule(i)).collect()
    }

    pub fn clear(&mut self) {
        self.target.clear();
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::VirtualTarget;

    fn tag() -> GroupedTag {
        GroupedTag::new(Box::new(VirtualTarget::new()))
    }

    #[test]
    fn test_groups_stay_ordered_regardless_of_write_order() {
        let mut tag = tag();
        tag.insert_rules(2, &[".c{}"]);
        tag.insert_rules(0, &[".a{}"]);
        tag.insert_rules(1, &[".b{}"]);
        tag.insert_rules(0, &[".a2{}"]);

        assert_eq!(tag.rules(), vec![".a{}", ".a2{}", ".b{}", ".c{}"]);
        assert_eq!(tag.group_size(0), 2);
        assert_eq!(tag.group_size(1), 1);
        assert_eq!(tag.group_size(7), 0);
        assert_eq!(tag.index_of_group(2), 3);
    }

    #[test]
    fn test_missing_groups_are_created_empty() {
        let mut tag = tag();
        tag.insert_rules(3, &[".d{}"]);
        assert_eq!(tag.group_count(), 4);
        assert_eq!(tag.groups()[..3].iter().map(|g| g.size).sum::<usize>(), 0);
    }

    #[test]
    fn test_marker_stays_last_in_group() {
        let mut tag = tag();
        tag.insert_rules(0, &[".a{}"]);
        tag.set_marker(0, "m0-1");
        tag.insert_rules(1, &[".b{}"]);
        tag.set_marker(1, "m1-1");
        tag.insert_rules(0, &[".a2{}"]);
        tag.set_marker(0, "m0-2");

        assert_eq!(tag.group_rules(0), vec![".a{}", ".a2{}", "m0-2"]);
        assert_eq!(tag.group_rules(1), vec![".b{}", "m1-1"]);
        assert!(tag.is_marked(0));
        assert_eq!(tag.len(), 5);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut tag = tag();
        tag.insert_rules(1, &[".a{}", ".b{}"]);
        tag.set_marker(1, "m");
        tag.clear();
        assert!(tag.is_empty());
        assert_eq!(tag.group_count(), 0);
    }

    #[test]
    #[should_panic(expected = "group sizes must cover the target exactly")]
    fn test_with_groups_rejects_mismatched_sizes() {
        let _ = GroupedTag::with_groups(
            Box::new(VirtualTarget::new()),
            vec![GroupSlot { size: 2, marked: true }],
        );
    }
}
