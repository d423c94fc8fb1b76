//! Rehydration
//!
//! Reads the managed `<style>` containers a server render left in the
//! document and rebuilds the registry and tag state those insertions would
//! have produced in-process. Nothing is re-inserted or re-marked: the rules
//! stay exactly where they are and a [`HostTarget`] adopts them.
//!
//! Managed containers are scanned in document order as one stream. Rules
//! that precede a marker in the same container belong to that marker's
//! group. Rules no marker claims (a container without markers, trailing
//! rules after the last marker) are kept verbatim but never indexed.

use ahash::AHashSet;

use super::marker::{MAX_GROUP, MarkerCodec};
use super::mutex_ext::MutexExt;
use super::tag::GroupSlot;
use super::target::{HostTarget, ManagedContainer, Slot};
use crate::document::{SharedDocument, StyleContainer};
use crate::{SPLITTER, VERSION};

/// A group recovered from markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RehydratedGroup {
    pub group: usize,
    pub id: String,
    pub names: Vec<String>,
    /// Rules attributed to the group, marker included.
    pub size: usize,
}

#[derive(Debug)]
pub struct Rehydration {
    pub groups: Vec<RehydratedGroup>,
    /// Managed containers that were adopted.
    pub managed_containers: usize,
    /// Rules kept verbatim without a group.
    pub unindexed: usize,
    pub(crate) target: HostTarget,
}

impl Rehydration {
    /// Tag slots for the recovered groups; gaps in the index space are empty.
    pub fn group_slots(&self) -> Vec<GroupSlot> {
        let Some(max) = self.groups.iter().map(|g| g.group).max() else {
            return Vec::new();
        };
        let mut slots = vec![GroupSlot::default(); max + 1];
        for group in &self.groups {
            slots[group.group] = GroupSlot {
                size: group.size,
                marked: true,
            };
        }
        slots
    }

    /// First group index free for new ids.
    pub fn next_group(&self) -> usize {
        self.groups.iter().map(|g| g.group + 1).max().unwrap_or(0)
    }
}

/// Whether a container was written by this engine version.
pub fn is_managed(container: &StyleContainer, attribute: &str, version_attribute: &str) -> bool {
    container.has_attribute(attribute) && container.attribute(version_attribute) == Some(VERSION)
}

/// Split container text on the rule splitter.
///
/// Returns the rule pieces and the trailing remainder when it is blank. A
/// non-blank remainder is an unterminated last rule and is returned as a
/// piece.
pub(crate) fn split_rules(css: &str) -> (Vec<String>, String) {
    let mut pieces = Vec::new();
    let mut rest = css;
    while let Some(pos) = rest.find(SPLITTER) {
        pieces.push(rest[..pos].to_string());
        rest = &rest[pos + SPLITTER.len()..];
    }
    if rest.trim().is_empty() {
        (pieces, rest.to_string())
    } else {
        pieces.push(rest.to_string());
        (pieces, String::new())
    }
}

/// Scan the document and adopt its managed containers.
#[tracing::instrument(skip_all, fields(attribute = attribute))]
pub fn rehydrate(document: &SharedDocument, attribute: &str, version_attribute: &str) -> Rehydration {
    let codec = MarkerCodec::new(attribute);
    let mut groups: Vec<RehydratedGroup> = Vec::new();
    let mut seen_ids: AHashSet<String> = AHashSet::new();
    let mut last_group: Option<usize> = None;
    let mut managed: Vec<ManagedContainer> = Vec::new();
    let mut foreign = 0usize;

    let doc = match document.lock_or_recover() {
        Ok(doc) => doc,
        Err(_) => {
            tracing::error!("Skipping rehydration: host document lock is poisoned");
            return Rehydration {
                groups,
                managed_containers: 0,
                unindexed: 0,
                target: HostTarget::new(document.clone(), attribute, version_attribute),
            };
        }
    };

    for container in doc.containers() {
        if !is_managed(container, attribute, version_attribute) {
            foreign += 1;
            continue;
        }

        let (pieces, tail) = split_rules(container.css());
        let mut slots: Vec<Slot> = Vec::with_capacity(pieces.len());
        // Slots from `pending` on are not yet claimed by a marker.
        let mut pending = 0usize;

        for piece in pieces {
            let Some(marker) = codec.decode(&piece) else {
                slots.push(Slot {
                    text: piece,
                    indexed: false,
                });
                continue;
            };

            if seen_ids.contains(&marker.id) {
                tracing::warn!(id = %marker.id, "Duplicate group marker; leaving its rules unindexed");
                slots.push(Slot {
                    text: piece,
                    indexed: false,
                });
                pending = slots.len();
                continue;
            }

            let group = match last_group {
                Some(prev) if marker.group <= prev => {
                    let Some(next) = prev.checked_add(1).filter(|g| *g < MAX_GROUP) else {
                        tracing::warn!(id = %marker.id, "No group index left for marker; leaving its rules unindexed");
                        slots.push(Slot {
                            text: piece,
                            indexed: false,
                        });
                        pending = slots.len();
                        continue;
                    };
                    tracing::warn!(
                        id = %marker.id,
                        encoded = marker.group,
                        assigned = next,
                        "Group marker out of order; renumbering"
                    );
                    next
                }
                _ => marker.group,
            };

            let mut size = 1usize;
            for slot in &mut slots[pending..] {
                if !slot.text.trim().is_empty() {
                    slot.indexed = true;
                    size += 1;
                }
            }
            slots.push(Slot {
                text: piece,
                indexed: true,
            });
            pending = slots.len();

            seen_ids.insert(marker.id.clone());
            last_group = Some(group);
            groups.push(RehydratedGroup {
                group,
                id: marker.id,
                names: marker.names,
                size,
            });
        }

        managed.push(ManagedContainer {
            container: container.id(),
            slots,
            tail,
        });
    }
    drop(doc);

    let target = HostTarget::adopt(document.clone(), attribute, version_attribute, managed);
    let rehydration = Rehydration {
        managed_containers: target.managed_containers().len(),
        unindexed: target.unindexed_len(),
        groups,
        target,
    };

    tracing::debug!(
        groups = rehydration.groups.len(),
        managed = rehydration.managed_containers,
        foreign,
        unindexed = rehydration.unindexed,
        "Rehydrated stylesheet"
    );
    rehydration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::RuleTarget;
    use crate::document::HostDocument;

    fn managed_attrs() -> [(&'static str, &'static str); 2] {
        [("data-styled", "active"), ("data-styled-version", VERSION)]
    }

    fn run(doc: HostDocument) -> (Rehydration, SharedDocument) {
        let shared = doc.into_shared();
        (rehydrate(&shared, "data-styled", "data-styled-version"), shared)
    }

    #[test]
    fn test_split_rules() {
        let (pieces, tail) = split_rules(".a{}/*!sc*/\n.b{}/*!sc*/\n  \n");
        assert_eq!(pieces, vec![".a{}", ".b{}"]);
        assert_eq!(tail, "  \n");

        let (pieces, tail) = split_rules(".a{}/*!sc*/\n.b{}");
        assert_eq!(pieces, vec![".a{}", ".b{}"]);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_single_group() {
        let mut doc = HostDocument::new();
        doc.push_style(
            managed_attrs(),
            ".b{color:red}/*!sc*/\ndata-styled.g1[id=\"TWO\"]{content:\"b,\"}/*!sc*/\n",
        );
        let (r, _) = run(doc);
        assert_eq!(
            r.groups,
            vec![RehydratedGroup {
                group: 1,
                id: "TWO".into(),
                names: vec!["b".into()],
                size: 2,
            }]
        );
        assert_eq!(r.next_group(), 2);
        assert_eq!(r.group_slots(), vec![GroupSlot::default(), GroupSlot { size: 2, marked: true }]);
        assert_eq!(r.target.len(), 2);
    }

    #[test]
    fn test_multiple_containers_form_one_stream() {
        let mut doc = HostDocument::new();
        doc.push_style(managed_attrs(), ".a{}/*!sc*/\ndata-styled.g0[id=\"A\"]{content:\"a,\"}/*!sc*/\n");
        doc.push_style([("media", "print")], ".foreign{}");
        doc.push_style(managed_attrs(), ".b{}/*!sc*/\n.b:hover{}/*!sc*/\ndata-styled.g1[id=\"B\"]{content:\"b,\"}/*!sc*/\n");
        let (r, _) = run(doc);
        assert_eq!(r.managed_containers, 2);
        assert_eq!(r.groups.iter().map(|g| (g.group, g.size)).collect::<Vec<_>>(), vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn test_container_without_markers_is_unindexed() {
        let mut doc = HostDocument::new();
        doc.push_style(managed_attrs(), ".legacy{color:red}/*!sc*/\n");
        doc.push_style(managed_attrs(), ".a{}/*!sc*/\ndata-styled.g0[id=\"A\"]{content:\"a,\"}/*!sc*/\n.trailing{}/*!sc*/\n");
        let (r, _) = run(doc);
        assert_eq!(r.groups.len(), 1);
        assert_eq!(r.groups[0].size, 2);
        assert_eq!(r.unindexed, 2);
        assert_eq!(r.target.len(), 2);
    }

    #[test]
    fn test_version_mismatch_is_foreign() {
        let mut doc = HostDocument::new();
        doc.push_style(
            [("data-styled", "active"), ("data-styled-version", "0.0.0-other")],
            ".a{}/*!sc*/\ndata-styled.g0[id=\"A\"]{content:\"a,\"}/*!sc*/\n",
        );
        doc.push_style([("data-styled", "active")], ".b{}/*!sc*/\n");
        let (r, _) = run(doc);
        assert!(r.groups.is_empty());
        assert_eq!(r.managed_containers, 0);
        assert_eq!(r.next_group(), 0);
    }

    #[test]
    fn test_out_of_order_and_duplicate_markers() {
        let mut doc = HostDocument::new();
        doc.push_style(
            managed_attrs(),
            concat!(
                ".a{}/*!sc*/\ndata-styled.g5[id=\"A\"]{content:\"a,\"}/*!sc*/\n",
                ".b{}/*!sc*/\ndata-styled.g2[id=\"B\"]{content:\"b,\"}/*!sc*/\n",
                ".a2{}/*!sc*/\ndata-styled.g7[id=\"A\"]{content:\"x,\"}/*!sc*/\n",
            ),
        );
        let (r, _) = run(doc);
        assert_eq!(r.groups.iter().map(|g| (g.id.as_str(), g.group)).collect::<Vec<_>>(), vec![("A", 5), ("B", 6)]);
        assert_eq!(r.unindexed, 2);
        assert_eq!(r.target.len(), 4);
    }

    #[test]
    fn test_hostile_markers_stay_unindexed() {
        let mut doc = HostDocument::new();
        doc.push_style(
            managed_attrs(),
            concat!(
                ".x{}/*!sc*/\ndata-styled.g18446744073709551615[id=\"X\"]{content:\"x,\"}/*!sc*/\n",
                ".y{}/*!sc*/\ndata-styled.g1000000000[id=\"Y\"]{content:\"y,\"}/*!sc*/\n",
                ".z{}/*!sc*/\ndata-styled.g0[id=\"Z\"]{content:\"a b,\"}/*!sc*/\n",
            ),
        );
        let (r, _) = run(doc);
        assert!(r.groups.is_empty());
        assert_eq!(r.unindexed, 6);
        assert!(r.group_slots().is_empty());
        assert_eq!(r.next_group(), 0);
    }

    #[test]
    fn test_renumbering_stops_at_group_limit() {
        let mut doc = HostDocument::new();
        let last = MAX_GROUP - 1;
        doc.push_style(
            managed_attrs(),
            format!(
                ".a{{}}/*!sc*/\ndata-styled.g{last}[id=\"A\"]{{content:\"a,\"}}/*!sc*/\n.b{{}}/*!sc*/\ndata-styled.g3[id=\"B\"]{{content:\"b,\"}}/*!sc*/\n"
            ),
        );
        let (r, _) = run(doc);
        assert_eq!(r.groups.iter().map(|g| (g.id.as_str(), g.group)).collect::<Vec<_>>(), vec![("A", last)]);
        assert_eq!(r.unindexed, 2);
        assert_eq!(r.next_group(), MAX_GROUP);
    }

    #[test]
    fn test_blank_pieces_are_not_counted() {
        let mut doc = HostDocument::new();
        doc.push_style(managed_attrs(), ".a{}/*!sc*/\n/*!sc*/\ndata-styled.g0[id=\"A\"]{content:\"a,\"}/*!sc*/\n");
        let (r, shared) = run(doc);
        assert_eq!(r.groups[0].size, 2);
        assert_eq!(r.unindexed, 1);
        drop(r);
        let css = shared.lock().unwrap().containers()[0].css().to_string();
        assert!(css.contains(".a{}/*!sc*/\n/*!sc*/\n"));
    }
}
