//! Topology grouping
//!
//! Partitions classified nodes by attachment key. A hub anchors its own
//! location; every other node attaches to the nearest anchoring hub within
//! [`GroupingOptions::max_hops`] hops above it, or to its own location if
//! there is none. Root hubs never anchor, otherwise every device on a bus
//! would collapse into one group.

use model::{ClassifiedUsbNode, LocationPath, UsbDeviceKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Hops searched above a node for its anchoring hub
pub const DEFAULT_MAX_HOPS: usize = 2;

/// Tunables for [`group_nodes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingOptions {
    /// How far above a node to look for an anchoring hub
    pub max_hops: usize,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

/// Nodes sharing one attachment key
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroup {
    members: Vec<ClassifiedUsbNode>,
    hub: Option<usize>,
}

impl NodeGroup {
    /// Members in input order
    pub fn members(&self) -> &[ClassifiedUsbNode] {
        &self.members
    }

    /// The hub anchoring this group
    pub fn hub(&self) -> Option<&ClassifiedUsbNode> {
        self.hub.and_then(|i| self.members.get(i))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members and the index of the anchoring hub
    pub fn into_parts(self) -> (Vec<ClassifiedUsbNode>, Option<usize>) {
        (self.members, self.hub)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AttachmentKey {
    Location(LocationPath),
    Unresolved(usize),
}

fn is_anchor(node: &ClassifiedUsbNode) -> bool {
    node.kind() == UsbDeviceKind::Hub && node.location().is_some_and(|l| !l.is_root())
}

fn attachment_key(
    index: usize,
    node: &ClassifiedUsbNode,
    anchors: &HashSet<&LocationPath>,
    options: &GroupingOptions,
) -> AttachmentKey {
    let Some(location) = node.location() else {
        return AttachmentKey::Unresolved(index);
    };
    if is_anchor(node) {
        return AttachmentKey::Location(location.clone());
    }

    let mut ancestor = location.parent();
    for _ in 0..options.max_hops {
        let Some(current) = ancestor else { break };
        if anchors.contains(&current) {
            return AttachmentKey::Location(current);
        }
        ancestor = current.parent();
    }
    AttachmentKey::Location(location.clone())
}

/// Partition `nodes` into groups
///
/// Groups are emitted in the order their first member appears in `nodes`
/// and members keep their input order.
pub fn group_nodes(nodes: Vec<ClassifiedUsbNode>, options: &GroupingOptions) -> Vec<NodeGroup> {
    let keys: Vec<AttachmentKey> = {
        let anchors: HashSet<&LocationPath> = nodes
            .iter()
            .filter(|n| is_anchor(n))
            .filter_map(|n| n.location())
            .collect();
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| attachment_key(i, node, &anchors, options))
            .collect()
    };

    let mut groups: Vec<NodeGroup> = Vec::new();
    let mut index_of: HashMap<AttachmentKey, usize> = HashMap::new();

    for (node, key) in nodes.into_iter().zip(keys) {
        let anchors_group = is_anchor(&node)
            && matches!(&key, AttachmentKey::Location(l) if Some(l) == node.location());
        let group_index = *index_of.entry(key).or_insert_with(|| {
            groups.push(NodeGroup {
                members: Vec::new(),
                hub: None,
            });
            groups.len() - 1
        });

        let group = &mut groups[group_index];
        if anchors_group && group.hub.is_none() {
            group.hub = Some(group.members.len());
        }
        group.members.push(node);
    }

    debug!("Grouped nodes into {} groups", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify_all;
    use crate::rules::RuleSet;
    use common::test_utils::*;
    use model::RawUsbNode;

    fn group(raw: Vec<RawUsbNode>) -> Vec<NodeGroup> {
        group_nodes(
            classify_all(raw, RuleSet::builtin()),
            &GroupingOptions::default(),
        )
    }

    #[test]
    fn test_empty_input() {
        assert!(group(Vec::new()).is_empty());
    }

    #[test]
    fn test_board_forms_one_group() {
        let groups = group(create_mock_freewili("1-4", 1));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 5);
        assert_eq!(groups[0].hub().unwrap().reported_location(), "1-4");
    }

    #[test]
    fn test_unrelated_nodes_are_singletons() {
        let groups = group(create_mock_node_list(4));

        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|g| g.len() == 1 && g.hub().is_none()));
    }

    #[test]
    fn test_emission_order_follows_first_member() {
        let mut raw = vec![create_mock_hid("2-1")];
        raw.extend(create_mock_freewili("1-4", 1));
        raw.push(create_mock_mass_storage("3-1"));
        let groups = group(raw);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].members()[0].reported_location(), "2-1");
        assert_eq!(groups[1].len(), 5);
        assert_eq!(groups[2].members()[0].reported_location(), "3-1");
    }

    #[test]
    fn test_root_hub_never_anchors() {
        let groups = group(vec![
            create_mock_generic_hub("usb1"),
            create_mock_hid("1-1"),
            create_mock_mass_storage("1-2"),
        ]);

        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.hub().is_none()));
    }

    #[test]
    fn test_nested_hub_anchors_its_own_group() {
        let mut raw = vec![create_mock_generic_hub("1-1"), create_mock_hid("1-1.1")];
        raw.extend(create_mock_freewili("1-1.2", 1));
        let groups = group(raw);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 5);
        assert_eq!(groups[1].hub().unwrap().reported_location(), "1-1.2");
    }

    #[test]
    fn test_max_hops_limits_attachment() {
        let raw = vec![create_mock_hub("1-1"), create_mock_hid("1-1.2.3.4")];

        let near = group(raw.clone());
        assert_eq!(near.len(), 2);

        let far = group_nodes(
            classify_all(raw, RuleSet::builtin()),
            &GroupingOptions { max_hops: 3 },
        );
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].len(), 2);
    }

    #[test]
    fn test_unresolvable_locations_are_singletons() {
        let raw = vec![
            create_mock_raw_node(0x1111, 0x2222, ""),
            create_mock_raw_node(0x1111, 0x2222, ""),
            create_mock_hub("1-1"),
        ];
        let groups = group(raw);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 1);
    }
}
