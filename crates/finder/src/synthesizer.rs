//! Composite device synthesis
//!
//! Turns one [`NodeGroup`] into a [`CompositeDevice`]: orders the members,
//! picks the identity, infers the device kind and derives the unique id.

use crate::rules::RuleSet;
use crate::topology::NodeGroup;
use model::{ClassifiedUsbNode, CompositeDevice, DeviceKind, UsbDeviceKind, generate_unique_id};
use std::collections::BTreeSet;
use tracing::debug;

/// Build the composite device for one group
pub fn synthesize(group: NodeGroup, rules: &RuleSet) -> CompositeDevice {
    let (mut members, hub_index) = group.into_parts();

    let hub = hub_index.map(|i| members.remove(i));
    members.sort_by(|a, b| a.location().cmp(&b.location()));
    let hub_index = hub.map(|hub| {
        members.push(hub);
        members.len() - 1
    });

    let (name, serial) = identity(&members);
    let kind = infer_kind(&members, rules);
    let unique_id = unique_id(&members, hub_index);

    debug!(
        "Synthesized {} '{}' ({}) from {} USB nodes",
        kind,
        name,
        serial,
        members.len()
    );
    CompositeDevice::new(name, serial, kind, unique_id, members, hub_index)
}

fn identity(members: &[ClassifiedUsbNode]) -> (String, String) {
    let source = [UsbDeviceKind::SerialMain, UsbDeviceKind::Esp32]
        .iter()
        .find_map(|kind| members.iter().find(|m| m.kind() == *kind))
        .or_else(|| members.iter().find(|m| m.has_identity()));

    match source {
        Some(node) => (node.name().to_string(), node.serial().to_string()),
        None => (String::new(), String::new()),
    }
}

fn infer_kind(members: &[ClassifiedUsbNode], rules: &RuleSet) -> DeviceKind {
    let present: BTreeSet<UsbDeviceKind> = members.iter().map(|m| m.kind()).collect();
    rules
        .infer
        .iter()
        .find(|rule| rule.matches(&present, members))
        .map(|rule| rule.kind)
        .unwrap_or(DeviceKind::Unknown)
}

/// Parent location id in the upper half, anchor location id in the lower
fn unique_id(members: &[ClassifiedUsbNode], hub_index: Option<usize>) -> Option<u64> {
    let anchor = members.get(hub_index.unwrap_or(0))?.location()?;
    let parent = anchor.parent()?;
    Some(generate_unique_id(parent.location_id(), anchor.location_id()))
}
