//! Node classification
//!
//! Resolves each raw node to exactly one [`UsbDeviceKind`] by walking the
//! classification table top-down. Nodes no rule claims become
//! [`UsbDeviceKind::Other`].

use crate::rules::RuleSet;
use model::{ClassifiedUsbNode, LocationPath, RawUsbNode, UsbDeviceKind};
use tracing::{trace, warn};

/// Kind of a single raw node
pub fn classify(node: &RawUsbNode, rules: &RuleSet) -> UsbDeviceKind {
    rules
        .classify
        .iter()
        .find(|rule| rule.criteria.matches(node))
        .map(|rule| rule.kind)
        .unwrap_or(UsbDeviceKind::Other)
}

/// Classify one node and parse its location
///
/// An unparseable location is logged and kept as `None`; the node itself is
/// never dropped.
pub fn classify_node(node: RawUsbNode, rules: &RuleSet) -> ClassifiedUsbNode {
    let kind = classify(&node, rules);
    let location = match node.location.parse::<LocationPath>() {
        Ok(location) => Some(location),
        Err(e) => {
            warn!(
                "Device {:04x}:{:04x}: {}",
                node.vendor_id, node.product_id, e
            );
            None
        }
    };
    trace!(
        "Classified {:04x}:{:04x} at '{}' as {}",
        node.vendor_id, node.product_id, node.location, kind
    );
    ClassifiedUsbNode::new(node, kind, location)
}

/// Classify a whole enumeration, preserving input order
pub fn classify_all(nodes: Vec<RawUsbNode>, rules: &RuleSet) -> Vec<ClassifiedUsbNode> {
    nodes
        .into_iter()
        .map(|node| classify_node(node, rules))
        .collect()
}
