//! Discovery facade
//!
//! Runs enumerate -> classify -> group -> synthesize. Every call takes a
//! fresh snapshot; nothing is cached between calls.

use crate::classifier::classify_all;
use crate::enumerator::{RawEnumerator, UsbEnumerator};
use crate::error::Result;
use crate::rules::RuleSet;
use crate::synthesizer::synthesize;
use crate::topology::{GroupingOptions, group_nodes};
use model::{CompositeDevice, RawUsbNode};
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Discovers composite devices through a raw enumerator
#[derive(Debug, Clone)]
pub struct Finder<E = UsbEnumerator> {
    enumerator: E,
    rules: Cow<'static, RuleSet>,
    grouping: GroupingOptions,
}

impl Finder<UsbEnumerator> {
    /// Finder for the live USB bus with the built-in rules
    pub fn usb() -> Self {
        Self::new(UsbEnumerator::new())
    }
}

impl<E: RawEnumerator> Finder<E> {
    /// Finder using `enumerator` with the built-in rules
    pub fn new(enumerator: E) -> Self {
        Self {
            enumerator,
            rules: Cow::Borrowed(RuleSet::builtin()),
            grouping: GroupingOptions::default(),
        }
    }

    /// Replace the rule tables
    ///
    /// Fails with [`DiscoveryError::Rules`](crate::DiscoveryError::Rules) if
    /// the tables do not validate.
    pub fn with_rules(mut self, rules: RuleSet) -> Result<Self> {
        rules.validate()?;
        self.rules = Cow::Owned(rules);
        Ok(self)
    }

    pub fn with_grouping(mut self, grouping: GroupingOptions) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn grouping(&self) -> &GroupingOptions {
        &self.grouping
    }

    pub fn enumerator(&self) -> &E {
        &self.enumerator
    }

    /// Enumerate and synthesize all composite devices
    ///
    /// An empty list means nothing is attached; enumeration failures are
    /// returned as errors.
    pub fn find_all(&self) -> Result<Vec<CompositeDevice>> {
        let raw = self.enumerator.enumerate().map_err(|e| {
            warn!("USB enumeration failed: {}", e);
            e
        })?;
        Ok(self.discover(raw))
    }

    /// Run the pipeline on an already enumerated node list
    pub fn discover(&self, raw: Vec<RawUsbNode>) -> Vec<CompositeDevice> {
        let node_count = raw.len();
        let classified = classify_all(raw, &self.rules);
        let groups = group_nodes(classified, &self.grouping);
        debug!("{} nodes in {} groups", node_count, groups.len());

        let devices: Vec<CompositeDevice> = groups
            .into_iter()
            .map(|group| synthesize(group, &self.rules))
            .collect();

        info!(
            "Discovered {} devices from {} USB nodes",
            devices.len(),
            node_count
        );
        devices
    }
}

/// Discover devices on the live USB bus with the built-in rules
pub fn find_all() -> Result<Vec<CompositeDevice>> {
    Finder::usb().find_all()
}
