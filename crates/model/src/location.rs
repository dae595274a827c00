//! Physical USB location paths
//!
//! A location is a bus number plus the port hops from the root controller.
//! The textual form follows Linux sysfs naming: `1-2.3` is port 3 of the hub
//! on port 2 of bus 1, and `usb1` is the root hub of bus 1.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of port hops below a root hub
pub const MAX_PORT_DEPTH: usize = 7;

/// Bus number and port chain of a USB node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationPath {
    bus: u8,
    ports: Vec<u8>,
}

impl LocationPath {
    /// Create a location from a bus number and port chain
    pub fn new(bus: u8, ports: Vec<u8>) -> Result<Self> {
        let location = Self { bus, ports };
        location.check()?;
        Ok(location)
    }

    /// Root hub location of a bus
    pub fn root(bus: u8) -> Self {
        Self {
            bus,
            ports: Vec::new(),
        }
    }

    /// Bus number
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Port hops from the root hub
    pub fn ports(&self) -> &[u8] {
        &self.ports
    }

    /// Number of port hops below the root hub
    pub fn depth(&self) -> usize {
        self.ports.len()
    }

    /// True for a root hub (no port hops)
    pub fn is_root(&self) -> bool {
        self.ports.is_empty()
    }

    /// Port number on the immediate parent
    pub fn port(&self) -> Option<u8> {
        self.ports.last().copied()
    }

    /// Location of the immediate parent, `None` for a root hub
    pub fn parent(&self) -> Option<LocationPath> {
        let (_, rest) = self.ports.split_last()?;
        Some(Self {
            bus: self.bus,
            ports: rest.to_vec(),
        })
    }

    /// True if `ancestor` is this location or one of its upstream hubs
    pub fn starts_with(&self, ancestor: &LocationPath) -> bool {
        self.bus == ancestor.bus && self.ports.starts_with(&ancestor.ports)
    }

    /// Number of hops from `ancestor` down to this location
    pub fn hops_below(&self, ancestor: &LocationPath) -> Option<usize> {
        self.starts_with(ancestor).then(|| self.depth() - ancestor.depth())
    }

    /// Packed 32-bit location id
    ///
    /// Bus in the top byte followed by one nibble per hop, the same packing
    /// macOS uses for `locationID`. Hops beyond the sixth are not encoded and
    /// ports above 15 are clamped.
    pub fn location_id(&self) -> u32 {
        let mut id = u32::from(self.bus) << 24;
        for (i, port) in self.ports.iter().take(6).enumerate() {
            let nibble = u32::from((*port).min(0x0F));
            id |= nibble << (20 - 4 * i);
        }
        id
    }

    fn check(&self) -> Result<()> {
        if self.ports.len() > MAX_PORT_DEPTH {
            return Err(self.unresolvable(format!(
                "{} hops exceeds maximum depth of {}",
                self.ports.len(),
                MAX_PORT_DEPTH
            )));
        }
        if self.ports.contains(&0) {
            return Err(self.unresolvable("port numbers start at 1".to_string()));
        }
        Ok(())
    }

    fn unresolvable(&self, reason: String) -> ModelError {
        ModelError::UnresolvableLocation {
            location: self.to_string(),
            reason,
        }
    }
}

impl FromStr for LocationPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let unresolvable = |reason: &str| ModelError::UnresolvableLocation {
            location: s.to_string(),
            reason: reason.to_string(),
        };

        if let Some(bus) = text.strip_prefix("usb") {
            let bus = bus
                .parse::<u8>()
                .map_err(|_| unresolvable("invalid root hub bus number"))?;
            return Ok(Self::root(bus));
        }

        let (bus, chain) = text
            .split_once('-')
            .ok_or_else(|| unresolvable("missing '-' separator"))?;
        let bus = bus
            .parse::<u8>()
            .map_err(|_| unresolvable("invalid bus number"))?;
        let ports = chain
            .split('.')
            .map(|port| port.parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| unresolvable("invalid port number"))?;

        Self::new(bus, ports).map_err(|e| match e {
            ModelError::UnresolvableLocation { reason, .. } => unresolvable(&reason),
            other => other,
        })
    }
}

impl TryFrom<String> for LocationPath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LocationPath> for String {
    fn from(location: LocationPath) -> Self {
        location.to_string()
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ports.is_empty() {
            return write!(f, "usb{}", self.bus);
        }
        write!(f, "{}-", self.bus)?;
        for (i, port) in self.ports.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", port)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> LocationPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_device_location() {
        let location = loc("1-2.3");
        assert_eq!(location.bus(), 1);
        assert_eq!(location.ports(), &[2, 3]);
        assert_eq!(location.depth(), 2);
        assert_eq!(location.port(), Some(3));
        assert_eq!(location.to_string(), "1-2.3");
    }

    #[test]
    fn test_parse_root_hub() {
        let location = loc("usb3");
        assert!(location.is_root());
        assert_eq!(location.bus(), 3);
        assert_eq!(location.port(), None);
        assert_eq!(location.parent(), None);
        assert_eq!(location.to_string(), "usb3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let garbage = [
            "", "1", "1:5", "1-", "1-a", "x-1", "1-2..3", "1-0", "1-1.2.3.4.5.6.7.8", "usbx",
        ];
        for bad in garbage {
            assert!(
                matches!(
                    bad.parse::<LocationPath>(),
                    Err(ModelError::UnresolvableLocation { .. })
                ),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_parent_chain() {
        let location = loc("2-1.4.2");
        assert_eq!(location.parent(), Some(loc("2-1.4")));
        assert_eq!(loc("2-1").parent(), Some(LocationPath::root(2)));
    }

    #[test]
    fn test_ancestry() {
        let hub = loc("1-2");
        assert!(loc("1-2.1").starts_with(&hub));
        assert!(hub.starts_with(&hub));
        assert!(!loc("1-3.1").starts_with(&hub));
        assert!(!loc("2-2.1").starts_with(&hub));
        // Port 2 is not an ancestor of port 21
        assert!(!loc("1-21").starts_with(&hub));

        assert_eq!(loc("1-2.1.4").hops_below(&hub), Some(2));
        assert_eq!(hub.hops_below(&hub), Some(0));
        assert_eq!(loc("1-3").hops_below(&hub), None);
    }

    #[test]
    fn test_location_id_packing() {
        assert_eq!(LocationPath::root(1).location_id(), 0x0100_0000);
        assert_eq!(loc("1-2").location_id(), 0x0120_0000);
        assert_eq!(loc("20-2.3.1").location_id(), 0x1423_1000);
        // Ports above 15 saturate
        assert_eq!(loc("1-20").location_id(), 0x01F0_0000);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&loc("1-2.3")).unwrap();
        assert_eq!(json, "\"1-2.3\"");
        let parsed: LocationPath = serde_json::from_str("\"usb4\"").unwrap();
        assert_eq!(parsed, LocationPath::root(4));
        assert!(serde_json::from_str::<LocationPath>("\"bogus\"").is_err());
    }
}
