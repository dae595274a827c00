//! Raw and classified USB nodes

use crate::location::LocationPath;
use crate::types::UsbDeviceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// USB hub device class
pub const CLASS_HUB: u8 = 0x09;
/// USB mass storage interface class
pub const CLASS_MASS_STORAGE: u8 = 0x08;
/// USB communications (CDC) class
pub const CLASS_CDC: u8 = 0x02;
/// USB CDC data interface class
pub const CLASS_CDC_DATA: u8 = 0x0A;
/// Vendor specific class
pub const CLASS_VENDOR_SPECIFIC: u8 = 0xFF;

/// One USB node as reported by the platform enumerator
///
/// Contains the descriptor fields needed to classify the node and place it
/// in the USB tree. Produced fresh on every discovery call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsbNode {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Serial number string (empty if unavailable)
    #[serde(default)]
    pub serial: String,
    /// Manufacturer string (empty if unavailable)
    #[serde(default)]
    pub manufacturer: String,
    /// Product string (empty if unavailable)
    #[serde(default)]
    pub product: String,
    /// Location as reported by the platform, e.g. `1-2.3`
    pub location: String,
    /// Device class code from the device descriptor
    #[serde(default)]
    pub device_class: u8,
    /// Interface class codes of the active configuration
    #[serde(default)]
    pub interface_classes: Vec<u8>,
    /// Serial port device node, e.g. `/dev/ttyACM0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Mount points of a mass storage node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    /// Platform specific passthrough for debugging
    #[serde(default)]
    pub raw: String,
}

impl RawUsbNode {
    /// True if the device class or any interface class equals `class`
    pub fn has_class(&self, class: u8) -> bool {
        self.device_class == class || self.interface_classes.contains(&class)
    }
}

/// A raw node with its resolved kind and parsed location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedUsbNode {
    kind: UsbDeviceKind,
    #[serde(flatten)]
    node: RawUsbNode,
    location_path: Option<LocationPath>,
}

impl ClassifiedUsbNode {
    /// Combine a raw node with its classification
    ///
    /// `location_path` is `None` when the reported location could not be
    /// resolved.
    pub fn new(
        node: RawUsbNode,
        kind: UsbDeviceKind,
        location_path: Option<LocationPath>,
    ) -> Self {
        Self {
            kind,
            node,
            location_path,
        }
    }

    pub fn kind(&self) -> UsbDeviceKind {
        self.kind
    }

    pub fn vid(&self) -> u16 {
        self.node.vendor_id
    }

    pub fn pid(&self) -> u16 {
        self.node.product_id
    }

    /// Product name
    pub fn name(&self) -> &str {
        &self.node.product
    }

    pub fn manufacturer(&self) -> &str {
        &self.node.manufacturer
    }

    pub fn serial(&self) -> &str {
        &self.node.serial
    }

    /// Parsed location, `None` if unresolvable
    pub fn location(&self) -> Option<&LocationPath> {
        self.location_path.as_ref()
    }

    /// Location exactly as the platform reported it
    pub fn reported_location(&self) -> &str {
        &self.node.location
    }

    /// Location of the port this node hangs off
    pub fn parent_path(&self) -> Option<LocationPath> {
        self.location_path.as_ref()?.parent()
    }

    /// Port number on the parent hub
    pub fn port(&self) -> Option<u8> {
        self.location_path.as_ref()?.port()
    }

    /// Serial port device node, if the node exposes one
    pub fn serial_port(&self) -> Option<&str> {
        self.node.port.as_deref()
    }

    /// Mount points of the node's file systems
    pub fn paths(&self) -> &[String] {
        &self.node.paths
    }

    /// Opaque platform passthrough
    pub fn raw(&self) -> &str {
        &self.node.raw
    }

    /// The underlying raw record
    pub fn raw_node(&self) -> &RawUsbNode {
        &self.node
    }

    /// True if the node has a name or serial to identify it by
    pub fn has_identity(&self) -> bool {
        !self.node.product.is_empty() || !self.node.serial.is_empty()
    }
}

impl fmt::Display for ClassifiedUsbNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.node.product, self.node.serial)
    }
}
