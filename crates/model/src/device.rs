//! Composite (logical) devices
//!
//! A composite device is the set of USB nodes that share one physical
//! attachment point, e.g. the hub of a FreeWili board with the main, display
//! and FPGA processors hanging off its ports.

use crate::node::ClassifiedUsbNode;
use crate::types::{DeviceKind, UsbDeviceKind};
use serde::Serialize;
use std::fmt;

/// Hub port of the main processor on a FreeWili board
pub const HUB_PORT_MAIN: u8 = 1;
/// Hub port of the display processor on a FreeWili board
pub const HUB_PORT_DISPLAY: u8 = 2;
/// Hub port of the FPGA (FTDI) on a FreeWili board
pub const HUB_PORT_FPGA: u8 = 3;

/// Combine a parent location id (upper 32 bits) and a device location id
/// (lower 32 bits) into one 64-bit id
pub fn generate_unique_id(parent_location: u32, device_location: u32) -> u64 {
    (u64::from(parent_location) << 32) | u64::from(device_location)
}

/// Logical device built from one group of USB nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeDevice {
    name: String,
    serial: String,
    kind: DeviceKind,
    unique_id: Option<u64>,
    usb_devices: Vec<ClassifiedUsbNode>,
    /// Index of the anchoring hub in `usb_devices`
    hub: Option<usize>,
}

impl CompositeDevice {
    /// Create a composite device
    ///
    /// `hub` indexes the member that anchors the group, if any. Every other
    /// member must be located below it.
    pub fn new(
        name: String,
        serial: String,
        kind: DeviceKind,
        unique_id: Option<u64>,
        usb_devices: Vec<ClassifiedUsbNode>,
        hub: Option<usize>,
    ) -> Self {
        debug_assert!(hub.is_none_or(|i| usb_devices
            .get(i)
            .is_some_and(|n| n.kind() == UsbDeviceKind::Hub)));
        Self {
            name,
            serial,
            kind,
            unique_id,
            usb_devices,
            hub,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Id derived from the anchor location, stable while the device stays
    /// plugged into the same port
    pub fn unique_id(&self) -> Option<u64> {
        self.unique_id
    }

    /// All member nodes, in member order
    pub fn usb_devices(&self) -> &[ClassifiedUsbNode] {
        &self.usb_devices
    }

    /// Member nodes of the given kinds; an empty filter returns all members
    pub fn usb_devices_of(&self, kinds: &[UsbDeviceKind]) -> Vec<&ClassifiedUsbNode> {
        self.usb_devices
            .iter()
            .filter(|node| kinds.is_empty() || kinds.contains(&node.kind()))
            .collect()
    }

    /// The hub member anchoring this device
    pub fn hub(&self) -> Option<&ClassifiedUsbNode> {
        self.hub.and_then(|i| self.usb_devices.get(i))
    }

    /// True if the device is not behind a hub of its own
    pub fn is_standalone(&self) -> bool {
        self.hub.is_none()
    }

    /// Main processor node
    ///
    /// On a hub based board this is the node on the main port. Standalone
    /// devices expose their main serial port.
    pub fn main_device(&self) -> Option<&ClassifiedUsbNode> {
        if self.is_standalone() {
            return self
                .usb_devices
                .iter()
                .find(|node| node.kind() == UsbDeviceKind::SerialMain);
        }
        self.hub_port_device(HUB_PORT_MAIN)
    }

    /// Display processor node
    pub fn display_device(&self) -> Option<&ClassifiedUsbNode> {
        self.hub_port_device(HUB_PORT_DISPLAY)
    }

    /// FPGA node
    pub fn fpga_device(&self) -> Option<&ClassifiedUsbNode> {
        self.hub_port_device(HUB_PORT_FPGA)
    }

    fn hub_port_device(&self, port: u8) -> Option<&ClassifiedUsbNode> {
        let hub_location = self.hub()?.location()?;
        self.usb_devices.iter().find(|node| {
            !matches!(node.kind(), UsbDeviceKind::Hub | UsbDeviceKind::Other)
                && node.parent_path().as_ref() == Some(hub_location)
                && node.port() == Some(port)
        })
    }
}

impl fmt::Display for CompositeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.serial)
    }
}
