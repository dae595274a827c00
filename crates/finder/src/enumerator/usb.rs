//! libusb backed enumerator

use super::RawEnumerator;
use crate::error::EnumerationError;
use model::{LocationPath, RawUsbNode};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for each string descriptor read
pub const DEFAULT_DESCRIPTOR_TIMEOUT: Duration = Duration::from_millis(100);

/// Enumerates the live USB bus through libusb
///
/// Devices that cannot be opened (missing permissions, busy drivers) are
/// still reported, with empty strings. On Linux, serial ports and mount
/// points are looked up in sysfs; elsewhere they are left empty.
#[derive(Debug, Clone, Copy)]
pub struct UsbEnumerator {
    timeout: Duration,
}

impl Default for UsbEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbEnumerator {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_DESCRIPTOR_TIMEOUT)
    }

    /// Use `timeout` for each string descriptor read
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn read_node(&self, device: &Device<Context>) -> Result<RawUsbNode, rusb::Error> {
        let descriptor = device.device_descriptor()?;
        let bus = device.bus_number();
        let address = device.address();

        let location = match device.port_numbers() {
            Ok(ports) => match LocationPath::new(bus, ports) {
                Ok(location) => location.to_string(),
                Err(e) => {
                    warn!("Device at bus {} address {}: {}", bus, address, e);
                    String::new()
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read port chain of bus {} address {}: {}",
                    bus, address, e
                );
                String::new()
            }
        };

        let (manufacturer, product, serial) = match device.open() {
            Ok(handle) => self.read_strings(&handle, &descriptor),
            Err(e) => {
                debug!(
                    "Cannot open {:04x}:{:04x} at {}: {}",
                    descriptor.vendor_id(),
                    descriptor.product_id(),
                    location,
                    e
                );
                Default::default()
            }
        };

        Ok(RawUsbNode {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            serial,
            manufacturer,
            product,
            location,
            device_class: descriptor.class_code(),
            interface_classes: interface_classes(device),
            port: None,
            paths: Vec::new(),
            raw: format!(
                "bus {:03} device {:03} speed {:?}",
                bus,
                address,
                device.speed()
            ),
        })
    }

    /// Manufacturer, product and serial strings, empty when unavailable
    fn read_strings(
        &self,
        handle: &DeviceHandle<Context>,
        descriptor: &DeviceDescriptor,
    ) -> (String, String, String) {
        let Some(language) = handle
            .read_languages(self.timeout)
            .ok()
            .and_then(|languages| languages.first().copied())
        else {
            return Default::default();
        };

        let manufacturer = handle
            .read_manufacturer_string(language, descriptor, self.timeout)
            .unwrap_or_default();
        let product = handle
            .read_product_string(language, descriptor, self.timeout)
            .unwrap_or_default();
        let serial = handle
            .read_serial_number_string(language, descriptor, self.timeout)
            .unwrap_or_default();

        (manufacturer, product, serial)
    }
}

/// Interface class codes of the active (or first) configuration
fn interface_classes(device: &Device<Context>) -> Vec<u8> {
    let config = match device.active_config_descriptor() {
        Ok(config) => config,
        Err(_) => match device.config_descriptor(0) {
            Ok(config) => config,
            Err(_) => return Vec::new(),
        },
    };

    let mut classes: Vec<u8> = config
        .interfaces()
        .flat_map(|interface| {
            interface
                .descriptors()
                .map(|descriptor| descriptor.class_code())
                .collect::<Vec<_>>()
        })
        .collect();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Fill in serial ports and mount points from sysfs
#[cfg(target_os = "linux")]
fn attach_device_paths(nodes: &mut [RawUsbNode]) {
    let sysfs = super::sysfs::Sysfs::load();
    for node in nodes {
        node.port = sysfs.serial_port(&node.location);
        node.paths = sysfs.mount_points(&node.location);
    }
}

#[cfg(not(target_os = "linux"))]
fn attach_device_paths(_nodes: &mut [RawUsbNode]) {}

impl RawEnumerator for UsbEnumerator {
    fn enumerate(&self) -> Result<Vec<RawUsbNode>, EnumerationError> {
        let context = Context::new()?;
        let devices = context.devices()?;

        let mut nodes = Vec::with_capacity(devices.len());
        for device in devices.iter() {
            match self.read_node(&device) {
                Ok(node) => nodes.push(node),
                Err(e) => {
                    // No partial enumerations
                    warn!(
                        "Failed to read descriptor of bus {} address {}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    return Err(e.into());
                }
            }
        }

        attach_device_paths(&mut nodes);
        debug!("Enumerated {} USB nodes", nodes.len());
        Ok(nodes)
    }
}
