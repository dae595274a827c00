//! Test utilities for fwfinder
//!
//! Provides mock raw USB nodes and board layouts for testing across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{create_mock_freewili, create_mock_raw_node};
//!
//! let node = create_mock_raw_node(0x1234, 0x5678, "1-2");
//! assert_eq!(node.vendor_id, 0x1234);
//!
//! let board = create_mock_freewili("1-4", 1);
//! assert_eq!(board.len(), 5);
//! ```

use model::ids::*;
use model::node::{CLASS_CDC, CLASS_CDC_DATA, CLASS_HUB, CLASS_MASS_STORAGE, CLASS_VENDOR_SPECIFIC};
use model::RawUsbNode;

/// Create a mock raw node with no class information
///
/// # Arguments
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
/// * `location` - sysfs style location, e.g. `1-2.3`
pub fn create_mock_raw_node(vendor_id: u16, product_id: u16, location: &str) -> RawUsbNode {
    create_mock_raw_node_with_class(vendor_id, product_id, location, 0x00, &[])
}

/// Create a mock raw node with device and interface classes
pub fn create_mock_raw_node_with_class(
    vendor_id: u16,
    product_id: u16,
    location: &str,
    device_class: u8,
    interface_classes: &[u8],
) -> RawUsbNode {
    RawUsbNode {
        vendor_id,
        product_id,
        serial: format!("SN-{}", location),
        manufacturer: "Test Manufacturer".to_string(),
        product: format!("Test Product {:04x}:{:04x}", vendor_id, product_id),
        location: location.to_string(),
        device_class,
        interface_classes: interface_classes.to_vec(),
        port: None,
        paths: Vec::new(),
        raw: format!("mock {}", location),
    }
}

/// Create a mock FreeWili hub node
pub fn create_mock_hub(location: &str) -> RawUsbNode {
    RawUsbNode {
        product: "USB2513B".to_string(),
        serial: String::new(),
        ..create_mock_raw_node_with_class(USB_VID_FW_HUB, USB_PID_FW_HUB, location, CLASS_HUB, &[
            CLASS_HUB,
        ])
    }
}

/// Create a mock generic (non FreeWili) hub node
pub fn create_mock_generic_hub(location: &str) -> RawUsbNode {
    RawUsbNode {
        product: "USB2.0 Hub".to_string(),
        serial: String::new(),
        ..create_mock_raw_node_with_class(0x05e3, 0x0608, location, CLASS_HUB, &[CLASS_HUB])
    }
}

/// Create a mock CDC serial node with the given product name
pub fn create_mock_serial(location: &str, product: &str, serial: &str) -> RawUsbNode {
    RawUsbNode {
        product: product.to_string(),
        serial: serial.to_string(),
        ..create_mock_raw_node_with_class(USB_VID_RPI, USB_PID_RPI_CDC, location, 0xEF, &[
            CLASS_CDC,
            CLASS_CDC_DATA,
        ])
    }
}

/// Create a mock ESP32 USB Serial/JTAG node
pub fn create_mock_esp32(location: &str, serial: &str) -> RawUsbNode {
    RawUsbNode {
        product: "USB JTAG/serial debug unit".to_string(),
        serial: serial.to_string(),
        ..create_mock_raw_node_with_class(
            USB_VID_ESPRESSIF,
            USB_PID_ESP32_SERIAL_JTAG,
            location,
            0xEF,
            &[CLASS_CDC, CLASS_CDC_DATA, CLASS_VENDOR_SPECIFIC],
        )
    }
}

/// Create a mock FTDI (FPGA) node
pub fn create_mock_ftdi(location: &str, serial: &str) -> RawUsbNode {
    RawUsbNode {
        product: "FreeWili FPGA".to_string(),
        serial: serial.to_string(),
        ..create_mock_raw_node_with_class(
            USB_VID_FW_FTDI,
            USB_PID_FW_FTDI,
            location,
            0x00,
            &[CLASS_VENDOR_SPECIFIC],
        )
    }
}

/// Create a mock RP2040 in UF2 bootloader mode
pub fn create_mock_uf2(location: &str) -> RawUsbNode {
    RawUsbNode {
        manufacturer: "Raspberry Pi".to_string(),
        product: "RP2 Boot".to_string(),
        serial: "E0C9125B0D9B".to_string(),
        ..create_mock_raw_node_with_class(
            USB_VID_RPI,
            USB_PID_RPI_2040_UF2,
            location,
            0x00,
            &[CLASS_MASS_STORAGE, CLASS_VENDOR_SPECIFIC],
        )
    }
}

/// Create a mock thumb drive
pub fn create_mock_mass_storage(location: &str) -> RawUsbNode {
    create_mock_raw_node_with_class(0x0781, 0x5581, location, 0x00, &[CLASS_MASS_STORAGE])
}

/// Create a mock HID device (keyboard/mouse)
pub fn create_mock_hid(location: &str) -> RawUsbNode {
    create_mock_raw_node_with_class(0x046d, 0xc52b, location, 0x00, &[0x03])
}

/// Create the nodes of a complete FreeWili board behind `hub_location`
///
/// Main processor on port 1, display on port 2, FPGA on port 3 and the ESP32
/// on port 4, followed by the hub itself. `index` makes serials unique.
pub fn create_mock_freewili(hub_location: &str, index: u32) -> Vec<RawUsbNode> {
    vec![
        create_mock_serial(
            &format!("{}.1", hub_location),
            "FreeWili MainCPU",
            &format!("FW-MAIN-{:04}", index),
        ),
        create_mock_serial(
            &format!("{}.2", hub_location),
            "FreeWili DisplayCPU",
            &format!("FW-DISP-{:04}", index),
        ),
        create_mock_ftdi(&format!("{}.3", hub_location), &format!("FW{:06}", index)),
        create_mock_esp32(&format!("{}.4", hub_location), &format!("ESP-{:04}", index)),
        create_mock_hub(hub_location),
    ]
}

/// Create a list of unrelated mock nodes, each on its own root port
pub fn create_mock_node_list(count: u8) -> Vec<RawUsbNode> {
    (1..=count)
        .map(|i| {
            create_mock_raw_node(0x1000 + u16::from(i), 0x2000 + u16::from(i), &format!("1-{}", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_raw_node() {
        let node = create_mock_raw_node(0x1234, 0x5678, "1-2");

        assert_eq!(node.vendor_id, 0x1234);
        assert_eq!(node.product_id, 0x5678);
        assert_eq!(node.location, "1-2");
        assert!(!node.serial.is_empty());
        assert!(node.interface_classes.is_empty());
    }

    #[test]
    fn test_create_mock_hub() {
        let hub = create_mock_hub("3-1");

        assert_eq!(hub.device_class, CLASS_HUB);
        assert_eq!(hub.vendor_id, USB_VID_FW_HUB);
        assert!(hub.serial.is_empty());
    }

    #[test]
    fn test_create_mock_freewili() {
        let board = create_mock_freewili("1-4", 7);

        assert_eq!(board.len(), 5);
        assert_eq!(board[0].location, "1-4.1");
        assert_eq!(board[0].serial, "FW-MAIN-0007");
        assert_eq!(board[4].location, "1-4");
    }

    #[test]
    fn test_create_mock_node_list() {
        let nodes = create_mock_node_list(10);

        assert_eq!(nodes.len(), 10);

        // Verify all locations are unique
        let locations: std::collections::HashSet<_> = nodes.iter().map(|n| &n.location).collect();
        assert_eq!(locations.len(), nodes.len());
    }

    #[test]
    fn test_create_mock_uf2() {
        let node = create_mock_uf2("2-1");

        assert!(node.has_class(CLASS_MASS_STORAGE));
        assert_eq!(node.product_id, USB_PID_RPI_2040_UF2);
    }
}
