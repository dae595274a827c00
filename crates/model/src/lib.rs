//! Data model for fwfinder
//!
//! This crate defines the values that flow through discovery: raw USB nodes
//! as reported by the platform, classified nodes, physical location paths and
//! the composite devices synthesized from them. The integer values of
//! [`UsbDeviceKind`] and [`DeviceKind`] are a stable contract for binding
//! layers.
//!
//! # Example
//!
//! ```
//! use model::{LocationPath, UsbDeviceKind};
//!
//! let location: LocationPath = "1-2.3".parse().unwrap();
//! assert_eq!(location.parent().unwrap().to_string(), "1-2");
//! assert_eq!(UsbDeviceKind::Esp32 as u32, 5);
//! ```

pub mod device;
pub mod error;
pub mod ids;
pub mod location;
pub mod node;
pub mod types;

pub use device::{CompositeDevice, generate_unique_id};
pub use error::{ModelError, Result};
pub use location::LocationPath;
pub use node::{ClassifiedUsbNode, RawUsbNode};
pub use types::{DeviceKind, UsbDeviceKind};
