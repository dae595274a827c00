//! USB node and device kind definitions
//!
//! Both enumerations are observed as raw integers by binding layers, so their
//! discriminants are a stable contract. New kinds are appended, never
//! renumbered.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a single USB node
///
/// Assigned by the node classifier. `Other` is the fallback when no
/// classification rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum UsbDeviceKind {
    /// USB hub, the parent of every FreeWili board
    Hub = 0,
    /// Generic serial (CDC ACM) port
    Serial = 1,
    /// Serial port of the main processor
    SerialMain = 2,
    /// Serial port of the display processor
    SerialDisplay = 3,
    /// Mass storage device
    MassStorage = 4,
    /// ESP32 USB (JTAG/serial)
    #[serde(rename = "ESP32")]
    Esp32 = 5,
    /// FTDI bridge (FPGA)
    #[serde(rename = "FTDI")]
    Ftdi = 6,
    /// Any other node attached next to a recognized one
    Other = 7,
}

impl UsbDeviceKind {
    /// Upper bound sentinel, one past the last valid discriminant
    ///
    /// Exposed for validation and iteration by binding layers; never a
    /// classification result.
    pub const MAX_VALUE: u32 = 8;

    /// Every valid kind, in discriminant order
    pub const ALL: [UsbDeviceKind; 8] = [
        UsbDeviceKind::Hub,
        UsbDeviceKind::Serial,
        UsbDeviceKind::SerialMain,
        UsbDeviceKind::SerialDisplay,
        UsbDeviceKind::MassStorage,
        UsbDeviceKind::Esp32,
        UsbDeviceKind::Ftdi,
        UsbDeviceKind::Other,
    ];

    /// Stable integer value
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            UsbDeviceKind::Hub => "Hub",
            UsbDeviceKind::Serial => "Serial",
            UsbDeviceKind::SerialMain => "Serial Main",
            UsbDeviceKind::SerialDisplay => "Serial Display",
            UsbDeviceKind::MassStorage => "Mass Storage",
            UsbDeviceKind::Esp32 => "ESP32",
            UsbDeviceKind::Ftdi => "FTDI",
            UsbDeviceKind::Other => "Other",
        }
    }
}

impl TryFrom<u32> for UsbDeviceKind {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ModelError::InvalidUsbDeviceKind(value))
    }
}

impl fmt::Display for UsbDeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical hardware family of a composite device
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum DeviceKind {
    /// No inference rule matched
    #[default]
    Unknown = 0,
    /// FreeWili board (hub with main, display and FPGA processors)
    FreeWili = 1,
    /// DEFCON 2024 badge
    #[serde(rename = "DEFCON2024Badge")]
    Defcon2024Badge = 2,
    /// DEFCON 2025 FreeWili badge
    #[serde(rename = "DEFCON2025FwBadge")]
    Defcon2025FwBadge = 3,
    /// RP2040/RP2350 in UF2 bootloader mode
    #[serde(rename = "UF2")]
    Uf2 = 4,
    /// Winky
    Winky = 5,
}

impl DeviceKind {
    /// Every kind, in discriminant order
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::Unknown,
        DeviceKind::FreeWili,
        DeviceKind::Defcon2024Badge,
        DeviceKind::Defcon2025FwBadge,
        DeviceKind::Uf2,
        DeviceKind::Winky,
    ];

    /// Stable integer value
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Unknown => "Unknown",
            DeviceKind::FreeWili => "Free-WiLi",
            DeviceKind::Defcon2024Badge => "DEFCON 2024 Badge",
            DeviceKind::Defcon2025FwBadge => "DEFCON 2025 Badge",
            DeviceKind::Uf2 => "UF2",
            DeviceKind::Winky => "Winky",
        }
    }

    /// Identifier used in rule tables and JSON output
    pub fn id(self) -> &'static str {
        match self {
            DeviceKind::Unknown => "Unknown",
            DeviceKind::FreeWili => "FreeWili",
            DeviceKind::Defcon2024Badge => "DEFCON2024Badge",
            DeviceKind::Defcon2025FwBadge => "DEFCON2025FwBadge",
            DeviceKind::Uf2 => "UF2",
            DeviceKind::Winky => "Winky",
        }
    }
}

/// Accepts the identifier or the human-readable name, ignoring ASCII case
impl FromStr for DeviceKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s) || kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownDeviceKind(s.to_string()))
    }
}

impl TryFrom<u32> for DeviceKind {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ModelError::InvalidDeviceKind(value))
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
