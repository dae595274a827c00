//! Serial ports and mount points of USB devices from sysfs
//!
//! A USB device at location `1-2.1` exposes its interfaces as
//! `/sys/bus/usb/devices/1-2.1:<config>.<interface>`. Serial ports appear
//! below an interface as `tty/ttyACM0` (CDC ACM) or `ttyUSB0/tty/ttyUSB0`
//! (USB serial converters), disks as `host6/.../block/sda`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const USB_DEVICES_PATH: &str = "/sys/bus/usb/devices";
const MOUNTS_PATH: &str = "/proc/mounts";

/// Deepest directory searched below an interface (`host/target/lun/block`)
const MAX_SEARCH_DEPTH: usize = 6;

/// One line of the mount table
#[derive(Debug, Clone, PartialEq, Eq)]
struct MountEntry {
    source: String,
    target: String,
}

/// Device node lookup against a sysfs tree and a mount table
#[derive(Debug, Clone)]
pub(crate) struct Sysfs {
    devices_path: PathBuf,
    mounts: Vec<MountEntry>,
}

impl Sysfs {
    /// Use the live sysfs tree and `/proc/mounts`
    pub(crate) fn load() -> Self {
        let mounts = fs::read_to_string(MOUNTS_PATH).unwrap_or_else(|e| {
            debug!("Failed to read {}: {}", MOUNTS_PATH, e);
            String::new()
        });
        Self::with_root(USB_DEVICES_PATH, &mounts)
    }

    /// Use `devices_path` in place of `/sys/bus/usb/devices` and `mounts` as
    /// the mount table
    pub(crate) fn with_root(devices_path: impl Into<PathBuf>, mounts: &str) -> Self {
        Self {
            devices_path: devices_path.into(),
            mounts: parse_mounts(mounts),
        }
    }

    /// Serial port device node of the device at `location`
    pub(crate) fn serial_port(&self, location: &str) -> Option<String> {
        self.interfaces(location)
            .iter()
            .flat_map(|interface| find_class_entries(interface, "tty"))
            .min()
            .map(|name| format!("/dev/{}", name))
    }

    /// Mount points of every disk of the device at `location`
    pub(crate) fn mount_points(&self, location: &str) -> Vec<String> {
        let mut disks: Vec<String> = self
            .interfaces(location)
            .iter()
            .flat_map(|interface| find_class_entries(interface, "block"))
            .collect();
        disks.sort();
        disks.dedup();

        disks
            .iter()
            .flat_map(|disk| {
                let node = format!("/dev/{}", disk);
                self.mounts
                    .iter()
                    .filter(move |entry| is_disk_or_partition(&entry.source, &node))
                    .map(|entry| entry.target.clone())
            })
            .collect()
    }

    /// Interface directories of the device at `location`
    fn interfaces(&self, location: &str) -> Vec<PathBuf> {
        if location.is_empty() {
            return Vec::new();
        }

        let prefix = format!("{}:", location);
        let Ok(entries) = fs::read_dir(&self.devices_path) else {
            return Vec::new();
        };

        let mut interfaces: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect();
        interfaces.sort();
        interfaces
    }
}

/// Names of the entries inside every directory called `class` below `root`
///
/// Symlinks below `root` are not followed; sysfs links back up the tree.
fn find_class_entries(root: &Path, class: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut pending = vec![(root.to_path_buf(), 0)];

    while let Some((dir, depth)) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            if !is_dir {
                continue;
            }
            if entry.file_name() == class {
                if let Ok(children) = fs::read_dir(entry.path()) {
                    found.extend(
                        children
                            .flatten()
                            .map(|child| child.file_name().to_string_lossy().into_owned()),
                    );
                }
            } else if depth < MAX_SEARCH_DEPTH {
                pending.push((entry.path(), depth + 1));
            }
        }
    }

    found
}

/// `/dev/sda`, `/dev/sda1` and `/dev/mmcblk0p1` all belong to their disk
fn is_disk_or_partition(source: &str, disk: &str) -> bool {
    match source.strip_prefix(disk) {
        Some(rest) => {
            let rest = rest.strip_prefix('p').unwrap_or(rest);
            rest.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let target = fields.next()?;
            Some(MountEntry {
                source: unescape_mount_field(source),
                target: unescape_mount_field(target),
            })
        })
        .collect()
}

/// Undo the octal escapes (`\040` for space) of the mount table
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let escaped = bytes[i] == b'\\'
            && bytes.len() >= i + 4
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b));
        if escaped {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
