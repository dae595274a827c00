//! Raw USB enumeration
//!
//! [`RawEnumerator`] is the single seam between discovery and the platform.
//! [`UsbEnumerator`] reads the live bus through libusb; [`SnapshotEnumerator`]
//! replays a JSON snapshot written by [`write_snapshot`], which makes field
//! reports reproducible without the hardware.

#[cfg(target_os = "linux")]
mod sysfs;
mod usb;

pub use usb::{DEFAULT_DESCRIPTOR_TIMEOUT, UsbEnumerator};

use crate::error::EnumerationError;
use model::RawUsbNode;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of raw USB nodes
///
/// Each call returns a fresh snapshot. Either the whole enumeration succeeds
/// or the call fails; there are no partial results.
pub trait RawEnumerator {
    fn enumerate(&self) -> Result<Vec<RawUsbNode>, EnumerationError>;
}

impl<T: RawEnumerator + ?Sized> RawEnumerator for &T {
    fn enumerate(&self) -> Result<Vec<RawUsbNode>, EnumerationError> {
        (**self).enumerate()
    }
}

impl<T: RawEnumerator + ?Sized> RawEnumerator for Box<T> {
    fn enumerate(&self) -> Result<Vec<RawUsbNode>, EnumerationError> {
        (**self).enumerate()
    }
}

#[derive(Debug, Clone)]
enum SnapshotSource {
    File(PathBuf),
    Nodes(Vec<RawUsbNode>),
}

/// Enumerator backed by a recorded snapshot
#[derive(Debug, Clone)]
pub struct SnapshotEnumerator {
    source: SnapshotSource,
}

impl SnapshotEnumerator {
    /// Replay a snapshot file, re-read on every call
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SnapshotSource::File(path.into()),
        }
    }

    /// Replay an in-memory node list
    pub fn from_nodes(nodes: Vec<RawUsbNode>) -> Self {
        Self {
            source: SnapshotSource::Nodes(nodes),
        }
    }
}

impl RawEnumerator for SnapshotEnumerator {
    fn enumerate(&self) -> Result<Vec<RawUsbNode>, EnumerationError> {
        match &self.source {
            SnapshotSource::File(path) => {
                let nodes = read_snapshot(BufReader::new(File::open(path)?))?;
                debug!("Replayed {} nodes from {}", nodes.len(), path.display());
                Ok(nodes)
            }
            SnapshotSource::Nodes(nodes) => Ok(nodes.clone()),
        }
    }
}

/// Parse a JSON snapshot
pub fn read_snapshot<R: Read>(reader: R) -> Result<Vec<RawUsbNode>, EnumerationError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Write nodes as a pretty-printed JSON snapshot
pub fn write_snapshot<W: Write>(nodes: &[RawUsbNode], writer: W) -> Result<(), EnumerationError> {
    serde_json::to_writer_pretty(writer, nodes)?;
    Ok(())
}

/// Write a snapshot file
pub fn save_snapshot(nodes: &[RawUsbNode], path: &Path) -> Result<(), EnumerationError> {
    let mut file = File::create(path)?;
    write_snapshot(nodes, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::*;

    #[test]
    fn test_snapshot_from_nodes() {
        let nodes = create_mock_freewili("1-4", 1);
        let enumerator = SnapshotEnumerator::from_nodes(nodes.clone());

        assert_eq!(enumerator.enumerate().unwrap(), nodes);
        // Fresh copy on every call
        assert_eq!(enumerator.enumerate().unwrap(), nodes);
    }

    #[test]
    fn test_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let nodes = create_mock_node_list(3);

        save_snapshot(&nodes, &path).unwrap();
        let enumerator = SnapshotEnumerator::from_path(&path);
        assert_eq!(enumerator.enumerate().unwrap(), nodes);
    }

    #[test]
    fn test_snapshot_missing_file() {
        let enumerator = SnapshotEnumerator::from_path("/nonexistent/snapshot.json");
        assert!(matches!(
            enumerator.enumerate(),
            Err(EnumerationError::Io(_))
        ));
    }

    #[test]
    fn test_snapshot_invalid_json() {
        let result = read_snapshot(&b"{ not json"[..]);
        assert!(matches!(result, Err(EnumerationError::Snapshot(_))));
    }

    #[test]
    fn test_snapshot_optional_fields_default() {
        let json = r#"[{ "vendor_id": 1027, "product_id": 24596, "location": "1-2.3" }]"#;
        let nodes = read_snapshot(json.as_bytes()).unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].vendor_id, 0x0403);
        assert!(nodes[0].serial.is_empty());
        assert!(nodes[0].interface_classes.is_empty());
    }

    #[test]
    fn test_boxed_enumerator() {
        let boxed: Box<dyn RawEnumerator> =
            Box::new(SnapshotEnumerator::from_nodes(create_mock_node_list(2)));
        assert_eq!(boxed.enumerate().unwrap().len(), 2);
    }
}
