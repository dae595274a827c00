//! FreeWili USB device discovery
//!
//! A FreeWili board shows up on the host as several USB nodes behind one
//! hub: the main processor, the display processor, the FPGA bridge and the
//! ESP32. This crate enumerates the raw nodes, classifies each one, groups
//! them by their position in the USB tree and synthesizes one
//! [`CompositeDevice`](model::CompositeDevice) per group.
//!
//! # Example
//!
//! ```no_run
//! let devices = finder::find_all()?;
//! for device in &devices {
//!     println!("{} {} ({})", device.kind(), device.name(), device.serial());
//!     if let Some(main) = device.main_device() {
//!         println!("  main: {}", main.reported_location());
//!     }
//! }
//! # Ok::<(), finder::DiscoveryError>(())
//! ```
//!
//! Discovery on recorded data, without hardware:
//!
//! ```
//! use finder::{Finder, SnapshotEnumerator};
//!
//! let finder = Finder::new(SnapshotEnumerator::from_nodes(Vec::new()));
//! assert!(finder.find_all().unwrap().is_empty());
//! ```

pub mod classifier;
pub mod discovery;
pub mod enumerator;
pub mod error;
pub mod rules;
pub mod synthesizer;
pub mod topology;

pub use classifier::{classify, classify_all};
pub use discovery::{Finder, find_all};
pub use enumerator::{RawEnumerator, SnapshotEnumerator, UsbEnumerator};
pub use error::{DiscoveryError, EnumerationError, Result, RuleError};
pub use rules::{ClassificationRule, KindRule, NodeCriteria, RuleSet, UsbIdFilter};
pub use topology::{GroupingOptions, NodeGroup};
