//! Discovery error types

use std::path::PathBuf;
use thiserror::Error;

/// Failure of the platform level enumeration call
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// libusb reported an error (permissions, missing backend, ...)
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// Snapshot file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not a valid list of raw nodes
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Invalid classification or kind inference table
#[derive(Debug, Error)]
pub enum RuleError {
    /// Rule file could not be read
    #[error("Failed to read rule table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rule file is not valid TOML or has unknown kinds
    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] toml::de::Error),

    /// VID:PID filter is malformed
    #[error("Invalid USB id filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// Rule would match every node
    #[error("Rule {index} in [[{table}]] matches every node")]
    EmptyCriteria { table: &'static str, index: usize },

    /// Kind inference rule yields the fallback kind
    #[error("Rule {index} in [[infer]] yields Unknown, which is reserved for the fallback")]
    FallbackKind { index: usize },
}

/// Error returned by discovery
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The raw enumerator failed; no partial result is returned
    #[error("USB enumeration failed: {0}")]
    Enumeration(#[from] EnumerationError),

    /// The rule table handed to the finder is invalid
    #[error("Invalid rule table: {0}")]
    Rules(#[from] RuleError),
}

/// Type alias for discovery results
pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_error_display() {
        let err = DiscoveryError::from(EnumerationError::Usb(rusb::Error::Access));
        let msg = format!("{}", err);
        assert!(msg.contains("USB enumeration failed"));
    }

    #[test]
    fn test_rule_error_display() {
        let err = RuleError::EmptyCriteria {
            table: "classify",
            index: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Rule 3"));
        assert!(msg.contains("[[classify]]"));
    }
}
