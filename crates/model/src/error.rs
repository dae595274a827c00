//! Model error types

use thiserror::Error;

/// Errors raised while building model values from platform data
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// A location string could not be parsed into a bus/port path
    #[error("Unresolvable USB location '{location}': {reason}")]
    UnresolvableLocation { location: String, reason: String },

    /// Integer does not name a USB device kind (the sentinel included)
    #[error("Invalid USB device kind value: {0}")]
    InvalidUsbDeviceKind(u32),

    /// Integer does not name a device kind
    #[error("Invalid device kind value: {0}")]
    InvalidDeviceKind(u32),

    /// String does not name a device kind
    #[error("Unknown device kind '{0}'")]
    UnknownDeviceKind(String),
}

/// Type alias for model results
pub type Result<T> = std::result::Result<T, ModelError>;
