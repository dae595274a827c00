//! Common utilities for fwfinder
//!
//! This crate provides functionality shared between the discovery library
//! and the command line tool: error handling, logging setup and mock USB
//! nodes for tests.

pub mod error;
pub mod logging;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::setup_logging;
