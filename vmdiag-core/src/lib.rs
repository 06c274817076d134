//! Azure VM diagnostics extension configuration
//!
//! This crate builds and reads the configuration document handed to the
//! diagnostics agent extension:
//! - The document builder and parser (`extensions::DiagnosticsExtensionBuilder`)
//! - Extension reference records exchanged with the compute API
//! - Storage connection string formatting and parsing
//! - The XML element tree the WadCfg fragment travels in
//! - Settings files for the command-line front end

pub mod config;
pub mod extensions;
pub mod types;
pub mod xml;

pub use types::{Error, Result};
