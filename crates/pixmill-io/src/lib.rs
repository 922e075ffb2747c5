#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`] variants for file access, encoding/decoding failures,
/// and format-specific errors.
pub mod error;

/// PNG image encoding and decoding.
///
/// Read any PNG into a 16-bit RGBA buffer and write it back as 16-bit RGBA or in the
/// layout of the source file.
pub mod png;

/// Internal utility functions for sample conversion.
mod conv_utils;

pub use crate::error::IoError;
