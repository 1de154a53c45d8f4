//! Shared utilities for filestash
//!
//! This crate provides the helpers used across the workspace: logging
//! initialisation and best-effort filesystem removal that tolerates files
//! still held open by readers.

pub mod removal;
pub mod tracing;

pub use removal::*;
