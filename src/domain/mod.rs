//! Manifest identifiers and document conventions; no I/O.

pub mod document;
pub mod error;
pub mod manifest;
