//! A storage-agnostic engine for reading and writing [OCFL](https://ocfl.io)
//! repositories.
//!
//! This crate implements the core of the Oxford Common File Layout
//! specification: the inventory model, the version commit pipeline, fixity
//! verification, and storage-layout/path-safety handling. It does not provide
//! a command line interface, a configuration loader, or a cache
//! implementation -- callers are expected to build those on top.

pub mod ocfl;

pub use crate::ocfl::error::{OcflError, Result};
