use core::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::{error, io};

use thiserror::Error;

use crate::ocfl::VersionNum;

pub type Result<T, E = OcflError> = core::result::Result<T, E>;

/// The complete error taxonomy for the OCFL engine.
#[derive(Error)]
pub enum OcflError {
    /// An object, version, or logical path that was expected to exist could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An object, version, or file already exists where a new one was about to be written.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A digest computed while reading or writing a file did not match the expected digest.
    #[error(
        "Fixity check failed for {path}: expected {algorithm} digest {expected}, got {actual}"
    )]
    FixityCheck {
        path: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    /// A version number string, or a version sequence, violated OCFL's version numbering rules.
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// A logical or content path violated a path or filename constraint.
    #[error("Path constraint violation: {0}")]
    PathConstraint(String),

    /// A storage layout or other OCFL extension is malformed, unsupported, or misconfigured.
    #[error("Extension error: {0}")]
    Extension(String),

    /// An object lock could not be acquired within its timeout.
    #[error("Timed out waiting to acquire a lock on object {0}")]
    LockAcquire(String),

    /// An object lock was used in violation of its reentrancy or ownership rules.
    #[error("Lock error: {0}")]
    Lock(String),

    /// An inventory, sidecar, or object on disk is structurally invalid.
    #[error("Object {object_id} is corrupt: {message}")]
    CorruptObject { object_id: String, message: String },

    /// A value supplied to a constructor or builder method was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A copy or move operation failed partway through.
    #[error("Failed to copy or move file: {0}")]
    CopyMoveError(String),

    /// An underlying I/O failure.
    #[error("{0}")]
    Io(io::Error),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The store or repository has been closed and can no longer be used.
    #[error("The repository is closed")]
    Closed,

    #[error("{0}")]
    General(String),

    #[error("{0}")]
    Wrapped(Box<dyn error::Error>),
}

/// Constructs an `OcflError::NotFound` error
pub fn not_found(object_id: &str, version_num: Option<VersionNum>) -> OcflError {
    match version_num {
        Some(version) => OcflError::NotFound(format!("Object {} version {}", object_id, version)),
        None => OcflError::NotFound(format!("Object {}", object_id)),
    }
}

/// Constructs an `OcflError::NotFound` error for a logical path that does not exist in a
/// specific version of an object.
pub fn not_found_path(
    object_id: &str,
    version_num: VersionNum,
    path: &impl Display,
) -> OcflError {
    OcflError::NotFound(format!(
        "Path {} not found in object {} version {}",
        path, object_id, version_num
    ))
}

impl Debug for OcflError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<io::Error> for OcflError {
    fn from(e: io::Error) -> Self {
        OcflError::Io(e)
    }
}

impl From<serde_json::Error> for OcflError {
    fn from(e: serde_json::Error) -> Self {
        OcflError::Wrapped(Box::new(e))
    }
}

impl From<walkdir::Error> for OcflError {
    fn from(e: walkdir::Error) -> Self {
        OcflError::Wrapped(Box::new(e))
    }
}
