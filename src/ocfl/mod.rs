//! The core of an [OCFL](https://ocfl.io/) repository engine: the inventory model and update
//! engine, the version commit pipeline, fixity-checked streaming I/O, and storage-layout /
//! path-safety handling.
//!
//! This crate does not provide a repository façade, a configuration loader, a CLI, or a cache
//! implementation -- callers build those on top of [`store::OcflStore`], [`commit::CommitPipeline`],
//! and [`cache::InventoryCache`].

pub use self::cache::{InventoryCache, NoopCache};
pub use self::commit::{CommitOutcome, CommitPipeline, CommitSession, PipelineState, StagedFile};
pub use self::details::ObjectDetails;
pub use self::digest::{DigestAlgorithm, DigestRegistry, HexDigest};
pub use self::encode::{
    ConstraintPolicy, Encoder, FileNameConstraint, LogicalPathMapper, PathConstraint,
    PathConstraintProcessor,
};
pub use self::error::{OcflError, Result};
pub use self::fixity::{FixityCheckReadChannel, FixityCheckWriteChannel};
pub use self::inventory::{Inventory, InventoryBuilder, User, Version};
pub use self::lock::{LockGuard, LockKind, ObjectLockManager};
pub use self::store::fs::FsOcflStore;
pub use self::store::layout::{
    ExtensionSupportEvaluator, ExtensionSupportPolicy, LayoutExtensionName, StorageLayout,
};
pub use self::store::{Listing, OcflLayout, OcflStore, StagingStore, Storage};
pub use self::types::*;
pub use self::updater::{AddFileOutcome, InventoryUpdater};

mod bimap;
mod cache;
mod commit;
mod consts;
mod details;
mod digest;
mod encode;
mod error;
mod fixity;
mod inventory;
mod lock;
mod paths;
mod serde;
mod store;
mod types;
mod updater;
mod util;
