//! Version commit pipeline: stage, finalize, and atomically promote a new object version.
//!
//! A standalone type with named states, generic over any store that is both an [`OcflStore`] and
//! a [`StagingStore`]. A session's staged content lives only for the lifetime of one
//! `CommitSession` -- there is no cross-process resumable staging area, so every session starts
//! by clearing out whatever the staging store might still hold for the object (residue from a
//! process that crashed before promoting or cleaning up).
//!
//! `main_store` and `staging_store` must share a filesystem (an [`crate::ocfl::store::fs::FsOcflStore`]
//! rooted at `<storage_root>/extensions/rocfl-staging`, for example) since promotion works by
//! renaming a staged version directory into place.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};

use crate::ocfl::cache::InventoryCache;
use crate::ocfl::digest::{DigestAlgorithm, HexDigest, MultiDigestReader};
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fixity::FixityCheckReadChannel;
use crate::ocfl::lock::{LockGuard, ObjectLockManager};
use crate::ocfl::paths;
use crate::ocfl::store::{OcflStore, StagingStore};
use crate::ocfl::updater::{AddFileOutcome, InventoryUpdater};
use crate::ocfl::{CommitMeta, ContentPath, LogicalPath, VersionNum};

/// Where a [`CommitSession`] is in its lifecycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PipelineState {
    /// Files may be staged; the session has not been finalized.
    Staging,
    /// `commit()` is deduping, serializing, and promoting the staged version.
    Finalizing,
    /// `commit()` failed and staged content is being discarded.
    RollingBack,
    /// The version was promoted into the main store.
    Committed,
}

/// A single file recorded in a session's staged version.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub logical_path: LogicalPath,
    pub content_path: ContentPath,
    pub digest: HexDigest,
    pub outcome: AddFileOutcome,
}

/// The result of successfully committing a session.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommitOutcome {
    pub version_num: VersionNum,
}

/// Builds `CommitSession`s for objects, wiring together the object lock manager, the inventory
/// cache, and the pair of stores a commit moves content between.
pub struct CommitPipeline<S: OcflStore + StagingStore> {
    main_store: Arc<S>,
    staging_store: Arc<S>,
    lock_manager: Arc<ObjectLockManager>,
    cache: Arc<dyn InventoryCache>,
}

impl<S: OcflStore + StagingStore> CommitPipeline<S> {
    pub fn new(
        main_store: Arc<S>,
        staging_store: Arc<S>,
        lock_manager: Arc<ObjectLockManager>,
        cache: Arc<dyn InventoryCache>,
    ) -> Self {
        Self {
            main_store,
            staging_store,
            lock_manager,
            cache,
        }
    }

    /// Opens a staging session for `object_id`, acquiring its write lock for the lifetime of the
    /// session. If the object already exists, its current inventory is loaded (from the cache if
    /// present, falling back to the main store, which verifies the inventory's sidecar fixity as
    /// it reads) and a new HEAD version is staged on top of it. Otherwise a brand new object is
    /// staged at v1 using `digest_algorithm` and `content_directory`.
    pub fn open_session(
        &self,
        object_id: &str,
        digest_algorithm: DigestAlgorithm,
        content_directory: Option<&str>,
    ) -> Result<CommitSession<'_, S>> {
        let lock = self.lock_manager.write_lock(object_id)?;

        let predecessor = match self.cache.get(object_id) {
            Some(inventory) => Some(inventory),
            None => match self.main_store.get_inventory(object_id) {
                Ok(inventory) => Some(inventory),
                Err(OcflError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
        };

        if let Some(inventory) = &predecessor {
            if inventory.mutable_head {
                return Err(OcflError::IllegalState(format!(
                    "Object {} has an active mutable HEAD and cannot be updated",
                    object_id
                )));
            }
        }

        // Clear out any residue from a session that staged files but never committed or aborted.
        self.staging_store.purge_object(object_id)?;

        let mut updater = match predecessor {
            Some(inventory) => InventoryUpdater::next_version(inventory)?,
            None => InventoryUpdater::new_object(object_id, digest_algorithm, content_directory)?,
        };

        self.staging_store.stage_object(updater.inventory_mut())?;

        Ok(CommitSession {
            pipeline: self,
            object_id: object_id.to_string(),
            updater,
            state: PipelineState::Staging,
            _lock: lock,
        })
    }
}

/// A single object's in-progress update: the staged file operations since [`CommitPipeline::open_session`]
/// plus the object's write lock, held until the session is committed or aborted.
pub struct CommitSession<'p, S: OcflStore + StagingStore> {
    pipeline: &'p CommitPipeline<S>,
    object_id: String,
    updater: InventoryUpdater,
    state: PipelineState,
    _lock: LockGuard,
}

impl<'p, S: OcflStore + StagingStore> CommitSession<'p, S> {
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn head(&self) -> VersionNum {
        self.updater.head()
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.updater.digest_algorithm()
    }

    /// Streams `source` into the staged version's content directory under a new logical path,
    /// digesting it with the object's primary algorithm (and any `fixity_algorithms` requested
    /// in addition) as it is written.
    ///
    /// If `expected_digest` is supplied, the primary digest is verified against it before the
    /// file is accepted into the manifest -- on mismatch the staged bytes are left in place (for
    /// a caller to inspect) and `OcflError::FixityCheck` is returned with `logical_path` filled
    /// in. This is for callers who already know a file's digest (importing a manifest with known
    /// checksums, say) and want corruption caught immediately rather than discovered on a later
    /// read.
    pub fn add_file(
        &mut self,
        source: &mut impl Read,
        logical_path: LogicalPath,
        expected_digest: Option<HexDigest>,
        fixity_algorithms: &[DigestAlgorithm],
        overwrite: bool,
    ) -> Result<StagedFile> {
        self.ensure_staging()?;

        let algorithm = self.updater.digest_algorithm();
        let content_path = self.updater.new_content_path(&logical_path)?;

        let secondary: Vec<DigestAlgorithm> = fixity_algorithms
            .iter()
            .copied()
            .filter(|a| *a != algorithm)
            .collect();

        let (digest, secondary_digests) = if secondary.is_empty() {
            let digest = self.stage_and_digest(source, &logical_path, algorithm, expected_digest)?;
            (digest, Vec::new())
        } else {
            let mut multi = MultiDigestReader::new(&secondary, source);
            let digest =
                self.stage_and_digest(&mut multi, &logical_path, algorithm, expected_digest)?;
            let secondary_digests: Vec<(DigestAlgorithm, HexDigest)> =
                multi.finalize_hex().into_iter().collect();
            (digest, secondary_digests)
        };

        let outcome = self
            .updater
            .add_file(digest.clone(), logical_path.clone(), overwrite)?;

        for (algo, secondary_digest) in secondary_digests {
            self.updater.add_fixity(&content_path, algo, secondary_digest)?;
        }

        Ok(StagedFile {
            logical_path,
            content_path,
            digest,
            outcome,
        })
    }

    fn stage_and_digest(
        &self,
        source: &mut impl Read,
        logical_path: &LogicalPath,
        algorithm: DigestAlgorithm,
        expected_digest: Option<HexDigest>,
    ) -> Result<HexDigest> {
        match expected_digest {
            Some(expected) => {
                let mut channel = FixityCheckReadChannel::new(algorithm, expected.clone(), source);
                self.pipeline.staging_store.stage_file_copy(
                    self.updater.inventory(),
                    &mut channel,
                    logical_path,
                )?;
                channel
                    .check_fixity()
                    .map_err(|e| with_logical_path(e, logical_path))?;
                Ok(expected)
            }
            None => {
                let mut reader = algorithm.reader(source);
                self.pipeline.staging_store.stage_file_copy(
                    self.updater.inventory(),
                    &mut reader,
                    logical_path,
                )?;
                Ok(reader.finalize_hex())
            }
        }
    }

    /// Removes a logical path from the staged version. A no-op if the path isn't present.
    pub fn remove_file(&mut self, logical_path: &LogicalPath) -> Result<()> {
        self.ensure_staging()?;
        self.updater.remove_file(logical_path);
        Ok(())
    }

    /// Renames `src` to `dst` within the staged version. If `src`'s content was staged during
    /// this same session, the staged bytes are physically moved too; if it's inherited from an
    /// earlier version, only the inventory's state mapping changes.
    pub fn rename_file(
        &mut self,
        src: &LogicalPath,
        dst: LogicalPath,
        overwrite: bool,
    ) -> Result<()> {
        self.ensure_staging()?;

        let staged = self.updater.staged_digest_and_content_path(src)?;

        match staged {
            Some((digest, content_path)) => {
                self.pipeline.staging_store.move_staged_file(
                    self.updater.inventory(),
                    &content_path,
                    &dst,
                )?;
                self.updater.rename_file(src, dst, Some(digest), overwrite)
            }
            None => self.updater.rename_file(src, dst, None, overwrite),
        }
    }

    /// Reinstates the version of `src_path` found in `source_version` as `dst_path` in the
    /// staged version. The content already exists on disk, so this only updates inventory state.
    pub fn reinstate_file(
        &mut self,
        source_version: VersionNum,
        src_path: &LogicalPath,
        dst_path: LogicalPath,
        overwrite: bool,
    ) -> Result<()> {
        self.ensure_staging()?;
        self.updater
            .reinstate_file(source_version, src_path, dst_path, overwrite)
    }

    pub fn set_commit_info(&mut self, meta: CommitMeta) -> Result<()> {
        self.ensure_staging()?;
        self.updater.set_commit_info(meta);
        Ok(())
    }

    /// Discards every staged change, deletes the session's staging directory, and releases the
    /// object's write lock. The object is left exactly as it was before the session opened.
    pub fn abort(self) -> Result<()> {
        self.pipeline.staging_store.purge_object(&self.object_id)
    }

    /// Finalizes the staged version and atomically promotes it into the main store.
    ///
    /// Dedups content added within this version, serializes the inventory and its sidecar,
    /// deletes orphaned staged files, renames the staged version (or, for a brand new object, the
    /// whole staged object) into place, invalidates the cache entry, and releases the lock. If
    /// anything before the rename fails, staged content is discarded and the on-disk HEAD is left
    /// untouched; after the rename begins, the store's own rollback logic (see
    /// `store::fs::FsOcflStore::write_new_version`) takes over.
    pub fn commit(mut self) -> Result<CommitOutcome> {
        self.ensure_staging()?;
        self.state = PipelineState::Finalizing;

        let CommitSession {
            pipeline,
            object_id,
            updater,
            _lock,
            ..
        } = self;

        match finalize_and_promote(pipeline, &object_id, updater) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(rollback_err) = pipeline.staging_store.purge_object(&object_id) {
                    error!(
                        "Failed to roll back staged changes for object {} after commit error {}: {}",
                        object_id, e, rollback_err
                    );
                }
                Err(e)
            }
        }
    }

    fn ensure_staging(&self) -> Result<()> {
        if self.state != PipelineState::Staging {
            return Err(OcflError::IllegalState(format!(
                "Cannot stage changes for object {} while its commit session is in the {:?} state",
                self.object_id, self.state
            )));
        }
        Ok(())
    }
}

fn finalize_and_promote<S: OcflStore + StagingStore>(
    pipeline: &CommitPipeline<S>,
    object_id: &str,
    updater: InventoryUpdater,
) -> Result<CommitOutcome> {
    let (mut new_inventory, orphaned) = updater.build()?;

    pipeline
        .staging_store
        .stage_inventory(&new_inventory, true, false)?;

    if !orphaned.is_empty() {
        let orphan_refs: Vec<&ContentPath> = orphaned.iter().map(|p| p.as_ref()).collect();
        pipeline
            .staging_store
            .rm_staged_files(&new_inventory, &orphan_refs)?;
    }
    pipeline.staging_store.rm_orphaned_files(&new_inventory)?;

    if new_inventory.is_new() {
        let src_object_path = PathBuf::from(&new_inventory.storage_path);
        pipeline
            .main_store
            .write_new_object(&mut new_inventory, &src_object_path, None)?;
    } else {
        let version_path = paths::version_path(&new_inventory.storage_path, new_inventory.head);
        pipeline
            .main_store
            .write_new_version(&mut new_inventory, &version_path)?;
    }

    pipeline.staging_store.purge_object(object_id)?;
    pipeline.cache.invalidate(object_id);

    info!(
        "Committed version {} of object {}",
        new_inventory.head, object_id
    );

    Ok(CommitOutcome {
        version_num: new_inventory.head,
    })
}

fn with_logical_path(err: OcflError, logical_path: &LogicalPath) -> OcflError {
    match err {
        OcflError::FixityCheck {
            algorithm,
            expected,
            actual,
            ..
        } => OcflError::FixityCheck {
            path: logical_path.to_string(),
            algorithm,
            expected,
            actual,
        },
        other => other,
    }
}
