//! Stages a next version on top of a predecessor inventory: the per-object, single-threaded
//! working set of added, removed, renamed, and reinstated logical paths that [`crate::ocfl::commit::CommitPipeline`]
//! finalizes into a new [`Inventory`].
//!
//! Everything here is pure inventory bookkeeping -- no file is read or written. The physical
//! side of staging a file (copying or moving bytes into the content directory) is the commit
//! pipeline's job, since that's the only layer that holds a [`crate::ocfl::store::StagingStore`].

use std::collections::HashMap;
use std::rc::Rc;

use crate::ocfl::digest::{DigestAlgorithm, HexDigest};
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::inventory::Inventory;
use crate::ocfl::{CommitMeta, ContentPath, InventoryPath, LogicalPath, VersionNum};

/// Whether a file added to a version introduced new content or reused bytes already present
/// somewhere in the object's manifest.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AddFileOutcome {
    New,
    Deduplicated,
}

impl AddFileOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, AddFileOutcome::New)
    }
}

/// Wraps an [`Inventory`] that has a staged HEAD version, tracking logical paths by their
/// lower-cased form so that paths differing only by case can be rejected as collisions.
pub struct InventoryUpdater {
    inventory: Inventory,
    case_index: HashMap<String, Rc<LogicalPath>>,
}

impl InventoryUpdater {
    /// Starts a brand new object at v1.
    pub fn new_object(
        object_id: &str,
        digest_algorithm: DigestAlgorithm,
        content_directory: Option<&str>,
    ) -> Result<Self> {
        let mut builder = Inventory::builder(object_id).with_digest_algorithm(digest_algorithm);
        if let Some(dir) = content_directory {
            builder = builder.with_content_directory(dir);
        }
        let inventory = builder.build()?;
        Ok(Self {
            inventory,
            case_index: HashMap::new(),
        })
    }

    /// Stages a new HEAD version on top of an object's current inventory.
    pub fn next_version(mut predecessor: Inventory) -> Result<Self> {
        predecessor.create_staging_head()?;
        let case_index = build_case_index(&predecessor);
        Ok(Self {
            inventory: predecessor,
            case_index,
        })
    }

    pub fn object_id(&self) -> &str {
        &self.inventory.id
    }

    pub fn head(&self) -> VersionNum {
        self.inventory.head
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.inventory.digest_algorithm
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// The content path a file at `logical_path` would be staged at if added to the HEAD
    /// version right now. Deterministic: depends only on the head version number, the content
    /// directory name, and the logical path.
    pub fn new_content_path(&self, logical_path: &LogicalPath) -> Result<ContentPath> {
        self.inventory.new_content_path_head(logical_path)
    }

    /// Returns the digest and content path of `logical_path` if it was added to the HEAD
    /// version during this staging session (as opposed to inherited from an earlier version).
    /// Callers use this to decide whether a rename needs to physically move staged bytes.
    pub fn staged_digest_and_content_path(
        &self,
        logical_path: &LogicalPath,
    ) -> Result<Option<(HexDigest, Rc<ContentPath>)>> {
        let head = self.inventory.head_version();
        let digest = match head.lookup_digest(logical_path) {
            Some(digest) => digest.clone(),
            None => return Ok(None),
        };

        let content_path =
            self.inventory
                .content_path_for_digest(&digest, None, Some(logical_path))?;

        let prefix = format!("{}/", self.inventory.head);
        if content_path.as_str().starts_with(&prefix) {
            Ok(Some((digest.as_ref().clone(), content_path.clone())))
        } else {
            Ok(None)
        }
    }

    /// Records that `logical_path` now maps to `digest` in the HEAD version. `overwrite`
    /// controls whether an existing path (including one differing only by case) may be
    /// replaced.
    pub fn add_file(
        &mut self,
        digest: HexDigest,
        logical_path: LogicalPath,
        overwrite: bool,
    ) -> Result<AddFileOutcome> {
        self.check_case_collision(&logical_path, overwrite)?;

        let outcome = if self.inventory.manifest_contains_digest(&digest) {
            AddFileOutcome::Deduplicated
        } else {
            AddFileOutcome::New
        };

        self.inventory.add_file_to_head(digest, logical_path.clone())?;
        self.index_path(logical_path);

        Ok(outcome)
    }

    /// Records an additional fixity digest for content that is already in the manifest.
    pub fn add_fixity(
        &mut self,
        content_path: &ContentPath,
        algorithm: DigestAlgorithm,
        digest: HexDigest,
    ) -> Result<()> {
        self.inventory
            .add_fixity_for_file(content_path, algorithm, digest)
    }

    /// Removes a logical path from the HEAD version. A no-op if the path isn't present.
    pub fn remove_file(&mut self, logical_path: &LogicalPath) {
        self.inventory.remove_logical_path_from_head(logical_path);
        self.case_index.remove(&lower_key(logical_path));
    }

    /// Renames `src` to `dst` within the HEAD version. The caller is responsible for physically
    /// moving staged bytes first when [`InventoryUpdater::staged_digest_and_content_path`]
    /// returns `Some` for `src` -- this only updates inventory state.
    pub fn rename_file(
        &mut self,
        src: &LogicalPath,
        dst: LogicalPath,
        moved_digest: Option<HexDigest>,
        overwrite: bool,
    ) -> Result<()> {
        self.check_case_collision(&dst, overwrite)?;

        match moved_digest {
            Some(digest) => self.inventory.move_new_in_head_file(digest, src, dst.clone())?,
            None => self.inventory.move_file_in_head(src, dst.clone())?,
        }

        self.case_index.remove(&lower_key(src));
        self.index_path(dst);
        Ok(())
    }

    /// Reinstates the version of `src_path` found in `source_version` as `dst_path` in the
    /// HEAD version. Purely a manifest operation -- the content already exists on disk.
    pub fn reinstate_file(
        &mut self,
        source_version: VersionNum,
        src_path: &LogicalPath,
        dst_path: LogicalPath,
        overwrite: bool,
    ) -> Result<()> {
        self.check_case_collision(&dst_path, overwrite)?;
        self.inventory
            .copy_file_to_head(source_version, src_path, dst_path.clone())?;
        self.index_path(dst_path);
        Ok(())
    }

    /// Attaches user and message metadata to the HEAD version.
    pub fn set_commit_info(&mut self, meta: CommitMeta) {
        self.inventory.head_version_mut().update_meta(meta);
    }

    /// Finalizes the staged version, deduping manifest entries that duplicate content added
    /// within this same version. Returns the finalized inventory and the content paths that
    /// became orphaned as a result of dedup and must be deleted from staging.
    pub fn build(mut self) -> Result<(Inventory, Vec<Rc<ContentPath>>)> {
        let orphaned = self.inventory.dedup_head();
        Ok((self.inventory, orphaned))
    }

    fn check_case_collision(&self, path: &LogicalPath, overwrite: bool) -> Result<()> {
        let key = lower_key(path);
        if let Some(existing) = self.case_index.get(&key) {
            if existing.as_ref() != path {
                return Err(OcflError::PathConstraint(format!(
                    "Path {} conflicts with existing path {}: logical paths may not differ only by case",
                    path, existing
                )));
            }
            if !overwrite {
                return Err(OcflError::AlreadyExists(format!(
                    "Path {} already exists in the new version",
                    path
                )));
            }
        }
        Ok(())
    }

    fn index_path(&mut self, path: LogicalPath) {
        self.case_index.insert(lower_key(&path), Rc::new(path));
    }
}

fn lower_key(path: &LogicalPath) -> String {
    path.as_str().to_ascii_lowercase()
}

fn build_case_index(inventory: &Inventory) -> HashMap<String, Rc<LogicalPath>> {
    let mut index = HashMap::new();
    for (path, _digest) in inventory.head_version().state_iter() {
        index.insert(lower_key(path), path.clone());
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocfl::inventory::Inventory;

    fn sample_object() -> InventoryUpdater {
        InventoryUpdater::new_object("urn:example:1", DigestAlgorithm::Sha256, None).unwrap()
    }

    fn digest(s: &str) -> HexDigest {
        HexDigest::from(s)
    }

    #[test]
    fn add_file_is_new_then_deduplicated() {
        let mut updater = sample_object();
        let path: LogicalPath = "a/one.txt".try_into().unwrap();
        let outcome = updater
            .add_file(digest("aa11"), path, false)
            .unwrap();
        assert_eq!(outcome, AddFileOutcome::New);

        let path2: LogicalPath = "a/two.txt".try_into().unwrap();
        let outcome2 = updater
            .add_file(digest("AA11"), path2, false)
            .unwrap();
        assert_eq!(outcome2, AddFileOutcome::Deduplicated);
    }

    #[test]
    fn case_insensitive_collision_is_rejected() {
        let mut updater = sample_object();
        let path: LogicalPath = "Readme.txt".try_into().unwrap();
        updater.add_file(digest("aa11"), path, false).unwrap();

        let other: LogicalPath = "README.txt".try_into().unwrap();
        let err = updater.add_file(digest("bb22"), other, false).unwrap_err();
        assert!(matches!(err, OcflError::PathConstraint(_)));
    }

    #[test]
    fn overwrite_same_path_is_allowed() {
        let mut updater = sample_object();
        let path: LogicalPath = "Readme.txt".try_into().unwrap();
        updater.add_file(digest("aa11"), path.clone(), false).unwrap();
        let outcome = updater.add_file(digest("aa11"), path, true).unwrap();
        assert_eq!(outcome, AddFileOutcome::Deduplicated);
    }

    #[test]
    fn overwrite_false_rejects_existing_path() {
        let mut updater = sample_object();
        let path: LogicalPath = "Readme.txt".try_into().unwrap();
        updater.add_file(digest("aa11"), path.clone(), false).unwrap();
        let err = updater.add_file(digest("bb22"), path, false).unwrap_err();
        assert!(matches!(err, OcflError::AlreadyExists(_)));
    }

    #[test]
    fn build_dedups_paths_added_within_the_same_version() {
        let mut updater = sample_object();
        let one: LogicalPath = "a/one.txt".try_into().unwrap();
        let two: LogicalPath = "a/two.txt".try_into().unwrap();
        updater.add_file(digest("aa11"), one, false).unwrap();
        updater.add_file(digest("aa11"), two, false).unwrap();

        let (inventory, orphaned) = updater.build().unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(inventory.content_paths_for_digest(&digest("aa11")).unwrap().len(), 1);
    }
}
