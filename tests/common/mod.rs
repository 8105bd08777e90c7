#![allow(dead_code)]

use std::convert::TryFrom;
use std::sync::Arc;

use ocfl_core::ocfl::{
    CommitPipeline, DigestAlgorithm, FsOcflStore, LayoutExtensionName, LogicalPath, NoopCache,
    ObjectLockManager, StorageLayout,
};
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

pub fn logical_path(path: &str) -> LogicalPath {
    LogicalPath::try_from(path).unwrap()
}

/// Sets up a fresh, empty OCFL storage root on disk laid out with the hashed-n-tuple layout, and
/// a pipeline wired to stage commits into `extensions/rocfl-staging` alongside it, mirroring how
/// a caller building a repository facade on top of this crate would wire the two stores together.
pub struct TestRepo {
    pub root: TempDir,
    pub pipeline: CommitPipeline<FsOcflStore>,
    pub main_store: Arc<FsOcflStore>,
}

impl TestRepo {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();

        let layout = StorageLayout::new(LayoutExtensionName::HashedNTupleLayout, None).unwrap();
        let main_store = Arc::new(FsOcflStore::init(root.path(), Some(layout)).unwrap());

        let staging_root = root.path().join("extensions").join("rocfl-staging");
        std::fs::create_dir_all(&staging_root).unwrap();
        let staging_store = Arc::new(FsOcflStore::new(&staging_root).unwrap());

        let lock_manager = Arc::new(ObjectLockManager::new(Duration::from_secs(5)));

        let pipeline = CommitPipeline::new(
            main_store.clone(),
            staging_store,
            lock_manager,
            Arc::new(NoopCache),
        );

        Self {
            root,
            pipeline,
            main_store,
        }
    }
}
