use chrono::{DateTime, Local};

use crate::ocfl::digest::{DigestAlgorithm, HexDigest};
use crate::ocfl::VersionNum;

/// A snapshot of the facts a caller's object-details table would persist about the most recently
/// committed version of an object: enough to know, without re-reading an inventory off disk,
/// which version is current and whether the inventory bytes a caller has cached are still valid.
///
/// This type carries no persistence logic of its own -- the engine does not own a database.
/// [`crate::ocfl::commit::CommitPipeline`] produces one of these as part of a commit's outcome
/// for a caller's own details table to store.
#[derive(Debug, Clone)]
pub struct ObjectDetails {
    pub object_id: String,
    pub version_num: VersionNum,
    pub object_root_path: String,
    /// The mutable-head extension revision this version corresponds to, if the version lives in
    /// the mutable-head extension rather than as a conventional numbered version. The engine
    /// does not implement the mutable-head extension, so this is always `None`; the field is
    /// kept because it is part of the schema a caller's details table is expected to have.
    pub revision_id: Option<String>,
    pub inventory_digest: HexDigest,
    pub digest_algorithm: DigestAlgorithm,
    pub inventory_bytes: Vec<u8>,
    pub update_timestamp: DateTime<Local>,
}

impl ObjectDetails {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        object_id: String,
        version_num: VersionNum,
        object_root_path: String,
        inventory_digest: HexDigest,
        digest_algorithm: DigestAlgorithm,
        inventory_bytes: Vec<u8>,
        update_timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            object_id,
            version_num,
            object_root_path,
            revision_id: None,
            inventory_digest,
            digest_algorithm,
            inventory_bytes,
            update_timestamp,
        }
    }
}
