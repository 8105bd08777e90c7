//! End-to-end tests driving a `CommitPipeline` over a real `FsOcflStore` on disk.

mod common;

use std::convert::TryFrom;
use std::io::Cursor;

use ocfl_core::ocfl::{DigestAlgorithm, OcflError, OcflStore, VersionNum, VersionRef};

use common::{logical_path, TestRepo, TEST_ALGORITHM};

#[test]
fn create_new_object_and_read_it_back() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj1";

    let session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    let mut session = session;
    session
        .add_file(
            &mut Cursor::new(b"hello world".to_vec()),
            logical_path("file1.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    let outcome = session.commit().unwrap();

    assert_eq!(VersionNum::try_from(1).unwrap(), outcome.version_num);

    let inventory = repo.main_store.get_inventory(object_id).unwrap();
    assert_eq!(object_id, inventory.id);
    assert_eq!(VersionNum::try_from(1).unwrap(), inventory.head);
    assert!(inventory
        .head_version()
        .lookup_digest(&logical_path("file1.txt"))
        .is_some());

    let mut sink = Vec::new();
    repo.main_store
        .get_object_file(
            object_id,
            &logical_path("file1.txt"),
            VersionRef::Head,
            &mut sink,
        )
        .unwrap();
    assert_eq!(b"hello world".to_vec(), sink);
}

#[test]
fn second_version_dedups_content_shared_with_first() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj2";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"same bytes".to_vec()),
            logical_path("a.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session.commit().unwrap();

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    let staged = session
        .add_file(
            &mut Cursor::new(b"same bytes".to_vec()),
            logical_path("b.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    assert!(!staged.outcome.is_new());
    let outcome = session.commit().unwrap();

    assert_eq!(VersionNum::try_from(2).unwrap(), outcome.version_num);

    let inventory = repo.main_store.get_inventory(object_id).unwrap();
    let v1_digest = inventory
        .get_version(VersionNum::try_from(1).unwrap())
        .unwrap()
        .lookup_digest(&logical_path("a.txt"))
        .unwrap()
        .clone();
    let v2_digest = inventory
        .head_version()
        .lookup_digest(&logical_path("b.txt"))
        .unwrap()
        .clone();
    assert_eq!(v1_digest, v2_digest);

    // the content from v1 was reused, not duplicated into v2
    let content_paths = inventory.content_paths_for_digest(&v1_digest).unwrap();
    assert_eq!(1, content_paths.len());
}

#[test]
fn add_file_with_wrong_expected_digest_fails_fixity_check() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj3";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();

    let bogus_digest = DigestAlgorithm::Sha256
        .hash_hex(&mut Cursor::new(b"not the real content".to_vec()))
        .unwrap();

    let result = session.add_file(
        &mut Cursor::new(b"actual content".to_vec()),
        logical_path("tampered.txt"),
        Some(bogus_digest),
        &[],
        false,
    );

    assert!(matches!(result, Err(OcflError::FixityCheck { .. })));
}

#[test]
fn rename_file_staged_in_same_session_moves_physical_content() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj4";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"content".to_vec()),
            logical_path("old.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session
        .rename_file(&logical_path("old.txt"), logical_path("new.txt"), false)
        .unwrap();
    session.commit().unwrap();

    let inventory = repo.main_store.get_inventory(object_id).unwrap();
    assert!(inventory
        .head_version()
        .lookup_digest(&logical_path("new.txt"))
        .is_some());
    assert!(inventory
        .head_version()
        .lookup_digest(&logical_path("old.txt"))
        .is_none());
}

#[test]
fn rename_file_inherited_from_earlier_version_is_metadata_only() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj5";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"content".to_vec()),
            logical_path("keep.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session.commit().unwrap();

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .rename_file(&logical_path("keep.txt"), logical_path("renamed.txt"), false)
        .unwrap();
    session.commit().unwrap();

    let inventory = repo.main_store.get_inventory(object_id).unwrap();
    assert_eq!(VersionNum::try_from(2).unwrap(), inventory.head);
    assert!(inventory
        .head_version()
        .lookup_digest(&logical_path("renamed.txt"))
        .is_some());

    let mut sink = Vec::new();
    repo.main_store
        .get_object_file(
            object_id,
            &logical_path("renamed.txt"),
            VersionRef::Head,
            &mut sink,
        )
        .unwrap();
    assert_eq!(b"content".to_vec(), sink);
}

#[test]
fn remove_file_from_head() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj6";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"content".to_vec()),
            logical_path("gone.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session.commit().unwrap();

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session.remove_file(&logical_path("gone.txt")).unwrap();
    session.commit().unwrap();

    let inventory = repo.main_store.get_inventory(object_id).unwrap();
    assert!(inventory
        .head_version()
        .lookup_digest(&logical_path("gone.txt"))
        .is_none());
}

#[test]
fn abort_session_leaves_main_store_untouched() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj7";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"never committed".to_vec()),
            logical_path("a.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session.abort().unwrap();

    let result = repo.main_store.get_inventory(object_id);
    assert!(matches!(result, Err(OcflError::NotFound(_))));
}

#[test]
fn overwrite_false_rejects_path_collision() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj8";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"first".to_vec()),
            logical_path("a.txt"),
            None,
            &[],
            false,
        )
        .unwrap();

    let result = session.add_file(
        &mut Cursor::new(b"second".to_vec()),
        logical_path("a.txt"),
        None,
        &[],
        false,
    );

    assert!(result.is_err());
}

#[test]
fn case_insensitive_path_collision_is_rejected_even_with_overwrite() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj9";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"first".to_vec()),
            logical_path("README.txt"),
            None,
            &[],
            false,
        )
        .unwrap();

    let result = session.add_file(
        &mut Cursor::new(b"second".to_vec()),
        logical_path("readme.txt"),
        None,
        &[],
        true,
    );

    assert!(matches!(result, Err(OcflError::PathConstraint(_))));
}

#[test]
fn get_inventory_for_unknown_object_is_not_found() {
    let repo = TestRepo::new();
    let result = repo.main_store.get_inventory("urn:example:does-not-exist");
    assert!(matches!(result, Err(OcflError::NotFound(_))));
}

#[test]
fn tampered_inventory_fails_sidecar_verification_on_next_read() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj11";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"hi\n".to_vec()),
            logical_path("hello.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session.commit().unwrap();

    let inventory = repo.main_store.get_inventory(object_id).unwrap();
    let inventory_file = repo.root.path().join(&inventory.object_root).join("inventory.json");

    let mut bytes = std::fs::read(&inventory_file).unwrap();
    let flip_at = bytes.iter().position(|b| b.is_ascii_digit()).unwrap();
    bytes[flip_at] ^= 0x01;
    std::fs::write(&inventory_file, bytes).unwrap();

    let result = repo.main_store.get_inventory(object_id);
    assert!(matches!(result, Err(OcflError::FixityCheck { .. })));
}

#[test]
fn purge_object_removes_all_versions() {
    let repo = TestRepo::new();
    let object_id = "urn:example:obj10";

    let mut session = repo
        .pipeline
        .open_session(object_id, TEST_ALGORITHM, None)
        .unwrap();
    session
        .add_file(
            &mut Cursor::new(b"content".to_vec()),
            logical_path("a.txt"),
            None,
            &[],
            false,
        )
        .unwrap();
    session.commit().unwrap();

    repo.main_store.purge_object(object_id).unwrap();

    let result = repo.main_store.get_inventory(object_id);
    assert!(matches!(result, Err(OcflError::NotFound(_))));
}
