//! Persistence tests for the identity subsystem (C4, §10.5).
//!
//! ARES itself holds no on-disk state per document — the only thing worth
//! persisting across invocations is the `IdentityStore` (EID/AID/SP
//! allocators, alias bindings, sense registry) that lets cross-document
//! identity resolution survive a process restart, the way `main.rs`'s
//! `--identity-store` flag round-trips it through `bincode`.

use std::fs;

use ares::identity::IdentityStore;
use ares::model::EntityProfile;
use ares::schema::EntityType;

fn round_trip(store: &IdentityStore) -> IdentityStore {
    let bytes = bincode::serialize(&store.snapshot()).unwrap();
    let snapshot = bincode::deserialize(&bytes).unwrap();
    IdentityStore::restore(snapshot)
}

#[test]
fn alias_binding_survives_snapshot_round_trip() {
    let store = IdentityStore::new();
    let profile = EntityProfile::default();
    let first = store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();

    let restored = round_trip(&store);
    let binding = restored.aliases.exact_match("Aragorn", EntityType::Person).unwrap();
    assert_eq!(binding.eid, first.eid);
    assert_eq!(binding.aid, first.aid);
}

#[test]
fn eid_allocator_floor_survives_restart() {
    let store = IdentityStore::new();
    let profile = EntityProfile::default();
    store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();
    store.assign("Arwen", EntityType::Person, &profile, &[]).unwrap();

    let restored = round_trip(&store);
    let new_assignment = restored.assign("Eldarion", EntityType::Person, &profile, &[]).unwrap();
    assert!(new_assignment.eid.get() >= 3, "new EID {} should continue past the persisted floor", new_assignment.eid.get());
}

#[test]
fn second_mention_after_restart_reuses_persisted_identity() {
    let store = IdentityStore::new();
    let profile = EntityProfile::default();
    let first = store.assign("Gandalf", EntityType::Person, &profile, &[]).unwrap();

    let restored = round_trip(&store);
    let second = restored.assign("Gandalf", EntityType::Person, &profile, &[]).unwrap();
    assert_eq!(first.eid, second.eid, "re-mentioning a name already bound before the restart must resolve to the same EID");
}

/// Exercises the actual on-disk path `main.rs --identity-store` takes:
/// serialize to a file, drop the in-memory store, reopen a fresh process
/// state from the file on disk.
#[test]
fn identity_store_survives_a_real_file_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("identity.bin");

    let first_eid;
    {
        let store = IdentityStore::new();
        let profile = EntityProfile::default();
        first_eid = store.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap().eid;
        let bytes = bincode::serialize(&store.snapshot()).unwrap();
        fs::write(&path, bytes).unwrap();
    }

    let bytes = fs::read(&path).unwrap();
    let snapshot = bincode::deserialize(&bytes).unwrap();
    let reopened = IdentityStore::restore(snapshot);

    let second = reopened.assign("Aragorn", EntityType::Person, &EntityProfile::default(), &[]).unwrap();
    assert_eq!(second.eid, first_eid, "reopening from disk must resolve a known name to the same EID");

    let fresh = reopened.assign("Arwen", EntityType::Person, &EntityProfile::default(), &[]).unwrap();
    assert!(fresh.eid.get() > first_eid.get(), "a brand new name after reopening should still mint past the persisted floor");
}

#[test]
fn bytes_are_stable_for_identical_state() {
    let store_a = IdentityStore::new();
    let store_b = IdentityStore::new();
    let profile = EntityProfile::default();
    store_a.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();
    store_b.assign("Aragorn", EntityType::Person, &profile, &[]).unwrap();

    let bytes_a = bincode::serialize(&store_a.snapshot()).unwrap();
    let bytes_b = bincode::serialize(&store_b.snapshot()).unwrap();
    assert_eq!(bytes_a, bytes_b, "identical assignment sequences should serialize identically");
}
