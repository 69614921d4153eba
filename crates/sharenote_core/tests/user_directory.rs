use sharenote_core::{
    CredentialHasher, CredentialPolicy, ErrorKind, HashError, IdPolicy, IdentityResolver,
    MemoryBackend, Principal, SequenceIdGenerator, Session, Store, UserDirectory,
    UserDirectoryError, UserId,
};
use std::cell::RefCell;

/// Reversible stand-in so tests stay fast and can inspect stored hashes.
struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, raw: &str) -> Result<String, HashError> {
        Ok(format!("plain${raw}"))
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(raw)
    }

    fn decoy_hash(&self) -> Result<&str, HashError> {
        Ok("decoy$")
    }
}

/// Records every verification and the hash it was checked against.
#[derive(Default)]
struct CountingHasher {
    verified: RefCell<Vec<String>>,
}

impl CredentialHasher for CountingHasher {
    fn hash(&self, raw: &str) -> Result<String, HashError> {
        PlainHasher.hash(raw)
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        self.verified.borrow_mut().push(hash.to_string());
        PlainHasher.verify(raw, hash)
    }

    fn decoy_hash(&self) -> Result<&str, HashError> {
        Ok("decoy$")
    }
}

fn empty_store() -> Store<MemoryBackend> {
    Store::open(MemoryBackend::new()).unwrap()
}

fn directory(ids: &[&str]) -> UserDirectory<PlainHasher, SequenceIdGenerator> {
    UserDirectory::new(PlainHasher, SequenceIdGenerator::new(ids.iter().copied()))
}

#[test]
fn register_persists_hashed_credential() {
    let mut store = empty_store();
    let users = directory(&["alice-0001"]);

    let id = users.register(&mut store, "alice", "secret1").unwrap();

    assert_eq!(id, UserId::new("alice-0001"));
    let persisted = &store.backend().persisted().users;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].username, "alice");
    assert_ne!(persisted[0].credential_hash, "secret1");
    assert_eq!(users.find_by_id(&store, &id).unwrap().username, "alice");
}

#[test]
fn duplicate_username_conflicts_and_keeps_one_record() {
    let mut store = empty_store();
    let users = directory(&["first00001", "second0001"]);

    users.register(&mut store, "alice", "secret1").unwrap();
    let err = users.register(&mut store, "alice", "other-pw").unwrap_err();

    assert!(matches!(err, UserDirectoryError::UsernameTaken(ref name) if name == "alice"));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.users().len(), 1);
    assert_eq!(store.backend().persist_count(), 1);
}

#[test]
fn usernames_are_case_sensitive() {
    let mut store = empty_store();
    let users = directory(&["lower00001", "upper00001"]);

    users.register(&mut store, "alice", "secret1").unwrap();
    users.register(&mut store, "Alice", "secret2").unwrap();

    assert_eq!(store.users().len(), 2);
    let err = users.authenticate(&store, "ALICE", "secret1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[test]
fn short_credential_and_blank_username_are_validation_errors() {
    let mut store = empty_store();
    let users = directory(&[]);

    let short = users.register(&mut store, "alice", "abc").unwrap_err();
    assert!(matches!(
        short,
        UserDirectoryError::CredentialTooShort { min_length: 4 }
    ));
    assert_eq!(short.kind(), ErrorKind::Validation);

    let blank = users.register(&mut store, "   ", "secret1").unwrap_err();
    assert!(matches!(blank, UserDirectoryError::EmptyUsername));

    users.register(&mut store, "bob", "abcd").unwrap();
    assert_eq!(store.users().len(), 1);
}

#[test]
fn confirmation_checks_length_before_mismatch() {
    let mut store = empty_store();
    let users = directory(&[]);

    let too_short = users
        .register_confirmed(&mut store, "alice", "abc", "xyz")
        .unwrap_err();
    assert!(matches!(too_short, UserDirectoryError::CredentialTooShort { .. }));

    let mismatch = users
        .register_confirmed(&mut store, "alice", "secret1", "secret2")
        .unwrap_err();
    assert!(matches!(mismatch, UserDirectoryError::CredentialMismatch));
    assert_eq!(mismatch.kind(), ErrorKind::Validation);
    assert!(store.users().is_empty());
}

#[test]
fn custom_credential_policy_is_applied() {
    let mut store = empty_store();
    let users = UserDirectory::with_policies(
        PlainHasher,
        SequenceIdGenerator::default(),
        IdPolicy::users(),
        CredentialPolicy { min_length: 8 },
    );

    let err = users.register(&mut store, "alice", "secret1").unwrap_err();
    assert!(matches!(
        err,
        UserDirectoryError::CredentialTooShort { min_length: 8 }
    ));
}

#[test]
fn wrong_credential_and_unknown_user_are_indistinguishable() {
    let mut store = empty_store();
    let users = directory(&["alice-0001"]);
    users.register(&mut store, "alice", "secret1").unwrap();

    let wrong = users.authenticate(&store, "alice", "nope").unwrap_err();
    let unknown = users.authenticate(&store, "mallory", "secret1").unwrap_err();

    assert_eq!(wrong.kind(), unknown.kind());
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert!(matches!(wrong, UserDirectoryError::InvalidCredentials));

    let id = users.authenticate(&store, "alice", "secret1").unwrap();
    assert_eq!(id, UserId::new("alice-0001"));
}

#[test]
fn user_id_collision_is_retried() {
    let mut store = empty_store();
    let users = directory(&["same000001", "same000001", "other00001"]);

    let first = users.register(&mut store, "alice", "secret1").unwrap();
    let second = users.register(&mut store, "bob", "secret2").unwrap();

    assert_eq!(first.as_str(), "same000001");
    assert_eq!(second.as_str(), "other00001");
}

#[test]
fn persist_failure_leaves_no_user_behind() {
    let mut store = empty_store();
    let users = directory(&["alice-0001"]);
    store.backend_mut().fail_persists(true);

    let err = users.register(&mut store, "alice", "secret1").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(store.users().is_empty());
    assert!(users.find_by_username(&store, "alice").is_err());
}

#[test]
fn lookups_report_not_found() {
    let store = empty_store();
    let users = directory(&[]);

    let by_id = users.find_by_id(&store, &UserId::new("missing")).unwrap_err();
    let by_name = users.find_by_username(&store, "missing").unwrap_err();
    assert_eq!(by_id.kind(), ErrorKind::NotFound);
    assert_eq!(by_name.kind(), ErrorKind::NotFound);
}

#[test]
fn resolver_maps_sessions_to_principals() {
    let mut store = empty_store();
    let users = directory(&["alice-0001"]);
    let id = users.register(&mut store, "alice", "secret1").unwrap();
    let resolver = IdentityResolver::new(&store);

    assert_eq!(resolver.resolve(None), Principal::Anonymous);
    assert_eq!(
        resolver.resolve_session(&Session::for_user(id.clone())),
        Principal::Authenticated {
            id,
            username: "alice".to_string(),
        }
    );
    assert_eq!(
        resolver.resolve(Some(&UserId::new("deleted-user"))),
        Principal::Anonymous
    );
}

#[test]
fn every_failed_login_costs_one_verification() {
    let mut store = empty_store();
    let hasher = CountingHasher::default();
    let users = UserDirectory::new(&hasher, SequenceIdGenerator::new(["alice-0001"]));
    users.register(&mut store, "alice", "secret1").unwrap();

    users.authenticate(&store, "nobody", "secret1").unwrap_err();
    assert_eq!(*hasher.verified.borrow(), vec!["decoy$".to_string()]);

    users.authenticate(&store, "alice", "wrong").unwrap_err();
    assert_eq!(hasher.verified.borrow().len(), 2);
    assert_eq!(hasher.verified.borrow()[1], "plain$secret1");

    users.authenticate(&store, "alice", "secret1").unwrap();
    assert_eq!(hasher.verified.borrow().len(), 3);
}
