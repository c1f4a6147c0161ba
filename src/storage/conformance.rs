//! Behavior every `StorageBackend` must show, run against each backend
//! through `conformance_tests!`.

use std::collections::HashSet;

use crate::kind::RecordKind;
use crate::pagination::{Cursor, Page};
use crate::storage::StorageBackend;
use crate::Error;

/// Instantiate the conformance suite for a backend constructor expression
macro_rules! conformance_tests {
    ($make:expr) => {
        #[test]
        fn conformance_exists_tracks_put() {
            $crate::storage::conformance::exists_tracks_put(&$make);
        }

        #[test]
        fn conformance_duplicate_put_rejected() {
            $crate::storage::conformance::duplicate_put_rejected(&$make);
        }

        #[test]
        fn conformance_get_roundtrip() {
            $crate::storage::conformance::get_roundtrip(&$make);
        }

        #[test]
        fn conformance_get_missing() {
            $crate::storage::conformance::get_missing(&$make);
        }

        #[test]
        fn conformance_cross_kind_link_mints_stub() {
            $crate::storage::conformance::cross_kind_link_mints_stub(&$make);
        }

        #[test]
        fn conformance_link_to_relationship_is_direct() {
            $crate::storage::conformance::link_to_relationship_is_direct(&$make);
        }

        #[test]
        fn conformance_relationship_first_rejected() {
            $crate::storage::conformance::relationship_first_rejected(&$make);
        }

        #[test]
        fn conformance_link_requires_both_endpoints() {
            $crate::storage::conformance::link_requires_both_endpoints(&$make);
        }

        #[test]
        fn conformance_self_link() {
            $crate::storage::conformance::self_link(&$make);
        }

        #[test]
        fn conformance_list_kind_completeness() {
            $crate::storage::conformance::list_kind_completeness(&$make);
        }

        #[test]
        fn conformance_list_links_completeness() {
            $crate::storage::conformance::list_links_completeness(&$make);
        }

        #[test]
        fn conformance_empty_links() {
            $crate::storage::conformance::empty_links(&$make);
        }
    };
}

pub(crate) use conformance_tests;

fn payload(id: &str) -> String {
    format!(r#"{{"id":"{}","note":"unicode ✓"}}"#, id)
}

fn drain(mut fetch: impl FnMut(Cursor) -> Page) -> Vec<String> {
    let mut cursor = Cursor::START;
    let mut ids = Vec::new();
    loop {
        let page = fetch(cursor);
        ids.extend(page.ids);
        match page.next {
            Some(next) => cursor = next,
            None => return ids,
        }
    }
}

fn relationship_count(backend: &dyn StorageBackend) -> usize {
    backend.count_kind(RecordKind::Relationship, 100).unwrap()
}

pub fn exists_tracks_put(backend: &dyn StorageBackend) {
    for (i, kind) in RecordKind::all().iter().enumerate() {
        let id = format!("fresh-{i}");
        assert!(!backend.exists(*kind, &id).unwrap());
        backend.put(*kind, &id, &payload(&id)).unwrap();
        assert!(backend.exists(*kind, &id).unwrap());
    }
}

pub fn duplicate_put_rejected(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Object, "dup", "first").unwrap();
    let err = backend.put(RecordKind::Object, "dup", "second").unwrap_err();
    assert!(matches!(err, Error::DuplicateIdentifier(ref id) if id == "dup"));
    assert_eq!(backend.get("dup").unwrap(), "first");
}

pub fn get_roundtrip(backend: &dyn StorageBackend) {
    let body = payload("round");
    backend.put(RecordKind::Rights, "round", &body).unwrap();
    assert_eq!(backend.get("round").unwrap(), body);
}

pub fn get_missing(backend: &dyn StorageBackend) {
    let err = backend.get("never-inserted").unwrap_err();
    assert!(matches!(err, Error::IdentifierNotFound(_)));
}

pub fn cross_kind_link_mints_stub(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Object, "obj-a", "{}").unwrap();
    backend.put(RecordKind::Event, "event-b", "{}").unwrap();

    let outcome = backend
        .link(RecordKind::Object, "obj-a", RecordKind::Event, "event-b")
        .unwrap();
    let stub = outcome.stub.expect("a stub relationship");

    assert!(backend.exists(RecordKind::Relationship, &stub).unwrap());
    assert!(backend.get(&stub).unwrap().contains("Automatically created"));

    assert!(backend.all_kind_links(RecordKind::Relationship, "obj-a").unwrap().contains(&stub));
    assert!(backend.all_kind_links(RecordKind::Relationship, "event-b").unwrap().contains(&stub));
    assert_eq!(backend.all_kind_links(RecordKind::Object, &stub).unwrap(), vec!["obj-a"]);
    assert_eq!(backend.all_kind_links(RecordKind::Event, &stub).unwrap(), vec!["event-b"]);

    assert!(backend.all_kind_links(RecordKind::Event, "obj-a").unwrap().is_empty());
    assert_eq!(relationship_count(backend), 1);
}

pub fn link_to_relationship_is_direct(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Relationship, "rel-r", "{}").unwrap();
    backend.put(RecordKind::Object, "obj-a", "{}").unwrap();

    let outcome = backend
        .link(RecordKind::Object, "obj-a", RecordKind::Relationship, "rel-r")
        .unwrap();
    assert!(outcome.stub.is_none());

    assert_eq!(backend.all_kind_links(RecordKind::Object, "rel-r").unwrap(), vec!["obj-a"]);
    assert_eq!(backend.all_kind_links(RecordKind::Relationship, "obj-a").unwrap(), vec!["rel-r"]);
    assert_eq!(relationship_count(backend), 1);

    // Linking again changes nothing
    backend
        .link(RecordKind::Object, "obj-a", RecordKind::Relationship, "rel-r")
        .unwrap();
    assert_eq!(backend.all_kind_links(RecordKind::Object, "rel-r").unwrap().len(), 1);
}

pub fn relationship_first_rejected(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Relationship, "rel-r", "{}").unwrap();
    backend.put(RecordKind::Object, "obj-a", "{}").unwrap();

    let err = backend
        .link(RecordKind::Relationship, "rel-r", RecordKind::Object, "obj-a")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidLinkOrder { .. }));
    assert!(backend.all_kind_links(RecordKind::Object, "rel-r").unwrap().is_empty());
    assert_eq!(relationship_count(backend), 1);
}

pub fn link_requires_both_endpoints(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Agent, "agent-a", "{}").unwrap();

    let err = backend
        .link(RecordKind::Agent, "agent-a", RecordKind::Relationship, "ghost")
        .unwrap_err();
    assert!(matches!(err, Error::IdentifierNotFound(ref id) if id == "ghost"));

    // The existence check runs before any stub is minted
    let err = backend
        .link(RecordKind::Agent, "agent-a", RecordKind::Rights, "ghost")
        .unwrap_err();
    assert!(matches!(err, Error::IdentifierNotFound(_)));
    assert_eq!(relationship_count(backend), 0);
    assert!(backend.all_kind_links(RecordKind::Relationship, "agent-a").unwrap().is_empty());
}

pub fn self_link(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Relationship, "rel-self", "{}").unwrap();
    backend
        .link(RecordKind::Relationship, "rel-self", RecordKind::Relationship, "rel-self")
        .unwrap();
    assert_eq!(
        backend.all_kind_links(RecordKind::Relationship, "rel-self").unwrap(),
        vec!["rel-self"]
    );
}

pub fn list_kind_completeness(backend: &dyn StorageBackend) {
    let inserted: HashSet<String> = (0..1234).map(|i| format!("object-{i:05}")).collect();
    for id in &inserted {
        backend.put(RecordKind::Object, id, "{}").unwrap();
    }

    let listed = drain(|cursor| backend.list_kind(RecordKind::Object, cursor, 200).unwrap());
    let unique: HashSet<String> = listed.iter().cloned().collect();
    assert_eq!(listed.len(), 1234);
    assert_eq!(unique, inserted);
}

pub fn list_links_completeness(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Event, "busy-event", "{}").unwrap();
    let mut inserted = HashSet::new();
    for i in 0..1234 {
        let rel = format!("rel-{i:05}");
        backend.put(RecordKind::Relationship, &rel, "{}").unwrap();
        backend
            .link(RecordKind::Event, "busy-event", RecordKind::Relationship, &rel)
            .unwrap();
        inserted.insert(rel);
    }

    let listed = drain(|cursor| {
        backend
            .list_kind_links(RecordKind::Relationship, "busy-event", cursor, Some(200))
            .unwrap()
    });
    let unique: HashSet<String> = listed.iter().cloned().collect();
    assert_eq!(listed.len(), 1234);
    assert_eq!(unique, inserted);

    let everything = backend
        .list_kind_links(RecordKind::Relationship, "busy-event", Cursor::START, None)
        .unwrap();
    assert_eq!(everything.ids.len(), 1234);
    assert!(everything.is_last());
}

pub fn empty_links(backend: &dyn StorageBackend) {
    backend.put(RecordKind::Agent, "lonely", "{}").unwrap();
    let page = backend
        .list_kind_links(RecordKind::Relationship, "lonely", Cursor::START, Some(50))
        .unwrap();
    assert!(page.ids.is_empty());
    assert!(page.is_last());

    let page = backend.list_kind(RecordKind::Rights, Cursor::START, 50).unwrap();
    assert!(page.ids.is_empty());
    assert!(page.is_last());
}
