//! Backend-agnostic linking of two records
//!
//! A link is stored as two independent index entries, one per direction.
//! Relationships are the only association entities, so linking two
//! non-relationship records goes through a freshly minted stub
//! relationship that ends up linked to both of them.

use crate::kind::RecordKind;
use crate::record;
use crate::storage::StorageBackend;
use crate::{Error, Result};

/// What a successful link produced
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkOutcome {
    /// Identifier of the stub relationship, if one was minted
    pub stub: Option<String>,
}

pub struct RecordLinker<'a, B: StorageBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: StorageBackend + ?Sized> RecordLinker<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Link `id1` (of `kind1`) with `id2` (of `kind2`).
    ///
    /// A relationship must be the second operand: `kind1 == relationship`
    /// with any other `kind2` fails with `InvalidLinkOrder`. Both endpoints
    /// must exist. When `kind2` is not a relationship the records are joined
    /// through a new stub relationship.
    pub fn link(
        &self,
        kind1: RecordKind,
        id1: &str,
        kind2: RecordKind,
        id2: &str,
    ) -> Result<LinkOutcome> {
        if kind1.is_relationship() && !kind2.is_relationship() {
            return Err(Error::InvalidLinkOrder { kind1, kind2 });
        }
        for (kind, id) in [(kind1, id1), (kind2, id2)] {
            if !self.backend.exists(kind, id)? {
                return Err(Error::IdentifierNotFound(id.to_string()));
            }
        }
        tracing::debug!("Attempting to link {}({}) to {}({})", kind1, id1, kind2, id2);

        if kind2.is_relationship() {
            self.write_pair(kind1, id1, kind2, id2)?;
            return Ok(LinkOutcome::default());
        }

        tracing::debug!("Target record is not a relationship - creating a simple linking relationship");
        let stub = self.mint_stub()?;
        self.write_pair(kind1, id1, RecordKind::Relationship, &stub)?;
        self.write_pair(kind2, id2, RecordKind::Relationship, &stub)?;

        Ok(LinkOutcome { stub: Some(stub) })
    }

    fn mint_stub(&self) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        tracing::debug!("Minting simple linking relationship ({})", id);
        self.backend
            .put(RecordKind::Relationship, &id, &record::stub_relationship(&id))?;
        Ok(id)
    }

    /// Write both directions of one link.
    ///
    /// The writes are not atomic. If the first lands and the second fails
    /// the link is left one-directional and reported as `PartialLink`.
    fn write_pair(
        &self,
        kind_a: RecordKind,
        id_a: &str,
        kind_b: RecordKind,
        id_b: &str,
    ) -> Result<()> {
        self.backend.add_link(id_a, kind_b, id_b)?;
        if let Err(e) = self.backend.add_link(id_b, kind_a, id_a) {
            tracing::error!(
                "Link {}({}) -> {}({}) written in one direction only: {}",
                kind_a,
                id_a,
                kind_b,
                id_b,
                e
            );
            return Err(Error::PartialLink {
                from: id_a.to_string(),
                to: id_b.to_string(),
                source: Box::new(e),
            });
        }
        Ok(())
    }
}

/// Link two records through `backend`. See `RecordLinker::link`.
pub fn link<B: StorageBackend + ?Sized>(
    backend: &B,
    kind1: RecordKind,
    id1: &str,
    kind2: RecordKind,
    id2: &str,
) -> Result<LinkOutcome> {
    RecordLinker::new(backend).link(kind1, id1, kind2, id2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{Cursor, Page};
    use crate::storage::{MemorySortedSets, SortedIndexBackend};

    /// Backend whose reverse-direction link writes always fail
    struct OneWay {
        inner: SortedIndexBackend<MemorySortedSets>,
    }

    impl StorageBackend for OneWay {
        fn name(&self) -> &'static str {
            "one-way"
        }
        fn exists(&self, kind: RecordKind, id: &str) -> Result<bool> {
            self.inner.exists(kind, id)
        }
        fn put(&self, kind: RecordKind, id: &str, payload: &str) -> Result<()> {
            self.inner.put(kind, id, payload)
        }
        fn add_link(&self, id: &str, kind: RecordKind, target: &str) -> Result<()> {
            if id.starts_with("rel") {
                return Err(Error::Io(std::io::Error::other("connection reset")));
            }
            self.inner.add_link(id, kind, target)
        }
        fn get(&self, id: &str) -> Result<String> {
            self.inner.get(id)
        }
        fn list_kind_links(
            &self,
            kind: RecordKind,
            id: &str,
            cursor: Cursor,
            limit: Option<usize>,
        ) -> Result<Page> {
            self.inner.list_kind_links(kind, id, cursor, limit)
        }
        fn list_kind(&self, kind: RecordKind, cursor: Cursor, limit: usize) -> Result<Page> {
            self.inner.list_kind(kind, cursor, limit)
        }
    }

    #[test]
    fn test_partial_link_reported() {
        let backend = OneWay {
            inner: SortedIndexBackend::new(MemorySortedSets::new()),
        };
        backend.put(RecordKind::Object, "obj", "{}").unwrap();
        backend.put(RecordKind::Relationship, "rel", "{}").unwrap();

        let err = backend
            .link(RecordKind::Object, "obj", RecordKind::Relationship, "rel")
            .unwrap_err();
        match err {
            Error::PartialLink { from, to, .. } => {
                assert_eq!(from, "obj");
                assert_eq!(to, "rel");
            }
            other => panic!("expected PartialLink, got {other:?}"),
        }
        // The forward direction stays written
        assert_eq!(
            backend.all_kind_links(RecordKind::Relationship, "obj").unwrap(),
            vec!["rel"]
        );
    }

    #[test]
    fn test_relationship_to_relationship_needs_no_stub() {
        let backend = SortedIndexBackend::new(MemorySortedSets::new());
        backend.put(RecordKind::Relationship, "parent", "{}").unwrap();
        backend.put(RecordKind::Relationship, "child", "{}").unwrap();

        let outcome = link(&backend, RecordKind::Relationship, "parent", RecordKind::Relationship, "child").unwrap();
        assert_eq!(outcome, LinkOutcome::default());
        assert_eq!(backend.all_kind_links(RecordKind::Relationship, "parent").unwrap(), vec!["child"]);
        assert_eq!(backend.all_kind_links(RecordKind::Relationship, "child").unwrap(), vec!["parent"]);
    }

    #[test]
    fn test_stub_payload_names_itself() {
        let backend = SortedIndexBackend::new(MemorySortedSets::new());
        backend.put(RecordKind::Agent, "agent", "{}").unwrap();
        backend.put(RecordKind::Rights, "rights", "{}").unwrap();

        let stub = RecordLinker::new(&backend)
            .link(RecordKind::Agent, "agent", RecordKind::Rights, "rights")
            .unwrap()
            .stub
            .unwrap();
        assert_eq!(stub.len(), 32);

        let payload: serde_json::Value = serde_json::from_str(&backend.get(&stub).unwrap()).unwrap();
        let id = record::primary_identifier(RecordKind::Relationship, payload.as_object().unwrap()).unwrap();
        assert_eq!(id, stub);
    }
}
