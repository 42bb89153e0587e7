//! Test fixtures shared by the module tests

use crate::arc::{Arc, ArcUse};
use crate::document::DocumentRecord;
use crate::fragment::{ExtendedLink, Fragment, FragmentIndex, FragmentKind};
use crate::persisted::{PersistedRelationship, RelationshipKey};
use crate::relationship::Relationship;
use crate::traits::{FragmentStore, RelationshipQuery, RelationshipStore};
use std::cell::Cell;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
#[error("memory store: {0}")]
pub(crate) struct MemoryStoreError(String);

struct StoredArc {
    link: FragmentIndex,
    from: String,
    to: String,
    arc: Arc,
}

/// In-memory stand-in for a document and relationship store
#[derive(Default)]
pub(crate) struct MemoryStore {
    fragments: BTreeMap<FragmentIndex, Fragment>,
    links: Vec<ExtendedLink>,
    members: Vec<(FragmentIndex, String, FragmentIndex)>,
    arcs: Vec<StoredArc>,
    relationships: BTreeMap<RelationshipKey, PersistedRelationship>,
    fail_after: Option<usize>,
    calls: Cell<usize>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn load(records: impl IntoIterator<Item = DocumentRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            match record {
                DocumentRecord::Fragment(f) => {
                    store.fragments.insert(f.index.clone(), f);
                }
                DocumentRecord::ExtendedLink(l) => store.links.push(l),
                DocumentRecord::Member {
                    link,
                    label,
                    fragment,
                } => store.members.push((link, label, fragment)),
                DocumentRecord::Arc { link, from, to, arc } => {
                    store.arcs.push(StoredArc { link, from, to, arc })
                }
            }
        }
        store
    }

    /// Fail every fragment-store call after `n` successful ones
    pub(crate) fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub(crate) fn record_count(&self) -> usize {
        self.relationships.len()
    }

    fn tick(&self) -> Result<(), MemoryStoreError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        match self.fail_after {
            Some(limit) if n >= limit => Err(MemoryStoreError("connection lost".to_string())),
            _ => Ok(()),
        }
    }

    fn labelled(&self, link: &FragmentIndex, label: &str) -> Vec<Fragment> {
        self.members
            .iter()
            .filter(|(l, lab, _)| l == link && lab == label)
            .filter_map(|(_, _, f)| self.fragments.get(f).cloned())
            .collect()
    }

    fn stored_arc(&self, arc: &Arc) -> Result<&StoredArc, MemoryStoreError> {
        self.arcs
            .iter()
            .find(|s| s.arc.index() == arc.index())
            .ok_or_else(|| MemoryStoreError(format!("unknown arc {}", arc.index())))
    }
}

impl FragmentStore for MemoryStore {
    type Error = MemoryStoreError;

    fn get_fragment(&self, index: &FragmentIndex) -> Result<Option<Fragment>, MemoryStoreError> {
        self.tick()?;
        Ok(self.fragments.get(index).cloned())
    }

    fn link_roles(&self) -> Result<Vec<String>, MemoryStoreError> {
        self.tick()?;
        let mut roles: Vec<String> = self.links.iter().map(|l| l.role.clone()).collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }

    fn arc_roles(&self) -> Result<Vec<String>, MemoryStoreError> {
        self.tick()?;
        let mut roles: Vec<String> = self.arcs.iter().map(|s| s.arc.arcrole().to_string()).collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }

    fn extended_links_with_role(&self, link_role: &str) -> Result<Vec<ExtendedLink>, MemoryStoreError> {
        self.tick()?;
        Ok(self
            .links
            .iter()
            .filter(|l| l.role == link_role)
            .cloned()
            .collect())
    }

    fn arcs_by_arcrole(&self, link: &ExtendedLink, arc_role: &str) -> Result<Vec<Arc>, MemoryStoreError> {
        self.tick()?;
        Ok(self
            .arcs
            .iter()
            .filter(|s| s.link == link.index && s.arc.arcrole() == arc_role)
            .map(|s| s.arc.clone())
            .collect())
    }

    fn arc_sources(&self, arc: &Arc) -> Result<Vec<Fragment>, MemoryStoreError> {
        self.tick()?;
        let stored = self.stored_arc(arc)?;
        Ok(self.labelled(&stored.link, &stored.from))
    }

    fn arc_targets(&self, arc: &Arc) -> Result<Vec<Fragment>, MemoryStoreError> {
        self.tick()?;
        let stored = self.stored_arc(arc)?;
        Ok(self.labelled(&stored.link, &stored.to))
    }
}

impl RelationshipStore for MemoryStore {
    type Error = MemoryStoreError;

    fn query_relationships(
        &self,
        query: &RelationshipQuery,
    ) -> Result<Vec<PersistedRelationship>, MemoryStoreError> {
        Ok(self
            .relationships
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    fn persist_relationship(&mut self, record: &PersistedRelationship) -> Result<(), MemoryStoreError> {
        self.relationships.insert(record.key(), record.clone());
        Ok(())
    }

    fn delete_relationship(&mut self, key: &RelationshipKey) -> Result<bool, MemoryStoreError> {
        Ok(self.relationships.remove(key).is_some())
    }

    fn persisted_arc_roles(&self) -> Result<Vec<String>, MemoryStoreError> {
        let mut roles: Vec<String> = self.relationships.keys().map(|k| k.arc_role.clone()).collect();
        roles.dedup();
        Ok(roles)
    }

    fn persisted_link_roles(&self, arc_role: &str) -> Result<Vec<String>, MemoryStoreError> {
        let mut roles: Vec<String> = self
            .relationships
            .keys()
            .filter(|k| k.arc_role == arc_role)
            .map(|k| k.link_role.clone())
            .collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }
}

pub(crate) fn concept(index: &str) -> Fragment {
    Fragment::new(index, FragmentKind::Concept)
}

/// Relationship in link role "L", arc role "R"
pub(crate) fn rel(
    arc: &str,
    source: &str,
    target: &str,
    order: &str,
    priority: i32,
    key: &str,
) -> Relationship {
    rel_in("L", "R", arc, source, target, order, priority, key)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn rel_in(
    link_role: &str,
    arc_role: &str,
    arc: &str,
    source: &str,
    target: &str,
    order: &str,
    priority: i32,
    key: &str,
) -> Relationship {
    Relationship::new(
        Arc::new(arc, arc_role, key)
            .with_order(order)
            .unwrap()
            .with_priority(priority),
        concept(source),
        concept(target),
        ExtendedLink::new(format!("link:{link_role}"), link_role),
    )
    .unwrap()
}

pub(crate) fn prohibiting(
    arc: &str,
    source: &str,
    target: &str,
    priority: i32,
    key: &str,
) -> Relationship {
    Relationship::new(
        Arc::new(arc, "R", key)
            .with_priority(priority)
            .with_use(ArcUse::Prohibited),
        concept(source),
        concept(target),
        ExtendedLink::new("link:L", "L"),
    )
    .unwrap()
}

/// Loader output for a small presentation link:
/// root -> {a (order 1), b (order 2)}, a -> c, with `a` reached via a locator
pub(crate) fn presentation_records() -> Vec<DocumentRecord> {
    let link = FragmentIndex::new("link1");
    let mut records = vec![
        DocumentRecord::ExtendedLink(ExtendedLink::new("link1", "L")),
        DocumentRecord::Fragment(concept("root")),
        DocumentRecord::Fragment(concept("a")),
        DocumentRecord::Fragment(concept("b")),
        DocumentRecord::Fragment(concept("c")),
        DocumentRecord::Fragment(Fragment::locator("loc_root", "root")),
        DocumentRecord::Fragment(Fragment::locator("loc_a", "a")),
        DocumentRecord::Fragment(Fragment::locator("loc_b", "b")),
        DocumentRecord::Fragment(Fragment::locator("loc_c", "c")),
    ];
    for (label, fragment) in [
        ("root", "loc_root"),
        ("a", "loc_a"),
        ("b", "loc_b"),
        ("c", "loc_c"),
    ] {
        records.push(DocumentRecord::Member {
            link: link.clone(),
            label: label.to_string(),
            fragment: fragment.into(),
        });
    }
    for (arc, from, to, order) in [
        ("arc1", "root", "b", "2"),
        ("arc2", "root", "a", "1"),
        ("arc3", "a", "c", "1"),
    ] {
        records.push(DocumentRecord::Arc {
            link: link.clone(),
            from: from.to_string(),
            to: to.to_string(),
            arc: Arc::new(arc, "R", format!("R|{from}|{to}"))
                .with_order(order)
                .unwrap(),
        });
    }
    records
}
