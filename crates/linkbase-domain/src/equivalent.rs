//! Buckets of equivalent relationships competing on priority

use crate::error::{NetworkError, Result};
use crate::fragment::FragmentIndex;
use crate::relationship::Relationship;
use std::collections::{BTreeMap, BTreeSet};

/// Identity every relationship in a bucket must share
#[derive(Debug, Clone, PartialEq, Eq)]
struct BucketIdentity {
    semantic_key: String,
    source: FragmentIndex,
    target: FragmentIndex,
}

/// All relationships that share a semantic key, source and target
///
/// The relationship with the greatest priority is the active one. An exact
/// priority collision replaces the earlier entry; XBRL requires priorities
/// to disambiguate equivalent arcs, so no further tie-break is attempted.
#[derive(Debug, Clone, Default)]
pub struct EquivalentRelationships {
    identity: Option<BucketIdentity>,
    by_priority: BTreeMap<i32, Relationship>,
    arcs: BTreeSet<FragmentIndex>,
    added: usize,
}

impl EquivalentRelationships {
    /// Create an empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate relationship
    ///
    /// The first relationship seeds the bucket identity. Later ones must
    /// match its semantic key, source index and target index.
    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<()> {
        match &self.identity {
            None => {
                self.identity = Some(BucketIdentity {
                    semantic_key: relationship.semantic_key().to_string(),
                    source: relationship.source_index().clone(),
                    target: relationship.target_index().clone(),
                });
            }
            Some(identity) => {
                if identity.semantic_key != relationship.semantic_key()
                    || &identity.source != relationship.source_index()
                    || &identity.target != relationship.target_index()
                {
                    return Err(NetworkError::IncompatibleRelationship(format!(
                        "relationship {} -> {} with key '{}' cannot join bucket {} -> {} with key '{}'",
                        relationship.source_index(),
                        relationship.target_index(),
                        relationship.semantic_key(),
                        identity.source,
                        identity.target,
                        identity.semantic_key,
                    )));
                }
            }
        }

        let priority = relationship.priority();
        self.arcs.insert(relationship.arc().index().clone());
        if let Some(previous) = self.by_priority.insert(priority, relationship) {
            tracing::warn!(
                arc = %previous.arc().index(),
                priority,
                "equivalent relationships share a priority; keeping the later one"
            );
        }
        self.added += 1;
        Ok(())
    }

    /// The relationship with the highest priority, if any
    pub fn active_relationship(&self) -> Option<&Relationship> {
        self.by_priority.last_key_value().map(|(_, r)| r)
    }

    /// True when the active relationship is a prohibiting arc
    pub fn is_prohibited(&self) -> bool {
        self.active_relationship()
            .is_some_and(Relationship::is_prohibited)
    }

    /// Number of relationships ever added, superseded ones included
    pub fn size(&self) -> usize {
        self.added
    }

    /// True when nothing has been added
    pub fn is_empty(&self) -> bool {
        self.by_priority.is_empty()
    }

    /// Retained relationships, highest priority first
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.by_priority.values().rev()
    }

    /// True when a relationship from the given arc was ever added, even if
    /// it has since lost a priority collision
    pub fn contains_arc(&self, arc_index: &FragmentIndex) -> bool {
        self.arcs.contains(arc_index)
    }

    /// Shared semantic key, once seeded
    pub fn semantic_key(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.semantic_key.as_str())
    }

    /// Shared source index, once seeded
    pub fn source_index(&self) -> Option<&FragmentIndex> {
        self.identity.as_ref().map(|i| &i.source)
    }

    /// Shared target index, once seeded
    pub fn target_index(&self) -> Option<&FragmentIndex> {
        self.identity.as_ref().map(|i| &i.target)
    }
}
