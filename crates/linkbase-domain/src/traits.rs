//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the network engine and the
//! document store. Implementations live in other crates (`linkbase-store`).

use crate::arc::Arc;
use crate::fragment::{ExtendedLink, Fragment, FragmentIndex};
use crate::persisted::{PersistedRelationship, RelationshipKey};

/// Read access to loaded fragments, extended links and arcs
///
/// This is everything [`crate::Network::complete`] needs from the XML side.
pub trait FragmentStore {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up a fragment by index
    fn get_fragment(&self, index: &FragmentIndex) -> Result<Option<Fragment>, Self::Error>;

    /// Every link role used by a loaded extended link
    fn link_roles(&self) -> Result<Vec<String>, Self::Error>;

    /// Every arc role used by a loaded arc
    fn arc_roles(&self) -> Result<Vec<String>, Self::Error>;

    /// Extended links with the given link role
    fn extended_links_with_role(&self, link_role: &str) -> Result<Vec<ExtendedLink>, Self::Error>;

    /// Arcs with the given arc role inside one extended link
    fn arcs_by_arcrole(&self, link: &ExtendedLink, arc_role: &str) -> Result<Vec<Arc>, Self::Error>;

    /// Fragments named by the arc's `xlink:from` label (locators not resolved)
    fn arc_sources(&self, arc: &Arc) -> Result<Vec<Fragment>, Self::Error>;

    /// Fragments named by the arc's `xlink:to` label (locators not resolved)
    fn arc_targets(&self, arc: &Arc) -> Result<Vec<Fragment>, Self::Error>;
}

/// Read/write access to persisted relationship records
pub trait RelationshipStore {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Records matching the query
    fn query_relationships(
        &self,
        query: &RelationshipQuery,
    ) -> Result<Vec<PersistedRelationship>, Self::Error>;

    /// Persist a record, replacing any record with the same key
    fn persist_relationship(&mut self, record: &PersistedRelationship) -> Result<(), Self::Error>;

    /// Remove the record with the given key; returns whether one existed
    fn delete_relationship(&mut self, key: &RelationshipKey) -> Result<bool, Self::Error>;

    /// Arc roles with at least one persisted record
    fn persisted_arc_roles(&self) -> Result<Vec<String>, Self::Error>;

    /// Link roles with at least one persisted record for the arc role
    fn persisted_link_roles(&self, arc_role: &str) -> Result<Vec<String>, Self::Error>;
}

/// Query criteria for persisted relationships
///
/// # Examples
///
/// ```
/// use linkbase_domain::RelationshipQuery;
///
/// let query = RelationshipQuery::for_arc_role("R")
///     .link_role("L")
///     .source("s1")
///     .roots_only();
/// assert_eq!(query.link_role.as_deref(), Some("L"));
/// assert!(query.roots_only);
/// assert!(query.include_prohibited);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipQuery {
    /// Filter by arc role
    pub arc_role: Option<String>,

    /// Filter by link role
    pub link_role: Option<String>,

    /// Filter by source fragment
    pub source_index: Option<FragmentIndex>,

    /// Filter by target fragment
    pub target_index: Option<FragmentIndex>,

    /// Only records flagged as network roots
    pub roots_only: bool,

    /// Include records carrying the prohibition marker
    pub include_prohibited: bool,
}

impl Default for RelationshipQuery {
    fn default() -> Self {
        Self {
            arc_role: None,
            link_role: None,
            source_index: None,
            target_index: None,
            roots_only: false,
            include_prohibited: true,
        }
    }
}

impl RelationshipQuery {
    /// Query every record of one arc role
    pub fn for_arc_role(arc_role: impl Into<String>) -> Self {
        Self {
            arc_role: Some(arc_role.into()),
            ..Default::default()
        }
    }

    /// Restrict to one link role
    pub fn link_role(mut self, link_role: impl Into<String>) -> Self {
        self.link_role = Some(link_role.into());
        self
    }

    /// Restrict to one source fragment
    pub fn source(mut self, index: impl Into<FragmentIndex>) -> Self {
        self.source_index = Some(index.into());
        self
    }

    /// Restrict to one target fragment
    pub fn target(mut self, index: impl Into<FragmentIndex>) -> Self {
        self.target_index = Some(index.into());
        self
    }

    /// Only records flagged as roots
    pub fn roots_only(mut self) -> Self {
        self.roots_only = true;
        self
    }

    /// Drop records carrying the prohibition marker
    pub fn without_prohibited(mut self) -> Self {
        self.include_prohibited = false;
        self
    }

    /// True when the record satisfies every filter
    pub fn matches(&self, record: &PersistedRelationship) -> bool {
        self.arc_role.as_deref().map_or(true, |r| r == record.arc_role)
            && self.link_role.as_deref().map_or(true, |r| r == record.link_role)
            && self.source_index.as_ref().map_or(true, |i| i == &record.source_index)
            && self.target_index.as_ref().map_or(true, |i| i == &record.target_index)
            && (!self.roots_only || record.root)
            && (self.include_prohibited || !record.prohibited)
    }
}
