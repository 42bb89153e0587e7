//! Analyser - queries over persisted relationships
//!
//! Reads records from a [`RelationshipStore`], turns them back into
//! [`Relationship`] values using a [`FragmentStore`] for the endpoints, and
//! applies one of three filters.

use crate::error::{NetworkError, Result};
use crate::fragment::{Fragment, FragmentIndex};
use crate::networks::Networks;
use crate::persisted::PersistedRelationship;
use crate::relationship::Relationship;
use crate::traits::{FragmentStore, RelationshipQuery, RelationshipStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Which persisted relationships an [`Analyser`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyserMode {
    /// Every record, unresolved
    All,

    /// Records without the prohibition marker, then override-resolved
    NonProhibited,

    /// Every record override- and prohibition-resolved
    #[default]
    ActiveOnly,
}

impl AnalyserMode {
    /// Get the mode name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyserMode::All => "all",
            AnalyserMode::NonProhibited => "non_prohibited",
            AnalyserMode::ActiveOnly => "active_only",
        }
    }
}

/// Query adapter over persisted relationships
///
/// Prohibition and override cannot both be expressed as one flat filter over
/// records, so the resolving modes first narrow the records and then build a
/// transient [`Networks`] to pick the active relationships.
pub struct Analyser<'a, F, R> {
    fragments: &'a F,
    relationships: &'a R,
    mode: AnalyserMode,
}

impl<'a, F, R> Analyser<'a, F, R>
where
    F: FragmentStore,
    R: RelationshipStore,
{
    /// Create an analyser over the two stores
    pub fn new(fragments: &'a F, relationships: &'a R, mode: AnalyserMode) -> Self {
        Self {
            fragments,
            relationships,
            mode,
        }
    }

    /// The filter in use
    pub fn mode(&self) -> AnalyserMode {
        self.mode
    }

    /// Relationships matching the query, filtered by the mode
    pub fn relationships(&self, query: &RelationshipQuery) -> Result<Vec<Relationship>> {
        match self.mode {
            AnalyserMode::All => self.rehydrate(self.records(query)?),
            AnalyserMode::NonProhibited | AnalyserMode::ActiveOnly => {
                let networks = self.networks(query)?;
                Ok(networks
                    .networks()
                    .flat_map(|n| n.active_relationships())
                    .cloned()
                    .collect())
            }
        }
    }

    /// A transient network collection built from the matching records
    ///
    /// In `NonProhibited` mode, prohibited records are left out before the
    /// networks are built.
    pub fn networks(&self, query: &RelationshipQuery) -> Result<Networks> {
        let query = match self.mode {
            AnalyserMode::NonProhibited => query.clone().without_prohibited(),
            AnalyserMode::All | AnalyserMode::ActiveOnly => query.clone(),
        };
        let mut networks = Networks::new();
        networks.add_relationships(self.rehydrate(self.records(&query)?)?)?;
        Ok(networks)
    }

    /// True when at least one relationship matches
    pub fn has_relationships(&self, query: &RelationshipQuery) -> Result<bool> {
        Ok(!self.relationships(query)?.is_empty())
    }

    /// Sources of records flagged as roots of the network
    pub fn roots(&self, link_role: &str, arc_role: &str) -> Result<BTreeSet<FragmentIndex>> {
        let query = RelationshipQuery::for_arc_role(arc_role)
            .link_role(link_role)
            .roots_only();
        Ok(self
            .relationships(&query)?
            .iter()
            .map(|r| r.source_index().clone())
            .collect())
    }

    /// Relationships out of `parent`, in arc order
    pub fn children(
        &self,
        parent: &FragmentIndex,
        link_role: &str,
        arc_role: &str,
    ) -> Result<Vec<Relationship>> {
        let query = RelationshipQuery::for_arc_role(arc_role)
            .link_role(link_role)
            .source(parent.clone());
        let mut children = self.relationships(&query)?;
        children.sort_by(|a, b| a.order_value().total_cmp(&b.order_value()));
        Ok(children)
    }

    /// Relationships into `child`
    pub fn parents(
        &self,
        child: &FragmentIndex,
        link_role: &str,
        arc_role: &str,
    ) -> Result<Vec<Relationship>> {
        let query = RelationshipQuery::for_arc_role(arc_role)
            .link_role(link_role)
            .target(child.clone());
        self.relationships(&query)
    }

    /// Arc roles with persisted relationships
    pub fn arc_roles(&self) -> Result<Vec<String>> {
        self.relationships
            .persisted_arc_roles()
            .map_err(NetworkError::store)
    }

    /// Link roles with persisted relationships for the arc role
    pub fn link_roles(&self, arc_role: &str) -> Result<Vec<String>> {
        self.relationships
            .persisted_link_roles(arc_role)
            .map_err(NetworkError::store)
    }

    fn records(&self, query: &RelationshipQuery) -> Result<Vec<PersistedRelationship>> {
        self.relationships
            .query_relationships(query)
            .map_err(NetworkError::store)
    }

    fn rehydrate(&self, records: Vec<PersistedRelationship>) -> Result<Vec<Relationship>> {
        let mut cache: HashMap<FragmentIndex, Fragment> = HashMap::new();
        records
            .into_iter()
            .map(|record| {
                let source = self.fragment(&mut cache, &record.source_index)?;
                let target = self.fragment(&mut cache, &record.target_index)?;
                Relationship::new(record.to_arc()?, source, target, record.to_link())
            })
            .collect()
    }

    fn fragment(
        &self,
        cache: &mut HashMap<FragmentIndex, Fragment>,
        index: &FragmentIndex,
    ) -> Result<Fragment> {
        if let Some(fragment) = cache.get(index) {
            return Ok(fragment.clone());
        }
        let fragment = self
            .fragments
            .get_fragment(index)
            .map_err(NetworkError::store)?
            .ok_or_else(|| NetworkError::MissingFragment(index.clone()))?;
        cache.insert(index.clone(), fragment.clone());
        Ok(fragment)
    }
}
