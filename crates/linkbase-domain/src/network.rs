//! Network module - the resolved graph of one (link role, arc role) pair
//!
//! Relationships are collected into [`EquivalentRelationships`] buckets held
//! in an arena. Two perspective indexes point into that arena:
//!
//! - by source: `source -> (semantic key, target) -> slot`
//! - by target: `target -> (semantic key, source) -> slot`
//!
//! Both perspectives name the same slot, so a bucket can never drift out of
//! sync between them. Active queries pick each bucket's highest-priority
//! relationship and drop buckets whose winner is a prohibiting arc.

use crate::equivalent::EquivalentRelationships;
use crate::error::{NetworkError, Result};
use crate::fragment::{Fragment, FragmentIndex, FragmentKind};
use crate::relationship::{NetworkKey, Relationship};
use crate::traits::FragmentStore;
use crate::tree::TreeIterator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

type PerspectiveIndex = BTreeMap<FragmentIndex, BTreeMap<(String, FragmentIndex), usize>>;

/// The graph of relationships for one (link role, arc role) pair
///
/// Mutation goes through `&mut self` only, so ingestion and querying are
/// naturally phase-separated: build the network, then share it read-only.
///
/// # Examples
///
/// ```
/// use linkbase_domain::{Arc, ExtendedLink, Fragment, FragmentKind, Network, Relationship};
///
/// let mut network = Network::new("L", "R").unwrap();
/// let r = Relationship::new(
///     Arc::new("a1", "R", "k1"),
///     Fragment::new("s1", FragmentKind::Concept),
///     Fragment::new("t1", FragmentKind::Concept),
///     ExtendedLink::new("l1", "L"),
/// )
/// .unwrap();
///
/// assert!(network.add_relationship(r.clone()).unwrap());
/// assert!(!network.add_relationship(r).unwrap());
/// assert_eq!(network.active_relationships_from(&"s1".into()).len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "NetworkSnapshot", into = "NetworkSnapshot")]
pub struct Network {
    key: NetworkKey,
    fragments: HashMap<FragmentIndex, Fragment>,
    buckets: Vec<EquivalentRelationships>,
    by_source: PerspectiveIndex,
    by_target: PerspectiveIndex,
}

/// Serialized form: the essential relationships only. Indexes and the
/// fragment cache are rebuilt on load.
#[derive(Serialize, Deserialize)]
struct NetworkSnapshot {
    link_role: String,
    arc_role: String,
    relationships: Vec<Relationship>,
}

impl TryFrom<NetworkSnapshot> for Network {
    type Error = NetworkError;

    fn try_from(snapshot: NetworkSnapshot) -> Result<Self> {
        let mut network = Network::new(snapshot.link_role, snapshot.arc_role)?;
        for relationship in snapshot.relationships {
            network.add_relationship(relationship)?;
        }
        Ok(network)
    }
}

impl From<Network> for NetworkSnapshot {
    fn from(network: Network) -> Self {
        let relationships = network
            .buckets
            .iter()
            .flat_map(|bucket| bucket.relationships().cloned())
            .collect();
        NetworkSnapshot {
            link_role: network.key.link_role,
            arc_role: network.key.arc_role,
            relationships,
        }
    }
}

impl Network {
    /// Create an empty network
    pub fn new(link_role: impl Into<String>, arc_role: impl Into<String>) -> Result<Self> {
        let link_role = link_role.into();
        let arc_role = arc_role.into();
        if link_role.is_empty() {
            return Err(NetworkError::Validation("network link role is empty".to_string()));
        }
        if arc_role.is_empty() {
            return Err(NetworkError::Validation("network arc role is empty".to_string()));
        }
        Ok(Self {
            key: NetworkKey::new(arc_role, link_role),
            fragments: HashMap::new(),
            buckets: Vec::new(),
            by_source: BTreeMap::new(),
            by_target: BTreeMap::new(),
        })
    }

    /// The (arc role, link role) pair
    pub fn key(&self) -> &NetworkKey {
        &self.key
    }

    /// Link role URI
    pub fn link_role(&self) -> &str {
        &self.key.link_role
    }

    /// Arc role URI
    pub fn arc_role(&self) -> &str {
        &self.key.arc_role
    }

    /// Add a relationship
    ///
    /// Returns `Ok(false)` when the relationship is already recorded: its
    /// bucket, found through the target perspective, already holds the
    /// same arc. A new arc for an existing bucket joins it as a competing
    /// candidate; otherwise a new bucket is created under both perspectives.
    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<bool> {
        if relationship.link_role() != self.key.link_role
            || relationship.arc_role() != self.key.arc_role
        {
            return Err(NetworkError::MismatchedNetwork {
                link_role: self.key.link_role.clone(),
                arc_role: self.key.arc_role.clone(),
                rel_link_role: relationship.link_role().to_string(),
                rel_arc_role: relationship.arc_role().to_string(),
            });
        }

        let source = relationship.source_index().clone();
        let target = relationship.target_index().clone();
        let semantic_key = relationship.semantic_key().to_string();

        let existing = self
            .by_target
            .get(&target)
            .and_then(|m| m.get(&(semantic_key.clone(), source.clone())))
            .copied();

        if let Some(slot) = existing {
            let bucket = &mut self.buckets[slot];
            if bucket.contains_arc(relationship.arc().index()) {
                tracing::debug!(
                    arc = %relationship.arc().index(),
                    %source,
                    %target,
                    "relationship already recorded"
                );
                return Ok(false);
            }
            bucket.add_relationship(relationship)?;
            return Ok(true);
        }

        self.cache_fragment(relationship.source());
        self.cache_fragment(relationship.target());

        let mut bucket = EquivalentRelationships::new();
        bucket.add_relationship(relationship)?;
        let slot = self.buckets.len();
        self.buckets.push(bucket);

        self.by_source
            .entry(source.clone())
            .or_default()
            .insert((semantic_key.clone(), target.clone()), slot);
        self.by_target
            .entry(target)
            .or_default()
            .insert((semantic_key, source), slot);
        Ok(true)
    }

    fn cache_fragment(&mut self, fragment: &Fragment) {
        if !self.fragments.contains_key(&fragment.index) {
            self.fragments
                .insert(fragment.index.clone(), fragment.clone());
        }
    }

    fn active_in<'a>(
        &'a self,
        slots: Option<&'a BTreeMap<(String, FragmentIndex), usize>>,
    ) -> Vec<&'a Relationship> {
        slots
            .into_iter()
            .flat_map(|m| m.values())
            .filter_map(|&slot| self.buckets[slot].active_relationship())
            .filter(|r| !r.is_prohibited())
            .collect()
    }

    /// Active relationships out of a fragment, in ascending arc order
    ///
    /// Equal orders keep a fixed relative order across calls.
    pub fn active_relationships_from(&self, source: &FragmentIndex) -> Vec<&Relationship> {
        let mut relationships = self.active_in(self.by_source.get(source));
        relationships.sort_by(|a, b| a.order_value().total_cmp(&b.order_value()));
        relationships
    }

    /// Active relationships into a fragment
    pub fn active_relationships_to(&self, target: &FragmentIndex) -> Vec<&Relationship> {
        self.active_in(self.by_target.get(target))
    }

    /// Every active relationship, grouped by source in index order
    pub fn active_relationships(&self) -> Vec<&Relationship> {
        self.by_source
            .keys()
            .flat_map(|source| self.active_relationships_from(source))
            .collect()
    }

    /// No active relationship leads into the fragment
    pub fn is_root(&self, index: &FragmentIndex) -> bool {
        self.active_relationships_to(index).is_empty()
    }

    /// No active relationship leads out of the fragment
    pub fn is_leaf(&self, index: &FragmentIndex) -> bool {
        self.active_relationships_from(index).is_empty()
    }

    /// Exactly one active relationship leads into the fragment
    pub fn has_single_parent(&self, index: &FragmentIndex) -> bool {
        self.active_relationships_to(index).len() == 1
    }

    /// Fragments that are sources but never targets
    ///
    /// Recomputed on every call.
    pub fn root_fragment_indexes(&self) -> BTreeSet<FragmentIndex> {
        self.by_source
            .keys()
            .filter(|index| !self.by_target.contains_key(*index))
            .cloned()
            .collect()
    }

    /// Cached fragment by index
    pub fn fragment(&self, index: &FragmentIndex) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    /// Every cached fragment
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    /// Indexes of fragments with outgoing relationships
    pub fn source_indexes(&self) -> impl Iterator<Item = &FragmentIndex> {
        self.by_source.keys()
    }

    /// Indexes of fragments with incoming relationships
    pub fn target_indexes(&self) -> impl Iterator<Item = &FragmentIndex> {
        self.by_target.keys()
    }

    /// Every bucket of equivalent relationships
    pub fn equivalence_sets(&self) -> impl Iterator<Item = &EquivalentRelationships> {
        self.buckets.iter()
    }

    /// Number of buckets (distinct relationships before resolution)
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when nothing has been added
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Preorder traversal; fails unless the network is a strict tree
    pub fn tree(&self) -> Result<TreeIterator<'_>> {
        TreeIterator::new(self)
    }

    /// Populate the network from a fragment store
    ///
    /// Walks every extended link with this link role and every arc with this
    /// arc role inside it, resolving locator endpoints one level deep.
    /// Returns the number of relationships added. On failure the network may
    /// hold part of the links; discard it and rebuild.
    pub fn complete<S: FragmentStore>(&mut self, store: &S) -> Result<usize> {
        self.complete_until(store, None)
    }

    /// Same as [`Network::complete`], giving up once `timeout` has elapsed
    ///
    /// A timeout too large to represent as a deadline means no limit.
    pub fn complete_within<S: FragmentStore>(&mut self, store: &S, timeout: Duration) -> Result<usize> {
        let deadline = Instant::now().checked_add(timeout).map(|at| (at, timeout));
        self.complete_until(store, deadline)
    }

    fn complete_until<S: FragmentStore>(
        &mut self,
        store: &S,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<usize> {
        let mut added = 0;
        match self.populate(store, deadline, &mut added) {
            Ok(()) => {
                tracing::info!(
                    link_role = %self.key.link_role,
                    arc_role = %self.key.arc_role,
                    added,
                    "network completed"
                );
                Ok(added)
            }
            Err(source) => Err(NetworkError::Completion {
                link_role: self.key.link_role.clone(),
                arc_role: self.key.arc_role.clone(),
                partial: added > 0,
                source: Box::new(source),
            }),
        }
    }

    fn populate<S: FragmentStore>(
        &mut self,
        store: &S,
        deadline: Option<(Instant, Duration)>,
        added: &mut usize,
    ) -> Result<()> {
        let links = store
            .extended_links_with_role(&self.key.link_role)
            .map_err(NetworkError::store)?;

        for link in &links {
            check_deadline(deadline)?;
            let arcs = store
                .arcs_by_arcrole(link, &self.key.arc_role)
                .map_err(NetworkError::store)?;

            for arc in arcs {
                check_deadline(deadline)?;
                let sources = store.arc_sources(&arc).map_err(NetworkError::store)?;
                let sources = self.resolve_endpoints(store, sources)?;
                let targets = store.arc_targets(&arc).map_err(NetworkError::store)?;
                let targets = self.resolve_endpoints(store, targets)?;

                for source in &sources {
                    for target in &targets {
                        let relationship = Relationship::new(
                            arc.clone(),
                            source.clone(),
                            target.clone(),
                            link.clone(),
                        )?;
                        if self.add_relationship(relationship)? {
                            *added += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_endpoints<S: FragmentStore>(
        &self,
        store: &S,
        endpoints: Vec<Fragment>,
    ) -> Result<Vec<Fragment>> {
        endpoints
            .into_iter()
            .map(|endpoint| self.resolve_endpoint(store, endpoint))
            .collect()
    }

    /// Follow at most one locator hop
    fn resolve_endpoint<S: FragmentStore>(&self, store: &S, endpoint: Fragment) -> Result<Fragment> {
        let FragmentKind::Locator { target } = &endpoint.kind else {
            return Ok(endpoint);
        };

        let resolved = match self.fragments.get(target) {
            Some(cached) => cached.clone(),
            None => store
                .get_fragment(target)
                .map_err(NetworkError::store)?
                .ok_or_else(|| NetworkError::DanglingLocator {
                    locator: endpoint.index.clone(),
                    target: target.clone(),
                })?,
        };

        if resolved.is_locator() {
            return Err(NetworkError::UnsupportedLocatorChain {
                locator: endpoint.index.clone(),
                target: resolved.index,
            });
        }
        Ok(resolved)
    }
}

fn check_deadline(deadline: Option<(Instant, Duration)>) -> Result<()> {
    match deadline {
        Some((at, budget)) if Instant::now() >= at => Err(NetworkError::TimedOut(budget)),
        _ => Ok(()),
    }
}
