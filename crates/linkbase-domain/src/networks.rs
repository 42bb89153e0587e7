//! Networks module - every network, keyed by arc role then link role

use crate::error::Result;
use crate::fragment::{Fragment, FragmentIndex};
use crate::network::Network;
use crate::relationship::Relationship;
use crate::traits::FragmentStore;
use crate::NetworkError;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// A collection of networks with at most one per (arc role, link role)
///
/// # Examples
///
/// ```
/// use linkbase_domain::{Arc, ExtendedLink, Fragment, FragmentKind, Networks, Relationship};
///
/// let mut networks = Networks::new();
/// let r = Relationship::new(
///     Arc::new("a1", "R", "k1"),
///     Fragment::new("s1", FragmentKind::Concept),
///     Fragment::new("t1", FragmentKind::Concept),
///     ExtendedLink::new("l1", "L"),
/// )
/// .unwrap();
/// networks.add_relationship(r).unwrap();
///
/// assert!(networks.has_network("R", "L"));
/// assert_eq!(networks.size(), 1);
/// assert_eq!(networks.target_fragments(&"s1".into(), "R", None).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Networks {
    by_arc_role: BTreeMap<String, BTreeMap<String, Network>>,
}

impl Networks {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relationship, creating its network on first use
    ///
    /// Returns `Ok(false)` when the relationship was already recorded.
    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<bool> {
        let by_link_role = self
            .by_arc_role
            .entry(relationship.arc_role().to_string())
            .or_default();
        let network = match by_link_role.entry(relationship.link_role().to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    arc_role = relationship.arc_role(),
                    link_role = relationship.link_role(),
                    "creating network"
                );
                entry.insert(Network::new(relationship.link_role(), relationship.arc_role())?)
            }
        };
        network.add_relationship(relationship)
    }

    /// Add many relationships; returns how many were new
    pub fn add_relationships<I>(&mut self, relationships: I) -> Result<usize>
    where
        I: IntoIterator<Item = Relationship>,
    {
        let mut added = 0;
        for relationship in relationships {
            if self.add_relationship(relationship)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Insert a whole network, replacing any network with the same roles
    pub fn insert_network(&mut self, network: Network) -> Option<Network> {
        self.by_arc_role
            .entry(network.arc_role().to_string())
            .or_default()
            .insert(network.link_role().to_string(), network)
    }

    /// The network for one pair, if present
    pub fn network(&self, arc_role: &str, link_role: &str) -> Option<&Network> {
        self.by_arc_role.get(arc_role)?.get(link_role)
    }

    /// True when a network exists for the pair
    pub fn has_network(&self, arc_role: &str, link_role: &str) -> bool {
        self.network(arc_role, link_role).is_some()
    }

    /// Every network, ordered by arc role then link role
    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.by_arc_role.values().flat_map(|m| m.values())
    }

    /// Arc roles with at least one network
    pub fn arc_roles(&self) -> Vec<&str> {
        self.by_arc_role.keys().map(String::as_str).collect()
    }

    /// Link roles with a network for the arc role
    pub fn link_roles(&self, arc_role: &str) -> Vec<&str> {
        self.by_arc_role
            .get(arc_role)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of (arc role, link role) pairs holding at least one relationship
    pub fn size(&self) -> usize {
        self.networks().filter(|n| !n.is_empty()).count()
    }

    fn selected(&self, arc_role: &str, link_role: Option<&str>) -> Vec<&Network> {
        self.by_arc_role
            .get(arc_role)
            .into_iter()
            .flat_map(|m| m.iter())
            .filter(|(role, _)| link_role.map_or(true, |wanted| wanted == role.as_str()))
            .map(|(_, network)| network)
            .collect()
    }

    /// Active relationships out of a fragment, across link roles unless one is given
    pub fn active_relationships_from(
        &self,
        source: &FragmentIndex,
        arc_role: &str,
        link_role: Option<&str>,
    ) -> Vec<&Relationship> {
        self.selected(arc_role, link_role)
            .into_iter()
            .flat_map(|n| n.active_relationships_from(source))
            .collect()
    }

    /// Active relationships into a fragment, across link roles unless one is given
    pub fn active_relationships_to(
        &self,
        target: &FragmentIndex,
        arc_role: &str,
        link_role: Option<&str>,
    ) -> Vec<&Relationship> {
        self.selected(arc_role, link_role)
            .into_iter()
            .flat_map(|n| n.active_relationships_to(target))
            .collect()
    }

    /// Sources of active relationships into `target`, each fragment once
    pub fn source_fragments(
        &self,
        target: &FragmentIndex,
        arc_role: &str,
        link_role: Option<&str>,
    ) -> Vec<&Fragment> {
        let unique: BTreeMap<&FragmentIndex, &Fragment> = self
            .active_relationships_to(target, arc_role, link_role)
            .into_iter()
            .map(|r| (r.source_index(), r.source()))
            .collect();
        unique.into_values().collect()
    }

    /// Targets of active relationships out of `source`, each fragment once
    pub fn target_fragments(
        &self,
        source: &FragmentIndex,
        arc_role: &str,
        link_role: Option<&str>,
    ) -> Vec<&Fragment> {
        let unique: BTreeMap<&FragmentIndex, &Fragment> = self
            .active_relationships_from(source, arc_role, link_role)
            .into_iter()
            .map(|r| (r.target_index(), r.target()))
            .collect();
        unique.into_values().collect()
    }

    /// Complete the network for one pair from a store
    ///
    /// The network is kept only if it ends up non-empty.
    pub fn complete<S: FragmentStore>(
        &mut self,
        store: &S,
        arc_role: &str,
        link_role: &str,
    ) -> Result<usize> {
        self.complete_pair(store, arc_role, link_role, None)
    }

    /// Complete networks for an arc role across every link role in the store
    ///
    /// `timeout` bounds the whole call, not each network.
    pub fn complete_arc_role<S: FragmentStore>(
        &mut self,
        store: &S,
        arc_role: &str,
        timeout: Option<Duration>,
    ) -> Result<usize> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t).map(|at| (at, t)));
        let link_roles = store.link_roles().map_err(NetworkError::store)?;

        let mut added = 0;
        for link_role in &link_roles {
            added += self.complete_pair(store, arc_role, link_role, deadline)?;
        }
        tracing::info!(arc_role, link_roles = link_roles.len(), added, "arc role completed");
        Ok(added)
    }

    fn complete_pair<S: FragmentStore>(
        &mut self,
        store: &S,
        arc_role: &str,
        link_role: &str,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<usize> {
        let mut network = match self
            .by_arc_role
            .get_mut(arc_role)
            .and_then(|m| m.remove(link_role))
        {
            Some(existing) => existing,
            None => Network::new(link_role, arc_role)?,
        };

        let outcome = match deadline {
            Some((at, budget)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                network.complete_within(store, remaining).map_err(|e| match e {
                    NetworkError::Completion {
                        link_role,
                        arc_role,
                        partial,
                        source,
                    } if matches!(*source, NetworkError::TimedOut(_)) => NetworkError::Completion {
                        link_role,
                        arc_role,
                        partial,
                        source: Box::new(NetworkError::TimedOut(budget)),
                    },
                    other => other,
                })
            }
            None => network.complete(store),
        };

        if !network.is_empty() {
            self.insert_network(network);
        }
        outcome
    }
}
