//! Storer - writes resolved relationships to a relationship store

use crate::error::{NetworkError, Result};
use crate::network::Network;
use crate::networks::Networks;
use crate::persisted::{PersistedRelationship, RelationshipKey};
use crate::relationship::Relationship;
use crate::traits::RelationshipStore;
use std::ops::AddAssign;
use tracing::{debug, info};

/// Counts from one storing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    /// Records written or replaced
    pub stored: usize,

    /// Records removed because the relationship is now prohibited
    pub removed: usize,
}

impl AddAssign for StoreSummary {
    fn add_assign(&mut self, other: Self) {
        self.stored += other.stored;
        self.removed += other.removed;
    }
}

/// Persists the active relationships of networks
///
/// Only active, non-prohibited relationships are written. A record with the
/// same key is replaced, so the last active relationship stored wins.
pub struct Storer<'a, R> {
    store: &'a mut R,
}

impl<'a, R: RelationshipStore> Storer<'a, R> {
    /// Create a storer writing to `store`
    pub fn new(store: &'a mut R) -> Self {
        Self { store }
    }

    /// Persist one relationship
    pub fn store_relationship(&mut self, relationship: &Relationship, root: bool) -> Result<()> {
        if relationship.is_prohibited() {
            return Err(NetworkError::Validation(format!(
                "prohibiting arc {} cannot be persisted",
                relationship.arc().index()
            )));
        }
        let record = PersistedRelationship::from_relationship(relationship, root);
        self.store
            .persist_relationship(&record)
            .map_err(NetworkError::store)
    }

    /// Persist every active relationship of the network
    ///
    /// Buckets whose active relationship is prohibited remove any record
    /// previously stored under their key.
    pub fn store_network(&mut self, network: &Network) -> Result<StoreSummary> {
        let roots = network.root_fragment_indexes();
        let mut summary = StoreSummary::default();

        for bucket in network.equivalence_sets() {
            let Some(active) = bucket.active_relationship() else {
                continue;
            };
            if active.is_prohibited() {
                let removed = self
                    .store
                    .delete_relationship(&RelationshipKey::of(active))
                    .map_err(NetworkError::store)?;
                if removed {
                    summary.removed += 1;
                }
                continue;
            }
            self.store_relationship(active, roots.contains(active.source_index()))?;
            summary.stored += 1;
        }

        debug!(
            network = %network.key(),
            stored = summary.stored,
            removed = summary.removed,
            "Stored network"
        );
        Ok(summary)
    }

    /// Persist every network in the collection
    pub fn store_networks(&mut self, networks: &Networks) -> Result<StoreSummary> {
        let mut summary = StoreSummary::default();
        for network in networks.networks() {
            summary += self.store_network(network)?;
        }
        info!(
            networks = networks.size(),
            stored = summary.stored,
            removed = summary.removed,
            "Stored relationships"
        );
        Ok(summary)
    }
}
