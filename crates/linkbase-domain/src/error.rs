//! Error types for the relationship network engine

use crate::fragment::FragmentIndex;
use thiserror::Error;

/// Result type alias for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while building or querying relationship networks
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A required construction argument was missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// An arc carries an order attribute that is not a decimal
    #[error("Invalid arc {index}: order '{order}' is not a decimal")]
    InvalidArc {
        /// Index of the offending arc (may be empty when not yet known)
        index: FragmentIndex,
        /// The raw order text
        order: String,
    },

    /// A relationship disagrees with the identity of the bucket it was added to
    #[error("Incompatible relationship: {0}")]
    IncompatibleRelationship(String),

    /// A relationship's roles do not match the network it was added to
    #[error(
        "Relationship ({rel_link_role}, {rel_arc_role}) does not belong in network ({link_role}, {arc_role})"
    )]
    MismatchedNetwork {
        /// Link role of the network
        link_role: String,
        /// Arc role of the network
        arc_role: String,
        /// Link role of the rejected relationship
        rel_link_role: String,
        /// Arc role of the rejected relationship
        rel_arc_role: String,
    },

    /// Tree traversal was requested over a network that is not a strict tree
    #[error("Network ({link_role}, {arc_role}) is not a tree: {reason}")]
    NotATree {
        /// Link role of the network
        link_role: String,
        /// Arc role of the network
        arc_role: String,
        /// What broke the tree shape
        reason: String,
    },

    /// The external fragment or relationship store failed
    #[error("Store access error: {0}")]
    StoreAccess(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A locator points at a fragment the store does not know
    #[error("Locator {locator} points at missing fragment {target}")]
    DanglingLocator {
        /// The locator fragment
        locator: FragmentIndex,
        /// The fragment it names
        target: FragmentIndex,
    },

    /// A locator resolves to another locator
    #[error("Locator {locator} resolves to another locator {target}; chained locators are not supported")]
    UnsupportedLocatorChain {
        /// The first locator
        locator: FragmentIndex,
        /// The locator it points at
        target: FragmentIndex,
    },

    /// A persisted relationship names a fragment the store does not know
    #[error("Fragment not found: {0}")]
    MissingFragment(FragmentIndex),

    /// Network completion ran past its deadline
    #[error("Timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// Bulk completion of a network failed
    #[error(
        "Completing network ({link_role}, {arc_role}) failed{}: {source}",
        partial_note(.partial)
    )]
    Completion {
        /// Link role of the network
        link_role: String,
        /// Arc role of the network
        arc_role: String,
        /// Whether relationships were added before the failure
        partial: bool,
        /// The underlying failure
        #[source]
        source: Box<NetworkError>,
    },
}

fn partial_note(partial: &bool) -> &'static str {
    if *partial {
        " (network left partially populated)"
    } else {
        ""
    }
}

impl NetworkError {
    /// Wrap an error coming out of an external store
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        NetworkError::StoreAccess(Box::new(err))
    }
}
