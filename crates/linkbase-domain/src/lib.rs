//! Linkbase Domain Layer
//!
//! This crate holds the relationship network engine for XBRL linkbases.
//! Arcs in extended links connect fragments; grouped by link role and arc
//! role they form networks, where equivalent relationships override one
//! another by priority and may be prohibited.
//!
//! ## Key Concepts
//!
//! - **Fragment**: An addressable piece of a loaded document (concept, label, locator)
//! - **Arc**: A directed connection with order, priority and use
//! - **Relationship**: An arc resolved to concrete source and target fragments
//! - **Network**: Relationships sharing a link role and arc role
//! - **Equivalent relationships**: Candidates competing for one slot; the
//!   highest priority one is active
//!
//! ## Architecture
//!
//! - Pure engine logic, storage behind the [`FragmentStore`] and
//!   [`RelationshipStore`] traits
//! - [`Analyser`] and [`Storer`] move resolved relationships in and out of
//!   a relationship store
//! - Store implementations live in other crates (`linkbase-store`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyser;
pub mod arc;
pub mod document;
pub mod equivalent;
pub mod error;
pub mod fragment;
pub mod network;
pub mod networks;
pub mod persisted;
pub mod relationship;
pub mod storer;
pub mod traits;
pub mod tree;

#[cfg(test)]
mod fixtures;

// Re-exports for convenience
pub use analyser::{Analyser, AnalyserMode};
pub use arc::{Arc, ArcOrder, ArcUse};
pub use document::DocumentRecord;
pub use equivalent::EquivalentRelationships;
pub use error::{NetworkError, Result};
pub use fragment::{ExtendedLink, Fragment, FragmentIndex, FragmentKind};
pub use network::Network;
pub use networks::Networks;
pub use persisted::{PersistedRelationship, RelationshipKey};
pub use relationship::{NetworkKey, Relationship};
pub use storer::{StoreSummary, Storer};
pub use traits::{FragmentStore, RelationshipQuery, RelationshipStore};
pub use tree::{TreeIterator, TreeNode};
