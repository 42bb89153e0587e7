//! Relationship module - an arc bound to its resolved endpoints

use crate::arc::{Arc, ArcUse};
use crate::error::{NetworkError, Result};
use crate::fragment::{ExtendedLink, Fragment, FragmentIndex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a network: one (arc role, link role) pair
///
/// Ordered by arc role first, matching how [`crate::Networks`] groups them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkKey {
    /// Arc role URI
    pub arc_role: String,

    /// Link role URI
    pub link_role: String,
}

impl NetworkKey {
    /// Create a key
    pub fn new(arc_role: impl Into<String>, link_role: impl Into<String>) -> Self {
        Self {
            arc_role: arc_role.into(),
            link_role: link_role.into(),
        }
    }
}

impl fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.link_role, self.arc_role)
    }
}

/// A directed relationship between two fragments
///
/// Immutable once constructed. A relationship never points back at the
/// network holding it: the network it belongs to is fully determined by
/// its own link role and arc role (see [`Relationship::network_key`]).
///
/// Equality compares source index, target index and arc semantics. Two
/// relationships that differ only in priority or use are therefore equal,
/// which is exactly what makes them compete inside one
/// [`crate::EquivalentRelationships`] bucket.
///
/// Deserialization goes through [`Relationship::new`], so serialized input
/// is held to the same validation as constructed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RelationshipParts", into = "RelationshipParts")]
pub struct Relationship {
    arc: Arc,
    source: Fragment,
    target: Fragment,
    link: ExtendedLink,
}

/// Unvalidated serialized form of a [`Relationship`]
#[derive(Serialize, Deserialize)]
struct RelationshipParts {
    arc: Arc,
    source: Fragment,
    target: Fragment,
    link: ExtendedLink,
}

impl TryFrom<RelationshipParts> for Relationship {
    type Error = NetworkError;

    fn try_from(parts: RelationshipParts) -> Result<Self> {
        Relationship::new(parts.arc, parts.source, parts.target, parts.link)
    }
}

impl From<Relationship> for RelationshipParts {
    fn from(relationship: Relationship) -> Self {
        Self {
            arc: relationship.arc,
            source: relationship.source,
            target: relationship.target,
            link: relationship.link,
        }
    }
}

impl Relationship {
    /// Bind an arc to resolved endpoints inside an extended link
    ///
    /// Endpoints must already be resolved: passing a locator is a
    /// validation error.
    pub fn new(arc: Arc, source: Fragment, target: Fragment, link: ExtendedLink) -> Result<Self> {
        if arc.arcrole().is_empty() {
            return Err(NetworkError::Validation(format!(
                "arc {} has no arc role",
                arc.index()
            )));
        }
        if link.role.is_empty() {
            return Err(NetworkError::Validation(format!(
                "extended link {} has no link role",
                link.index
            )));
        }
        for endpoint in [&source, &target] {
            if endpoint.is_locator() {
                return Err(NetworkError::Validation(format!(
                    "relationship endpoint {} is an unresolved locator",
                    endpoint.index
                )));
            }
        }
        Ok(Self {
            arc,
            source,
            target,
            link,
        })
    }

    /// The arc this relationship came from
    pub fn arc(&self) -> &Arc {
        &self.arc
    }

    /// Source fragment
    pub fn source(&self) -> &Fragment {
        &self.source
    }

    /// Target fragment
    pub fn target(&self) -> &Fragment {
        &self.target
    }

    /// Containing extended link
    pub fn link(&self) -> &ExtendedLink {
        &self.link
    }

    /// Index of the source fragment
    pub fn source_index(&self) -> &FragmentIndex {
        &self.source.index
    }

    /// Index of the target fragment
    pub fn target_index(&self) -> &FragmentIndex {
        &self.target.index
    }

    /// Link role URI
    pub fn link_role(&self) -> &str {
        &self.link.role
    }

    /// Arc role URI
    pub fn arc_role(&self) -> &str {
        self.arc.arcrole()
    }

    /// Trimmed arc order text
    pub fn order(&self) -> &str {
        self.arc.order()
    }

    /// Arc order as a decimal
    pub fn order_value(&self) -> f64 {
        self.arc.order_value()
    }

    /// Arc priority
    pub fn priority(&self) -> i32 {
        self.arc.priority()
    }

    /// Arc use
    pub fn arc_use(&self) -> ArcUse {
        self.arc.arc_use()
    }

    /// True when the arc prohibits the relationship
    pub fn is_prohibited(&self) -> bool {
        self.arc.is_prohibited()
    }

    /// Semantic key of the arc
    pub fn semantic_key(&self) -> &str {
        self.arc.semantic_key()
    }

    /// The network this relationship belongs to
    pub fn network_key(&self) -> NetworkKey {
        NetworkKey::new(self.arc_role(), self.link_role())
    }

    /// True when both relationships come from the same arc between the same endpoints
    pub fn is_same_arc(&self, other: &Relationship) -> bool {
        self.arc.index() == other.arc.index()
            && self.source_index() == other.source_index()
            && self.target_index() == other.target_index()
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.source_index() == other.source_index()
            && self.target_index() == other.target_index()
            && self.arc.semantically_equals(&other.arc)
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_index().hash(state);
        self.target_index().hash(state);
        self.semantic_key().hash(state);
    }
}
