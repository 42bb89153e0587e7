//! Persisted relationship records
//!
//! The flat shape in which resolved relationships are written to a
//! relationship store, so later queries can skip re-deriving networks.

use crate::arc::{Arc, ArcUse};
use crate::error::Result;
use crate::fragment::{ExtendedLink, FragmentIndex};
use crate::relationship::Relationship;
use serde::{Deserialize, Serialize};

/// Key under which at most one record is persisted
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipKey {
    /// Arc role URI
    pub arc_role: String,

    /// Link role URI
    pub link_role: String,

    /// Arc semantic key
    pub semantic_key: String,

    /// Source fragment
    pub source_index: FragmentIndex,

    /// Target fragment
    pub target_index: FragmentIndex,
}

impl RelationshipKey {
    /// Key of a live relationship
    pub fn of(relationship: &Relationship) -> Self {
        Self {
            arc_role: relationship.arc_role().to_string(),
            link_role: relationship.link_role().to_string(),
            semantic_key: relationship.semantic_key().to_string(),
            source_index: relationship.source_index().clone(),
            target_index: relationship.target_index().clone(),
        }
    }
}

/// A relationship as stored in a relationship store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRelationship {
    /// Arc the relationship came from
    pub arc_index: FragmentIndex,

    /// Arc role URI
    pub arc_role: String,

    /// Extended link the arc sits in
    pub link_index: FragmentIndex,

    /// Link role URI
    pub link_role: String,

    /// Source fragment
    pub source_index: FragmentIndex,

    /// Target fragment
    pub target_index: FragmentIndex,

    /// Trimmed arc order text
    pub order: String,

    /// Arc priority
    pub priority: i32,

    /// Prohibition marker
    pub prohibited: bool,

    /// Arc semantic key
    pub semantic_key: String,

    /// Source is a root of its network
    pub root: bool,
}

impl PersistedRelationship {
    /// Flatten a relationship
    pub fn from_relationship(relationship: &Relationship, root: bool) -> Self {
        Self {
            arc_index: relationship.arc().index().clone(),
            arc_role: relationship.arc_role().to_string(),
            link_index: relationship.link().index.clone(),
            link_role: relationship.link_role().to_string(),
            source_index: relationship.source_index().clone(),
            target_index: relationship.target_index().clone(),
            order: relationship.order().to_string(),
            priority: relationship.priority(),
            prohibited: relationship.is_prohibited(),
            semantic_key: relationship.semantic_key().to_string(),
            root,
        }
    }

    /// Storage key of the record
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            arc_role: self.arc_role.clone(),
            link_role: self.link_role.clone(),
            semantic_key: self.semantic_key.clone(),
            source_index: self.source_index.clone(),
            target_index: self.target_index.clone(),
        }
    }

    /// Rebuild the arc, re-validating its order
    pub fn to_arc(&self) -> Result<Arc> {
        let arc_use = if self.prohibited {
            ArcUse::Prohibited
        } else {
            ArcUse::Optional
        };
        Ok(
            Arc::new(self.arc_index.clone(), self.arc_role.clone(), self.semantic_key.clone())
                .with_order(&self.order)?
                .with_priority(self.priority)
                .with_use(arc_use),
        )
    }

    /// Rebuild the extended link
    pub fn to_link(&self) -> ExtendedLink {
        ExtendedLink::new(self.link_index.clone(), self.link_role.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Fragment, FragmentKind};

    #[test]
    fn test_flatten_and_rebuild_arc() {
        let arc = Arc::new("a1", "R", "k1")
            .with_order("2.5")
            .unwrap()
            .with_priority(3)
            .with_use(ArcUse::Prohibited);
        let r = Relationship::new(
            arc.clone(),
            Fragment::new("s1", FragmentKind::Concept),
            Fragment::new("t1", FragmentKind::Label),
            ExtendedLink::new("l1", "L"),
        )
        .unwrap();

        let record = PersistedRelationship::from_relationship(&r, true);
        assert!(record.root);
        assert!(record.prohibited);
        assert_eq!(record.key(), RelationshipKey::of(&r));
        assert_eq!(record.to_arc().unwrap(), arc);
        assert_eq!(record.to_link(), ExtendedLink::new("l1", "L"));
    }

    #[test]
    fn test_corrupt_order_fails_rebuild() {
        let record = PersistedRelationship {
            arc_index: "a1".into(),
            arc_role: "R".to_string(),
            link_index: "l1".into(),
            link_role: "L".to_string(),
            source_index: "s1".into(),
            target_index: "t1".into(),
            order: "one".to_string(),
            priority: 0,
            prohibited: false,
            semantic_key: "k".to_string(),
            root: false,
        };
        assert!(record.to_arc().is_err());
    }
}
