//! Fragment module - the nodes that relationships connect

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque index of a fragment in the document store
///
/// Indexes are assigned by the loader and are only ever compared,
/// ordered and handed back to the store for lookup.
///
/// # Examples
///
/// ```
/// use linkbase_domain::FragmentIndex;
///
/// let index = FragmentIndex::new("f42");
/// assert_eq!(index.as_str(), "f42");
/// assert_eq!(index.to_string(), "f42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentIndex(String);

impl FragmentIndex {
    /// Create an index from its string form
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw index
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the index is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FragmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FragmentIndex {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FragmentIndex {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of a fragment, resolved once when the fragment is loaded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// A concept declared in a taxonomy schema
    Concept,

    /// A fact (item or tuple) in an instance document
    Fact,

    /// A label resource
    Label,

    /// A reference resource
    Reference,

    /// Any other XLink resource
    Resource,

    /// An XLink locator naming a remote fragment
    Locator {
        /// The fragment the locator points at
        target: FragmentIndex,
    },

    /// Anything the engine does not need to distinguish
    Other,
}

impl FragmentKind {
    /// Get the kind name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentKind::Concept => "concept",
            FragmentKind::Fact => "fact",
            FragmentKind::Label => "label",
            FragmentKind::Reference => "reference",
            FragmentKind::Resource => "resource",
            FragmentKind::Locator { .. } => "locator",
            FragmentKind::Other => "other",
        }
    }

    /// Rebuild a kind from its stored name and optional locator target
    pub fn from_parts(kind: &str, locator_target: Option<FragmentIndex>) -> Result<Self> {
        match (kind, locator_target) {
            ("locator", Some(target)) => Ok(FragmentKind::Locator { target }),
            ("locator", None) => Err(NetworkError::Validation(
                "locator fragment without a target".to_string(),
            )),
            (_, Some(_)) => Err(NetworkError::Validation(format!(
                "fragment kind '{}' cannot carry a locator target",
                kind
            ))),
            ("concept", None) => Ok(FragmentKind::Concept),
            ("fact", None) => Ok(FragmentKind::Fact),
            ("label", None) => Ok(FragmentKind::Label),
            ("reference", None) => Ok(FragmentKind::Reference),
            ("resource", None) => Ok(FragmentKind::Resource),
            ("other", None) => Ok(FragmentKind::Other),
            (other, None) => Err(NetworkError::Validation(format!(
                "unknown fragment kind '{}'",
                other
            ))),
        }
    }

    /// The locator target, if this is a locator
    pub fn locator_target(&self) -> Option<&FragmentIndex> {
        match self {
            FragmentKind::Locator { target } => Some(target),
            _ => None,
        }
    }
}

/// A node that relationships connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Store index
    pub index: FragmentIndex,

    /// Resolved kind
    pub kind: FragmentKind,

    /// Element or concept name, when the loader knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Fragment {
    /// Create a fragment without a name
    pub fn new(index: impl Into<FragmentIndex>, kind: FragmentKind) -> Self {
        Self {
            index: index.into(),
            kind,
            name: None,
        }
    }

    /// Create a locator fragment pointing at `target`
    pub fn locator(index: impl Into<FragmentIndex>, target: impl Into<FragmentIndex>) -> Self {
        Self::new(
            index,
            FragmentKind::Locator {
                target: target.into(),
            },
        )
    }

    /// Attach a name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// True for XLink locators
    pub fn is_locator(&self) -> bool {
        matches!(self.kind, FragmentKind::Locator { .. })
    }
}

/// An XLink extended link, the container that gives arcs their link role
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtendedLink {
    /// Store index of the extended link element
    pub index: FragmentIndex,

    /// The link role URI
    pub role: String,
}

impl ExtendedLink {
    /// Create an extended link
    pub fn new(index: impl Into<FragmentIndex>, role: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            role: role.into(),
        }
    }
}
