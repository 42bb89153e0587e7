//! Arc module - the declarations relationships are derived from
//!
//! An arc carries everything that decides how a relationship competes with
//! its equivalents: its order among siblings, its priority, and whether it
//! prohibits or asserts the relationship.

use crate::error::{NetworkError, Result};
use crate::fragment::FragmentIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arc `use` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArcUse {
    /// The arc asserts a relationship
    #[default]
    Optional,

    /// The arc prohibits equivalent relationships of lower priority
    Prohibited,
}

impl ArcUse {
    /// Get the use value as it appears in XLink
    pub fn as_str(&self) -> &'static str {
        match self {
            ArcUse::Optional => "optional",
            ArcUse::Prohibited => "prohibited",
        }
    }

    /// Parse a use value
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "optional" => Some(ArcUse::Optional),
            "prohibited" => Some(ArcUse::Prohibited),
            _ => None,
        }
    }
}

impl std::str::FromStr for ArcUse {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid arc use: {}", s))
    }
}

/// Sibling order of an arc
///
/// Keeps the trimmed text as written and the decimal value used for
/// sorting. Only the text is serialized; the value is re-parsed on load.
///
/// # Examples
///
/// ```
/// use linkbase_domain::ArcOrder;
///
/// let order = ArcOrder::parse(" 2.50 ").unwrap();
/// assert_eq!(order.as_str(), "2.50");
/// assert_eq!(order.value(), 2.5);
/// assert!(ArcOrder::parse("first").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArcOrder {
    text: String,
    value: f64,
}

impl ArcOrder {
    /// Parse an order attribute value
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw.trim();
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self {
                text: text.to_string(),
                value,
            }),
            _ => Err(NetworkError::InvalidArc {
                index: FragmentIndex::new(""),
                order: raw.to_string(),
            }),
        }
    }

    /// Trimmed text form
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Decimal value
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Default for ArcOrder {
    fn default() -> Self {
        Self {
            text: "1".to_string(),
            value: 1.0,
        }
    }
}

impl fmt::Display for ArcOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for ArcOrder {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ArcOrder> for String {
    fn from(order: ArcOrder) -> Self {
        order.text
    }
}

/// An XLink arc, reduced to what relationship resolution needs
///
/// Arcs are immutable once built; the `with_*` methods consume and return
/// the arc so they can only be used during construction.
///
/// # Examples
///
/// ```
/// use linkbase_domain::{Arc, ArcUse};
///
/// let arc = Arc::new("a1", "http://www.xbrl.org/2003/arcrole/parent-child", "k1")
///     .with_order("2")
///     .unwrap()
///     .with_priority(1)
///     .with_use(ArcUse::Prohibited);
///
/// assert_eq!(arc.order(), "2");
/// assert_eq!(arc.priority(), 1);
/// assert!(arc.is_prohibited());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    index: FragmentIndex,
    arcrole: String,
    #[serde(default)]
    order: ArcOrder,
    #[serde(default)]
    priority: i32,
    #[serde(default, rename = "use")]
    arc_use: ArcUse,
    semantic_key: String,
}

impl Arc {
    /// Create an arc with XBRL defaults: order 1, priority 0, use optional
    pub fn new(
        index: impl Into<FragmentIndex>,
        arcrole: impl Into<String>,
        semantic_key: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            arcrole: arcrole.into(),
            order: ArcOrder::default(),
            priority: 0,
            arc_use: ArcUse::Optional,
            semantic_key: semantic_key.into(),
        }
    }

    /// Set the order attribute, failing on non-decimal text
    pub fn with_order(mut self, order: &str) -> Result<Self> {
        self.order = ArcOrder::parse(order).map_err(|_| NetworkError::InvalidArc {
            index: self.index.clone(),
            order: order.to_string(),
        })?;
        Ok(self)
    }

    /// Set the priority attribute
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the use attribute
    pub fn with_use(mut self, arc_use: ArcUse) -> Self {
        self.arc_use = arc_use;
        self
    }

    /// Store index of the arc
    pub fn index(&self) -> &FragmentIndex {
        &self.index
    }

    /// Arc role URI
    pub fn arcrole(&self) -> &str {
        &self.arcrole
    }

    /// Trimmed order text
    pub fn order(&self) -> &str {
        self.order.as_str()
    }

    /// Order as a decimal, for sorting
    pub fn order_value(&self) -> f64 {
        self.order.value()
    }

    /// Priority; higher wins
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Use attribute
    pub fn arc_use(&self) -> ArcUse {
        self.arc_use
    }

    /// True for prohibiting arcs
    pub fn is_prohibited(&self) -> bool {
        self.arc_use == ArcUse::Prohibited
    }

    /// Key shared by all arcs that are equivalent apart from priority and use
    pub fn semantic_key(&self) -> &str {
        &self.semantic_key
    }

    /// True when both arcs are equivalent for override/prohibition purposes
    pub fn semantically_equals(&self, other: &Arc) -> bool {
        self.semantic_key == other.semantic_key
    }
}

/// Attributes that never take part in arc equivalence
fn is_exempt(attribute: &str) -> bool {
    matches!(attribute, "use" | "priority" | "order") || attribute.starts_with("xlink:")
}

/// Derive a semantic key from an arc's attributes
///
/// The key is built from the arc role, the numeric order value and every
/// non-exempt attribute in name order. `use`, `priority` and `xlink:*`
/// attributes are exempt. Orders that differ only in notation ("1" and
/// "1.0") produce the same key.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use linkbase_domain::{arc::semantic_key, ArcOrder};
///
/// let mut attrs = BTreeMap::new();
/// attrs.insert("preferredLabel".to_string(), "terse".to_string());
/// attrs.insert("priority".to_string(), "3".to_string());
///
/// let a = semantic_key("role", &ArcOrder::parse("1").unwrap(), &attrs);
/// attrs.insert("priority".to_string(), "7".to_string());
/// let b = semantic_key("role", &ArcOrder::parse("1.0").unwrap(), &attrs);
/// assert_eq!(a, b);
/// ```
pub fn semantic_key(
    arcrole: &str,
    order: &ArcOrder,
    attributes: &BTreeMap<String, String>,
) -> String {
    let mut key = format!("{}|order={}", arcrole, order.value());
    for (name, value) in attributes.iter().filter(|(name, _)| !is_exempt(name)) {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value.trim());
    }
    key
}
