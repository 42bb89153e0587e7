//! Records emitted by the document loader
//!
//! The XML loader itself lives outside this workspace. What it hands over is
//! a flat stream of these records, which a store ingests and later serves
//! back through [`crate::FragmentStore`].

use crate::arc::Arc;
use crate::fragment::{ExtendedLink, Fragment, FragmentIndex};

/// One unit of loader output
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentRecord {
    /// A fragment (concept, fact, resource, locator, ...)
    Fragment(Fragment),

    /// An extended link container
    ExtendedLink(ExtendedLink),

    /// A locator or resource carrying an `xlink:label` inside a link
    Member {
        /// The containing extended link
        link: FragmentIndex,
        /// The `xlink:label` value
        label: String,
        /// The labelled fragment
        fragment: FragmentIndex,
    },

    /// An arc inside a link, connecting two labels
    Arc {
        /// The containing extended link
        link: FragmentIndex,
        /// The `xlink:from` label
        from: String,
        /// The `xlink:to` label
        to: String,
        /// The arc itself
        arc: Arc,
    },
}
