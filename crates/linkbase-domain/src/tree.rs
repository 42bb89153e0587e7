//! Preorder traversal of tree-shaped networks
//!
//! Presentation hierarchies are rendered by walking a network from its single
//! root, visiting children in arc order.

use crate::error::{NetworkError, Result};
use crate::fragment::{Fragment, FragmentIndex};
use crate::network::Network;
use crate::relationship::Relationship;
use std::collections::{BTreeSet, VecDeque};

/// One step of a tree traversal
#[derive(Debug, Clone, Copy)]
pub struct TreeNode<'a> {
    /// The fragment visited
    pub fragment: &'a Fragment,

    /// The relationship that led here; `None` for the root
    pub relationship: Option<&'a Relationship>,

    /// Distance from the root
    pub depth: usize,
}

/// Preorder iterator over a network that is a strict tree
///
/// Keeps one queue of remaining siblings per depth level. Each step takes
/// the next sibling at the deepest level, yields its target, and pushes
/// that target's ordered children as a new level.
///
/// # Examples
///
/// ```
/// use linkbase_domain::{Arc, ExtendedLink, Fragment, FragmentKind, Network, Relationship};
///
/// let link = ExtendedLink::new("l1", "L");
/// let concept = |i: &str| Fragment::new(i, FragmentKind::Concept);
/// let mut network = Network::new("L", "R").unwrap();
/// for (arc, from, to, order) in [("a1", "root", "b", "2"), ("a2", "root", "a", "1")] {
///     let arc = Arc::new(arc, "R", arc).with_order(order).unwrap();
///     let r = Relationship::new(arc, concept(from), concept(to), link.clone()).unwrap();
///     network.add_relationship(r).unwrap();
/// }
///
/// let visited: Vec<&str> = network
///     .tree()
///     .unwrap()
///     .map(|node| node.fragment.index.as_str())
///     .collect();
/// assert_eq!(visited, vec!["root", "a", "b"]);
/// ```
#[derive(Debug)]
pub struct TreeIterator<'a> {
    network: &'a Network,
    root: Option<&'a Fragment>,
    levels: Vec<VecDeque<&'a Relationship>>,
}

impl<'a> TreeIterator<'a> {
    /// Start a traversal, checking the network is a strict tree
    ///
    /// Fails with [`NetworkError::NotATree`] when there is not exactly one
    /// root, when some fragment has more than one active parent, or when some
    /// fragment of an active relationship cannot be reached from the root.
    pub fn new(network: &'a Network) -> Result<Self> {
        let not_a_tree = |reason: String| NetworkError::NotATree {
            link_role: network.link_role().to_string(),
            arc_role: network.arc_role().to_string(),
            reason,
        };

        let roots = network.root_fragment_indexes();
        if roots.len() != 1 {
            return Err(not_a_tree(format!("found {} root fragments", roots.len())));
        }

        if let Some(shared) = network
            .target_indexes()
            .find(|index| network.active_relationships_to(index).len() > 1)
        {
            return Err(not_a_tree(format!("fragment {} has more than one parent", shared)));
        }

        let root_index = roots
            .into_iter()
            .next()
            .ok_or_else(|| not_a_tree("root vanished".to_string()))?;
        let root = network
            .fragment(&root_index)
            .ok_or_else(|| not_a_tree(format!("root {} is not cached", root_index)))?;

        let connected: BTreeSet<&FragmentIndex> = network
            .active_relationships()
            .into_iter()
            .flat_map(|r| [&r.source().index, &r.target().index])
            .collect();
        let reachable = reachable_from(network, &root.index);
        if reachable.len() != connected.len() {
            return Err(not_a_tree(format!(
                "{} of {} fragments reachable from root {}",
                reachable.len(),
                connected.len(),
                root.index
            )));
        }

        Ok(Self {
            network,
            root: Some(root),
            levels: Vec::new(),
        })
    }

    fn push_children(&mut self, fragment: &Fragment) {
        let children: VecDeque<&'a Relationship> = self
            .network
            .active_relationships_from(&fragment.index)
            .into_iter()
            .collect();
        if !children.is_empty() {
            self.levels.push(children);
        }
    }
}

fn reachable_from<'a>(network: &'a Network, root: &'a FragmentIndex) -> BTreeSet<&'a FragmentIndex> {
    let mut seen = BTreeSet::from([root]);
    let mut pending = vec![root];
    while let Some(index) = pending.pop() {
        for relationship in network.active_relationships_from(index) {
            let target = &relationship.target().index;
            if seen.insert(target) {
                pending.push(target);
            }
        }
    }
    seen
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = TreeNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            self.push_children(root);
            return Some(TreeNode {
                fragment: root,
                relationship: None,
                depth: 0,
            });
        }

        loop {
            let depth = self.levels.len();
            let level = self.levels.last_mut()?;
            let Some(relationship) = level.pop_front() else {
                self.levels.pop();
                continue;
            };
            let fragment = relationship.target();
            self.push_children(fragment);
            return Some(TreeNode {
                fragment,
                relationship: Some(relationship),
                depth,
            });
        }
    }
}
