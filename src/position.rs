//! Path-based locations and their total order.

use std::cmp::Ordering;

use crate::error::EditError;
use crate::node::NodeId;
use crate::tree::Tree;

/// A root-to-node path of sibling indices. The empty path names the root
/// itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Position {
    indices: Vec<usize>,
}

impl Position {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Walk the parent back-pointers of `id` up to the root, collecting the
    /// sibling index at every level.
    pub fn of(tree: &Tree, id: NodeId) -> Self {
        let mut indices = Vec::new();
        let mut current = id;
        while let Some(index) = tree.index_of(current) {
            indices.push(index);
            current = tree.node(current).parent.expect("index_of implies parent");
        }
        debug_assert!(current == tree.root(), "position of a detached node");
        indices.reverse();
        Self { indices }
    }

    /// Resolve the path by repeated indexed-child lookup. Out-of-range
    /// segments fail fast; stored paths never use negative indices.
    pub fn resolve(&self, tree: &Tree) -> Result<NodeId, EditError> {
        let mut current = tree.root();
        for &index in &self.indices {
            current = tree.child(current, index as isize)?;
        }
        Ok(current)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    pub fn is_ancestor_of(&self, other: &Position) -> bool {
        self.indices.len() < other.indices.len()
            && other.indices[..self.indices.len()] == self.indices[..]
    }

    pub fn parent(&self) -> Option<Position> {
        if self.indices.is_empty() {
            return None;
        }
        Some(Position {
            indices: self.indices[..self.indices.len() - 1].to_vec(),
        })
    }
}

impl Ord for Position {
    /// Lexicographic over path segments. When one path is a strict prefix
    /// of the other, the ancestor orders first: positions follow pre-order,
    /// the same order depth-first navigation visits nodes in.
    fn cmp(&self, other: &Self) -> Ordering {
        for (left, right) in self.indices.iter().zip(&other.indices) {
            match left.cmp(right) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        self.indices.len().cmp(&other.indices.len())
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[path = "position_tests.rs"]
mod position_tests;
