//! Cursor and selection over tree locations.
//!
//! The cursor names the node the insertion point sits in front of; the
//! trailing end sentinel of every container keeps the "after the last
//! child" position addressable. A selection is the half-open range between
//! the two endpoints in position order.

use crate::error::EditError;
use crate::node::NodeId;
use crate::position::Position;
use crate::tree::Tree;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    insert: NodeId,
    selection: NodeId,
}

impl Cursor {
    pub fn new(at: NodeId) -> Self {
        Self {
            insert: at,
            selection: at,
        }
    }

    pub fn insert(&self) -> NodeId {
        self.insert
    }

    pub fn selection(&self) -> NodeId {
        self.selection
    }

    pub fn has_selection(&self) -> bool {
        self.insert != self.selection
    }

    /// The lower-ordered endpoint.
    pub fn first(&self, tree: &Tree) -> NodeId {
        if Position::of(tree, self.insert) <= Position::of(tree, self.selection) {
            self.insert
        } else {
            self.selection
        }
    }

    /// The higher-ordered endpoint.
    pub fn last(&self, tree: &Tree) -> NodeId {
        if Position::of(tree, self.insert) <= Position::of(tree, self.selection) {
            self.selection
        } else {
            self.insert
        }
    }

    /// Collapses any selection.
    pub fn move_insert_to(&mut self, id: NodeId) {
        self.insert = id;
        self.selection = id;
    }

    /// Moves only the insert end, keeping (or starting) a selection.
    pub fn move_insert_preserving_selection(&mut self, id: NodeId) {
        self.insert = id;
    }

    /// Absolute positioning from two resolved paths.
    pub fn set_state(
        &mut self,
        tree: &Tree,
        pos_insert: &Position,
        pos_selection: &Position,
    ) -> Result<(), EditError> {
        let insert = pos_insert.resolve(tree)?;
        let selection = pos_selection.resolve(tree)?;
        if !tree.node(insert).kind.can_hold_cursor()
            || !tree.node(selection).kind.can_hold_cursor()
        {
            return Err(EditError::Structural("node cannot hold a cursor"));
        }
        self.insert = insert;
        self.selection = selection;
        Ok(())
    }

    /// Re-establish the same-parent invariant after structural edits.
    ///
    /// Both endpoints are pulled up to direct children of their smallest
    /// common ancestor; the higher-ordered endpoint, when it had to be
    /// widened, steps one sibling further so the widened range still covers
    /// everything the narrower one covered. Idempotent.
    pub fn restore_selection_invariant(&mut self, tree: &Tree) -> Result<(), EditError> {
        if !self.has_selection() {
            return Ok(());
        }
        let insert_parent = tree.node(self.insert).parent();
        let selection_parent = tree.node(self.selection).parent();
        if insert_parent.is_some() && insert_parent == selection_parent {
            return Ok(());
        }

        let insert_chain = ancestor_chain(tree, self.insert);
        let selection_chain = ancestor_chain(tree, self.selection);
        let mut depth = 0;
        while depth < insert_chain.len()
            && depth < selection_chain.len()
            && insert_chain[depth] == selection_chain[depth]
        {
            depth += 1;
        }
        // The chains agree on indices 0..depth; the node at depth - 1 is the
        // smallest common ancestor. A single root guarantees depth >= 1.
        if depth == 0 {
            return Err(EditError::SelectionInvariant);
        }
        // When one endpoint is an ancestor of the other, the common node is
        // that endpoint itself; normalize against its parent instead.
        let sca = insert_chain[depth - 1];
        if sca == self.insert || sca == self.selection {
            depth -= 1;
            if depth == 0 {
                return Err(EditError::SelectionInvariant);
            }
        }

        let up_insert = insert_chain[depth];
        let up_selection = selection_chain[depth];

        // The higher-ordered endpoint steps one sibling past its widened
        // ancestor; an endpoint that already was a direct child of the
        // ancestor is kept as-is. Ordering the original endpoints (ancestors
        // first) also covers the case where one endpoint contains the other
        // and both chains meet in the same child.
        let widen = |endpoint: NodeId, up: NodeId, higher: bool| -> Result<NodeId, EditError> {
            if !higher || endpoint == up {
                return Ok(up);
            }
            tree.next_sibling(up).ok_or(EditError::SelectionInvariant)
        };
        let insert_higher = Position::of(tree, self.insert) > Position::of(tree, self.selection);
        self.insert = widen(self.insert, up_insert, insert_higher)?;
        self.selection = widen(self.selection, up_selection, !insert_higher)?;
        Ok(())
    }
}

/// Root-first chain of ancestors, the node itself included. An ancestor
/// chain ending anywhere but the root means the node is detached.
fn ancestor_chain(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(parent) = tree.node(current).parent() {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    chain
}

// ----------------------------------------------------------------------
// Navigation primitives
// ----------------------------------------------------------------------

/// Depth-first successor among cursor-capable nodes (enters children).
pub fn next_location(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        current = pre_next(tree, current)?;
        if tree.node(current).kind.can_hold_cursor() {
            return Some(current);
        }
    }
}

/// Depth-first predecessor among cursor-capable nodes.
pub fn prev_location(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        current = pre_prev(tree, current)?;
        if tree.node(current).kind.can_hold_cursor() {
            return Some(current);
        }
    }
}

/// Sibling-level successor; steps out of (and across) nested math regions
/// without entering them, skipping nodes that cannot hold a cursor.
pub fn next_no_descent(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        match tree.next_sibling(current) {
            Some(sibling) if tree.node(sibling).kind.can_hold_cursor() => return Some(sibling),
            Some(sibling) => current = sibling,
            None => current = tree.node(current).parent()?,
        }
    }
}

/// Sibling-level predecessor. Stepping out of a region backward lands in
/// front of the region itself.
pub fn prev_no_descent(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        match tree.prev_sibling(current) {
            Some(sibling) if tree.node(sibling).kind.can_hold_cursor() => return Some(sibling),
            Some(sibling) => current = sibling,
            None => {
                let parent = tree.node(current).parent()?;
                if tree.node(parent).kind.can_hold_cursor() {
                    return Some(parent);
                }
                current = parent;
            }
        }
    }
}

/// Pre-order successor over the raw tree.
fn pre_next(tree: &Tree, id: NodeId) -> Option<NodeId> {
    if let Some(&first) = tree.node(id).children().first() {
        return Some(first);
    }
    let mut current = id;
    loop {
        if let Some(sibling) = tree.next_sibling(current) {
            return Some(sibling);
        }
        current = tree.node(current).parent()?;
    }
}

/// Pre-order predecessor over the raw tree.
fn pre_prev(tree: &Tree, id: NodeId) -> Option<NodeId> {
    match tree.prev_sibling(id) {
        Some(sibling) => Some(deepest_last(tree, sibling)),
        None => tree.node(id).parent(),
    }
}

fn deepest_last(tree: &Tree, id: NodeId) -> NodeId {
    let mut current = id;
    while let Some(&last) = tree.node(current).children().last() {
        current = last;
    }
    current
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod cursor_tests;
