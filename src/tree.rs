//! Arena-backed content tree.
//!
//! Children are owned exclusively through the arena, parents are non-owning
//! back-pointers, and detaching a subtree never frees it: a [`NodeId`] held
//! by a command's undo state keeps naming the same node until the document
//! goes away. The tree also maintains the derived run (paragraph) partition
//! of the root's children incrementally and owns all layout invalidation.

use crate::error::EditError;
use crate::node::{LayoutSlot, MathKind, Node, NodeId, NodeKind};

/// One run of the root's children: a maximal sequence terminated by (and
/// including) a `Break`, or by the document `End` for the final run.
#[derive(Debug)]
pub struct Run {
    pub(crate) len: usize,
    pub(crate) layout: Option<LayoutSlot>,
}

impl Run {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    runs: Vec<Run>,
}

impl Tree {
    /// An empty document: one run holding only the end sentinel.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            runs: Vec::new(),
        };
        let root = tree.alloc(NodeKind::Root);
        tree.root = root;
        let end = tree.alloc(NodeKind::End);
        tree.attach(root, 0, end);
        tree.runs.push(Run {
            len: 1,
            layout: None,
        });
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self, parent: NodeId) -> usize {
        self.node(parent).children.len()
    }

    pub fn is_empty(&self, parent: NodeId) -> bool {
        self.node(parent).children.is_empty()
    }

    /// Indexed child lookup; a negative index counts from the end.
    pub fn child(&self, parent: NodeId, index: isize) -> Result<NodeId, EditError> {
        let children = &self.node(parent).children;
        let len = children.len();
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(EditError::PositionOutOfRange { index, len });
        }
        Ok(children[resolved as usize])
    }

    /// Index of a node among its parent's children; `None` for the root and
    /// for detached nodes.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id).parent?;
        self.node(parent)
            .children
            .iter()
            .position(|&child| child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let index = self.index_of(id)?;
        self.node(parent).children.get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let index = self.index_of(id)?;
        if index == 0 {
            return None;
        }
        Some(self.node(parent).children[index - 1])
    }

    /// The root child on the path from `id` up to the root; `None` for the
    /// root itself and for detached subtrees.
    pub fn root_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.node(current).parent?;
            if parent == self.root {
                return Some(current);
            }
            current = parent;
        }
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// Build a well-formed math region in one step: fixed-arity kinds get
    /// their two argument lists (each holding an end sentinel), a symbol
    /// list gets its sentinel directly.
    pub fn new_math(&mut self, kind: MathKind) -> NodeId {
        let region = self.alloc(kind.node_kind());
        match kind {
            MathKind::Script | MathKind::Fraction | MathKind::Radical => {
                for slot in 0..2 {
                    let list = self.alloc(NodeKind::List);
                    let end = self.alloc(NodeKind::End);
                    self.attach(list, 0, end);
                    self.attach(region, slot, list);
                }
            }
            MathKind::SymbolList => {
                let end = self.alloc(NodeKind::End);
                self.attach(region, 0, end);
            }
        }
        region
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Precondition check shared by all insertion paths. Rejects before any
    /// mutation happens.
    pub fn can_insert(&self, parent: NodeId, index: usize, child: NodeId) -> Result<(), EditError> {
        let parent_node = self.node(parent);
        let child_node = self.node(child);
        if child_node.parent.is_some() {
            return Err(EditError::Structural("node to insert is still attached"));
        }
        if matches!(child_node.kind, NodeKind::End) {
            return Err(EditError::Structural("end sentinels are fixed"));
        }
        if parent_node.kind.required_lists().is_some() {
            return Err(EditError::Structural(
                "argument slots of a math region are fixed",
            ));
        }
        if !parent_node.kind.allows_child(&child_node.kind) {
            return Err(EditError::Structural("child kind not allowed here"));
        }
        // A node must not end up inside its own subtree.
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(EditError::Structural("node cannot contain itself"));
            }
            ancestor = self.node(current).parent;
        }
        // The trailing end sentinel owns the last index; inserting past it
        // is out of range.
        let len = parent_node.children.len();
        if index >= len {
            return Err(EditError::PositionOutOfRange {
                index: index as isize,
                len,
            });
        }
        Ok(())
    }

    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), EditError> {
        self.can_insert(parent, index, child)?;
        self.attach(parent, index, child);
        if parent == self.root {
            self.record_root_insert(index, child);
        } else {
            self.invalidate_run_of(parent);
        }
        Ok(())
    }

    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) -> Result<(), EditError> {
        let Some(parent) = self.node(sibling).parent else {
            return Err(EditError::Structural("sibling is detached"));
        };
        let Some(index) = self.index_of(sibling) else {
            return Err(EditError::Structural("sibling is detached"));
        };
        self.insert(parent, index, child)
    }

    /// Append in front of the container's end sentinel.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), EditError> {
        let len = self.len(parent);
        if len == 0 {
            return Err(EditError::Structural("container has no end sentinel"));
        }
        self.insert(parent, len - 1, child)
    }

    /// Detach `id` (and its whole subtree) from its parent. The node stays
    /// alive in the arena and may be re-inserted later.
    pub fn remove(&mut self, id: NodeId) -> Result<(), EditError> {
        self.can_remove(id)?;
        let parent = self.node(id).parent.expect("checked by can_remove");
        let index = self.index_of(id).expect("checked by can_remove");
        let was_break = matches!(self.node(id).kind, NodeKind::Break);
        self.detach(id);
        if parent == self.root {
            self.record_root_remove(index, was_break);
        } else {
            self.invalidate_run_of(parent);
        }
        Ok(())
    }

    pub fn can_remove(&self, id: NodeId) -> Result<(), EditError> {
        let node = self.node(id);
        let Some(parent) = node.parent else {
            return Err(EditError::Structural("node is already detached"));
        };
        if matches!(node.kind, NodeKind::End) {
            return Err(EditError::Structural("end sentinels are fixed"));
        }
        if self.node(parent).kind.required_lists().is_some() {
            return Err(EditError::Structural(
                "argument slots of a math region are fixed",
            ));
        }
        Ok(())
    }

    /// Remove the children `start..end` of `parent`, returning them in
    /// document order. All preconditions are checked up front; on error the
    /// tree is untouched.
    pub fn remove_range(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Vec<NodeId>, EditError> {
        let len = self.len(parent);
        if start > end || end > len {
            return Err(EditError::PositionOutOfRange {
                index: end as isize,
                len,
            });
        }
        for &child in &self.node(parent).children[start..end] {
            self.can_remove(child)?;
        }
        let mut removed = Vec::with_capacity(end - start);
        for _ in start..end {
            let child = self.node(parent).children[start];
            removed.push(child);
            self.remove(child)?;
        }
        Ok(removed)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(self.node(child).parent.is_none());
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(index, child);
    }

    pub(crate) fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).parent else {
            return;
        };
        let Some(index) = self.index_of(child) else {
            return;
        };
        self.node_mut(parent).children.remove(index);
        self.node_mut(child).parent = None;
    }

    // ------------------------------------------------------------------
    // Run bookkeeping
    // ------------------------------------------------------------------

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn run_len(&self, run: usize) -> usize {
        self.runs[run].len
    }

    /// Child-index range of a run under the root.
    pub fn run_range(&self, run: usize) -> std::ops::Range<usize> {
        let start: usize = self.runs[..run].iter().map(|r| r.len).sum();
        start..start + self.runs[run].len
    }

    /// The run a root child index belongs to.
    pub fn run_of_child(&self, child_index: usize) -> usize {
        let mut start = 0;
        for (idx, run) in self.runs.iter().enumerate() {
            if child_index < start + run.len {
                return idx;
            }
            start += run.len;
        }
        self.runs.len().saturating_sub(1)
    }

    /// The `Break` (or final `End`) closing a run; carries the run's
    /// paragraph attributes.
    pub fn run_terminator(&self, run: usize) -> NodeId {
        let range = self.run_range(run);
        self.node(self.root).children[range.end - 1]
    }

    pub fn run_layout(&self, run: usize) -> Option<&LayoutSlot> {
        self.runs[run].layout.as_ref()
    }

    /// Written by the external layout engine; the core never interprets the
    /// slot.
    pub fn set_run_layout(&mut self, run: usize, layout: Option<LayoutSlot>) {
        self.runs[run].layout = layout;
    }

    /// Clear the cached layout of the run whose content contains `id`.
    pub(crate) fn invalidate_run_of(&mut self, id: NodeId) {
        let Some(top) = self.root_ancestor(id) else {
            return;
        };
        if let Some(index) = self.index_of(top) {
            let run = self.run_of_child(index);
            self.runs[run].layout = None;
        }
    }

    fn record_root_insert(&mut self, index: usize, child: NodeId) {
        let run = self.run_of_child(index);
        if matches!(self.node(child).kind, NodeKind::Break) {
            // The new break closes the first half; the original terminator
            // stays with the second.
            let start = self.run_range(run).start;
            let offset = index - start;
            let old_len = self.runs[run].len;
            self.runs[run].len = old_len - offset;
            self.runs[run].layout = None;
            self.runs.insert(
                run,
                Run {
                    len: offset + 1,
                    layout: None,
                },
            );
        } else {
            self.runs[run].len += 1;
            self.runs[run].layout = None;
        }
    }

    fn record_root_remove(&mut self, index: usize, was_break: bool) {
        let run = self.run_of_child(index);
        if was_break {
            // Removing a terminator merges its run with the following one.
            // A break never closes the final run, so a successor exists.
            let merged = self.runs[run].len - 1 + self.runs[run + 1].len;
            self.runs[run].len = merged;
            self.runs[run].layout = None;
            self.runs.remove(run + 1);
        } else {
            self.runs[run].len -= 1;
            self.runs[run].layout = None;
            if self.runs[run].len == 0 {
                self.runs.remove(run);
            }
        }
    }

    /// Re-derive the run partition from scratch. Used by bulk constructors;
    /// incremental bookkeeping covers everything else.
    pub(crate) fn rebuild_runs(&mut self) {
        self.runs.clear();
        let mut len = 0;
        for &child in &self.nodes[self.root.index()].children {
            len += 1;
            if matches!(self.node(child).kind, NodeKind::Break | NodeKind::End) {
                self.runs.push(Run { len, layout: None });
                len = 0;
            }
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check every structural invariant of the whole tree. Holds after every
    /// command when the crate is bug-free; tests lean on it heavily.
    pub fn validate(&self) -> Result<(), EditError> {
        self.validate_subtree(self.root)?;
        self.validate_runs()
    }

    fn validate_subtree(&self, id: NodeId) -> Result<(), EditError> {
        let node = self.node(id);
        if node.kind.is_leaf() && !node.children.is_empty() {
            return Err(EditError::Structural("leaf node with children"));
        }
        for (index, &child) in node.children.iter().enumerate() {
            let child_node = self.node(child);
            if child_node.parent != Some(id) {
                return Err(EditError::Structural("stale parent back-pointer"));
            }
            if !node.kind.allows_child(&child_node.kind) {
                return Err(EditError::Structural("child kind not allowed here"));
            }
            let is_last = index + 1 == node.children.len();
            if matches!(child_node.kind, NodeKind::End) && !is_last {
                return Err(EditError::Structural("end sentinel not in final position"));
            }
            self.validate_subtree(child)?;
        }
        if let Some(required) = node.kind.required_lists() {
            if node.children.len() != required {
                return Err(EditError::Structural("math region arity violated"));
            }
        } else if matches!(
            node.kind,
            NodeKind::Root | NodeKind::List | NodeKind::SymbolList
        ) {
            let last = node.children.last().copied();
            let has_end = last.is_some_and(|end| matches!(self.node(end).kind, NodeKind::End));
            if !has_end {
                return Err(EditError::Structural("container misses its end sentinel"));
            }
        }
        Ok(())
    }

    fn validate_runs(&self) -> Result<(), EditError> {
        let children = &self.node(self.root).children;
        let total: usize = self.runs.iter().map(|r| r.len).sum();
        if total != children.len() {
            return Err(EditError::Structural("run partition out of sync"));
        }
        let mut offset = 0;
        for (idx, run) in self.runs.iter().enumerate() {
            if run.len == 0 {
                return Err(EditError::Structural("empty run entry"));
            }
            let is_last = idx + 1 == self.runs.len();
            for (pos, &child) in children[offset..offset + run.len].iter().enumerate() {
                let terminal = pos + 1 == run.len;
                match (&self.node(child).kind, terminal, is_last) {
                    (NodeKind::Break, true, false) => {}
                    (NodeKind::End, true, true) => {}
                    (NodeKind::Break | NodeKind::End, _, _) => {
                        return Err(EditError::Structural("run terminator misplaced"));
                    }
                    _ if terminal => {
                        return Err(EditError::Structural("run without terminator"));
                    }
                    _ => {}
                }
            }
            offset += run.len;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    /// Structural and value equality, ignoring node identity and layout
    /// slots.
    pub fn structure_eq(&self, other: &Tree) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }

    fn subtree_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        let a = self.node(id);
        let b = other.node(other_id);
        if a.kind != b.kind
            || a.styles != b.styles
            || a.link_target != b.link_target
            || a.paragraph_style != b.paragraph_style
            || a.children.len() != b.children.len()
        {
            return false;
        }
        a.children
            .iter()
            .zip(&b.children)
            .all(|(&left, &right)| self.subtree_eq(left, other, right))
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;
