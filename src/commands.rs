//! The concrete edit commands behind the instruction surface.
//!
//! Every command captures, on its first `run`, the node identities and
//! prior attribute values its inversion needs. Redo re-splices the very
//! same nodes; nothing is reconstructed by value.

use log::warn;

use crate::command::Command;
use crate::cursor::{
    Cursor, next_location, next_no_descent, prev_location, prev_no_descent,
};
use crate::document::Editor;
use crate::error::EditError;
use crate::node::{InlineStyle, MathKind, NodeId, NodeKind, ParagraphKind, ParagraphStyle};
use crate::position::Position;
use crate::tree::Tree;

/// What an [`InsertNode`] command creates.
#[derive(Clone, Debug)]
pub enum NodeSpec {
    Char(char),
    Symbol(String),
    Break,
    Placeholder,
    Media(u32),
    Math(MathKind),
}

impl NodeSpec {
    fn build(&self, tree: &mut Tree) -> NodeId {
        match self {
            NodeSpec::Char(ch) => tree.alloc(NodeKind::Char(*ch)),
            NodeSpec::Symbol(name) => tree.alloc(NodeKind::Symbol(name.clone())),
            NodeSpec::Break => tree.alloc(NodeKind::Break),
            NodeSpec::Placeholder => tree.alloc(NodeKind::Placeholder),
            NodeSpec::Media(handle) => tree.alloc(NodeKind::Media(*handle)),
            NodeSpec::Math(kind) => tree.new_math(*kind),
        }
    }
}

// ----------------------------------------------------------------------
// InsertNode
// ----------------------------------------------------------------------

/// Insert a new node in front of the cursor. Math regions come up fully
/// formed and the cursor moves into their first argument slot.
pub struct InsertNode {
    spec: NodeSpec,
    state: Option<InsertNodeState>,
}

struct InsertNodeState {
    parent: NodeId,
    index: usize,
    node: NodeId,
    cursor_before: Cursor,
    cursor_after: Cursor,
}

impl InsertNode {
    pub fn new(spec: NodeSpec) -> Self {
        Self { spec, state: None }
    }
}

impl Command for InsertNode {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            editor.tree.insert(state.parent, state.index, state.node)?;
            editor.cursor = state.cursor_after;
            return Ok(());
        }

        let cursor_before = editor.cursor;
        let anchor = editor.cursor.insert();
        let parent = editor
            .tree
            .node(anchor)
            .parent()
            .ok_or(EditError::Structural("cursor is detached"))?;
        let index = editor
            .tree
            .index_of(anchor)
            .ok_or(EditError::Structural("cursor is detached"))?;

        let node = self.spec.build(&mut editor.tree);
        editor.tree.insert(parent, index, node)?;

        if matches!(self.spec, NodeSpec::Break) {
            // The new break closes the first half of the split run; it takes
            // over the paragraph attributes of the run it split, which keep
            // living on the old terminator for the second half.
            let run = editor.tree.run_of_child(index);
            let old_terminator = editor.tree.run_terminator(run + 1);
            let style = editor.tree.node(old_terminator).paragraph_style;
            editor.tree.node_mut(node).paragraph_style = style;
        }

        if matches!(self.spec, NodeSpec::Math(_)) {
            if let Some(inside) = next_location(&editor.tree, node) {
                editor.cursor.move_insert_to(inside);
            }
        }

        self.state = Some(InsertNodeState {
            parent,
            index,
            node,
            cursor_before,
            cursor_after: editor.cursor,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("insert undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        if let Err(err) = editor.tree.remove(state.node) {
            warn!("insert undo failed: {err}");
            return;
        }
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        true
    }
}

// ----------------------------------------------------------------------
// DeleteNode
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteDirection {
    Backward,
    Forward,
}

/// Delete the node next to the cursor. Hitting a boundary (document start,
/// start of a math slot, an end sentinel) absorbs the keystroke: nothing
/// changes, the command is still recorded and coalesces with its burst.
pub struct DeleteNode {
    direction: DeleteDirection,
    state: Option<DeleteNodeState>,
}

struct DeleteNodeState {
    parent: NodeId,
    index: usize,
    node: NodeId,
    removed: bool,
    cursor_before: Cursor,
    cursor_after: Cursor,
}

impl DeleteNode {
    pub fn new(direction: DeleteDirection) -> Self {
        Self {
            direction,
            state: None,
        }
    }
}

impl Command for DeleteNode {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            if state.removed {
                editor.tree.remove(state.node)?;
                editor.cursor = state.cursor_after;
            }
            return Ok(());
        }

        let cursor_before = editor.cursor;
        let anchor = editor.cursor.insert();
        let target = match self.direction {
            DeleteDirection::Forward => {
                if matches!(editor.tree.node(anchor).kind, NodeKind::End) {
                    None
                } else {
                    Some(anchor)
                }
            }
            DeleteDirection::Backward => editor.tree.prev_sibling(anchor),
        };
        let target = target.filter(|&t| editor.tree.can_remove(t).is_ok());
        let Some(target) = target else {
            self.state = Some(DeleteNodeState {
                parent: anchor,
                index: 0,
                node: anchor,
                removed: false,
                cursor_before,
                cursor_after: cursor_before,
            });
            return Ok(());
        };

        let parent = editor
            .tree
            .node(target)
            .parent()
            .ok_or(EditError::Structural("delete target is detached"))?;
        let index = editor
            .tree
            .index_of(target)
            .ok_or(EditError::Structural("delete target is detached"))?;
        let cursor_after = match self.direction {
            // The node after the target takes its place; an end sentinel
            // guarantees there is one.
            DeleteDirection::Forward => {
                let next = editor
                    .tree
                    .next_sibling(target)
                    .ok_or(EditError::Structural("no node behind delete target"))?;
                Cursor::new(next)
            }
            DeleteDirection::Backward => Cursor::new(anchor),
        };
        editor.tree.remove(target)?;
        editor.cursor = cursor_after;

        self.state = Some(DeleteNodeState {
            parent,
            index,
            node: target,
            removed: true,
            cursor_before,
            cursor_after,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("delete undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        if state.removed {
            if let Err(err) = editor.tree.insert(state.parent, state.index, state.node) {
                warn!("delete undo failed: {err}");
                return;
            }
        }
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        self.state.as_ref().is_none_or(|state| state.removed)
    }
}

// ----------------------------------------------------------------------
// DeleteRange
// ----------------------------------------------------------------------

/// Delete the selected range `[first, last)` and collapse the cursor onto
/// the old upper bound.
pub struct DeleteRange {
    state: Option<DeleteRangeState>,
}

struct DeleteRangeState {
    parent: NodeId,
    start: usize,
    nodes: Vec<NodeId>,
    removed: bool,
    cursor_before: Cursor,
    cursor_after: Cursor,
}

impl DeleteRange {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for DeleteRange {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for DeleteRange {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            if state.removed {
                let end = state.start + state.nodes.len();
                editor.tree.remove_range(state.parent, state.start, end)?;
                editor.cursor = state.cursor_after;
            }
            return Ok(());
        }

        let cursor_before = editor.cursor;
        if !editor.cursor.has_selection() {
            self.state = Some(DeleteRangeState {
                parent: editor.tree.root(),
                start: 0,
                nodes: Vec::new(),
                removed: false,
                cursor_before,
                cursor_after: cursor_before,
            });
            return Ok(());
        }

        // Range commands assume sibling endpoints; re-establish and bail on
        // the (unreachable) failure rather than cutting a garbled range.
        if let Err(err) = editor.cursor.restore_selection_invariant(&editor.tree) {
            editor.cursor = cursor_before;
            return Err(err);
        }
        let first = editor.cursor.first(&editor.tree);
        let last = editor.cursor.last(&editor.tree);
        let parent = editor
            .tree
            .node(first)
            .parent()
            .ok_or(EditError::Structural("selection endpoint is detached"))?;
        let start = editor
            .tree
            .index_of(first)
            .ok_or(EditError::Structural("selection endpoint is detached"))?;
        let end = editor
            .tree
            .index_of(last)
            .ok_or(EditError::Structural("selection endpoint is detached"))?;
        if start >= end {
            editor.cursor = cursor_before;
            self.state = Some(DeleteRangeState {
                parent,
                start,
                nodes: Vec::new(),
                removed: false,
                cursor_before,
                cursor_after: cursor_before,
            });
            return Ok(());
        }

        let nodes = match editor.tree.remove_range(parent, start, end) {
            Ok(nodes) => nodes,
            Err(err) => {
                editor.cursor = cursor_before;
                return Err(err);
            }
        };
        let cursor_after = Cursor::new(last);
        editor.cursor = cursor_after;

        self.state = Some(DeleteRangeState {
            parent,
            start,
            nodes,
            removed: true,
            cursor_before,
            cursor_after,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("range delete undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        if state.removed {
            for (offset, &node) in state.nodes.iter().enumerate() {
                if let Err(err) = editor.tree.insert(state.parent, state.start + offset, node) {
                    warn!("range delete undo failed: {err}");
                    return;
                }
            }
        }
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        self.state.as_ref().is_none_or(|state| state.removed)
    }
}

// ----------------------------------------------------------------------
// Inline attributes over the selection
// ----------------------------------------------------------------------

/// Add or remove one presentation tag on every character/symbol leaf inside
/// the selected range, nested math content included.
pub struct SetInlineStyle {
    style: InlineStyle,
    enable: bool,
    state: Option<InlineAttrState<Vec<InlineStyle>>>,
}

/// Set (or clear, with `None`) the link target on every character/symbol
/// leaf inside the selected range.
pub struct SetLink {
    target: Option<String>,
    state: Option<InlineAttrState<Option<String>>>,
}

struct InlineAttrState<T> {
    changed: Vec<(NodeId, T)>,
    cursor_before: Cursor,
    cursor_after: Cursor,
}

impl SetInlineStyle {
    pub fn new(style: InlineStyle, enable: bool) -> Self {
        Self {
            style,
            enable,
            state: None,
        }
    }

    fn apply(&self, editor: &mut Editor, nodes: &[NodeId]) {
        for &id in nodes {
            let node = editor.tree.node_mut(id);
            if self.enable {
                node.add_style(self.style);
            } else {
                node.remove_style(self.style);
            }
            editor.tree.invalidate_run_of(id);
        }
    }
}

impl Command for SetInlineStyle {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            let nodes: Vec<NodeId> = state.changed.iter().map(|(id, _)| *id).collect();
            let cursor_after = state.cursor_after;
            self.apply(editor, &nodes);
            editor.cursor = cursor_after;
            return Ok(());
        }

        let cursor_before = editor.cursor;
        let Some(targets) = selected_inline_targets(editor, cursor_before)? else {
            self.state = Some(InlineAttrState {
                changed: Vec::new(),
                cursor_before,
                cursor_after: cursor_before,
            });
            return Ok(());
        };
        let changed: Vec<(NodeId, Vec<InlineStyle>)> = targets
            .into_iter()
            .filter(|&id| editor.tree.node(id).has_style(self.style) != self.enable)
            .map(|id| (id, editor.tree.node(id).styles.clone()))
            .collect();
        let nodes: Vec<NodeId> = changed.iter().map(|(id, _)| *id).collect();
        self.apply(editor, &nodes);
        self.state = Some(InlineAttrState {
            changed,
            cursor_before,
            cursor_after: editor.cursor,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("style undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        for (id, styles) in &state.changed {
            editor.tree.node_mut(*id).styles = styles.clone();
            editor.tree.invalidate_run_of(*id);
        }
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        self.state
            .as_ref()
            .is_none_or(|state| !state.changed.is_empty())
    }
}

impl SetLink {
    pub fn new(target: Option<String>) -> Self {
        Self {
            target,
            state: None,
        }
    }
}

impl Command for SetLink {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            for (id, _) in &state.changed {
                editor.tree.node_mut(*id).link_target = self.target.clone();
                editor.tree.invalidate_run_of(*id);
            }
            editor.cursor = state.cursor_after;
            return Ok(());
        }

        let cursor_before = editor.cursor;
        let Some(targets) = selected_inline_targets(editor, cursor_before)? else {
            self.state = Some(InlineAttrState {
                changed: Vec::new(),
                cursor_before,
                cursor_after: cursor_before,
            });
            return Ok(());
        };
        let changed: Vec<(NodeId, Option<String>)> = targets
            .into_iter()
            .filter(|&id| editor.tree.node(id).link_target != self.target)
            .map(|id| (id, editor.tree.node(id).link_target.clone()))
            .collect();
        for (id, _) in &changed {
            editor.tree.node_mut(*id).link_target = self.target.clone();
            editor.tree.invalidate_run_of(*id);
        }
        self.state = Some(InlineAttrState {
            changed,
            cursor_before,
            cursor_after: editor.cursor,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("link undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        for (id, target) in &state.changed {
            editor.tree.node_mut(*id).link_target = target.clone();
            editor.tree.invalidate_run_of(*id);
        }
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        self.state
            .as_ref()
            .is_none_or(|state| !state.changed.is_empty())
    }
}

/// The character/symbol leaves covered by the selection, or `None` without
/// a selection. Restores the selection invariant first; fatal failures
/// propagate with the cursor rolled back.
fn selected_inline_targets(
    editor: &mut Editor,
    cursor_before: Cursor,
) -> Result<Option<Vec<NodeId>>, EditError> {
    if !editor.cursor.has_selection() {
        return Ok(None);
    }
    if let Err(err) = editor.cursor.restore_selection_invariant(&editor.tree) {
        editor.cursor = cursor_before;
        return Err(err);
    }
    let first = editor.cursor.first(&editor.tree);
    let last = editor.cursor.last(&editor.tree);
    let parent = editor
        .tree
        .node(first)
        .parent()
        .ok_or(EditError::Structural("selection endpoint is detached"))?;
    let start = editor
        .tree
        .index_of(first)
        .ok_or(EditError::Structural("selection endpoint is detached"))?;
    let end = editor
        .tree
        .index_of(last)
        .ok_or(EditError::Structural("selection endpoint is detached"))?;
    let mut targets = Vec::new();
    for offset in start..end {
        let child = editor.tree.child(parent, offset as isize)?;
        collect_inline_targets(&editor.tree, child, &mut targets);
    }
    Ok(Some(targets))
}

fn collect_inline_targets(tree: &Tree, id: NodeId, targets: &mut Vec<NodeId>) {
    match &tree.node(id).kind {
        NodeKind::Char(_) | NodeKind::Symbol(_) => targets.push(id),
        _ => {}
    }
    for &child in tree.node(id).children() {
        collect_inline_targets(tree, child, targets);
    }
}

// ----------------------------------------------------------------------
// Paragraph attributes
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub enum ParagraphEdit {
    SetKind(ParagraphKind),
    Indent(i8),
}

const MAX_INDENT: u8 = 8;

/// Rewrite the paragraph attributes of every run the selection touches
/// (just the cursor's run without a selection). Attributes live on the run
/// terminators.
pub struct SetParagraphStyle {
    edit: ParagraphEdit,
    state: Option<ParagraphAttrState>,
}

struct ParagraphAttrState {
    changed: Vec<(NodeId, Option<ParagraphStyle>)>,
    cursor_before: Cursor,
}

impl SetParagraphStyle {
    pub fn new(edit: ParagraphEdit) -> Self {
        Self { edit, state: None }
    }

    fn rewrite(&self, old: Option<ParagraphStyle>) -> ParagraphStyle {
        let mut style = old.unwrap_or_default();
        match self.edit {
            ParagraphEdit::SetKind(kind) => style.kind = kind,
            ParagraphEdit::Indent(delta) => {
                style.indent = style
                    .indent
                    .saturating_add_signed(delta)
                    .min(MAX_INDENT);
            }
        }
        style
    }
}

impl Command for SetParagraphStyle {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            for (id, old) in &state.changed {
                let style = self.rewrite(*old);
                editor.tree.node_mut(*id).paragraph_style = Some(style);
                editor.tree.invalidate_run_of(*id);
            }
            return Ok(());
        }

        let cursor_before = editor.cursor;
        if editor.cursor.has_selection() {
            if let Err(err) = editor.cursor.restore_selection_invariant(&editor.tree) {
                editor.cursor = cursor_before;
                return Err(err);
            }
        }
        let (run_first, run_last) = selected_runs(editor)?;
        let mut changed = Vec::new();
        for run in run_first..=run_last {
            let terminator = editor.tree.run_terminator(run);
            let old = editor.tree.node(terminator).paragraph_style;
            let new = self.rewrite(old);
            if old != Some(new) {
                changed.push((terminator, old));
                editor.tree.node_mut(terminator).paragraph_style = Some(new);
                editor.tree.invalidate_run_of(terminator);
            }
        }
        self.state = Some(ParagraphAttrState {
            changed,
            cursor_before,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("paragraph style undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        for (id, old) in &state.changed {
            editor.tree.node_mut(*id).paragraph_style = *old;
            editor.tree.invalidate_run_of(*id);
        }
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        self.state
            .as_ref()
            .is_none_or(|state| !state.changed.is_empty())
    }
}

/// Inclusive run interval the cursor/selection covers.
fn selected_runs(editor: &Editor) -> Result<(usize, usize), EditError> {
    let tree = &editor.tree;
    let run_of = |id: NodeId| -> Result<usize, EditError> {
        let top = if tree.node(id).parent() == Some(tree.root()) {
            id
        } else {
            tree.root_ancestor(id)
                .ok_or(EditError::Structural("cursor is detached"))?
        };
        let index = tree
            .index_of(top)
            .ok_or(EditError::Structural("cursor is detached"))?;
        Ok(tree.run_of_child(index))
    };
    if !editor.cursor.has_selection() {
        let run = run_of(editor.cursor.insert())?;
        return Ok((run, run));
    }
    let first = run_of(editor.cursor.first(tree))?;
    let last_node = editor.cursor.last(tree);
    // The upper bound is exclusive; a selection ending right at a run's
    // first node does not touch that run.
    let last_index = tree.index_of(last_node);
    let last = match last_index {
        Some(index) if tree.node(last_node).parent() == Some(tree.root()) && index > 0 => {
            tree.run_of_child(index - 1)
        }
        _ => run_of(last_node)?,
    };
    Ok((first.min(last), first.max(last)))
}

// ----------------------------------------------------------------------
// MoveCursor
// ----------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum Motion {
    /// Depth-first, entering math regions.
    Next,
    Prev,
    /// Sibling level only; steps out of or across regions.
    NextNoDescent,
    PrevNoDescent,
    /// Absolute move of the insert point.
    To(Position),
    /// Absolute move of both endpoints.
    Set {
        insert: Position,
        selection: Position,
    },
}

/// Cursor motion as a command: recorded (so undo restores the cursor
/// exactly) but never an undo boundary by itself.
pub struct MoveCursor {
    motion: Motion,
    extend: bool,
    state: Option<MoveCursorState>,
}

struct MoveCursorState {
    cursor_before: Cursor,
    cursor_after: Cursor,
}

impl MoveCursor {
    pub fn new(motion: Motion, extend: bool) -> Self {
        Self {
            motion,
            extend,
            state: None,
        }
    }
}

impl Command for MoveCursor {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        if let Some(state) = &self.state {
            editor.cursor = state.cursor_after;
            return Ok(());
        }

        let cursor_before = editor.cursor;
        let anchor = editor.cursor.insert();
        let target = match &self.motion {
            Motion::Next => next_location(&editor.tree, anchor),
            Motion::Prev => prev_location(&editor.tree, anchor),
            Motion::NextNoDescent => next_no_descent(&editor.tree, anchor),
            Motion::PrevNoDescent => prev_no_descent(&editor.tree, anchor),
            Motion::To(position) => {
                let id = position.resolve(&editor.tree)?;
                if !editor.tree.node(id).kind.can_hold_cursor() {
                    return Err(EditError::Structural("node cannot hold a cursor"));
                }
                Some(id)
            }
            Motion::Set { insert, selection } => {
                editor.cursor.set_state(&editor.tree, insert, selection)?;
                self.state = Some(MoveCursorState {
                    cursor_before,
                    cursor_after: editor.cursor,
                });
                return Ok(());
            }
        };
        let Some(target) = target else {
            // Motion against a boundary: absorbed, cursor unchanged.
            self.state = Some(MoveCursorState {
                cursor_before,
                cursor_after: cursor_before,
            });
            return Ok(());
        };

        if self.extend {
            editor.cursor.move_insert_preserving_selection(target);
            if let Err(err) = editor.cursor.restore_selection_invariant(&editor.tree) {
                editor.cursor = cursor_before;
                return Err(err);
            }
        } else {
            editor.cursor.move_insert_to(target);
        }
        self.state = Some(MoveCursorState {
            cursor_before,
            cursor_after: editor.cursor,
        });
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor) {
        let Some(state) = &self.state else {
            debug_assert!(false, "undo before run");
            warn!("cursor move undo ignored: {}", EditError::InvalidCommandState);
            return;
        };
        editor.cursor = state.cursor_before;
    }

    fn is_undo_checkpoint(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
