//! Document facade: tree + cursor + history + layout glue.

use crate::command::{Command, CommandProcessor};
use crate::commands::{
    DeleteDirection, DeleteNode, DeleteRange, InsertNode, Motion, MoveCursor, NodeSpec,
    ParagraphEdit, SetInlineStyle, SetLink, SetParagraphStyle,
};
use crate::cursor::{Cursor, next_location};
use crate::error::EditError;
use crate::layout::{LayoutEngine, NullLayout};
use crate::markup::{self, ParseError};
use crate::node::{InlineStyle, MathKind, ParagraphKind};
use crate::position::Position;
use crate::tree::Tree;

/// The state commands operate on. Owned by [`Document`]; handed to commands
/// as one mutable unit so tree and cursor always change together.
pub struct Editor {
    pub tree: Tree,
    pub cursor: Cursor,
    pub(crate) modified: bool,
}

impl Editor {
    pub(crate) fn new(tree: Tree) -> Self {
        let at = next_location(&tree, tree.root())
            .expect("a validated tree always has an end sentinel");
        Self {
            tree,
            cursor: Cursor::new(at),
            modified: false,
        }
    }
}

pub struct Document {
    editor: Editor,
    processor: CommandProcessor,
    layout: Box<dyn LayoutEngine>,
}

impl Document {
    /// An empty document: a single run holding only the end sentinel.
    pub fn new() -> Self {
        Self::with_layout(Box::new(NullLayout))
    }

    pub fn with_layout(layout: Box<dyn LayoutEngine>) -> Self {
        Self {
            editor: Editor::new(Tree::new()),
            processor: CommandProcessor::new(),
            layout,
        }
    }

    pub fn from_plain_text(text: &str) -> Self {
        let mut document = Self::new();
        document.editor = Editor::new(markup::tree_from_plain_text(text));
        document
    }

    pub fn from_markup(input: &str) -> Result<Self, ParseError> {
        let tree = markup::parse(input)?;
        let mut document = Self::new();
        document.editor = Editor::new(tree);
        Ok(document)
    }

    pub fn to_markup(&self) -> String {
        markup::serialize(&self.editor.tree)
    }

    pub fn tree(&self) -> &Tree {
        &self.editor.tree
    }

    pub fn cursor(&self) -> Cursor {
        self.editor.cursor
    }

    pub fn is_modified(&self) -> bool {
        self.editor.modified
    }

    pub fn mark_saved(&mut self) {
        self.editor.modified = false;
    }

    pub fn validate(&self) -> Result<(), EditError> {
        self.editor.tree.validate()
    }

    // ------------------------------------------------------------------
    // Instruction surface
    // ------------------------------------------------------------------

    pub fn insert_char(&mut self, ch: char) -> Result<(), EditError> {
        self.insert(NodeSpec::Char(ch))
    }

    pub fn insert_symbol(&mut self, name: &str) -> Result<(), EditError> {
        self.insert(NodeSpec::Symbol(name.to_string()))
    }

    pub fn insert_break(&mut self) -> Result<(), EditError> {
        self.insert(NodeSpec::Break)
    }

    pub fn insert_placeholder(&mut self) -> Result<(), EditError> {
        self.insert(NodeSpec::Placeholder)
    }

    pub fn insert_media(&mut self, handle: u32) -> Result<(), EditError> {
        self.insert(NodeSpec::Media(handle))
    }

    pub fn insert_math(&mut self, kind: MathKind) -> Result<(), EditError> {
        self.insert(NodeSpec::Math(kind))
    }

    /// Typing over a selection replaces it: delete and insert compose into
    /// one atomic chain undone as a unit.
    fn insert(&mut self, spec: NodeSpec) -> Result<(), EditError> {
        if !self.editor.cursor.has_selection() {
            return self.submit(Box::new(InsertNode::new(spec)));
        }
        let wrap = !self.processor.is_chain_open();
        if wrap {
            self.processor.begin_chain();
        }
        self.submit(Box::new(DeleteRange::new()))?;
        self.submit(Box::new(InsertNode::new(spec)))?;
        if wrap {
            self.end_chain()?;
        }
        Ok(())
    }

    pub fn delete_backward(&mut self) -> Result<(), EditError> {
        if self.editor.cursor.has_selection() {
            return self.delete_selection();
        }
        self.submit(Box::new(DeleteNode::new(DeleteDirection::Backward)))
    }

    pub fn delete_forward(&mut self) -> Result<(), EditError> {
        if self.editor.cursor.has_selection() {
            return self.delete_selection();
        }
        self.submit(Box::new(DeleteNode::new(DeleteDirection::Forward)))
    }

    pub fn delete_selection(&mut self) -> Result<(), EditError> {
        self.submit(Box::new(DeleteRange::new()))
    }

    pub fn set_inline_style(&mut self, style: InlineStyle, enable: bool) -> Result<(), EditError> {
        self.submit(Box::new(SetInlineStyle::new(style, enable)))
    }

    pub fn set_link(&mut self, target: Option<String>) -> Result<(), EditError> {
        self.submit(Box::new(SetLink::new(target)))
    }

    pub fn set_paragraph_kind(&mut self, kind: ParagraphKind) -> Result<(), EditError> {
        self.submit(Box::new(SetParagraphStyle::new(ParagraphEdit::SetKind(kind))))
    }

    pub fn indent(&mut self) -> Result<(), EditError> {
        self.submit(Box::new(SetParagraphStyle::new(ParagraphEdit::Indent(1))))
    }

    pub fn unindent(&mut self) -> Result<(), EditError> {
        self.submit(Box::new(SetParagraphStyle::new(ParagraphEdit::Indent(-1))))
    }

    pub fn cursor_next(&mut self, extend: bool) -> Result<(), EditError> {
        self.submit(Box::new(MoveCursor::new(Motion::Next, extend)))
    }

    pub fn cursor_prev(&mut self, extend: bool) -> Result<(), EditError> {
        self.submit(Box::new(MoveCursor::new(Motion::Prev, extend)))
    }

    pub fn cursor_next_no_descent(&mut self, extend: bool) -> Result<(), EditError> {
        self.submit(Box::new(MoveCursor::new(Motion::NextNoDescent, extend)))
    }

    pub fn cursor_prev_no_descent(&mut self, extend: bool) -> Result<(), EditError> {
        self.submit(Box::new(MoveCursor::new(Motion::PrevNoDescent, extend)))
    }

    pub fn cursor_to(&mut self, position: Position, extend: bool) -> Result<(), EditError> {
        self.submit(Box::new(MoveCursor::new(Motion::To(position), extend)))
    }

    pub fn set_cursor(&mut self, insert: Position, selection: Position) -> Result<(), EditError> {
        self.submit(Box::new(MoveCursor::new(
            Motion::Set { insert, selection },
            false,
        )))
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.processor.undo(&mut self.editor, self.layout.as_mut())
    }

    pub fn redo(&mut self) -> bool {
        self.processor.redo(&mut self.editor, self.layout.as_mut())
    }

    pub fn can_undo(&self) -> bool {
        self.processor.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.processor.can_redo()
    }

    /// Compose every command submitted until `end_chain` into one atomic,
    /// jointly undone edit.
    pub fn begin_chain(&mut self) {
        self.processor.begin_chain();
    }

    pub fn end_chain(&mut self) -> Result<(), EditError> {
        self.processor
            .end_chain(&mut self.editor, self.layout.as_mut())
    }

    pub fn submit(&mut self, command: Box<dyn Command>) -> Result<(), EditError> {
        self.processor
            .add_command(&mut self.editor, self.layout.as_mut(), command)
    }

    #[cfg(test)]
    pub(crate) fn processor(&self) -> &CommandProcessor {
        &self.processor
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod document_tests;
