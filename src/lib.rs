//! Editing core for tree-structured rich-text documents.
//!
//! Content is a tree, not a flat buffer: plain characters, line breaks and
//! media placeholders mix with nested math regions (scripts, fractions,
//! roots, symbol lists). The crate owns the three subsystems that make
//! editing such a tree safe and reversible:
//!
//! * the content [`Tree`] with its per-kind child contracts and the derived
//!   run (paragraph) partition,
//! * the [`Position`]/[`Cursor`] model over tree locations, including the
//!   same-parent selection invariant,
//! * the [`Command`] engine with a linear undo/redo history that inverts
//!   arbitrary tree surgery by node identity, cursor included.
//!
//! Layout, rendering and UI stay outside; they plug in through the
//! [`LayoutEngine`] seam and the markup serialization in [`markup`].

pub mod command;
pub mod commands;
pub mod cursor;
pub mod document;
pub mod error;
pub mod layout;
pub mod markup;
pub mod node;
pub mod position;
pub mod tree;

pub use command::{Command, CommandProcessor};
pub use cursor::Cursor;
pub use document::{Document, Editor};
pub use error::EditError;
pub use layout::{LayoutEngine, NullLayout};
pub use node::{
    InlineStyle, MathKind, Node, NodeId, NodeKind, ParagraphKind, ParagraphStyle,
};
pub use position::Position;
pub use tree::Tree;
