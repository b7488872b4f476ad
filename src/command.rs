//! Reversible edits and the linear undo/redo history.
//!
//! A command mutates tree and cursor in `run`, capturing on the way exactly
//! the state its `undo` needs: identities of removed and added nodes, the
//! prior cursor, prior attribute values. Nothing is deep-copied; a removed
//! node keeps living in the arena and is re-spliced by identity, so
//! references held elsewhere stay valid across undo/redo cycles.

use log::{debug, warn};

use crate::document::Editor;
use crate::error::EditError;
use crate::layout::LayoutEngine;

pub trait Command {
    /// Apply the edit and populate the inversion state. Recoverable errors
    /// must be raised before anything is mutated.
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError>;

    /// Invoked once external layout has recomputed geometry for the edit
    /// just applied.
    fn run_after_layout(&mut self, _editor: &mut Editor) {}

    /// Restore tree and cursor to the exact pre-`run` state.
    fn undo(&mut self, editor: &mut Editor);

    /// Whether this command closes an undo boundary. An edit absorbed
    /// without any tree change reports false; it stays recorded and
    /// coalesces with the neighboring edits of its burst.
    fn is_undo_checkpoint(&self) -> bool;
}

/// Linear history: committed commands up to `applied`, a pre-commit buffer
/// of commands run since the last checkpoint, and an optional open chain
/// collecting commands for atomic composition.
pub struct CommandProcessor {
    commands: Vec<Box<dyn Command>>,
    applied: usize,
    preedit: Vec<Box<dyn Command>>,
    chain: Option<Vec<Box<dyn Command>>>,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            applied: 0,
            preedit: Vec::new(),
            chain: None,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0 || !self.preedit.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.commands.len()
    }

    pub fn committed(&self) -> usize {
        self.commands.len()
    }

    pub fn pending(&self) -> usize {
        self.preedit.len()
    }

    pub fn is_chain_open(&self) -> bool {
        self.chain.is_some()
    }

    /// Run a command (or buffer it while a chain is open) and record it.
    ///
    /// A command failing a recoverable precondition becomes a silent no-op:
    /// nothing is recorded, no checkpoint is created, the tree is untouched.
    /// Invariant failures propagate.
    pub fn add_command(
        &mut self,
        editor: &mut Editor,
        layout: &mut dyn LayoutEngine,
        mut command: Box<dyn Command>,
    ) -> Result<(), EditError> {
        if let Some(chain) = &mut self.chain {
            chain.push(command);
            return Ok(());
        }
        if let Err(err) = command.run(editor) {
            if err.is_recoverable() {
                debug!("edit absorbed: {err}");
                return Ok(());
            }
            return Err(err);
        }
        layout.recompute(&mut editor.tree);
        command.run_after_layout(editor);

        let checkpoint = command.is_undo_checkpoint();
        self.preedit.push(command);
        if checkpoint {
            // A new edit invalidates the redo tail.
            self.commands.truncate(self.applied);
            self.commands.append(&mut self.preedit);
            self.applied = self.commands.len();
            editor.modified = true;
            debug!("checkpoint committed, history depth {}", self.applied);
        }
        Ok(())
    }

    /// Open a chain buffer; subsequent commands are collected instead of
    /// run, until `end_chain` composes them into one atomic command.
    pub fn begin_chain(&mut self) {
        debug_assert!(self.chain.is_none(), "chain already open");
        if self.chain.is_none() {
            self.chain = Some(Vec::new());
        }
    }

    pub fn end_chain(
        &mut self,
        editor: &mut Editor,
        layout: &mut dyn LayoutEngine,
    ) -> Result<(), EditError> {
        let Some(buffered) = self.chain.take() else {
            return Ok(());
        };
        if buffered.is_empty() {
            return Ok(());
        }
        self.add_command(editor, layout, Box::new(Chain::new(buffered)))
    }

    /// Roll back one user-visible edit: first any uncommitted pre-edit
    /// commands, then the committed burst ending at the current position.
    pub fn undo(&mut self, editor: &mut Editor, layout: &mut dyn LayoutEngine) -> bool {
        let mut any = false;
        for mut command in self.preedit.drain(..).rev() {
            command.undo(editor);
            any = true;
        }
        while self.applied > 0 {
            self.applied -= 1;
            self.commands[self.applied].undo(editor);
            any = true;
            // The burst starts right above the previous checkpoint.
            if self.applied == 0 || self.commands[self.applied - 1].is_undo_checkpoint() {
                break;
            }
        }
        if any {
            layout.recompute(&mut editor.tree);
        }
        any
    }

    /// Replay forward through the next checkpoint.
    pub fn redo(&mut self, editor: &mut Editor, layout: &mut dyn LayoutEngine) -> bool {
        let mut any = false;
        while self.applied < self.commands.len() {
            let command = &mut self.commands[self.applied];
            if let Err(err) = command.run(editor) {
                // History replays state captured from a successful run;
                // failing here is a bug, not a user condition.
                warn!("redo failed, history truncated: {err}");
                self.commands.truncate(self.applied);
                break;
            }
            layout.recompute(&mut editor.tree);
            command.run_after_layout(editor);
            self.applied += 1;
            any = true;
            if self.commands[self.applied - 1].is_undo_checkpoint() {
                break;
            }
        }
        any
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Atomic multi-command composite built by the processor's chain buffer.
/// Runs its parts in order and rolls back the already-run prefix when one
/// fails, so the whole chain applies or nothing does.
pub(crate) struct Chain {
    commands: Vec<Box<dyn Command>>,
}

impl Chain {
    pub(crate) fn new(commands: Vec<Box<dyn Command>>) -> Self {
        Self { commands }
    }
}

impl Command for Chain {
    fn run(&mut self, editor: &mut Editor) -> Result<(), EditError> {
        for index in 0..self.commands.len() {
            if let Err(err) = self.commands[index].run(editor) {
                for command in self.commands[..index].iter_mut().rev() {
                    command.undo(editor);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn run_after_layout(&mut self, editor: &mut Editor) {
        for command in &mut self.commands {
            command.run_after_layout(editor);
        }
    }

    fn undo(&mut self, editor: &mut Editor) {
        for command in self.commands.iter_mut().rev() {
            command.undo(editor);
        }
    }

    fn is_undo_checkpoint(&self) -> bool {
        self.commands.iter().any(|c| c.is_undo_checkpoint())
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod command_tests;
