use thiserror::Error;

/// Errors surfaced by tree surgery, position resolution, and command
/// execution.
///
/// `Structural` and `PositionOutOfRange` are recoverable: the command layer
/// turns them into silent no-op edits. The remaining variants are invariant
/// failures that abort the offending command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("structural violation: {0}")]
    Structural(&'static str),

    #[error("position out of range: index {index} not in 0..{len}")]
    PositionOutOfRange { index: isize, len: usize },

    #[error("command inversion state missing (undo before run)")]
    InvalidCommandState,

    #[error("selection endpoints share no common ancestor")]
    SelectionInvariant,
}

impl EditError {
    /// Whether the failed edit may be absorbed as a no-op instead of being
    /// propagated. Invariant failures must never be swallowed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EditError::Structural(_) | EditError::PositionOutOfRange { .. }
        )
    }
}
