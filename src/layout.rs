//! Seam to the external layout/rendering engine.
//!
//! The engine is invoked synchronously right after each command's `run`, so
//! `run_after_layout` hooks and geometry-dependent follow-ups always observe
//! freshly computed values. The core only ever clears layout slots; it never
//! reads them.

use crate::tree::Tree;

pub trait LayoutEngine {
    /// Recompute geometry for the current tree. Runs whose cached layout
    /// slot was invalidated are the ones that changed.
    fn recompute(&mut self, tree: &mut Tree);
}

/// Layout engine that computes nothing. Default for headless use and tests.
#[derive(Default)]
pub struct NullLayout;

impl LayoutEngine for NullLayout {
    fn recompute(&mut self, _tree: &mut Tree) {}
}
