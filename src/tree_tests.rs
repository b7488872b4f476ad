use super::*;
use crate::markup::tree_from_plain_text;
use crate::node::MathKind;

fn run_lens(tree: &Tree) -> Vec<usize> {
    (0..tree.run_count()).map(|run| tree.run_len(run)).collect()
}

fn root_kind_labels(tree: &Tree) -> Vec<&'static str> {
    tree.node(tree.root())
        .children()
        .iter()
        .map(|&id| tree.node(id).kind.label())
        .collect()
}

#[test]
fn new_tree_is_one_run_with_end_sentinel() {
    let tree = Tree::new();
    assert_eq!(run_lens(&tree), vec![1]);
    assert_eq!(root_kind_labels(&tree), vec!["end"]);
    assert!(tree.validate().is_ok());
}

#[test]
fn appending_extends_the_final_run() {
    let mut tree = Tree::new();
    let root = tree.root();
    for ch in ['a', 'b'] {
        let node = tree.alloc(NodeKind::Char(ch));
        tree.append(root, node).unwrap();
    }
    assert_eq!(run_lens(&tree), vec![3]);
    assert!(tree.validate().is_ok());
}

#[test]
fn inserting_a_break_splits_the_run() {
    let mut tree = tree_from_plain_text("abcd");
    assert_eq!(run_lens(&tree), vec![5]);
    let br = tree.alloc(NodeKind::Break);
    tree.insert(tree.root(), 2, br).unwrap();
    // Two runs summing to the old length plus one; the break closes the
    // first.
    assert_eq!(run_lens(&tree), vec![3, 3]);
    assert_eq!(
        root_kind_labels(&tree),
        vec!["character", "character", "break", "character", "character", "end"]
    );
    assert!(tree.validate().is_ok());
}

#[test]
fn removing_a_break_merges_the_runs_back() {
    let mut tree = tree_from_plain_text("ab\ncd");
    assert_eq!(run_lens(&tree), vec![3, 3]);
    let br = tree.child(tree.root(), 2).unwrap();
    assert_eq!(tree.node(br).kind, NodeKind::Break);
    tree.remove(br).unwrap();
    assert_eq!(run_lens(&tree), vec![5]);
    assert!(tree.validate().is_ok());
}

#[test]
fn appending_a_break_leaves_a_sentinel_only_run() {
    let mut tree = tree_from_plain_text("ab");
    let br = tree.alloc(NodeKind::Break);
    tree.append(tree.root(), br).unwrap();
    assert_eq!(run_lens(&tree), vec![3, 1]);
    // Removing it drops the trailing run again.
    tree.remove(br).unwrap();
    assert_eq!(run_lens(&tree), vec![3]);
    assert!(tree.validate().is_ok());
}

#[test]
fn remove_range_across_a_break_merges_bookkeeping() {
    let mut tree = tree_from_plain_text("ab\ncd");
    // Remove "b", the break, and "c" in one go.
    let removed = tree.remove_range(tree.root(), 1, 4).unwrap();
    assert_eq!(removed.len(), 3);
    assert_eq!(run_lens(&tree), vec![3]);
    assert_eq!(root_kind_labels(&tree), vec!["character", "character", "end"]);
    assert!(tree.validate().is_ok());
}

#[test]
fn remove_range_rejects_the_end_sentinel_without_mutation() {
    let mut tree = tree_from_plain_text("ab");
    let err = tree.remove_range(tree.root(), 1, 3).unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
    assert_eq!(run_lens(&tree), vec![3]);
    assert!(tree.validate().is_ok());
}

#[test]
fn child_supports_negative_indexing() {
    let tree = tree_from_plain_text("ab");
    let root = tree.root();
    let end = tree.child(root, -1).unwrap();
    assert_eq!(tree.node(end).kind, NodeKind::End);
    assert_eq!(tree.child(root, -3).unwrap(), tree.child(root, 0).unwrap());
}

#[test]
fn child_fails_fast_outside_the_sibling_list() {
    let tree = tree_from_plain_text("ab");
    let err = tree.child(tree.root(), 3).unwrap_err();
    assert!(matches!(err, EditError::PositionOutOfRange { .. }));
    let err = tree.child(tree.root(), -4).unwrap_err();
    assert!(matches!(err, EditError::PositionOutOfRange { .. }));
}

#[test]
fn index_of_and_siblings_agree() {
    let tree = tree_from_plain_text("ab");
    let root = tree.root();
    let a = tree.child(root, 0).unwrap();
    let b = tree.child(root, 1).unwrap();
    assert_eq!(tree.index_of(a), Some(0));
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.prev_sibling(b), Some(a));
    assert_eq!(tree.prev_sibling(a), None);
    assert_eq!(tree.index_of(root), None);
}

#[test]
fn math_regions_come_up_well_formed() {
    let mut tree = Tree::new();
    let frac = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), frac).unwrap();
    assert!(tree.validate().is_ok());
    assert_eq!(tree.len(frac), 2);
    for slot in 0..2 {
        let list = tree.child(frac, slot).unwrap();
        assert_eq!(tree.node(list).kind, NodeKind::List);
        assert_eq!(tree.len(list), 1);
    }
}

#[test]
fn fixed_arity_regions_reject_child_insertion() {
    let mut tree = Tree::new();
    let frac = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), frac).unwrap();
    let ch = tree.alloc(NodeKind::Char('x'));
    let err = tree.insert(frac, 0, ch).unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
    assert!(tree.validate().is_ok());
}

#[test]
fn fixed_arity_regions_keep_their_argument_lists() {
    let mut tree = Tree::new();
    let frac = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), frac).unwrap();
    let numerator = tree.child(frac, 0).unwrap();
    let err = tree.remove(numerator).unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
    assert!(tree.validate().is_ok());
}

#[test]
fn end_sentinels_cannot_be_removed() {
    let mut tree = Tree::new();
    let end = tree.child(tree.root(), 0).unwrap();
    let err = tree.remove(end).unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
}

#[test]
fn breaks_are_rejected_inside_math_lists() {
    let mut tree = Tree::new();
    let frac = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), frac).unwrap();
    let list = tree.child(frac, 0).unwrap();
    let br = tree.alloc(NodeKind::Break);
    let err = tree.insert(list, 0, br).unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
    assert!(tree.validate().is_ok());
}

#[test]
fn nested_math_is_allowed_inside_lists() {
    let mut tree = Tree::new();
    let outer = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), outer).unwrap();
    let numerator = tree.child(outer, 0).unwrap();
    let inner = tree.new_math(MathKind::Script);
    tree.insert(numerator, 0, inner).unwrap();
    assert!(tree.validate().is_ok());
}

#[test]
fn validate_rejects_a_script_with_one_list() {
    let mut tree = Tree::new();
    let script = tree.alloc(NodeKind::Script);
    let list = tree.alloc(NodeKind::List);
    let end = tree.alloc(NodeKind::End);
    tree.attach(list, 0, end);
    tree.attach(script, 0, list);
    tree.attach(tree.root(), 0, script);
    tree.rebuild_runs();
    let err = tree.validate().unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
}

#[test]
fn validate_accepts_a_script_with_two_lists() {
    let mut tree = Tree::new();
    let script = tree.new_math(MathKind::Script);
    tree.append(tree.root(), script).unwrap();
    assert!(tree.validate().is_ok());
}

#[test]
fn validate_rejects_a_list_without_sentinel() {
    let mut tree = Tree::new();
    let frac = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), frac).unwrap();
    let list = tree.child(frac, 0).unwrap();
    let end = tree.child(list, 0).unwrap();
    tree.detach(end);
    let err = tree.validate().unwrap_err();
    assert!(matches!(err, EditError::Structural(_)));
}

#[test]
fn mutation_clears_the_cached_run_layout() {
    let mut tree = tree_from_plain_text("ab\ncd");
    tree.set_run_layout(0, Some(Box::new(42u32)));
    tree.set_run_layout(1, Some(Box::new(43u32)));
    let node = tree.alloc(NodeKind::Char('x'));
    tree.insert(tree.root(), 0, node).unwrap();
    assert!(tree.run_layout(0).is_none());
    assert!(tree.run_layout(1).is_some());
}

#[test]
fn nested_mutation_invalidates_the_enclosing_run() {
    let mut tree = tree_from_plain_text("a");
    let frac = tree.new_math(MathKind::Fraction);
    tree.append(tree.root(), frac).unwrap();
    tree.set_run_layout(0, Some(Box::new(1u8)));
    let numerator = tree.child(frac, 0).unwrap();
    let ch = tree.alloc(NodeKind::Char('x'));
    tree.insert(numerator, 0, ch).unwrap();
    assert!(tree.run_layout(0).is_none());
}

#[test]
fn structure_eq_ignores_identity_but_not_values() {
    let a = tree_from_plain_text("ab\ncd");
    let b = tree_from_plain_text("ab\ncd");
    let c = tree_from_plain_text("ab\nce");
    assert!(a.structure_eq(&b));
    assert!(!a.structure_eq(&c));
}

#[test]
fn run_terminators_and_ranges_line_up() {
    let tree = tree_from_plain_text("ab\ncd");
    assert_eq!(tree.run_range(0), 0..3);
    assert_eq!(tree.run_range(1), 3..6);
    assert_eq!(tree.node(tree.run_terminator(0)).kind, NodeKind::Break);
    assert_eq!(tree.node(tree.run_terminator(1)).kind, NodeKind::End);
    assert_eq!(tree.run_of_child(0), 0);
    assert_eq!(tree.run_of_child(2), 0);
    assert_eq!(tree.run_of_child(3), 1);
}
