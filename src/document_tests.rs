use pretty_assertions::assert_eq;

use super::*;
use crate::node::NodeKind;

fn run_lens(document: &Document) -> Vec<usize> {
    (0..document.tree().run_count())
        .map(|run| document.tree().run_len(run))
        .collect()
}

fn root_labels(document: &Document) -> Vec<&'static str> {
    document
        .tree()
        .node(document.tree().root())
        .children()
        .iter()
        .map(|&id| document.tree().node(id).kind.label())
        .collect()
}

#[test]
fn a_new_document_is_one_empty_paragraph() {
    let document = Document::new();
    document.validate().unwrap();
    assert_eq!(run_lens(&document), vec![1]);
    assert_eq!(root_labels(&document), vec!["end"]);
    assert!(!document.is_modified());
    assert!(!document.can_undo());
}

#[test]
fn splitting_and_merging_a_paragraph_by_break() {
    // Type "abcd", step back in front of "d", split, and undo the split.
    let mut document = Document::new();
    for ch in ['a', 'b', 'c', 'd'] {
        document.insert_char(ch).unwrap();
    }
    document.cursor_prev(false).unwrap();
    assert_eq!(
        document.tree().node(document.cursor().insert()).kind,
        NodeKind::Char('d')
    );

    document.insert_break().unwrap();
    assert_eq!(run_lens(&document), vec![4, 2]);
    assert_eq!(
        root_labels(&document),
        vec![
            "character",
            "character",
            "character",
            "break",
            "character",
            "end"
        ]
    );

    assert!(document.undo());
    assert_eq!(run_lens(&document), vec![5]);
    assert_eq!(document.to_markup(), "<doc>abcd</doc>");
    document.validate().unwrap();
}

#[test]
fn k_undos_return_to_the_initial_state_and_k_redos_forward() {
    let mut document = Document::new();
    let initial = document.to_markup();

    document.insert_char('a').unwrap();
    document.insert_break().unwrap();
    document.insert_char('b').unwrap();
    let final_markup = document.to_markup();
    assert_eq!(final_markup, "<doc>a<br/>b</doc>");

    // Identity probes for the nodes surviving the whole cycle.
    let root = document.tree().root();
    let a = document.tree().child(root, 0).unwrap();
    let br = document.tree().child(root, 1).unwrap();
    let b = document.tree().child(root, 2).unwrap();

    for _ in 0..3 {
        assert!(document.undo());
    }
    assert_eq!(document.to_markup(), initial);
    assert!(!document.can_undo());
    document.validate().unwrap();

    for _ in 0..3 {
        assert!(document.redo());
    }
    assert_eq!(document.to_markup(), final_markup);
    assert_eq!(document.tree().child(root, 0).unwrap(), a);
    assert_eq!(document.tree().child(root, 1).unwrap(), br);
    assert_eq!(document.tree().child(root, 2).unwrap(), b);
    assert!(!document.can_redo());
    document.validate().unwrap();
}

#[test]
fn every_command_leaves_a_valid_tree_behind() {
    let mut document = Document::new();
    document.insert_char('a').unwrap();
    document.validate().unwrap();
    document.insert_math(MathKind::Fraction).unwrap();
    document.validate().unwrap();
    document.insert_char('1').unwrap();
    document.validate().unwrap();
    document.cursor_next_no_descent(false).unwrap();
    document.validate().unwrap();
    document.insert_break().unwrap();
    document.validate().unwrap();
    document.delete_backward().unwrap();
    document.validate().unwrap();
    while document.undo() {
        document.validate().unwrap();
    }
    assert_eq!(document.to_markup(), "<doc></doc>");
}

#[test]
fn editing_inside_a_math_region_stays_inside() {
    let mut document = Document::new();
    document.insert_math(MathKind::Fraction).unwrap();
    document.insert_char('1').unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc><frac><list>1</list><list></list></frac></doc>"
    );
    document.validate().unwrap();
}

#[test]
fn document_edits_round_trip_through_markup() {
    let mut document = Document::new();
    for ch in "hello".chars() {
        document.insert_char(ch).unwrap();
    }
    document.insert_break().unwrap();
    document.insert_symbol("alpha").unwrap();
    document.insert_math(MathKind::Script).unwrap();
    document.insert_char('2').unwrap();

    let markup = document.to_markup();
    let reparsed = Document::from_markup(&markup).unwrap();
    assert!(document.tree().structure_eq(reparsed.tree()));
    assert_eq!(reparsed.to_markup(), markup);
}

#[test]
fn from_plain_text_builds_the_run_partition() {
    let document = Document::from_plain_text("ab\n\ncd");
    document.validate().unwrap();
    assert_eq!(run_lens(&document), vec![3, 1, 3]);
}

#[test]
fn modified_tracks_checkpoints_and_saving() {
    let mut document = Document::new();
    assert!(!document.is_modified());
    document.cursor_next(false).unwrap();
    assert!(!document.is_modified(), "cursor motion is not an edit");
    document.insert_char('a').unwrap();
    assert!(document.is_modified());
    document.mark_saved();
    assert!(!document.is_modified());
}

#[test]
fn explicit_chains_compose_into_one_undo_step() {
    let mut document = Document::new();
    document.begin_chain();
    document.insert_char('a').unwrap();
    document.insert_char('b').unwrap();
    document.end_chain().unwrap();
    assert_eq!(document.to_markup(), "<doc>ab</doc>");

    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc></doc>");
    assert!(!document.can_undo());
}
