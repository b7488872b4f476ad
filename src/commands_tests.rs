use super::*;
use crate::document::Document;

fn doc_from_text(text: &str) -> Document {
    let document = Document::from_plain_text(text);
    document.validate().unwrap();
    document
}

/// Select the root children `[from, to)` by absolute positions.
fn select(document: &mut Document, from: usize, to: usize) {
    document
        .set_cursor(Position::new(vec![to]), Position::new(vec![from]))
        .unwrap();
}

#[test]
fn insert_char_places_the_node_in_front_of_the_cursor() {
    let mut document = Document::new();
    document.insert_char('a').unwrap();
    document.insert_char('b').unwrap();
    assert_eq!(document.to_markup(), "<doc>ab</doc>");
    assert_eq!(
        document.tree().node(document.cursor().insert()).kind,
        NodeKind::End
    );
    document.validate().unwrap();
}

#[test]
fn insert_undo_restores_structure_and_cursor_exactly() {
    let mut document = doc_from_text("ab\ncd");
    let before_markup = document.to_markup();
    let before_cursor = document.cursor();

    document.insert_char('x').unwrap();
    assert_ne!(document.to_markup(), before_markup);

    assert!(document.undo());
    assert_eq!(document.to_markup(), before_markup);
    assert_eq!(document.cursor(), before_cursor);
    document.validate().unwrap();
}

#[test]
fn insert_math_moves_the_cursor_into_the_first_slot() {
    let mut document = Document::new();
    document.insert_math(MathKind::Fraction).unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc><frac><list></list><list></list></frac></doc>"
    );

    let at = document.cursor().insert();
    assert_eq!(document.tree().node(at).kind, NodeKind::End);
    let list = document.tree().node(at).parent().unwrap();
    assert_eq!(document.tree().node(list).kind, NodeKind::List);
    let region = document.tree().node(list).parent().unwrap();
    assert_eq!(document.tree().node(region).kind, NodeKind::Fraction);
    assert_eq!(document.tree().index_of(list), Some(0));

    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc></doc>");
    document.validate().unwrap();
}

#[test]
fn delete_backward_removes_the_node_in_front() {
    let mut document = doc_from_text("ab");
    document.cursor_next(false).unwrap();
    document.cursor_next(false).unwrap();
    assert_eq!(
        document.tree().node(document.cursor().insert()).kind,
        NodeKind::End
    );

    document.delete_backward().unwrap();
    assert_eq!(document.to_markup(), "<doc>a</doc>");

    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc>ab</doc>");
    document.validate().unwrap();
}

#[test]
fn delete_backward_at_the_document_start_is_absorbed() {
    let mut document = doc_from_text("a");
    document.delete_backward().unwrap();
    assert_eq!(document.to_markup(), "<doc>a</doc>");
    // Recorded, but no checkpoint: nothing was committed.
    assert_eq!(document.processor().committed(), 0);
    assert_eq!(document.processor().pending(), 1);
    assert!(!document.is_modified());
}

#[test]
fn delete_forward_keeps_node_identity_across_undo() {
    let mut document = doc_from_text("ab");
    let a = document.tree().child(document.tree().root(), 0).unwrap();

    document.delete_forward().unwrap();
    assert_eq!(document.to_markup(), "<doc>b</doc>");

    assert!(document.undo());
    assert_eq!(
        document.tree().child(document.tree().root(), 0).unwrap(),
        a,
        "undo must re-splice the very same node"
    );
}

#[test]
fn delete_forward_on_a_break_merges_the_runs() {
    let mut document = doc_from_text("ab\ncd");
    assert_eq!(document.tree().run_count(), 2);
    document.cursor_next(false).unwrap();
    document.cursor_next(false).unwrap();
    assert_eq!(
        document.tree().node(document.cursor().insert()).kind,
        NodeKind::Break
    );

    document.delete_forward().unwrap();
    assert_eq!(document.tree().run_count(), 1);
    assert_eq!(document.tree().run_len(0), 5);

    assert!(document.undo());
    assert_eq!(document.tree().run_count(), 2);
    assert_eq!(document.to_markup(), "<doc>ab<br/>cd</doc>");
    document.validate().unwrap();
}

#[test]
fn delete_selection_collapses_onto_the_upper_bound() {
    let mut document = doc_from_text("abcd");
    select(&mut document, 1, 3);
    let d = document.tree().child(document.tree().root(), 3).unwrap();

    document.delete_selection().unwrap();
    assert_eq!(document.to_markup(), "<doc>ad</doc>");
    assert_eq!(document.cursor().insert(), d);
    assert!(!document.cursor().has_selection());
    document.validate().unwrap();
}

#[test]
fn delete_selection_reinserts_identical_nodes_on_undo() {
    let mut document = doc_from_text("abcd");
    let root = document.tree().root();
    let b = document.tree().child(root, 1).unwrap();
    let c = document.tree().child(root, 2).unwrap();
    select(&mut document, 1, 3);
    let selected_cursor = document.cursor();

    document.delete_selection().unwrap();
    assert!(document.undo());
    assert_eq!(document.tree().child(root, 1).unwrap(), b);
    assert_eq!(document.tree().child(root, 2).unwrap(), c);
    assert_eq!(document.cursor(), selected_cursor);

    // The redo half of the cycle removes and restores the same identities.
    assert!(document.redo());
    assert_eq!(document.to_markup(), "<doc>ad</doc>");
    assert!(document.undo());
    assert_eq!(document.tree().child(root, 1).unwrap(), b);
    assert_eq!(document.tree().child(root, 2).unwrap(), c);
    document.validate().unwrap();
}

#[test]
fn typing_over_a_selection_replaces_it_atomically() {
    let mut document = doc_from_text("abcd");
    select(&mut document, 1, 3);
    document.insert_char('x').unwrap();
    assert_eq!(document.to_markup(), "<doc>axd</doc>");

    // Delete and insert were chained: one undo restores both.
    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc>abcd</doc>");
    document.validate().unwrap();
}

#[test]
fn styling_a_selection_tags_every_character_in_range() {
    let mut document = doc_from_text("abcd");
    select(&mut document, 1, 3);
    document
        .set_inline_style(InlineStyle::Emphasis, true)
        .unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc>a<t styles=\"em\">bc</t>d</doc>"
    );

    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc>abcd</doc>");
    assert!(document.redo());
    assert_eq!(
        document.to_markup(),
        "<doc>a<t styles=\"em\">bc</t>d</doc>"
    );
    document.validate().unwrap();
}

#[test]
fn styling_reaches_into_math_regions() {
    let mut document =
        Document::from_markup("<doc>a<frac><list>1</list><list>x</list></frac>b</doc>").unwrap();
    // Select the fraction (child 1) alone.
    select(&mut document, 1, 2);
    document.set_inline_style(InlineStyle::Strong, true).unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc>a<frac><list><t styles=\"strong\">1</t></list>\
         <list><t styles=\"strong\">x</t></list></frac>b</doc>"
    );
}

#[test]
fn styling_without_a_selection_is_absorbed() {
    let mut document = doc_from_text("ab");
    document
        .set_inline_style(InlineStyle::Emphasis, true)
        .unwrap();
    assert_eq!(document.to_markup(), "<doc>ab</doc>");
    assert_eq!(document.processor().committed(), 0);
}

#[test]
fn links_apply_and_invert_per_node() {
    let mut document = doc_from_text("abc");
    select(&mut document, 0, 2);
    document
        .set_link(Some("ref://target".to_string()))
        .unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc><t link=\"ref://target\">ab</t>c</doc>"
    );
    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc>abc</doc>");
}

#[test]
fn paragraph_kind_lands_on_the_cursor_runs_terminator() {
    let mut document = doc_from_text("ab\ncd");
    document.set_paragraph_kind(ParagraphKind::Heading1).unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc>ab<br style=\"heading1\" indent=\"0\"/>cd</doc>"
    );
    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc>ab<br/>cd</doc>");
}

#[test]
fn paragraph_edits_cover_every_selected_run() {
    let mut document = doc_from_text("ab\ncd");
    select(&mut document, 0, 4);
    document.set_paragraph_kind(ParagraphKind::Quote).unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc style=\"quote\" indent=\"0\">ab<br style=\"quote\" indent=\"0\"/>cd</doc>"
    );
}

#[test]
fn selection_ending_at_a_run_start_leaves_that_run_alone() {
    let mut document = doc_from_text("ab\ncd");
    // [0, 3) covers the first run up to and including its break, but
    // nothing of the second run.
    select(&mut document, 0, 3);
    document.set_paragraph_kind(ParagraphKind::Code).unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc>ab<br style=\"code\" indent=\"0\"/>cd</doc>"
    );
}

#[test]
fn indentation_accumulates_and_clamps_at_zero() {
    let mut document = doc_from_text("ab");
    document.indent().unwrap();
    document.indent().unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc style=\"text\" indent=\"2\">ab</doc>"
    );
    document.unindent().unwrap();
    document.unindent().unwrap();
    assert_eq!(
        document.to_markup(),
        "<doc style=\"text\" indent=\"0\">ab</doc>"
    );
    // Already at zero: absorbed without a checkpoint.
    let committed = document.processor().committed();
    document.unindent().unwrap();
    assert_eq!(document.processor().committed(), committed);
}

#[test]
fn extending_into_a_region_selects_the_whole_region() {
    let mut document =
        Document::from_markup("<doc>a<frac><list>1</list><list>x</list></frac>b</doc>").unwrap();
    let root = document.tree().root();
    let a = document.tree().child(root, 0).unwrap();
    let b = document.tree().child(root, 2).unwrap();
    assert_eq!(document.cursor().insert(), a);

    document.cursor_next(true).unwrap();
    document.cursor_next(true).unwrap();
    // The insert end dived into the numerator; the invariant pulls it back
    // up and past the fraction so the selection covers it.
    assert_eq!(document.cursor().insert(), b);
    assert_eq!(document.cursor().selection(), a);
}

#[test]
fn cursor_motion_against_a_boundary_is_absorbed() {
    let mut document = doc_from_text("ab");
    let before = document.cursor();
    document.cursor_prev(false).unwrap();
    assert_eq!(document.cursor(), before);
    assert_eq!(document.processor().committed(), 0);
}

#[test]
fn cursor_motion_is_undone_with_its_burst() {
    let mut document = doc_from_text("ab");
    let start = document.cursor();
    document.cursor_next(false).unwrap();
    document.insert_char('x').unwrap();
    assert_eq!(document.to_markup(), "<doc>axb</doc>");

    assert!(document.undo());
    assert_eq!(document.to_markup(), "<doc>ab</doc>");
    assert_eq!(document.cursor(), start);
}
