//! Lossless textual markup for persistence, plus bulk import.
//!
//! One element per node kind; runs of plain characters collapse into text
//! (or a `<t>` element when styled). End sentinels are implicit and the
//! final run's paragraph attributes ride on the `<doc>` element. Round
//! trip: `parse(serialize(tree))` is structure- and value-equal to `tree`;
//! node identity does not survive.

use std::fmt::Write as _;

use thiserror::Error;

use crate::error::EditError;
use crate::node::{InlineStyle, Node, NodeId, NodeKind, ParagraphKind, ParagraphStyle};
use crate::tree::Tree;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("markup syntax error at byte {at}: {message}")]
    Syntax { at: usize, message: String },

    #[error("markup structure error: {0}")]
    Structure(#[from] EditError),
}

// ----------------------------------------------------------------------
// Import
// ----------------------------------------------------------------------

/// Build a tree from plain text: one character node per char, a break per
/// newline. The result always satisfies `validate()`.
pub fn tree_from_plain_text(text: &str) -> Tree {
    let mut tree = Tree::new();
    let root = tree.root();
    for ch in text.chars() {
        let kind = if ch == '\n' {
            NodeKind::Break
        } else {
            NodeKind::Char(ch)
        };
        let node = tree.alloc(kind);
        tree.append(root, node)
            .expect("plain text nodes are always appendable");
    }
    tree
}

// ----------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------

pub fn serialize(tree: &Tree) -> String {
    let mut out = String::new();
    let root = tree.root();
    let children = tree.node(root).children();
    let end = *children.last().expect("root always has an end sentinel");

    out.push_str("<doc");
    push_paragraph_attrs(&mut out, tree.node(end).paragraph_style);
    out.push('>');
    write_sequence(tree, &children[..children.len() - 1], &mut out);
    out.push_str("</doc>");
    out
}

fn write_sequence(tree: &Tree, ids: &[NodeId], out: &mut String) {
    let mut i = 0;
    while i < ids.len() {
        let node = tree.node(ids[i]);
        match &node.kind {
            NodeKind::Char(_) => {
                let mut j = i;
                while j < ids.len() {
                    let other = tree.node(ids[j]);
                    let same_attrs = other.styles == node.styles
                        && other.link_target == node.link_target;
                    if !matches!(other.kind, NodeKind::Char(_)) || !same_attrs {
                        break;
                    }
                    j += 1;
                }
                write_text_group(tree, &ids[i..j], node, out);
                i = j;
                continue;
            }
            NodeKind::Symbol(name) => {
                out.push_str("<sym id=\"");
                push_escaped(out, name);
                out.push('"');
                push_inline_attrs(out, node);
                out.push_str("/>");
            }
            NodeKind::Break => {
                out.push_str("<br");
                push_paragraph_attrs(out, node.paragraph_style);
                out.push_str("/>");
            }
            NodeKind::Placeholder => {
                out.push_str("<ph");
                push_inline_attrs(out, node);
                out.push_str("/>");
            }
            NodeKind::Media(handle) => {
                let _ = write!(out, "<media ref=\"{handle}\"");
                push_inline_attrs(out, node);
                out.push_str("/>");
            }
            NodeKind::Script | NodeKind::Fraction | NodeKind::Radical => {
                let tag = region_tag(&node.kind);
                out.push('<');
                out.push_str(tag);
                push_inline_attrs(out, node);
                out.push('>');
                for &list in node.children() {
                    let inner = tree.node(list).children();
                    out.push_str("<list>");
                    write_sequence(tree, &inner[..inner.len().saturating_sub(1)], out);
                    out.push_str("</list>");
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::SymbolList => {
                out.push_str("<symlist");
                push_inline_attrs(out, node);
                out.push('>');
                let inner = node.children();
                write_sequence(tree, &inner[..inner.len().saturating_sub(1)], out);
                out.push_str("</symlist>");
            }
            NodeKind::Root | NodeKind::List | NodeKind::End => {
                debug_assert!(false, "sentinel or wrapper in serialized sequence");
            }
        }
        i += 1;
    }
}

fn write_text_group(tree: &Tree, ids: &[NodeId], first: &Node, out: &mut String) {
    let plain = first.styles.is_empty() && first.link_target.is_none();
    if !plain {
        out.push_str("<t");
        push_inline_attrs(out, first);
        out.push('>');
    }
    for &id in ids {
        if let NodeKind::Char(ch) = tree.node(id).kind {
            push_escaped_char(out, ch);
        }
    }
    if !plain {
        out.push_str("</t>");
    }
}

fn region_tag(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Script => "script",
        NodeKind::Fraction => "frac",
        NodeKind::Radical => "radical",
        _ => unreachable!("not a fixed-arity region"),
    }
}

fn push_inline_attrs(out: &mut String, node: &Node) {
    if !node.styles.is_empty() {
        out.push_str(" styles=\"");
        for (idx, style) in node.styles.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(style.label());
        }
        out.push('"');
    }
    if let Some(link) = &node.link_target {
        out.push_str(" link=\"");
        push_escaped(out, link);
        out.push('"');
    }
}

fn push_paragraph_attrs(out: &mut String, style: Option<ParagraphStyle>) {
    let Some(style) = style else {
        return;
    };
    let _ = write!(
        out,
        " style=\"{}\" indent=\"{}\"",
        style.kind.label(),
        style.indent
    );
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        push_escaped_char(out, ch);
    }
}

fn push_escaped_char(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        _ => out.push(ch),
    }
}

// ----------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------

/// Parse markup back into a tree. Syntax errors carry the byte offset;
/// structurally invalid documents are rejected by the tree validator, so
/// parsing never produces a tree that breaks the invariants.
pub fn parse(input: &str) -> Result<Tree, ParseError> {
    let mut scanner = Scanner { input, pos: 0 };
    let mut tree = Tree::new();
    let root = tree.root();

    scanner.skip_whitespace();
    let tag = scanner.parse_tag()?;
    if tag.name != "doc" || tag.closing || tag.self_closing {
        return scanner.fail("expected <doc>");
    }
    parse_children(&mut scanner, &mut tree, root, 0)?;
    // The root's end sentinel carries the final run's paragraph attributes.
    let end = tree.child(root, -1)?;
    apply_paragraph_attrs(&scanner, tree.node_mut(end), &tag.attrs)?;
    scanner.skip_whitespace();
    if scanner.pos != scanner.input.len() {
        return scanner.fail("trailing input after </doc>");
    }

    tree.rebuild_runs();
    tree.validate()?;
    Ok(tree)
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

struct RawTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    closing: bool,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError::Syntax {
            at: self.pos,
            message: message.into(),
        })
    }

    /// Parse a tag; the scanner must sit on `<`.
    fn parse_tag(&mut self) -> Result<RawTag, ParseError> {
        if !self.eat('<') {
            return self.fail("expected a tag");
        }
        let closing = self.eat('/');
        let name = self.take_name();
        if name.is_empty() {
            return self.fail("empty tag name");
        }
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    return Ok(RawTag {
                        name,
                        attrs,
                        self_closing: false,
                        closing,
                    });
                }
                Some('/') => {
                    self.bump();
                    if !self.eat('>') {
                        return self.fail("expected '>' after '/'");
                    }
                    return Ok(RawTag {
                        name,
                        attrs,
                        self_closing: true,
                        closing,
                    });
                }
                Some(_) => {
                    let key = self.take_name();
                    if key.is_empty() {
                        return self.fail("expected attribute name");
                    }
                    if !self.eat('=') || !self.eat('"') {
                        return self.fail("expected '=\"' after attribute name");
                    }
                    let mut value = String::new();
                    loop {
                        match self.bump() {
                            Some('"') => break,
                            Some('&') => value.push(self.unescape_entity()?),
                            Some(ch) => value.push(ch),
                            None => return self.fail("unterminated attribute value"),
                        }
                    }
                    attrs.push((key, value));
                }
                None => return self.fail("unterminated tag"),
            }
        }
    }

    fn take_name(&mut self) -> String {
        let mut name = String::new();
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            name.push(self.bump().expect("peeked"));
        }
        name
    }

    /// The scanner sits right after `&`.
    fn unescape_entity(&mut self) -> Result<char, ParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == ';' {
                let entity = &self.input[start..self.pos];
                self.bump();
                return match entity {
                    "amp" => Ok('&'),
                    "lt" => Ok('<'),
                    "gt" => Ok('>'),
                    "quot" => Ok('"'),
                    _ => self.fail(format!("unknown entity &{entity};")),
                };
            }
            self.bump();
        }
        self.fail("unterminated entity")
    }
}

/// Parse child content of a container until its closing tag, attaching the
/// nodes starting at `first_index`. Returns the number of children added.
fn parse_children(
    scanner: &mut Scanner<'_>,
    tree: &mut Tree,
    parent: NodeId,
    first_index: usize,
) -> Result<usize, ParseError> {
    let mut index = first_index;
    loop {
        match scanner.peek() {
            None => return scanner.fail("unterminated element"),
            Some('<') => {
                let tag = scanner.parse_tag()?;
                if tag.closing {
                    if tag.name != expected_closing(tree, parent) {
                        return scanner.fail(format!("mismatched closing tag </{}>", tag.name));
                    }
                    return Ok(index - first_index);
                }
                if tag.name == "t" {
                    index += parse_text_element(scanner, tree, &tag, parent, index)?;
                    continue;
                }
                let node = parse_element(scanner, tree, &tag)?;
                tree.attach(parent, index, node);
                index += 1;
            }
            Some('&') => {
                scanner.bump();
                let ch = scanner.unescape_entity()?;
                let node = tree.alloc(NodeKind::Char(ch));
                tree.attach(parent, index, node);
                index += 1;
            }
            Some(_) => {
                let ch = scanner.bump().expect("peeked");
                let node = tree.alloc(NodeKind::Char(ch));
                tree.attach(parent, index, node);
                index += 1;
            }
        }
    }
}

fn expected_closing(tree: &Tree, parent: NodeId) -> &'static str {
    match tree.node(parent).kind {
        NodeKind::Root => "doc",
        NodeKind::List => "list",
        NodeKind::SymbolList => "symlist",
        NodeKind::Script => "script",
        NodeKind::Fraction => "frac",
        NodeKind::Radical => "radical",
        _ => "",
    }
}

fn parse_element(
    scanner: &mut Scanner<'_>,
    tree: &mut Tree,
    tag: &RawTag,
) -> Result<NodeId, ParseError> {
    let node = match tag.name.as_str() {
        "sym" => {
            let name = attr(tag, "id")
                .ok_or_else(|| ParseError::Syntax {
                    at: scanner.pos,
                    message: "<sym> misses id attribute".into(),
                })?
                .to_string();
            tree.alloc(NodeKind::Symbol(name))
        }
        "ph" => tree.alloc(NodeKind::Placeholder),
        "br" => tree.alloc(NodeKind::Break),
        "media" => {
            let handle = attr(tag, "ref")
                .and_then(|value| value.parse::<u32>().ok())
                .ok_or_else(|| ParseError::Syntax {
                    at: scanner.pos,
                    message: "<media> misses numeric ref attribute".into(),
                })?;
            tree.alloc(NodeKind::Media(handle))
        }
        "script" => tree.alloc(NodeKind::Script),
        "frac" => tree.alloc(NodeKind::Fraction),
        "radical" => tree.alloc(NodeKind::Radical),
        "symlist" => tree.alloc(NodeKind::SymbolList),
        "list" => tree.alloc(NodeKind::List),
        other => return scanner.fail(format!("unknown element <{other}>")),
    };

    if matches!(
        tree.node(node).kind,
        NodeKind::Script | NodeKind::Fraction | NodeKind::Radical
    ) {
        if !tag.self_closing {
            parse_region_lists(scanner, tree, node, &tag.name)?;
        }
    } else if matches!(
        tree.node(node).kind,
        NodeKind::SymbolList | NodeKind::List
    ) {
        let count = if tag.self_closing {
            0
        } else {
            parse_children(scanner, tree, node, 0)?
        };
        let end = tree.alloc(NodeKind::End);
        tree.attach(node, count, end);
    } else if !tag.self_closing {
        return scanner.fail(format!("<{}> must be self-closing", tag.name));
    }

    if matches!(tree.node(node).kind, NodeKind::Break) {
        apply_paragraph_attrs(scanner, tree.node_mut(node), &tag.attrs)?;
    } else {
        apply_inline_attrs(scanner, tree.node_mut(node), &tag.attrs)?;
    }
    Ok(node)
}

/// A fixed-arity region holds exactly its `<list>` children; anything else
/// in between is a syntax error (arity itself is checked by the validator).
fn parse_region_lists(
    scanner: &mut Scanner<'_>,
    tree: &mut Tree,
    region: NodeId,
    region_tag: &str,
) -> Result<(), ParseError> {
    let mut slot = 0;
    loop {
        if scanner.peek() != Some('<') {
            return scanner.fail("expected <list> inside a math region");
        }
        let tag = scanner.parse_tag()?;
        if tag.closing {
            if tag.name != region_tag {
                return scanner.fail(format!("mismatched closing tag </{}>", tag.name));
            }
            return Ok(());
        }
        if tag.name != "list" {
            return scanner.fail("expected <list> inside a math region");
        }
        let list = tree.alloc(NodeKind::List);
        let count = if tag.self_closing {
            0
        } else {
            parse_children(scanner, tree, list, 0)?
        };
        let end = tree.alloc(NodeKind::End);
        tree.attach(list, count, end);
        tree.attach(region, slot, list);
        slot += 1;
    }
}

/// A `<t>` element is sugar for a group of identically attributed
/// characters; it expands back into one node per char, attached to `parent`
/// starting at `first_index`. Returns the number of nodes attached.
fn parse_text_element(
    scanner: &mut Scanner<'_>,
    tree: &mut Tree,
    tag: &RawTag,
    parent: NodeId,
    first_index: usize,
) -> Result<usize, ParseError> {
    if tag.self_closing {
        return scanner.fail("<t> cannot be empty");
    }
    let mut chars = Vec::new();
    loop {
        match scanner.peek() {
            None => return scanner.fail("unterminated <t>"),
            Some('<') => {
                let close = scanner.parse_tag()?;
                if !close.closing || close.name != "t" {
                    return scanner.fail("nested elements are not allowed in <t>");
                }
                break;
            }
            Some('&') => {
                scanner.bump();
                chars.push(scanner.unescape_entity()?);
            }
            Some(_) => chars.push(scanner.bump().expect("peeked")),
        }
    }
    if chars.is_empty() {
        return scanner.fail("<t> cannot be empty");
    }
    let count = chars.len();
    for (offset, ch) in chars.into_iter().enumerate() {
        let node = tree.alloc(NodeKind::Char(ch));
        apply_inline_attrs(scanner, tree.node_mut(node), &tag.attrs)?;
        tree.attach(parent, first_index + offset, node);
    }
    Ok(count)
}

fn attr<'t>(tag: &'t RawTag, name: &str) -> Option<&'t str> {
    tag.attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn apply_inline_attrs(
    scanner: &Scanner<'_>,
    node: &mut Node,
    attrs: &[(String, String)],
) -> Result<(), ParseError> {
    for (key, value) in attrs {
        match key.as_str() {
            "styles" => {
                for label in value.split(',') {
                    let style = InlineStyle::from_label(label).ok_or_else(|| {
                        ParseError::Syntax {
                            at: scanner.pos,
                            message: format!("unknown style {label}"),
                        }
                    })?;
                    node.add_style(style);
                }
            }
            "link" => node.link_target = Some(value.clone()),
            "id" | "ref" => {}
            other => {
                return Err(ParseError::Syntax {
                    at: scanner.pos,
                    message: format!("unknown attribute {other}"),
                });
            }
        }
    }
    Ok(())
}

fn apply_paragraph_attrs(
    scanner: &Scanner<'_>,
    node: &mut Node,
    attrs: &[(String, String)],
) -> Result<(), ParseError> {
    let mut style = None;
    for (key, value) in attrs {
        match key.as_str() {
            "style" => {
                let kind = ParagraphKind::from_label(value).ok_or_else(|| ParseError::Syntax {
                    at: scanner.pos,
                    message: format!("unknown paragraph style {value}"),
                })?;
                style.get_or_insert(ParagraphStyle::default()).kind = kind;
            }
            "indent" => {
                let indent = value.parse::<u8>().map_err(|_| ParseError::Syntax {
                    at: scanner.pos,
                    message: format!("invalid indent {value}"),
                })?;
                style.get_or_insert(ParagraphStyle::default()).indent = indent;
            }
            other => {
                return Err(ParseError::Syntax {
                    at: scanner.pos,
                    message: format!("unknown attribute {other}"),
                });
            }
        }
    }
    if style.is_some() {
        node.paragraph_style = style;
    }
    Ok(())
}

#[cfg(test)]
#[path = "markup_tests.rs"]
mod markup_tests;
