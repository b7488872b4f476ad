use std::any::Any;
use std::fmt;

/// Handle to a node in a [`Tree`](crate::tree::Tree) arena.
///
/// Handles stay valid for the life of the document: detaching a node from
/// its parent never deallocates it, so a handle captured by a command's undo
/// state still names the same node when it is spliced back in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed node-kind catalogue, value payloads included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root. Its direct children form the run partition.
    Root,
    /// Generic argument/wrapper list, the cell of every math region.
    List,
    /// Sub-/superscript pair.
    Script,
    /// Fraction with numerator and denominator.
    Fraction,
    /// n-th root with index and radicand.
    Radical,
    /// Flat list of symbols.
    SymbolList,
    /// One character of text.
    Char(char),
    /// Named symbol (e.g. "alpha", "sum").
    Symbol(String),
    /// Line break; terminates a run. Root-only.
    Break,
    /// Empty slot the cursor can rest on inside math regions.
    Placeholder,
    /// Handle to externally managed media content.
    Media(u32),
    /// Trailing sentinel of every container; keeps the end position
    /// addressable.
    End,
}

impl NodeKind {
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            NodeKind::Root
                | NodeKind::List
                | NodeKind::Script
                | NodeKind::Fraction
                | NodeKind::Radical
                | NodeKind::SymbolList
        )
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_branch()
    }

    pub fn is_math_region(&self) -> bool {
        matches!(
            self,
            NodeKind::Script | NodeKind::Fraction | NodeKind::Radical | NodeKind::SymbolList
        )
    }

    /// Whether the cursor may stand in front of a node of this kind.
    /// Wrapper lists and the root only ever hold a cursor indirectly,
    /// through their children.
    pub fn can_hold_cursor(&self) -> bool {
        !matches!(self, NodeKind::Root | NodeKind::List)
    }

    /// Child contract of a container kind. Leaves admit no children at all.
    pub fn allows_child(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::Root => !matches!(child, NodeKind::Root | NodeKind::List),
            NodeKind::List => {
                !matches!(child, NodeKind::Root | NodeKind::List | NodeKind::Break)
            }
            // Argument slots are wired up at construction time and stay
            // fixed; see `required_lists`.
            NodeKind::Script | NodeKind::Fraction | NodeKind::Radical => {
                matches!(child, NodeKind::List)
            }
            NodeKind::SymbolList => matches!(
                child,
                NodeKind::Symbol(_) | NodeKind::Placeholder | NodeKind::End
            ),
            _ => false,
        }
    }

    /// For fixed-arity math regions, the exact number of `List` children.
    pub fn required_lists(&self) -> Option<usize> {
        match self {
            NodeKind::Script | NodeKind::Fraction | NodeKind::Radical => Some(2),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Root => "doc",
            NodeKind::List => "list",
            NodeKind::Script => "script",
            NodeKind::Fraction => "fraction",
            NodeKind::Radical => "radical",
            NodeKind::SymbolList => "symbol list",
            NodeKind::Char(_) => "character",
            NodeKind::Symbol(_) => "symbol",
            NodeKind::Break => "break",
            NodeKind::Placeholder => "placeholder",
            NodeKind::Media(_) => "media",
            NodeKind::End => "end",
        }
    }
}

/// Math region kinds the editing surface can create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathKind {
    Script,
    Fraction,
    Radical,
    SymbolList,
}

impl MathKind {
    pub fn node_kind(self) -> NodeKind {
        match self {
            MathKind::Script => NodeKind::Script,
            MathKind::Fraction => NodeKind::Fraction,
            MathKind::Radical => NodeKind::Radical,
            MathKind::SymbolList => NodeKind::SymbolList,
        }
    }
}

/// Presentation tags carried per node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InlineStyle {
    Emphasis,
    Strong,
    Code,
    Small,
}

impl InlineStyle {
    pub fn label(self) -> &'static str {
        match self {
            InlineStyle::Emphasis => "em",
            InlineStyle::Strong => "strong",
            InlineStyle::Code => "code",
            InlineStyle::Small => "small",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "em" => Some(InlineStyle::Emphasis),
            "strong" => Some(InlineStyle::Strong),
            "code" => Some(InlineStyle::Code),
            "small" => Some(InlineStyle::Small),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParagraphKind {
    #[default]
    Text,
    Heading1,
    Heading2,
    Heading3,
    Code,
    Quote,
}

impl ParagraphKind {
    pub fn label(self) -> &'static str {
        match self {
            ParagraphKind::Text => "text",
            ParagraphKind::Heading1 => "heading1",
            ParagraphKind::Heading2 => "heading2",
            ParagraphKind::Heading3 => "heading3",
            ParagraphKind::Code => "code",
            ParagraphKind::Quote => "quote",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "text" => Some(ParagraphKind::Text),
            "heading1" => Some(ParagraphKind::Heading1),
            "heading2" => Some(ParagraphKind::Heading2),
            "heading3" => Some(ParagraphKind::Heading3),
            "code" => Some(ParagraphKind::Code),
            "quote" => Some(ParagraphKind::Quote),
            _ => None,
        }
    }
}

/// Paragraph-level attributes, stored on the run's terminator node (the
/// `Break`, or the `End` for the final run).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParagraphStyle {
    pub kind: ParagraphKind,
    pub indent: u8,
}

/// Opaque per-node layout metadata. Written and read only by the external
/// layout engine; the core clears it on invalidation and never looks inside.
pub type LayoutSlot = Box<dyn Any>;

/// One element of the content tree.
///
/// Children are exclusively owned through the arena; the parent link is a
/// non-owning back-pointer used only for upward traversal.
pub struct Node {
    pub kind: NodeKind,
    pub styles: Vec<InlineStyle>,
    pub link_target: Option<String>,
    pub paragraph_style: Option<ParagraphStyle>,
    pub layout: Option<LayoutSlot>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            styles: Vec::new(),
            link_target: None,
            paragraph_style: None,
            layout: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_style(&self, style: InlineStyle) -> bool {
        self.styles.contains(&style)
    }

    pub fn add_style(&mut self, style: InlineStyle) {
        if let Err(at) = self.styles.binary_search(&style) {
            self.styles.insert(at, style);
        }
    }

    pub fn remove_style(&mut self, style: InlineStyle) {
        if let Ok(at) = self.styles.binary_search(&style) {
            self.styles.remove(at);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("styles", &self.styles)
            .field("link_target", &self.link_target)
            .field("paragraph_style", &self.paragraph_style)
            .field("layout", &self.layout.as_ref().map(|_| "<opaque>"))
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}
