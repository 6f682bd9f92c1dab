use std::fmt;
use std::sync::Arc;

use super::ModelError;
use super::attrs::{AttrValue, Attrs};
use super::schema::{DOC, TEXT};

struct MarkInner {
    kind: String,
    attrs: Attrs,
}

/// An inline annotation attached to nodes.
///
/// Cloning a mark shares it: `ptr_eq` tells whether two marks are the same
/// mark, `==` whether they merely look the same.
#[derive(Clone)]
pub struct Mark(Arc<MarkInner>);

impl Mark {
    pub fn new(kind: impl Into<String>, attrs: Attrs) -> Self {
        Self(Arc::new(MarkInner {
            kind: kind.into(),
            attrs,
        }))
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.0.attrs.get(name)
    }

    pub fn ptr_eq(a: &Mark, b: &Mark) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        Mark::ptr_eq(self, other) || (self.kind() == other.kind() && self.attrs() == other.attrs())
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs().is_empty() {
            write!(f, "{}", self.kind())
        } else {
            write!(f, "{}{:?}", self.kind(), self.attrs())
        }
    }
}

#[derive(PartialEq)]
enum Content {
    Text(String),
    Leaf,
    Branch(Fragment),
}

struct NodeInner {
    kind: String,
    attrs: Attrs,
    marks: Vec<Mark>,
    content: Content,
    size: usize,
}

/// An immutable node of the content tree.
///
/// Edits never touch an existing node; they build new ones and share the
/// untouched children. Two handles to the same allocation are the same
/// node (`Node::ptr_eq`), which is what block identity is based on.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

static EMPTY: Fragment = Fragment {
    children: Vec::new(),
    size: 0,
};

impl Node {
    fn build(kind: String, attrs: Attrs, marks: Vec<Mark>, content: Content) -> Self {
        let size = match &content {
            Content::Text(text) => text.chars().count(),
            Content::Leaf => 1,
            Content::Branch(fragment) => fragment.size() + 2,
        };
        Self(Arc::new(NodeInner {
            kind,
            attrs,
            marks,
            content,
            size,
        }))
    }

    pub fn branch(kind: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Self::build(
            kind.into(),
            attrs,
            Vec::new(),
            Content::Branch(Fragment::from_nodes(children)),
        )
    }

    pub fn leaf(kind: impl Into<String>, attrs: Attrs) -> Self {
        Self::build(kind.into(), attrs, Vec::new(), Content::Leaf)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with_marks(text, Vec::new())
    }

    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self::build(
            TEXT.to_string(),
            Attrs::new(),
            marks,
            Content::Text(text.into()),
        )
    }

    pub fn doc(children: Vec<Node>) -> Self {
        Self::branch(DOC, Attrs::new(), children)
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.0.attrs.get(name)
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.0.marks.iter().any(|m| m == mark)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.content, Content::Text(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.0.content, Content::Leaf)
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.0.content, Content::Branch(_))
    }

    pub fn text_str(&self) -> Option<&str> {
        match &self.0.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn content(&self) -> &Fragment {
        match &self.0.content {
            Content::Branch(fragment) => fragment,
            _ => &EMPTY,
        }
    }

    pub fn node_size(&self) -> usize {
        self.0.size
    }

    pub fn content_size(&self) -> usize {
        self.content().size()
    }

    pub fn child_count(&self) -> usize {
        self.content().child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content().child(index)
    }

    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn text_content(&self) -> String {
        match &self.0.content {
            Content::Text(text) => text.clone(),
            Content::Leaf => String::new(),
            Content::Branch(fragment) => fragment.text_content(),
        }
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        Self::build(
            self.0.kind.clone(),
            attrs,
            self.0.marks.clone(),
            self.clone_content(),
        )
    }

    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        Self::build(
            self.0.kind.clone(),
            self.0.attrs.clone(),
            marks,
            self.clone_content(),
        )
    }

    /// Same node with new children. Text and leaf nodes are returned as is.
    pub fn with_content(&self, content: Fragment) -> Node {
        if !self.is_branch() {
            return self.clone();
        }
        Self::build(
            self.0.kind.clone(),
            self.0.attrs.clone(),
            self.0.marks.clone(),
            Content::Branch(content),
        )
    }

    fn clone_content(&self) -> Content {
        match &self.0.content {
            Content::Text(text) => Content::Text(text.clone()),
            Content::Leaf => Content::Leaf,
            Content::Branch(fragment) => Content::Branch(fragment.clone()),
        }
    }

    fn with_mark(&self, mark: &Mark) -> Node {
        if self.has_mark(mark) {
            return self.clone();
        }
        let mut marks = self.0.marks.clone();
        marks.push(mark.clone());
        self.with_marks(marks)
    }

    fn without_mark(&self, mark: &Mark) -> Node {
        if !self.has_mark(mark) {
            return self.clone();
        }
        let marks = self.0.marks.iter().filter(|m| *m != mark).cloned().collect();
        self.with_marks(marks)
    }

    /// Slice of a text node between two character offsets, keeping its marks.
    pub fn cut_text(&self, from: usize, to: usize) -> Node {
        match &self.0.content {
            Content::Text(text) => {
                if from == 0 && to >= self.0.size {
                    return self.clone();
                }
                let sliced: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
                Node::text_with_marks(sliced, self.0.marks.clone())
            }
            _ => self.clone(),
        }
    }

    /// The node directly after `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        self.resolve(pos).ok()?.node_after()
    }

    /// Every descendant with the absolute position before it, in document order.
    pub fn descendants(&self) -> Vec<(usize, Node)> {
        let mut out = Vec::new();
        self.content().collect_descendants(0, &mut out);
        out
    }

    /// Tree walk for the first descendant whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, name: &str, value: &AttrValue) -> Option<(usize, Node)> {
        self.descendants()
            .into_iter()
            .find(|(_, node)| node.attr(name) == Some(value))
    }

    /// Replace the range `from..to` of this node's content.
    pub fn replace(&self, from: usize, to: usize, content: &Fragment) -> Result<Node, ModelError> {
        let inner = self.content().replace(from, to, content)?;
        Ok(self.with_content(inner))
    }

    pub fn remove_mark(&self, from: usize, to: usize, mark: &Mark) -> Result<Node, ModelError> {
        if from > to || to > self.content_size() {
            return Err(ModelError::InvalidReplace { from, to });
        }
        Ok(self.with_content(self.content().map_inline(from, to, &|node: &Node| node.without_mark(mark))))
    }

    pub fn add_mark(&self, from: usize, to: usize, mark: &Mark) -> Result<Node, ModelError> {
        if from > to || to > self.content_size() {
            return Err(ModelError::InvalidReplace { from, to });
        }
        Ok(self.with_content(self.content().map_inline(from, to, &|node: &Node| node.with_mark(mark))))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Node::ptr_eq(self, other)
            || (self.0.kind == other.0.kind
                && self.0.attrs == other.0.attrs
                && self.0.marks == other.0.marks
                && self.0.content == other.0.content)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.marks.is_empty() {
            write!(f, "{:?}", self.0.marks)?;
        }
        match &self.0.content {
            Content::Text(text) => write!(f, "{text:?}"),
            Content::Leaf => write!(f, "{}{:?}", self.kind(), self.attrs()),
            Content::Branch(fragment) => {
                write!(f, "{}", self.kind())?;
                if !self.attrs().is_empty() {
                    write!(f, "{:?}", self.attrs())?;
                }
                f.debug_list().entries(fragment.children()).finish()
            }
        }
    }
}

/// An ordered run of sibling nodes.
#[derive(Clone, Default, PartialEq)]
pub struct Fragment {
    children: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment, joining adjacent text nodes that carry equal marks
    /// and dropping empty text.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut children: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.is_text() && node.node_size() == 0 {
                continue;
            }
            if let Some(last) = children.last_mut()
                && last.is_text()
                && node.is_text()
                && last.marks() == node.marks()
            {
                let joined = format!(
                    "{}{}",
                    last.text_str().unwrap_or_default(),
                    node.text_str().unwrap_or_default()
                );
                *last = Node::text_with_marks(joined, last.marks().to_vec());
                continue;
            }
            children.push(node);
        }
        let size = children.iter().map(Node::node_size).sum();
        Self { children, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    /// Index of the child at `pos` and the offset where that child starts.
    /// A position on a child boundary maps to the child after it.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        if pos >= self.size {
            return (self.children.len(), self.size);
        }
        let mut cur = 0;
        for (index, child) in self.children.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return (index + 1, end);
                }
                return (index, cur);
            }
            cur = end;
        }
        (self.children.len(), self.size)
    }

    pub(crate) fn collect_descendants(&self, start: usize, out: &mut Vec<(usize, Node)>) {
        let mut pos = start;
        for child in &self.children {
            out.push((pos, child.clone()));
            if child.is_branch() {
                child.content().collect_descendants(pos + 1, out);
            }
            pos += child.node_size();
        }
    }

    /// Splice `content` over `from..to`. Both ends must sit in the same
    /// parent; text nodes cut by the range are split.
    pub fn replace(&self, from: usize, to: usize, content: &Fragment) -> Result<Fragment, ModelError> {
        if from > to || to > self.size {
            return Err(ModelError::InvalidReplace { from, to });
        }

        let mut offset = 0;
        for (index, child) in self.children.iter().enumerate() {
            let end = offset + child.node_size();
            if child.is_branch() && from > offset && to < end {
                let inner = child
                    .content()
                    .replace(from - offset - 1, to - offset - 1, content)?;
                let mut children = self.children.clone();
                children[index] = child.with_content(inner);
                return Ok(Fragment::from_nodes(children));
            }
            offset = end;
        }

        let mut before = Vec::new();
        let mut after = Vec::new();
        offset = 0;
        for child in &self.children {
            let end = offset + child.node_size();
            if end <= from {
                before.push(child.clone());
            } else if offset >= to {
                after.push(child.clone());
            } else if child.is_text() {
                if offset < from {
                    before.push(child.cut_text(0, from - offset));
                }
                if end > to {
                    after.push(child.cut_text(to - offset, end - offset));
                }
            } else if offset < from || end > to {
                return Err(ModelError::InvalidReplace { from, to });
            }
            offset = end;
        }

        before.extend(content.children.iter().cloned());
        before.extend(after);
        Ok(Fragment::from_nodes(before))
    }

    /// Rebuild the inline nodes covered by `from..to` with `f`, splitting
    /// text at the bounds. Branches are descended into but kept as they are.
    pub(crate) fn map_inline(&self, from: usize, to: usize, f: &dyn Fn(&Node) -> Node) -> Fragment {
        let mut out = Vec::with_capacity(self.children.len());
        let mut offset = 0;
        for child in &self.children {
            let size = child.node_size();
            let end = offset + size;
            if end <= from || offset >= to {
                out.push(child.clone());
            } else if child.is_text() {
                let start = from.max(offset) - offset;
                let stop = to.min(end) - offset;
                if start > 0 {
                    out.push(child.cut_text(0, start));
                }
                out.push(f(&child.cut_text(start, stop)));
                if stop < size {
                    out.push(child.cut_text(stop, size));
                }
            } else if child.is_branch() {
                let inner_from = from.saturating_sub(offset + 1);
                let inner_to = (to - offset - 1).min(child.content_size());
                let inner = child.content().map_inline(inner_from, inner_to, f);
                out.push(child.with_content(inner));
            } else {
                out.push(f(child));
            }
            offset = end;
        }
        Fragment::from_nodes(out)
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.children).finish()
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}
