use std::collections::HashMap;

/// Semantic role a node or mark type plays in block mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRole {
    /// Ordinary structure (paragraphs, lists, emphasis...).
    Plain,
    /// A semantic unit boundary: the node or mark is a block of its own.
    Root,
    /// A named content slot inside a block root.
    Content(String),
}

impl BlockRole {
    pub fn is_root(&self) -> bool {
        matches!(self, BlockRole::Root)
    }

    pub fn slot(&self) -> Option<&str> {
        match self {
            BlockRole::Content(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_tagged(&self) -> bool {
        !matches!(self, BlockRole::Plain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: String,
    /// DOM tag used by the generic parser/serializer. Slot nodes have none:
    /// they only exist inside their block's template.
    pub tag: Option<String>,
    pub role: BlockRole,
    pub leaf: bool,
}

impl NodeSpec {
    pub fn plain(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: Some(tag.to_string()),
            role: BlockRole::Plain,
            leaf: false,
        }
    }

    pub fn leaf(name: &str, tag: &str) -> Self {
        Self {
            leaf: true,
            ..Self::plain(name, tag)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSpec {
    pub name: String,
    pub tag: String,
    pub role: BlockRole,
}

impl MarkSpec {
    pub fn plain(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            role: BlockRole::Plain,
        }
    }
}

/// Registration table of node and mark types.
///
/// Lookups are keyed by type name; nothing about a node's role is inferred
/// from its shape.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: HashMap<String, NodeSpec>,
    marks: HashMap<String, MarkSpec>,
}

pub const TEXT: &str = "text";
pub const DOC: &str = "doc";

impl Schema {
    /// Document, paragraphs, quotes, bullet lists and the usual inline marks.
    pub fn basic() -> Self {
        let mut schema = Self::default();
        schema.add_node(NodeSpec {
            name: DOC.to_string(),
            tag: None,
            role: BlockRole::Plain,
            leaf: false,
        });
        schema.add_node(NodeSpec::plain("paragraph", "p"));
        schema.add_node(NodeSpec::plain("blockquote", "blockquote"));
        schema.add_node(NodeSpec::plain("bullet_list", "ul"));
        schema.add_node(NodeSpec::plain("list_item", "li"));
        schema.add_node(NodeSpec::leaf("hard_break", "br"));
        schema.add_mark(MarkSpec::plain("em", "em"));
        schema.add_mark(MarkSpec::plain("strong", "strong"));
        schema.add_mark(MarkSpec::plain("anchor", "a"));
        schema
    }

    pub fn add_node(&mut self, spec: NodeSpec) {
        self.nodes.insert(spec.name.clone(), spec);
    }

    pub fn add_mark(&mut self, spec: MarkSpec) {
        self.marks.insert(spec.name.clone(), spec);
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn mark(&self, name: &str) -> Option<&MarkSpec> {
        self.marks.get(name)
    }

    pub fn node_role(&self, name: &str) -> &BlockRole {
        self.nodes
            .get(name)
            .map(|spec| &spec.role)
            .unwrap_or(&BlockRole::Plain)
    }

    pub fn mark_role(&self, name: &str) -> &BlockRole {
        self.marks
            .get(name)
            .map(|spec| &spec.role)
            .unwrap_or(&BlockRole::Plain)
    }

    pub fn node_for_tag(&self, tag: &str) -> Option<&NodeSpec> {
        self.nodes
            .values()
            .find(|spec| spec.tag.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    pub fn mark_for_tag(&self, tag: &str) -> Option<&MarkSpec> {
        self.marks
            .values()
            .find(|spec| spec.tag.eq_ignore_ascii_case(tag))
    }
}
