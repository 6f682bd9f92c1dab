//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::editing::codec::{BlockCodec, BlockSpec, RootKind, slot_type};
use crate::model::{AttrValue, Attrs, DomElement, Mark, Node, Schema};

/// A mark block with no attributes of its own.
pub struct NoteBlock;

impl BlockSpec for NoteBlock {
    fn name(&self) -> &str {
        "note"
    }

    fn tag(&self) -> &str {
        "co-note"
    }

    fn kind(&self) -> RootKind {
        RootKind::Mark
    }

    fn attributes(&self) -> Attrs {
        Attrs::new()
    }

    fn to_dom(&self, _attrs: &Attrs) -> DomElement {
        DomElement::new("co-note")
    }

    fn from_dom(&self, _el: &DomElement) -> Attrs {
        Attrs::new()
    }
}

/// Default blocks plus the `note` mark block.
pub fn fixture_codec() -> BlockCodec {
    let mut codec = BlockCodec::with_defaults();
    codec.register(Arc::new(NoteBlock));
    codec
}

pub fn fixture_schema() -> Schema {
    fixture_codec().schema().clone()
}

pub fn para(children: Vec<Node>) -> Node {
    Node::branch("paragraph", Attrs::new(), children)
}

/// A link block node with both slots present.
pub fn link(id: &str, title: Vec<Node>, content: Vec<Node>) -> Node {
    let mut attrs = fixture_codec().default_attrs("link").unwrap_or_default();
    attrs.insert("id".into(), AttrValue::from(id));
    Node::branch(
        "link",
        attrs,
        vec![
            Node::branch(slot_type("link", "title"), Attrs::new(), title),
            Node::branch(slot_type("link", "content"), Attrs::new(), content),
        ],
    )
}

pub fn note(id: &str) -> Mark {
    let mut attrs = fixture_codec().default_attrs("note").unwrap_or_default();
    attrs.insert("id".into(), AttrValue::from(id));
    Mark::new("note", attrs)
}
