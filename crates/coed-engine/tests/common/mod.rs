// Helpers shared by the integration test files; each file uses a subset.
#![allow(dead_code)]

use coed_engine::editing::codec::slot_type;
use coed_engine::{AttrValue, Attrs, BlockCodec, Node};

pub fn codec() -> BlockCodec {
    BlockCodec::with_defaults()
}

pub fn para(children: Vec<Node>) -> Node {
    Node::branch("paragraph", Attrs::new(), children)
}

pub fn text(s: &str) -> Node {
    Node::text(s)
}

pub fn link(id: &str, title: Vec<Node>, content: Vec<Node>) -> Node {
    let mut attrs = codec().default_attrs("link").unwrap();
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

/// `ab` paragraph, a link with nested link in its content, `cd` paragraph.
///
/// outer link 4..31, its title slot 5..12, its content slot 12..30,
/// inner link 13..25 with title slot 14..21 ("Inner" at 15..20).
pub fn nested_doc() -> Node {
    let inner = link("inner", vec![text("Inner")], vec![text("x")]);
    Node::doc(vec![
        para(vec![text("ab")]),
        link("outer", vec![text("Outer")], vec![inner, text("tail")]),
        para(vec![text("cd")]),
    ])
}
