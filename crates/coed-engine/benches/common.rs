// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use coed_engine::editing::codec::slot_type;
use coed_engine::{AttrValue, Attrs, BlockCodec, Node};

#[allow(dead_code)]
pub fn link(codec: &BlockCodec, id: &str, title: &str, content: Vec<Node>) -> Node {
    let mut attrs = codec.default_attrs("link").unwrap_or_default();
    attrs.insert("id".into(), AttrValue::from(id));
    Node::branch(
        "link",
        attrs,
        vec![
            Node::branch(slot_type("link", "title"), Attrs::new(), vec![Node::text(title)]),
            Node::branch(slot_type("link", "content"), Attrs::new(), content),
        ],
    )
}

/// Links nested `depth` deep, each content slot holding some text and the
/// next link. Returns the document and a position in the innermost title.
#[allow(dead_code)]
pub fn nested_links(codec: &BlockCodec, depth: usize) -> (Node, usize) {
    let mut block = link(codec, "l0", "innermost", vec![]);
    for level in 1..depth {
        block = link(
            codec,
            &format!("l{level}"),
            "title",
            vec![Node::text("some text before "), block],
        );
    }
    let doc = Node::doc(vec![block]);

    let mut pos = 0;
    let mut node = doc.child(0).cloned();
    while let Some(current) = node {
        // into the link, then past its title slot into the content slot
        let title = current.child(0).map(Node::node_size).unwrap_or_default();
        match current.child(1).and_then(|content| content.child(1)).cloned() {
            Some(next) => {
                pos += 1 + title + 1 + "some text before ".chars().count();
                node = Some(next);
            }
            None => {
                pos += 3;
                node = None;
            }
        }
    }
    (doc, pos)
}

#[allow(dead_code)]
pub fn paragraphs_with_urls(count: usize) -> String {
    (0..count)
        .map(|i| format!("paragraph {i} links to https://example.com/page/{i} and more text. "))
        .collect()
}
