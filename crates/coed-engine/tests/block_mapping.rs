use coed_engine::editing::{
    BlockParent, Coordinate, DomHandle, EditError, Selection, block_parent, block_parents,
    selection_parents,
};
use coed_engine::model::Side;
use coed_engine::{Editor, EditorOptions, Node, ResolverChain};
use pretty_assertions::assert_eq;
use serde::Serialize;

mod common;
use common::{codec, nested_doc};

#[derive(Debug, PartialEq, Serialize)]
struct Entry {
    kind: String,
    slot: Option<String>,
    id: String,
    start: usize,
    end: usize,
}

fn entries(chain: &[BlockParent]) -> Vec<Entry> {
    chain
        .iter()
        .map(|parent| Entry {
            kind: parent.kind().to_string(),
            slot: parent.slot().map(str::to_string),
            id: parent
                .root
                .target
                .attr("id")
                .map(ToString::to_string)
                .unwrap_or_default(),
            start: parent.root.range.start,
            end: parent.root.range.end,
        })
        .collect()
}

#[test]
fn nested_chain_snapshot() {
    let codec = codec();
    let doc = nested_doc();
    let rpos = doc.resolve(16).unwrap();
    let chain = entries(&block_parents(codec.schema(), &rpos, Side::After));
    insta::assert_yaml_snapshot!("nested_chain", chain);
}

/// Every position inside a root maps to that root, whichever slot it is in.
#[test]
fn positions_inside_a_root_map_to_it() {
    let codec = codec();
    let doc = nested_doc();
    let outer = doc.child(1).unwrap().clone();
    let inner = outer.child(1).unwrap().child(0).unwrap().clone();

    for pos in 4..31 {
        let rpos = doc.resolve(pos).unwrap();
        let parent = block_parent(codec.schema(), &rpos, Side::After).unwrap();
        let node = parent.root.target.as_node().unwrap();
        let expected = if (13..25).contains(&pos) { &inner } else { &outer };
        assert!(Node::ptr_eq(node, expected), "wrong root at {pos}");
    }
    for pos in [0, 1, 2, 3, 31, 32, 33] {
        let rpos = doc.resolve(pos).unwrap();
        assert!(block_parent(codec.schema(), &rpos, Side::After).is_none(), "{pos}");
    }
}

#[test]
fn empty_selection_is_the_forward_chain() {
    let codec = codec();
    let doc = nested_doc();
    for pos in 0..=doc.content_size() {
        let selection = Selection::cursor(&doc, pos).unwrap();
        let rpos = doc.resolve(pos).unwrap();
        assert_eq!(
            entries(&selection_parents(codec.schema(), &selection)),
            entries(&block_parents(codec.schema(), &rpos, Side::After)),
            "{pos}"
        );
    }
}

#[test]
fn selection_across_sibling_roots_has_no_common_block() {
    let codec = codec();
    let first = common::link("same", vec![common::text("A")], vec![]);
    let second = common::link("same", vec![common::text("A")], vec![]);
    assert_eq!(first, second);
    let doc = Node::doc(vec![first.clone(), second]);
    let size = first.node_size();

    let selection = Selection::new(&doc, 2, size + 2).unwrap();
    assert!(selection_parents(codec.schema(), &selection).is_empty());

    let within = Selection::new(&doc, 2, 3).unwrap();
    assert_eq!(entries(&selection_parents(codec.schema(), &within)).len(), 1);
}

#[test]
fn selection_inside_nested_roots_keeps_the_shared_part() {
    let codec = codec();
    let doc = nested_doc();
    // from the inner title to the outer tail text
    let selection = Selection::new(&doc, 16, 27).unwrap();
    let shared = entries(&selection_parents(codec.schema(), &selection));
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, "outer");
}

#[test]
fn handles_resolve_like_positions() {
    let editor = Editor::new(nested_doc(), codec(), ResolverChain::new(), EditorOptions::default());
    let by_handle = editor
        .block_parent(&DomHandle::new(vec![1, 1, 0]).into())
        .unwrap();
    assert_eq!(by_handle.root.target.attr("id").map(ToString::to_string), Some("inner".into()));

    assert!(editor.block_parent(&DomHandle::new(vec![7]).into()).is_none());
    assert!(matches!(
        editor.block_parents(&Coordinate::Pos(500)),
        Err(EditError::NotFound(_))
    ));
}
