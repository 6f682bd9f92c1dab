//! Clipboard content reconciliation.
//!
//! Pasted text is scanned for references (bare URLs) which become resolver
//! placeholders, and pasted blocks that duplicate a block already in the
//! document get a fresh id.

use std::collections::{HashMap, HashSet};

use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::editing::codec::{BlockCodec, ID};
use crate::editing::resolver::{Reference, ResolveContext, ResolverCoordinator};
use crate::model::{AttrValue, Fragment, Mark, Node, Schema};

/// Bare http(s) URLs, without trailing sentence punctuation. Closing
/// brackets are matched and then trimmed by [`trim_unbalanced`].
pub static DEFAULT_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bhttps?://[^\s<>"']*[^\s<>"'.,;:!?]"#).unwrap()
});

/// `found` without closing brackets that have no opener inside it, and
/// without the sentence punctuation left in front of them.
pub fn trim_unbalanced(found: &str) -> &str {
    let mut url = found;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let opener = match last {
            ')' => '(',
            ']' => '[',
            '.' | ',' | ';' | ':' | '!' | '?' => {
                url = &url[..url.len() - 1];
                continue;
            }
            _ => return url,
        };
        if url.matches(last).count() <= url.matches(opener).count() {
            return url;
        }
        url = &url[..url.len() - 1];
    }
}

pub struct PasteReconciler<'a> {
    pub codec: &'a BlockCodec,
    pub coordinator: &'a ResolverCoordinator,
    /// Tree the paste goes into.
    pub doc: &'a Node,
    pub url_pattern: &'a Regex,
}

impl PasteReconciler<'_> {
    /// Replace references in the text of `fragment` with placeholder
    /// blocks. `anchor` is where the fragment's content will start once
    /// inserted; placeholders carry their expected position from it as a
    /// hint. Unchanged nodes are shared with the input.
    pub fn transform_pasted(&self, fragment: &Fragment, anchor: usize) -> Fragment {
        self.transform(fragment, anchor).unwrap_or_else(|| fragment.clone())
    }

    /// `None` when nothing changed.
    fn transform(&self, fragment: &Fragment, start: usize) -> Option<Fragment> {
        let mut out = Vec::with_capacity(fragment.child_count());
        let mut changed = false;
        let mut pos = start;

        for child in fragment.children() {
            if let Some(text) = child.text_str() {
                if self.split_text(text, child.marks(), pos, &mut out) {
                    changed = true;
                } else {
                    out.push(child.clone());
                }
            } else if child.is_branch() {
                match self.transform(child.content(), pos + 1) {
                    Some(inner) => {
                        changed = true;
                        out.push(child.with_content(inner));
                    }
                    None => out.push(child.clone()),
                }
            } else {
                out.push(child.clone());
            }
            pos = start + out.iter().map(Node::node_size).sum::<usize>();
        }

        changed.then(|| Fragment::from_nodes(out))
    }

    /// Push the pieces of `text` to `out` if any reference in it was
    /// replaced; otherwise leave `out` alone and return false.
    fn split_text(&self, text: &str, marks: &[Mark], start: usize, out: &mut Vec<Node>) -> bool {
        let ctx = ResolveContext {
            codec: self.codec,
            doc: self.doc,
        };
        let mut replaced = false;
        let mut pos = start;
        let mut last = 0;

        for found in self.url_pattern.find_iter(text) {
            let url = trim_unbalanced(found.as_str());
            if url.is_empty() {
                continue;
            }
            let head = &text[last..found.start()];
            let hint = pos + head.chars().count();
            let Some(placeholder) = self
                .coordinator
                .resolve(&ctx, &Reference::url(url), Some(hint))
            else {
                continue;
            };
            let node = match self.codec.block_to_node(&placeholder) {
                Ok(node) => node,
                Err(err) => {
                    error!("cannot build placeholder for {url}: {err}");
                    continue;
                }
            };

            if !head.is_empty() {
                out.push(Node::text_with_marks(head, marks.to_vec()));
            }
            pos = hint + node.node_size();
            out.push(node);
            last = found.start() + url.len();
            replaced = true;
        }

        if replaced && last < text.len() {
            out.push(Node::text_with_marks(&text[last..], marks.to_vec()));
        }
        replaced
    }
}

/// Give a fresh id to pasted block roots whose id is already used in
/// `doc`: those are copies. Ids not found in `doc` are kept, as the block
/// was cut or dragged from elsewhere.
pub fn reconcile_pasted_ids(schema: &Schema, doc: &Node, fragment: &Fragment) -> Fragment {
    let existing = block_ids(schema, doc.content());
    let mut renamed = HashMap::new();
    reassign(schema, &existing, &mut renamed, fragment).unwrap_or_else(|| fragment.clone())
}

fn block_ids(schema: &Schema, fragment: &Fragment) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut nodes = Vec::new();
    fragment.collect_descendants(0, &mut nodes);
    for (_, node) in nodes {
        if schema.node_role(node.kind()).is_root()
            && let Some(id) = node.attr(ID).and_then(AttrValue::as_str)
        {
            ids.insert(id.to_string());
        }
        for mark in node.marks() {
            if schema.mark_role(mark.kind()).is_root()
                && let Some(id) = mark.attr(ID).and_then(AttrValue::as_str)
            {
                ids.insert(id.to_string());
            }
        }
    }
    ids
}

fn reassign(
    schema: &Schema,
    existing: &HashSet<String>,
    renamed: &mut HashMap<String, String>,
    fragment: &Fragment,
) -> Option<Fragment> {
    let mut changed = false;
    let children: Vec<Node> = fragment
        .children()
        .iter()
        .map(|child| {
            let mut node = child.clone();
            if schema.node_role(node.kind()).is_root()
                && let Some(id) = fresh_id(existing, renamed, node.attr(ID))
            {
                let mut attrs = node.attrs().clone();
                attrs.insert(ID.to_string(), AttrValue::from(id));
                node = node.with_attrs(attrs);
                changed = true;
            }

            if let Some(index) = node
                .marks()
                .iter()
                .position(|mark| schema.mark_role(mark.kind()).is_root())
                && let Some(id) = fresh_id(existing, renamed, node.marks()[index].attr(ID))
            {
                let mut marks = node.marks().to_vec();
                let mut attrs = marks[index].attrs().clone();
                attrs.insert(ID.to_string(), AttrValue::from(id));
                marks[index] = Mark::new(marks[index].kind(), attrs);
                node = node.with_marks(marks);
                changed = true;
            }

            if node.is_branch()
                && let Some(inner) = reassign(schema, existing, renamed, node.content())
            {
                node = node.with_content(inner);
                changed = true;
            }
            node
        })
        .collect();
    changed.then(|| Fragment::from_nodes(children))
}

fn fresh_id(
    existing: &HashSet<String>,
    renamed: &mut HashMap<String, String>,
    id: Option<&AttrValue>,
) -> Option<String> {
    let id = id.and_then(AttrValue::as_str).filter(|id| existing.contains(*id))?;
    let fresh = renamed
        .entry(id.to_string())
        .or_insert_with(|| Uuid::new_v4().simple().to_string())
        .clone();
    debug!("pasted block {id} is a copy, renamed to {fresh}");
    Some(fresh)
}
