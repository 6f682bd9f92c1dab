//! The editor: one current tree and the single place edits are applied.
//!
//! Helpers and resolvers only ever build [`Transaction`]s; `apply` is the
//! serialized step that swaps the current tree. Resolver completions queue
//! up on a channel and are applied by [`Editor::process_resolutions`]
//! against whatever tree is current at that point.

use log::{debug, error, info};
use regex::Regex;

use crate::editing::EditError;
use crate::editing::ancestors::{BlockParent, block_parents};
use crate::editing::codec::BlockCodec;
use crate::editing::commands;
use crate::editing::descriptor::BlockDescriptor;
use crate::editing::paste::{DEFAULT_URL_PATTERN, PasteReconciler, reconcile_pasted_ids};
use crate::editing::position::{Coordinate, resolve};
use crate::editing::resolver::{
    DEFAULT_MARKER_PREFIX, Outcome, Reference, ResolveContext, ResolverChain, ResolverCoordinator,
    settle,
};
use crate::editing::selection::{Selection, selection_parents};
use crate::editing::transaction::Transaction;
use crate::model::dom::fragment_to_html;
use crate::model::{Fragment, Node, Side};

#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// What counts as a reference in pasted text.
    pub url_pattern: Regex,
    /// Prefix of placeholder markers.
    pub marker_prefix: String,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            url_pattern: DEFAULT_URL_PATTERN.clone(),
            marker_prefix: DEFAULT_MARKER_PREFIX.to_string(),
        }
    }
}

pub struct Editor {
    doc: Node,
    codec: BlockCodec,
    coordinator: ResolverCoordinator,
    options: EditorOptions,
}

impl Editor {
    pub fn new(doc: Node, codec: BlockCodec, chain: ResolverChain, options: EditorOptions) -> Self {
        let coordinator = ResolverCoordinator::new(chain, options.marker_prefix.clone());
        Self {
            doc,
            codec,
            coordinator,
            options,
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn codec(&self) -> &BlockCodec {
        &self.codec
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// A fresh transaction against the current tree.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(&self.doc)
    }

    /// Make `tr` the current tree. Transactions started before the last
    /// apply are refused.
    pub fn apply(&mut self, tr: Transaction) -> Result<(), EditError> {
        if !Node::ptr_eq(tr.base(), &self.doc) {
            return Err(EditError::StaleTransaction);
        }
        if tr.doc_changed() {
            debug!("applying {} step(s), touching {:?}", tr.steps().len(), tr.changed());
            self.doc = tr.doc().clone();
        }
        Ok(())
    }

    fn apply_some(&mut self, tr: Option<Transaction>) -> Result<bool, EditError> {
        match tr {
            Some(tr) => self.apply(tr).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn block_parent(&self, coordinate: &Coordinate) -> Option<BlockParent> {
        commands::select(&self.codec, &self.doc, coordinate)
    }

    pub fn block_parents(&self, coordinate: &Coordinate) -> Result<Vec<BlockParent>, EditError> {
        let rpos = resolve(&self.doc, coordinate)?;
        Ok(block_parents(self.codec.schema(), &rpos, Side::After))
    }

    pub fn selection_parents(&self, from: usize, to: usize) -> Result<Vec<BlockParent>, EditError> {
        let selection = Selection::new(&self.doc, from, to)?;
        Ok(selection_parents(self.codec.schema(), &selection))
    }

    /// Run `reference` through the resolver chain and build the
    /// placeholder node, if some resolver claimed it.
    pub fn resolve_reference(&self, reference: &Reference, hint: Option<usize>) -> Option<Node> {
        let ctx = ResolveContext {
            codec: &self.codec,
            doc: &self.doc,
        };
        let placeholder = self.coordinator.resolve(&ctx, reference, hint)?;
        match self.codec.block_to_node(&placeholder) {
            Ok(node) => Some(node),
            Err(err) => {
                error!("cannot build {} placeholder: {err}", placeholder.kind);
                None
            }
        }
    }

    /// Insert pasted content at `pos`: copied blocks get fresh ids and
    /// references in the text become placeholders.
    pub fn paste(&mut self, fragment: &Fragment, pos: usize) -> Result<(), EditError> {
        let fragment = reconcile_pasted_ids(self.codec.schema(), &self.doc, fragment);
        let transformed = PasteReconciler {
            codec: &self.codec,
            coordinator: &self.coordinator,
            doc: &self.doc,
            url_pattern: &self.options.url_pattern,
        }
        .transform_pasted(&fragment, pos);

        let mut tr = self.transaction();
        tr.insert(pos, transformed)?;
        self.apply(tr)
    }

    pub fn paste_text(&mut self, text: &str, pos: usize) -> Result<(), EditError> {
        self.paste(&Fragment::from(vec![Node::text(text)]), pos)
    }

    /// Apply every resolver completion received so far.
    pub fn process_resolutions(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for resolution in self.coordinator.drain() {
            let (outcome, tr) = settle(&self.codec, &self.doc, resolution);
            if let Some(tr) = tr
                && let Err(err) = self.apply(tr)
            {
                error!("cannot apply resolution: {err}");
            }
            outcomes.push(outcome);
        }
        if !outcomes.is_empty() {
            info!("processed {} resolution(s)", outcomes.len());
        }
        outcomes
    }

    pub fn insert(&mut self, coordinate: &Coordinate, desc: &BlockDescriptor) -> Result<bool, EditError> {
        let tr = commands::insert(&self.codec, &self.doc, coordinate, desc)?;
        self.apply_some(tr)
    }

    pub fn delete(&mut self, from: &Coordinate, to: &Coordinate) -> Result<bool, EditError> {
        let tr = commands::delete(&self.doc, from, to)?;
        self.apply_some(tr)
    }

    pub fn replace(&mut self, coordinate: &Coordinate, desc: &BlockDescriptor) -> Result<bool, EditError> {
        let tr = commands::replace(&self.codec, &self.doc, coordinate, desc)?;
        self.apply_some(tr)
    }

    pub fn remove(&mut self, coordinate: &Coordinate) -> Result<bool, EditError> {
        let tr = commands::remove(&self.codec, &self.doc, coordinate)?;
        self.apply_some(tr)
    }

    pub fn refresh(&mut self, coordinate: &Coordinate) -> Result<bool, EditError> {
        let tr = commands::refresh(&self.codec, &self.doc, coordinate)?;
        self.apply_some(tr)
    }

    pub fn to_html(&self) -> String {
        fragment_to_html(&self.codec.serialize_fragment(self.doc.content()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::codec::FOCUSED;
    use crate::editing::error::ResolveError;
    use crate::editing::link::LinkResolver;
    use crate::editing::resolver::Completion;
    use crate::model::AttrValue;
    use crate::tests::{fixture_codec, para};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn editor(chain: ResolverChain) -> Editor {
        let doc = Node::doc(vec![para(vec![])]);
        Editor::new(doc, fixture_codec(), chain, EditorOptions::default())
    }

    fn placeholder(editor: &Editor) -> Option<(usize, Node)> {
        editor
            .doc()
            .descendants()
            .into_iter()
            .find(|(_, node)| node.kind() == "link")
    }

    /// Claims everything and keeps the completion for the test to fire.
    fn holding(slot: Arc<Mutex<Option<Completion>>>) -> ResolverChain {
        ResolverChain::new().with(move |_: &ResolveContext<'_>, _: &Reference, done: Completion| {
            *slot.lock().unwrap() = Some(done);
            Some(BlockDescriptor::new("link").with_attr("variant", "none"))
        })
    }

    #[test]
    fn stale_transactions_are_refused() {
        let mut editor = editor(ResolverChain::new());
        let old = editor.transaction();
        editor.paste_text("x", 1).unwrap();

        let mut tr = old;
        tr.insert(1, Fragment::from(vec![Node::text("y")])).unwrap();
        assert_eq!(editor.apply(tr), Err(EditError::StaleTransaction));
        assert_eq!(editor.doc().text_content(), "x");
    }

    #[test]
    fn pasted_urls_resolve_into_links() {
        let chain = ResolverChain::new().with(LinkResolver::default());
        let mut editor = editor(chain);
        editor.paste_text("see http://example.com now", 1).unwrap();

        let (pos, pending) = placeholder(&editor).unwrap();
        assert_eq!(pos, 5);
        assert_eq!(pending.attr("variant"), Some(&AttrValue::from("none")));

        let outcomes = editor.process_resolutions();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0], Outcome::Replaced { pos: 5, .. }));
        let (_, resolved) = placeholder(&editor).unwrap();
        assert_eq!(resolved.attr("variant"), Some(&AttrValue::from("link")));
        assert_eq!(resolved.attr("url"), Some(&AttrValue::from("http://example.com")));
        assert!(editor.to_html().contains("href=\"http://example.com\""));
    }

    #[test]
    fn placeholder_deleted_before_completion_is_left_alone() {
        let chain = ResolverChain::new().with(LinkResolver::default());
        let mut editor = editor(chain);
        editor.paste_text("see http://example.com now", 1).unwrap();

        let (pos, pending) = placeholder(&editor).unwrap();
        let end = pos + pending.node_size();
        editor.delete(&Coordinate::Pos(pos), &Coordinate::Pos(end)).unwrap();
        let before = editor.doc().clone();

        let outcomes = editor.process_resolutions();
        assert!(matches!(&outcomes[..], [Outcome::Stale { .. }]));
        assert!(Node::ptr_eq(editor.doc(), &before));
        assert_eq!(editor.doc().text_content(), "see  now");
    }

    #[test]
    fn failed_resolution_removes_the_placeholder() {
        let slot = Arc::new(Mutex::new(None));
        let mut editor = editor(holding(Arc::clone(&slot)));
        editor.paste_text("a http://example.com b", 1).unwrap();
        assert!(placeholder(&editor).is_some());

        let done = slot.lock().unwrap().take().unwrap();
        done.complete(Err(ResolveError::Failed("offline".into())));

        let outcomes = editor.process_resolutions();
        assert!(matches!(&outcomes[..], [Outcome::Removed { pos: 3, .. }]));
        assert!(placeholder(&editor).is_none());
        assert_eq!(editor.doc().text_content(), "a  b");
    }

    #[test]
    fn resolution_lands_where_the_placeholder_moved_and_keeps_focus() {
        let slot = Arc::new(Mutex::new(None));
        let mut editor = editor(holding(Arc::clone(&slot)));
        editor.paste_text("http://example.com", 1).unwrap();

        // type in front of the placeholder and focus it
        editor.paste_text("moved ", 1).unwrap();
        let (pos, pending) = placeholder(&editor).unwrap();
        assert_eq!(pos, 7);
        let mut attrs = pending.attrs().clone();
        attrs.insert(FOCUSED.to_string(), AttrValue::Bool(true));
        let mut tr = editor.transaction();
        tr.replace_with(pos, pos + pending.node_size(), Fragment::from(vec![pending.with_attrs(attrs)]))
            .unwrap();
        editor.apply(tr).unwrap();

        let done = slot.lock().unwrap().take().unwrap();
        done.complete(Ok(BlockDescriptor::new("link")
            .with_attr("variant", "link")
            .with_attr("url", "http://example.com")));

        let outcomes = editor.process_resolutions();
        assert!(matches!(&outcomes[..], [Outcome::Replaced { pos: 7, .. }]));
        let (_, resolved) = placeholder(&editor).unwrap();
        assert_eq!(resolved.attr("variant"), Some(&AttrValue::from("link")));
        assert_eq!(resolved.attr(FOCUSED), Some(&AttrValue::Bool(true)));
    }

    #[test]
    fn block_queries_go_through_the_current_tree() {
        let chain = ResolverChain::new().with(LinkResolver::default());
        let mut editor = editor(chain);
        editor.paste_text("http://example.com", 1).unwrap();

        let parent = editor.block_parent(&Coordinate::Pos(3)).unwrap();
        assert_eq!(parent.kind(), "link");
        assert_eq!(parent.slot(), Some("title"));
        assert_eq!(editor.block_parents(&Coordinate::Pos(3)).unwrap().len(), 1);
        assert!(editor.selection_parents(0, 1).unwrap().is_empty());

        assert!(editor.remove(&Coordinate::Pos(3)).unwrap());
        assert!(placeholder(&editor).is_none());
        assert!(!editor.remove(&Coordinate::Pos(1)).unwrap());
    }
}
