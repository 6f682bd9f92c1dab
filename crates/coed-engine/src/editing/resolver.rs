//! Resolver coordination: turning references into placeholder blocks now
//! and into real blocks later.
//!
//! A resolver that claims a reference returns a placeholder descriptor at
//! once and reports the final descriptor through its [`Completion`], which
//! may fire long after the tree has moved on. The placeholder is stamped
//! with a marker id; completions find it again by that marker in whatever
//! tree is current when they are processed, never by a stored position.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use log::{debug, error, warn};
use uuid::Uuid;

use crate::editing::EditError;
use crate::editing::codec::{BlockCodec, FOCUSED, ID};
use crate::editing::descriptor::BlockDescriptor;
use crate::editing::error::ResolveError;
use crate::editing::transaction::Transaction;
use crate::model::{AttrValue, Fragment, Node};

pub const DEFAULT_MARKER_PREFIX: &str = "id-colink-";

/// Something a resolver may turn into a block: a URL or a detached fragment.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub url: Option<String>,
    pub fragment: Option<Fragment>,
    pub title: Option<String>,
}

impl Reference {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn fragment(fragment: Fragment) -> Self {
        Self {
            fragment: Some(fragment),
            ..Self::default()
        }
    }

    /// Fill a missing title from the URL, else from the fragment's first child.
    pub fn with_default_title(mut self) -> Self {
        if self.title.is_none() {
            self.title = self.url.clone().or_else(|| {
                self.fragment
                    .as_ref()
                    .and_then(Fragment::first_child)
                    .map(Node::text_content)
            });
        }
        self
    }
}

/// Read-only view handed to resolvers.
pub struct ResolveContext<'a> {
    pub codec: &'a BlockCodec,
    pub doc: &'a Node,
}

/// A placeholder reference that survives edits: the marker is
/// authoritative, the position hint is only what the caller expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeakPos {
    pub marker: String,
    pub hint: Option<usize>,
}

impl WeakPos {
    /// Position and node of the placeholder in `doc`, if it is still there.
    pub fn locate(&self, doc: &Node) -> Option<(usize, Node)> {
        let marker = AttrValue::from(self.marker.as_str());
        if let Some(hint) = self.hint
            && let Some(node) = doc.node_at(hint)
            && node.attr(ID) == Some(&marker)
        {
            return Some((hint, node));
        }
        let found = doc.find_by_attr(ID, &marker);
        if let (Some((pos, _)), Some(hint)) = (&found, self.hint)
            && *pos != hint
        {
            debug!("placeholder {} moved from {hint} to {pos}", self.marker);
        }
        found
    }
}

/// A finished resolution, waiting to be applied.
#[derive(Debug)]
pub struct Resolution {
    pub target: WeakPos,
    pub result: Result<BlockDescriptor, ResolveError>,
}

/// One-shot callback handed to a resolver. Consuming `complete` means it
/// can fire at most once; dropping it unused abandons the placeholder.
#[derive(Debug)]
pub struct Completion {
    target: WeakPos,
    sender: Sender<Resolution>,
}

impl Completion {
    pub fn marker(&self) -> &str {
        &self.target.marker
    }

    pub fn complete(self, result: Result<BlockDescriptor, ResolveError>) {
        let marker = self.target.marker.clone();
        if self
            .sender
            .send(Resolution {
                target: self.target,
                result,
            })
            .is_err()
        {
            debug!("editor is gone, dropping resolution for {marker}");
        }
    }
}

pub trait Resolver: Send + Sync {
    /// Claim `reference` by returning a placeholder, or decline with `None`.
    /// A claiming resolver reports the final block through `done`.
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
        done: Completion,
    ) -> Option<BlockDescriptor>;
}

impl<F> Resolver for F
where
    F: Fn(&ResolveContext<'_>, &Reference, Completion) -> Option<BlockDescriptor> + Send + Sync,
{
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
        done: Completion,
    ) -> Option<BlockDescriptor> {
        self(ctx, reference, done)
    }
}

/// Ordered resolvers owned by one editor.
#[derive(Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.push(resolver);
        self
    }

    pub fn push(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Arc::new(resolver));
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

/// Runs references through a [`ResolverChain`] and collects completions.
pub struct ResolverCoordinator {
    chain: ResolverChain,
    marker_prefix: String,
    sender: Sender<Resolution>,
    receiver: Receiver<Resolution>,
}

impl ResolverCoordinator {
    pub fn new(chain: ResolverChain, marker_prefix: impl Into<String>) -> Self {
        let (sender, receiver) = channel();
        Self {
            chain,
            marker_prefix: marker_prefix.into(),
            sender,
            receiver,
        }
    }

    pub fn new_marker(&self) -> String {
        format!("{}{}", self.marker_prefix, Uuid::new_v4().simple())
    }

    /// Offer `reference` to each resolver in turn. The first placeholder
    /// returned wins and is stamped with the marker its completion carries.
    pub fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
        hint: Option<usize>,
    ) -> Option<BlockDescriptor> {
        let marker = self.new_marker();
        for resolver in &self.chain.resolvers {
            let done = Completion {
                target: WeakPos {
                    marker: marker.clone(),
                    hint,
                },
                sender: self.sender.clone(),
            };
            if let Some(mut placeholder) = resolver.resolve(ctx, reference, done) {
                debug!("reference claimed as {} placeholder {marker}", placeholder.kind);
                placeholder.id = Some(marker);
                return Some(placeholder);
            }
        }
        debug!("no resolver claimed {:?}", reference.url);
        None
    }

    /// Completions received so far, in arrival order.
    pub fn drain(&self) -> Vec<Resolution> {
        self.receiver.try_iter().collect()
    }
}

/// What applying a resolution did to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replaced { marker: String, pos: usize },
    Removed { marker: String, pos: usize },
    /// The placeholder is gone; nothing was changed.
    Stale { marker: String },
}

/// Turn a resolution into an edit of `doc`. Never fails: a vanished
/// placeholder is a no-op, a failed resolution or an unusable descriptor
/// removes the placeholder.
pub fn settle(codec: &BlockCodec, doc: &Node, resolution: Resolution) -> (Outcome, Option<Transaction>) {
    let marker = resolution.target.marker.clone();
    let Some((pos, placeholder)) = resolution.target.locate(doc) else {
        debug!("placeholder {marker} is no longer in the document");
        return (Outcome::Stale { marker }, None);
    };
    let end = pos + placeholder.node_size();

    let replacement = match resolution.result {
        Ok(mut desc) => {
            if placeholder.attr(FOCUSED).is_some_and(|f| !f.is_blank()) {
                desc.set_attr(FOCUSED, true);
            }
            codec.block_to_node(&desc).map_err(|err| {
                error!("cannot build block for {marker}: {err}");
                err
            })
        }
        Err(err) => {
            warn!("resolver for {marker} failed: {err}");
            Err(EditError::NotFound(marker.clone()))
        }
    };

    let mut tr = Transaction::new(doc);
    let (applied, outcome) = match replacement {
        Ok(node) => (
            tr.replace_with(pos, end, Fragment::from(vec![node])).map(|_| ()),
            Outcome::Replaced { marker: marker.clone(), pos },
        ),
        Err(_) => (
            tr.delete(pos, end).map(|_| ()),
            Outcome::Removed { marker: marker.clone(), pos },
        ),
    };
    match applied {
        Ok(()) => (outcome, Some(tr)),
        Err(err) => {
            error!("cannot apply resolution for {marker}: {err}");
            (Outcome::Stale { marker }, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::link::LinkResolver;
    use crate::model::DomNode;
    use crate::tests::{fixture_codec, para};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn declining(_: &ResolveContext<'_>, _: &Reference, _: Completion) -> Option<BlockDescriptor> {
        None
    }

    #[test]
    fn default_title_comes_from_url_then_fragment() {
        assert_eq!(
            Reference::url("http://a.b").with_default_title().title.as_deref(),
            Some("http://a.b")
        );
        let fragment = Fragment::from(vec![para(vec![Node::text("Heading")]), para(vec![])]);
        assert_eq!(
            Reference::fragment(fragment).with_default_title().title.as_deref(),
            Some("Heading")
        );
        let titled = Reference {
            title: Some("Given".into()),
            ..Reference::url("http://a.b")
        };
        assert_eq!(titled.with_default_title().title.as_deref(), Some("Given"));
    }

    #[test]
    fn first_claiming_resolver_wins_and_gets_the_marker() {
        let codec = fixture_codec();
        let doc = Node::doc(vec![]);
        let ctx = ResolveContext { codec: &codec, doc: &doc };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_second = Arc::clone(&seen);

        let chain = ResolverChain::new()
            .with(declining)
            .with(LinkResolver::default())
            .with(move |_: &ResolveContext<'_>, _: &Reference, done: Completion| {
                seen_by_second.lock().unwrap().push(done.marker().to_string());
                None
            });
        let coordinator = ResolverCoordinator::new(chain, "m-");

        let placeholder = coordinator
            .resolve(&ctx, &Reference::url("http://example.com"), Some(3))
            .unwrap();
        let marker = placeholder.id.clone().unwrap();
        assert!(marker.starts_with("m-"));
        assert_eq!(placeholder.attr("variant"), Some(&AttrValue::from("none")));
        assert_eq!(
            placeholder.content("title"),
            Some(&vec![DomNode::text("http://example.com")])
        );
        assert!(seen.lock().unwrap().is_empty());

        let pending = coordinator.drain();
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[0].target,
            WeakPos {
                marker,
                hint: Some(3)
            }
        );
        let resolved = pending[0].result.as_ref().unwrap();
        assert_eq!(resolved.attr("variant"), Some(&AttrValue::from("link")));
    }

    #[test]
    fn nobody_claiming_is_not_an_error() {
        let codec = fixture_codec();
        let doc = Node::doc(vec![]);
        let ctx = ResolveContext { codec: &codec, doc: &doc };
        let coordinator = ResolverCoordinator::new(ResolverChain::new().with(declining), "m-");
        assert!(coordinator.resolve(&ctx, &Reference::url("x"), None).is_none());
        assert!(coordinator.drain().is_empty());
    }

    #[test]
    fn weak_positions_trust_the_marker_over_the_hint() {
        let mut attrs = crate::model::Attrs::new();
        attrs.insert(ID.into(), AttrValue::from("m1"));
        let marked = Node::branch("paragraph", attrs, vec![]);
        let doc = Node::doc(vec![para(vec![Node::text("ab")]), marked.clone()]);

        for hint in [Some(4), Some(0), Some(99), None] {
            let weak = WeakPos {
                marker: "m1".into(),
                hint,
            };
            let (pos, node) = weak.locate(&doc).unwrap();
            assert_eq!(pos, 4);
            assert!(Node::ptr_eq(&node, &marked));
        }

        let missing = WeakPos {
            marker: "m2".into(),
            hint: Some(4),
        };
        assert!(missing.locate(&doc).is_none());
    }

    #[test]
    fn settle_without_placeholder_is_stale() {
        let codec = fixture_codec();
        let doc = Node::doc(vec![para(vec![Node::text("x")])]);
        let (sender, _receiver) = channel();
        let done = Completion {
            target: WeakPos {
                marker: "gone".into(),
                hint: Some(0),
            },
            sender,
        };
        let resolution = Resolution {
            target: done.target.clone(),
            result: Ok(BlockDescriptor::new("link")),
        };
        let (outcome, tr) = settle(&codec, &doc, resolution);
        assert_eq!(outcome, Outcome::Stale { marker: "gone".into() });
        assert!(tr.is_none());
    }
}
