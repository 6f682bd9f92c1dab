use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::model::{AttrValue, Attrs, DomFragment};

type Deferred = Box<dyn FnOnce() -> DomFragment + Send>;

/// Serialized content of one slot, produced on first access.
///
/// Serializing a slot walks the whole subtree, so descriptors built from
/// the tree defer it until somebody reads the slot. The closure runs at
/// most once; later reads return the memoized fragment.
pub struct SlotContent(Lazy<DomFragment, Deferred>);

impl SlotContent {
    pub fn deferred(f: impl FnOnce() -> DomFragment + Send + 'static) -> Self {
        let init: Deferred = Box::new(f);
        Self(Lazy::new(init))
    }

    pub fn ready(fragment: DomFragment) -> Self {
        let slot = Self::deferred(move || fragment);
        Lazy::force(&slot.0);
        slot
    }

    pub fn get(&self) -> &DomFragment {
        Lazy::force(&self.0)
    }

    pub fn is_evaluated(&self) -> bool {
        Lazy::get(&self.0).is_some()
    }
}

impl fmt::Debug for SlotContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Lazy::get(&self.0) {
            Some(fragment) => fmt::Debug::fmt(fragment, f),
            None => f.write_str("<deferred>"),
        }
    }
}

/// Detached description of a block: its type, id, flat attributes and
/// serialized slot content. Holds no reference into any tree.
#[derive(Debug)]
pub struct BlockDescriptor {
    pub kind: String,
    pub id: Option<String>,
    /// Attributes other than `id`.
    pub attrs: Attrs,
    pub content: BTreeMap<String, SlotContent>,
}

impl BlockDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            attrs: Attrs::new(),
            content: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_content(mut self, slot: impl Into<String>, fragment: DomFragment) -> Self {
        self.content.insert(slot.into(), SlotContent::ready(fragment));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Serialized content of `slot`, evaluating it if needed.
    pub fn content(&self, slot: &str) -> Option<&DomFragment> {
        self.content.get(slot).map(SlotContent::get)
    }

    pub fn is_content_evaluated(&self, slot: &str) -> bool {
        self.content.get(slot).is_some_and(SlotContent::is_evaluated)
    }
}
