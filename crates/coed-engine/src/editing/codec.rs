//! Conversion between live block roots and detached [`BlockDescriptor`]s.
//!
//! Every block type registers a [`BlockSpec`]: its attribute template, its
//! content slots and a DOM template. A block node is always built by
//! rendering the template and parsing it back, so the template decides what
//! survives a round trip (a link's size is kept in whole kilobytes).

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use serde_json::{Map, Value};

use crate::editing::EditError;
use crate::editing::ancestors::BlockTarget;
use crate::editing::descriptor::{BlockDescriptor, SlotContent};
use crate::editing::link::LinkBlock;
use crate::model::{
    AttrValue, Attrs, BlockRole, DomElement, DomFragment, DomNode, Fragment, Mark, MarkSpec, Node,
    NodeSpec, Schema,
};

/// DOM attribute marking the element that holds a slot's content.
pub const SLOT_ATTR: &str = "coed-name";

/// Transient attribute: whether the block currently has focus.
pub const FOCUSED: &str = "focused";

pub const ID: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Node,
    Mark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: String,
    /// Content expression, e.g. `inline*`.
    pub hint: String,
}

impl SlotSpec {
    pub fn new(name: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            hint: hint.to_string(),
        }
    }
}

pub trait BlockSpec: Send + Sync {
    /// Type name of the block root.
    fn name(&self) -> &str;

    /// DOM tag of the rendered template.
    fn tag(&self) -> &str;

    fn kind(&self) -> RootKind {
        RootKind::Node
    }

    /// Attribute allow-list with default values. `id` and `focused` are
    /// added for every block and need not be listed.
    fn attributes(&self) -> Attrs;

    fn content_slots(&self) -> Vec<SlotSpec> {
        Vec::new()
    }

    /// Render attributes into the template. Slot holders are left empty
    /// and marked with [`SLOT_ATTR`].
    fn to_dom(&self, attrs: &Attrs) -> DomElement;

    /// Read attributes back from a rendered template. Values the template
    /// cannot express are left out.
    fn from_dom(&self, el: &DomElement) -> Attrs;

    /// Turn wire-format attributes (formatted strings) into stored values.
    fn decode_attrs(&self, _attrs: &mut Attrs) {}

    /// Inverse of [`BlockSpec::decode_attrs`].
    fn encode_attrs(&self, _attrs: &mut Attrs) {}

    /// Final shaping of a slot's serialized content for descriptors.
    fn to_content(&self, _slot: &str, content: DomFragment) -> DomFragment {
        content
    }
}

pub fn slot_type(block: &str, slot: &str) -> String {
    format!("{block}_{slot}")
}

#[derive(Clone)]
pub struct BlockCodec {
    schema: Arc<Schema>,
    specs: Arc<HashMap<String, Arc<dyn BlockSpec>>>,
}

impl std::fmt::Debug for BlockCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.specs.keys().collect();
        names.sort();
        f.debug_struct("BlockCodec").field("blocks", &names).finish()
    }
}

impl BlockCodec {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            specs: Arc::new(HashMap::new()),
        }
    }

    /// Basic schema with the link block registered.
    pub fn with_defaults() -> Self {
        let mut codec = Self::new(Schema::basic());
        codec.register(Arc::new(LinkBlock));
        codec
    }

    /// Register a block type and add its root and slot types to the schema.
    pub fn register(&mut self, spec: Arc<dyn BlockSpec>) {
        let schema = Arc::make_mut(&mut self.schema);
        let name = spec.name().to_string();
        let slots = spec.content_slots();

        match spec.kind() {
            RootKind::Node => {
                schema.add_node(NodeSpec {
                    name: name.clone(),
                    tag: Some(spec.tag().to_string()),
                    role: BlockRole::Root,
                    leaf: slots.is_empty(),
                });
                for slot in &slots {
                    schema.add_node(NodeSpec {
                        name: slot_type(&name, &slot.name),
                        tag: None,
                        role: BlockRole::Content(slot.name.clone()),
                        leaf: false,
                    });
                }
            }
            RootKind::Mark => schema.add_mark(MarkSpec {
                name: name.clone(),
                tag: spec.tag().to_string(),
                role: BlockRole::Root,
            }),
        }

        Arc::make_mut(&mut self.specs).insert(name, spec);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn spec(&self, kind: &str) -> Result<&Arc<dyn BlockSpec>, EditError> {
        self.specs
            .get(kind)
            .ok_or_else(|| EditError::UnknownBlockType(kind.to_string()))
    }

    pub fn spec_for_tag(&self, tag: &str) -> Option<&Arc<dyn BlockSpec>> {
        self.specs
            .values()
            .find(|spec| spec.tag().eq_ignore_ascii_case(tag))
    }

    /// Full attribute template of a block type.
    pub fn default_attrs(&self, kind: &str) -> Result<Attrs, EditError> {
        Ok(template(self.spec(kind)?.as_ref()))
    }

    /// Describe a block root. Slot content is serialized on first read.
    pub fn node_to_block(&self, target: &BlockTarget) -> Result<BlockDescriptor, EditError> {
        let spec = self.spec(target.kind())?;
        let mut desc = BlockDescriptor::new(spec.name());

        for (name, default) in template(spec.as_ref()) {
            if name == ID {
                continue;
            }
            let value = target.attr(&name).cloned().unwrap_or(default);
            desc.attrs.insert(name, value);
        }
        desc.id = target
            .attr(ID)
            .and_then(AttrValue::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        if let BlockTarget::Node(node) = target {
            for slot in spec.content_slots() {
                let slot_kind = slot_type(spec.name(), &slot.name);
                let Some(holder) = node.content().children().iter().find(|c| c.kind() == slot_kind)
                else {
                    continue;
                };
                let codec = self.clone();
                let spec = Arc::clone(spec);
                let holder = holder.clone();
                let name = slot.name.clone();
                desc.content.insert(
                    slot.name,
                    SlotContent::deferred(move || {
                        spec.to_content(&name, codec.serialize_fragment(holder.content()))
                    }),
                );
            }
        }

        Ok(desc)
    }

    /// Stored attributes of a descriptor: template defaults, overlaid with
    /// the descriptor's known attributes after decoding. Unknown attributes
    /// are dropped.
    pub fn block_to_attrs(&self, desc: &BlockDescriptor) -> Result<Attrs, EditError> {
        let spec = self.spec(&desc.kind)?;
        let mut raw = desc.attrs.clone();
        spec.decode_attrs(&mut raw);

        let mut attrs = template(spec.as_ref());
        for (name, value) in raw {
            if name != ID && attrs.contains_key(&name) {
                attrs.insert(name, value);
            }
        }
        if let Some(id) = &desc.id {
            attrs.insert(ID.to_string(), AttrValue::from(id.as_str()));
        }
        Ok(attrs)
    }

    /// Build a block node from stored attributes, through its DOM template.
    pub fn attrs_to_node(&self, kind: &str, attrs: &Attrs) -> Result<Node, EditError> {
        let spec = self.spec(kind)?;
        let el = render(spec.as_ref(), attrs);
        let mut node = self.parse_block(&el)?;
        if attrs.get(FOCUSED).is_some_and(|f| !f.is_blank()) {
            let mut kept = node.attrs().clone();
            kept.insert(FOCUSED.to_string(), AttrValue::Bool(true));
            node = node.with_attrs(kept);
        }
        Ok(node)
    }

    /// Render a descriptor, slot content included.
    pub fn to_dom(&self, desc: &BlockDescriptor) -> Result<DomElement, EditError> {
        let spec = self.spec(&desc.kind)?;
        let attrs = self.block_to_attrs(desc)?;
        let mut el = render(spec.as_ref(), &attrs);
        for slot in spec.content_slots() {
            let holder = slot_holder_mut(&mut el, &slot.name);
            if let (Some(content), Some(holder)) = (desc.content(&slot.name), holder) {
                holder.children = content.clone();
            }
        }
        Ok(el)
    }

    pub fn block_to_node(&self, desc: &BlockDescriptor) -> Result<Node, EditError> {
        let spec = self.spec(&desc.kind)?;
        if spec.kind() == RootKind::Mark {
            return Err(EditError::MarkBlock(desc.kind.clone()));
        }
        let el = self.to_dom(desc)?;
        let node = self.parse_block(&el)?;
        if desc.attr(FOCUSED).is_some_and(|f| !f.is_blank()) {
            let mut attrs = node.attrs().clone();
            attrs.insert(FOCUSED.to_string(), AttrValue::Bool(true));
            return Ok(node.with_attrs(attrs));
        }
        Ok(node)
    }

    pub fn block_to_mark(&self, desc: &BlockDescriptor) -> Result<Mark, EditError> {
        let spec = self.spec(&desc.kind)?;
        if spec.kind() != RootKind::Mark {
            return Err(EditError::InvalidDescriptor(format!(
                "{} is not a mark block",
                desc.kind
            )));
        }
        Ok(Mark::new(spec.name(), self.block_to_attrs(desc)?))
    }

    /// Parse a rendered block node template.
    pub fn parse_block(&self, el: &DomElement) -> Result<Node, EditError> {
        let spec = self
            .spec_for_tag(&el.tag)
            .ok_or_else(|| EditError::UnknownBlockType(el.tag.clone()))?;
        if spec.kind() == RootKind::Mark {
            return Err(EditError::MarkBlock(spec.name().to_string()));
        }

        let attrs = read_attrs(spec.as_ref(), el);
        let slots = spec.content_slots();
        if slots.is_empty() {
            return Ok(Node::leaf(spec.name(), attrs));
        }

        let children = slots
            .iter()
            .map(|slot| {
                let content = slot_holder(el, &slot.name)
                    .map(|holder| self.parse_fragment(&holder.children))
                    .unwrap_or_default();
                Node::branch(
                    slot_type(spec.name(), &slot.name),
                    Attrs::new(),
                    content.children().to_vec(),
                )
            })
            .collect();
        Ok(Node::branch(spec.name(), attrs, children))
    }

    /// Serialize tree content. Nodes of unknown type are skipped.
    pub fn serialize_fragment(&self, fragment: &Fragment) -> DomFragment {
        let mut out = Vec::new();
        for node in fragment.children() {
            self.serialize_into(node, &mut out);
        }
        out
    }

    fn serialize_into(&self, node: &Node, out: &mut DomFragment) {
        let dom: DomNode = if let Some(text) = node.text_str() {
            DomNode::text(text)
        } else if let Some(spec) = self.specs.get(node.kind()) {
            self.render_node(spec.as_ref(), node).into()
        } else {
            match self.schema.node(node.kind()) {
                Some(NodeSpec { tag: Some(tag), .. }) => {
                    let mut el = DomElement::new(tag.as_str());
                    el.attrs = to_dom_attrs(node.attrs());
                    el.children = self.serialize_fragment(node.content());
                    el.into()
                }
                Some(_) => {
                    // tagless wrappers (the document, a stray slot) are transparent
                    out.extend(self.serialize_fragment(node.content()));
                    return;
                }
                None => {
                    warn!("skipping node of unknown type {}", node.kind());
                    return;
                }
            }
        };
        out.push(self.wrap_marks(dom, node.marks()));
    }

    fn render_node(&self, spec: &dyn BlockSpec, node: &Node) -> DomElement {
        let mut el = render(spec, node.attrs());
        for slot in spec.content_slots() {
            let slot_kind = slot_type(spec.name(), &slot.name);
            let Some(content) = node.content().children().iter().find(|c| c.kind() == slot_kind)
            else {
                continue;
            };
            if let Some(holder) = slot_holder_mut(&mut el, &slot.name) {
                holder.children = self.serialize_fragment(content.content());
            }
        }
        el
    }

    fn wrap_marks(&self, dom: DomNode, marks: &[Mark]) -> DomNode {
        marks.iter().rev().fold(dom, |inner, mark| {
            let wrapper = if let Some(spec) = self.specs.get(mark.kind()) {
                render(spec.as_ref(), mark.attrs())
            } else if let Some(spec) = self.schema.mark(mark.kind()) {
                let mut el = DomElement::new(spec.tag.as_str());
                el.attrs = to_dom_attrs(mark.attrs());
                el
            } else {
                warn!("dropping mark of unknown type {}", mark.kind());
                return inner;
            };
            wrapper.with_child(inner).into()
        })
    }

    /// Parse DOM content. Elements with unknown tags are transparent.
    pub fn parse_fragment(&self, dom: &[DomNode]) -> Fragment {
        let mut out = Vec::new();
        self.parse_into(dom, &[], &mut out);
        Fragment::from_nodes(out)
    }

    fn parse_into(&self, dom: &[DomNode], marks: &[Mark], out: &mut Vec<Node>) {
        for child in dom {
            match child {
                DomNode::Text(text) => out.push(Node::text_with_marks(text.as_str(), marks.to_vec())),
                DomNode::Element(el) => self.parse_element(el, marks, out),
            }
        }
    }

    fn parse_element(&self, el: &DomElement, marks: &[Mark], out: &mut Vec<Node>) {
        if let Some(spec) = self.spec_for_tag(&el.tag) {
            match spec.kind() {
                RootKind::Node => match self.parse_block(el) {
                    Ok(node) => out.push(node),
                    Err(err) => warn!("skipping <{}>: {err}", el.tag),
                },
                RootKind::Mark => {
                    let mark = Mark::new(spec.name(), read_attrs(spec.as_ref(), el));
                    self.parse_into(&el.children, &with_mark(marks, mark), out);
                }
            }
            return;
        }

        if let Some(spec) = self.schema.node_for_tag(&el.tag) {
            let attrs = from_dom_attrs(el);
            let node = if spec.leaf {
                Node::leaf(spec.name.as_str(), attrs).with_marks(marks.to_vec())
            } else {
                let inner = self.parse_fragment(&el.children);
                Node::branch(spec.name.as_str(), attrs, inner.children().to_vec())
            };
            out.push(node);
        } else if let Some(spec) = self.schema.mark_for_tag(&el.tag) {
            let mark = Mark::new(spec.name.as_str(), from_dom_attrs(el));
            self.parse_into(&el.children, &with_mark(marks, mark), out);
        } else {
            self.parse_into(&el.children, marks, out);
        }
    }

    /// Storage form of a descriptor: `{type, id?, content?, ...attributes}`.
    pub fn to_wire(&self, desc: &BlockDescriptor) -> Result<Value, EditError> {
        let spec = self.spec(&desc.kind)?;
        let mut attrs = self.block_to_attrs(desc)?;
        attrs.remove(ID);
        attrs.remove(FOCUSED);
        spec.encode_attrs(&mut attrs);

        let mut map = Map::new();
        map.insert("type".into(), Value::from(desc.kind.as_str()));
        if let Some(id) = &desc.id {
            map.insert(ID.into(), Value::from(id.as_str()));
        }
        for (name, value) in attrs {
            if !value.is_null() {
                map.insert(name, json_from_attr(value));
            }
        }

        let mut content = Map::new();
        for slot in spec.content_slots() {
            if let Some(fragment) = desc.content(&slot.name) {
                let value = serde_json::to_value(fragment)
                    .map_err(|err| EditError::InvalidDescriptor(err.to_string()))?;
                content.insert(slot.name, value);
            }
        }
        if !content.is_empty() {
            map.insert("content".into(), Value::Object(content));
        }
        Ok(Value::Object(map))
    }

    pub fn from_wire(&self, value: &Value) -> Result<BlockDescriptor, EditError> {
        let obj = value
            .as_object()
            .ok_or_else(|| EditError::InvalidDescriptor("expected an object".into()))?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| EditError::InvalidDescriptor("missing type".into()))?;
        self.spec(kind)?;

        let mut desc = BlockDescriptor::new(kind);
        desc.id = obj.get(ID).and_then(Value::as_str).map(str::to_string);
        for (name, value) in obj {
            match name.as_str() {
                "type" | "id" => {}
                "content" => {
                    let Some(slots) = value.as_object() else {
                        return Err(EditError::InvalidDescriptor("content must be an object".into()));
                    };
                    for (slot, fragment) in slots {
                        let fragment: DomFragment = serde_json::from_value(fragment.clone())
                            .map_err(|err| EditError::InvalidDescriptor(format!("{slot}: {err}")))?;
                        desc.content.insert(slot.clone(), SlotContent::ready(fragment));
                    }
                }
                _ => {
                    if let Some(attr) = attr_from_json(value) {
                        desc.attrs.insert(name.clone(), attr);
                    }
                }
            }
        }
        Ok(desc)
    }
}

fn template(spec: &dyn BlockSpec) -> Attrs {
    let mut attrs = spec.attributes();
    attrs.insert(ID.to_string(), AttrValue::Null);
    attrs.insert(FOCUSED.to_string(), AttrValue::Bool(false));
    attrs
}

fn render(spec: &dyn BlockSpec, attrs: &Attrs) -> DomElement {
    let mut el = spec.to_dom(attrs);
    if let Some(id) = attrs.get(ID).and_then(AttrValue::as_str).filter(|id| !id.is_empty()) {
        el.set_attr(ID, id);
    }
    el
}

fn read_attrs(spec: &dyn BlockSpec, el: &DomElement) -> Attrs {
    let mut attrs = template(spec);
    for (name, value) in spec.from_dom(el) {
        if attrs.contains_key(&name) && name != FOCUSED {
            attrs.insert(name, value);
        }
    }
    if let Some(id) = el.attr(ID).filter(|id| !id.is_empty()) {
        attrs.insert(ID.to_string(), AttrValue::from(id));
    }
    attrs
}

fn slot_holder<'a>(el: &'a DomElement, slot: &str) -> Option<&'a DomElement> {
    el.find(&|e: &DomElement| e.attr(SLOT_ATTR) == Some(slot))
}

fn slot_holder_mut<'a>(el: &'a mut DomElement, slot: &str) -> Option<&'a mut DomElement> {
    el.find_mut(&|e: &DomElement| e.attr(SLOT_ATTR) == Some(slot))
}

fn with_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut out = marks.to_vec();
    out.push(mark);
    out
}

fn to_dom_attrs(attrs: &Attrs) -> std::collections::BTreeMap<String, String> {
    attrs
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

fn from_dom_attrs(el: &DomElement) -> Attrs {
    el.attrs
        .iter()
        .map(|(name, value)| (name.clone(), AttrValue::from(value.as_str())))
        .collect()
}

fn json_from_attr(value: AttrValue) -> Value {
    match value {
        AttrValue::Null => Value::Null,
        AttrValue::Bool(b) => Value::Bool(b),
        AttrValue::Int(n) => Value::from(n),
        AttrValue::Str(s) => Value::String(s),
    }
}

fn attr_from_json(value: &Value) -> Option<AttrValue> {
    match value {
        Value::Null => Some(AttrValue::Null),
        Value::Bool(b) => Some(AttrValue::Bool(*b)),
        Value::Number(n) => n.as_i64().map(AttrValue::Int),
        Value::String(s) => Some(AttrValue::from(s.as_str())),
        Value::Array(_) | Value::Object(_) => None,
    }
}
