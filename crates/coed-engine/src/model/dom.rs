//! DOM-like structure used at the boundary with block templates, clipboard
//! and storage. It is a plain value: no parent links, no live handles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomNode {
    Text(String),
    Element(DomElement),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

/// Serialized content of a slot or of a pasted selection.
pub type DomFragment = Vec<DomNode>;

impl DomNode {
    pub fn text(text: impl Into<String>) -> Self {
        DomNode::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&DomElement> {
        match self {
            DomNode::Element(el) => Some(el),
            DomNode::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            DomNode::Text(text) => text.clone(),
            DomNode::Element(el) => el.text_content(),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            DomNode::Text(text) => out.push_str(&html_escape::encode_text(text)),
            DomNode::Element(el) => el.write_html(out),
        }
    }
}

impl From<DomElement> for DomNode {
    fn from(el: DomElement) -> Self {
        DomNode::Element(el)
    }
}

const VOID_TAGS: &[&str] = &["br", "img", "hr", "input", "meta", "link"];

/// Elements whose text is written as-is, like `textContent`.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<DomNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(DomNode::Text(text.into()))
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn elements(&self) -> impl Iterator<Item = &DomElement> {
        self.children.iter().filter_map(DomNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut DomElement> {
        self.children.iter_mut().filter_map(|child| match child {
            DomNode::Element(el) => Some(el),
            DomNode::Text(_) => None,
        })
    }

    /// First child element with `tag` matching `pred`.
    pub fn child(&self, tag: &str, pred: impl Fn(&DomElement) -> bool) -> Option<&DomElement> {
        self.elements().find(|el| el.is(tag) && pred(el))
    }

    /// First child element with `tag`, appended when missing.
    pub fn ensure_child(&mut self, tag: &str) -> &mut DomElement {
        let position = self
            .children
            .iter()
            .position(|child| child.as_element().is_some_and(|el| el.is(tag)));
        let index = match position {
            Some(index) => index,
            None => {
                self.children.push(DomElement::new(tag).into());
                self.children.len() - 1
            }
        };
        match &mut self.children[index] {
            DomNode::Element(el) => el,
            DomNode::Text(_) => unreachable!("index points at an element"),
        }
    }

    /// Depth-first search for the first descendant element matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&DomElement) -> bool) -> Option<&DomElement> {
        for el in self.elements() {
            if pred(el) {
                return Some(el);
            }
            if let Some(found) = el.find(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, pred: &dyn Fn(&DomElement) -> bool) -> Option<&mut DomElement> {
        for el in self.elements_mut() {
            if pred(el) {
                return Some(el);
            }
            if let Some(found) = el.find_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Walk a chain of child tags, like a `a > b > c` selector.
    pub fn path(&self, tags: &[&str]) -> Option<&DomElement> {
        tags.iter()
            .try_fold(self, |el, tag| el.child(tag, |_| true))
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(DomNode::text_content).collect()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![DomNode::Text(text.into())];
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
        out.push('>');
        if VOID_TAGS.iter().any(|tag| self.is(tag)) && self.children.is_empty() {
            return;
        }
        let raw = RAW_TEXT_TAGS.iter().any(|tag| self.is(tag));
        for child in &self.children {
            match child {
                DomNode::Text(text) if raw => out.push_str(text),
                _ => child.write_html(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

pub fn fragment_to_html(fragment: &[DomNode]) -> String {
    fragment.iter().map(DomNode::to_html).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_output_escapes_text_and_attributes() {
        let el = DomElement::new("a")
            .with_attr("title", "say \"hi\"")
            .with_text("1 < 2 & 3");
        assert_eq!(
            el.to_html(),
            r#"<a title="say &quot;hi&quot;">1 &lt; 2 &amp; 3</a>"#
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let el = DomElement::new("p")
            .with_text("a")
            .with_child(DomElement::new("br"))
            .with_text("b");
        assert_eq!(el.to_html(), "<p>a<br>b</p>");
    }

    #[test]
    fn path_and_find_walk_children() {
        let el = DomElement::new("root").with_child(
            DomElement::new("header").with_child(DomElement::new("a").with_attr("href", "/x")),
        );
        assert_eq!(el.path(&["header", "a"]).and_then(|a| a.attr("href")), Some("/x"));
        assert!(el.path(&["aside"]).is_none());
        assert!(el.find(&|e: &DomElement| e.attr("href").is_some()).is_some());
    }

    #[test]
    fn script_text_is_written_raw() {
        let el = DomElement::new("script")
            .with_attr("type", "text/html")
            .with_text("<iframe src=\"a?b=1&c=2\"></iframe>");
        assert_eq!(
            el.to_html(),
            r#"<script type="text/html"><iframe src="a?b=1&c=2"></iframe></script>"#
        );
    }

    #[test]
    fn ensure_child_reuses_existing() {
        let mut el = DomElement::new("figure");
        el.ensure_child("img").set_attr("src", "a.png");
        el.ensure_child("img").set_attr("alt", "a");
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn serializes_text_as_plain_strings() {
        let node = DomNode::from(DomElement::new("p").with_text("hi"));
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"tag":"p","children":["hi"]}"#);
        let back: DomNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
