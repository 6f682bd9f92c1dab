//! The `co-link` block: a link preview with a title, free content, and the
//! metadata an inspector found for the URL (site, icon, thumbnail, media
//! dimensions, duration and size).

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::editing::codec::{BlockSpec, SLOT_ATTR, SlotSpec};
use crate::editing::descriptor::BlockDescriptor;
use crate::editing::resolver::{Completion, Reference, ResolveContext, Resolver};
use crate::model::{AttrValue, Attrs, DomElement, DomNode, attrs};

pub const LINK: &str = "link";
pub const LINK_TAG: &str = "co-link";

/// Variant of a link that is still waiting for its inspector.
pub const PENDING_VARIANT: &str = "none";

static DIMENSIONS_PX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)px$").unwrap());
static DIMENSIONS_WXH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)x(\d+)$").unwrap());
static SIZE_KB: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)KB$").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkBlock;

impl BlockSpec for LinkBlock {
    fn name(&self) -> &str {
        LINK
    }

    fn tag(&self) -> &str {
        LINK_TAG
    }

    fn attributes(&self) -> Attrs {
        attrs([
            ("variant", AttrValue::from(PENDING_VARIANT)),
            ("url", AttrValue::from("")),
            ("description", AttrValue::from("")),
            ("icon", AttrValue::from("")),
            ("thumbnail", AttrValue::from("")),
            ("size", AttrValue::Null),
            ("width", AttrValue::Null),
            ("height", AttrValue::Null),
            ("duration", AttrValue::from("")),
            ("site", AttrValue::from("")),
            ("html", AttrValue::from("")),
        ])
    }

    fn content_slots(&self) -> Vec<SlotSpec> {
        vec![SlotSpec::new("title", "inline*"), SlotSpec::new("content", "inline*")]
    }

    fn to_dom(&self, attrs: &Attrs) -> DomElement {
        let text = |name: &str| attrs.get(name).map(ToString::to_string).unwrap_or_default();

        let mut site = DomElement::new("a")
            .with_attr("title", text("site"))
            .with_attr("target", "_blank");
        let url = text("url");
        if !url.is_empty() {
            site.set_attr("href", url);
        }
        let icon = text("icon");
        if !icon.is_empty() {
            site.ensure_child("img").set_attr("src", icon);
        }

        let mut figure = DomElement::new("figure");
        let thumbnail = text("thumbnail");
        if !thumbnail.is_empty() {
            figure.ensure_child("img").set_attr("src", thumbnail);
        }

        let null = AttrValue::Null;
        let get = |name: &str| attrs.get(name).unwrap_or(&null);
        let facts = DomElement::new("div")
            .with_child(fact("dimensions", format_dimensions(get("width"), get("height"))))
            .with_child(fact("duration", Some(text("duration"))))
            .with_child(fact("size", format_size(get("size"))));

        let mut root = DomElement::new(LINK_TAG)
            .with_child(
                DomElement::new("header")
                    .with_child(DomElement::new("a").with_attr("name", "type"))
                    .with_child(site)
                    .with_child(DomElement::new("a").with_attr("name", "preview")),
            )
            .with_child(
                DomElement::new("div")
                    .with_child(DomElement::new("div").with_attr(SLOT_ATTR, "title"))
                    .with_child(DomElement::new("div").with_attr(SLOT_ATTR, "content")),
            )
            .with_child(
                DomElement::new("aside")
                    .with_child(
                        DomElement::new("div")
                            .with_child(facts)
                            .with_child(paragraph(text("description"))),
                    )
                    .with_child(figure),
            );

        let mut script = DomElement::new("script").with_attr("type", "text/html");
        let html = text("html");
        if !html.is_empty() {
            script.set_text(html);
        }
        root = root.with_child(script);

        let variant = text("variant");
        if !variant.is_empty() {
            root.set_attr("type", variant);
        }
        root
    }

    fn from_dom(&self, el: &DomElement) -> Attrs {
        let mut attrs = Attrs::new();
        let variant = el.attr("type").filter(|v| !v.is_empty()).unwrap_or(PENDING_VARIANT);
        attrs.insert("variant".into(), variant.into());

        if let Some(site) = el
            .path(&["header"])
            .and_then(|header| header.child("a", |a| a.attr("title").is_some()))
        {
            attrs.insert("url".into(), site.attr("href").unwrap_or_default().into());
            attrs.insert("site".into(), site.attr("title").unwrap_or_default().into());
            if let Some(src) = site.path(&["img"]).and_then(|img| img.attr("src")) {
                attrs.insert("icon".into(), src.into());
            }
        }

        if let Some(script) = el.child("script", |s| s.attr("type") == Some("text/html")) {
            attrs.insert("html".into(), script.text_content().into());
        }
        if let Some(src) = el.path(&["aside", "figure", "img"]).and_then(|img| img.attr("src")) {
            attrs.insert("thumbnail".into(), src.into());
        }

        if let Some(facts) = el.path(&["aside", "div", "div"]) {
            for span in facts.elements().filter(|e| e.is("span")) {
                let value = span.text_content();
                match span.attr("title") {
                    Some("size") => {
                        if let Some(bytes) = parse_size(&value) {
                            attrs.insert("size".into(), bytes.into());
                        }
                    }
                    Some("dimensions") => {
                        if let Some((width, height)) = parse_dimensions(&value) {
                            attrs.insert("width".into(), width.into());
                            attrs.insert("height".into(), height.into());
                        }
                    }
                    Some(title) => {
                        attrs.insert(title.to_string(), value.into());
                    }
                    None => {}
                }
            }
        }

        if let Some(description) = el.path(&["aside", "div", "p"]) {
            attrs.insert("description".into(), description.text_content().into());
        }
        attrs
    }

    fn decode_attrs(&self, attrs: &mut Attrs) {
        if let Some(AttrValue::Str(dimensions)) = attrs.remove("dimensions")
            && let Some((width, height)) = parse_dimensions(&dimensions)
        {
            attrs.insert("width".into(), width.into());
            attrs.insert("height".into(), height.into());
        }
        let size = match attrs.get("size") {
            Some(AttrValue::Str(size)) => Some(parse_size(size)),
            _ => None,
        };
        if let Some(bytes) = size {
            attrs.insert("size".into(), bytes.into());
        }
    }

    fn encode_attrs(&self, attrs: &mut Attrs) {
        let width = attrs.remove("width").unwrap_or_default();
        let height = attrs.remove("height").unwrap_or_default();
        if let Some(dimensions) = format_dimensions(&width, &height) {
            attrs.insert("dimensions".into(), dimensions.into());
        }
        let size = attrs.remove("size").unwrap_or_default();
        if let Some(size) = format_size(&size) {
            attrs.insert("size".into(), size.into());
        }
    }
}

fn fact(title: &str, value: Option<String>) -> DomElement {
    let span = DomElement::new("span").with_attr("title", title);
    match value {
        Some(value) if !value.is_empty() => span.with_text(value),
        _ => span,
    }
}

fn paragraph(text: String) -> DomElement {
    if text.is_empty() {
        DomElement::new("p")
    } else {
        DomElement::new("p").with_text(text)
    }
}

/// `"<w>px"` when the height is unknown, else `"<w>x<h>"`.
pub fn format_dimensions(width: &AttrValue, height: &AttrValue) -> Option<String> {
    if width.is_blank() {
        return None;
    }
    if height.is_blank() {
        return Some(format!("{width}px"));
    }
    Some(format!("{width}x{height}"))
}

pub fn parse_dimensions(value: &str) -> Option<(i64, Option<i64>)> {
    if let Some(caps) = DIMENSIONS_PX.captures(value) {
        return Some((caps[1].parse().ok()?, None));
    }
    let caps = DIMENSIONS_WXH.captures(value)?;
    Some((caps[1].parse().ok()?, Some(caps[2].parse().ok()?)))
}

/// Whole kilobytes, rounded to the nearest.
pub fn format_size(bytes: &AttrValue) -> Option<String> {
    let bytes = bytes.as_int().filter(|b| *b != 0)?;
    Some(format!("{}KB", (bytes as f64 / 1000.0).round() as i64))
}

pub fn parse_size(value: &str) -> Option<i64> {
    let caps = SIZE_KB.captures(value)?;
    caps[1].parse::<i64>().ok()?.checked_mul(1000)
}

/// Looks a reference up and reports what it found.
pub trait Inspector: Send + Sync {
    /// Complete `done` with a `link` descriptor, now or later.
    fn inspect(&self, reference: &Reference, done: Completion);
}

/// Answers immediately with the reference itself, typed as a plain link.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoInspector;

impl Inspector for EchoInspector {
    fn inspect(&self, reference: &Reference, done: Completion) {
        let mut desc = BlockDescriptor::new(LINK).with_attr("variant", "link");
        if let Some(url) = &reference.url {
            desc.set_attr("url", url.as_str());
        }
        if let Some(title) = &reference.title {
            desc = desc.with_content("title", vec![DomNode::text(title.as_str())]);
        }
        done.complete(Ok(desc));
    }
}

/// Claims every reference and turns it into a link block through an
/// [`Inspector`].
#[derive(Clone)]
pub struct LinkResolver {
    inspector: Arc<dyn Inspector>,
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new(Arc::new(EchoInspector))
    }
}

impl LinkResolver {
    pub fn new(inspector: Arc<dyn Inspector>) -> Self {
        Self { inspector }
    }
}

impl Resolver for LinkResolver {
    fn resolve(
        &self,
        _ctx: &ResolveContext<'_>,
        reference: &Reference,
        done: Completion,
    ) -> Option<BlockDescriptor> {
        if reference.url.is_none() && reference.fragment.is_none() {
            return None;
        }
        let reference = reference.clone().with_default_title();
        self.inspector.inspect(&reference, done);

        let mut placeholder = BlockDescriptor::new(LINK).with_attr("variant", PENDING_VARIANT);
        if let Some(title) = &reference.title {
            placeholder = placeholder.with_content("title", vec![DomNode::text(title.as_str())]);
        }
        Some(placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(300), Some(200), Some("300x200"))]
    #[case(Some(300), None, Some("300px"))]
    #[case(None, Some(200), None)]
    #[case(None, None, None)]
    fn dimensions_format(
        #[case] width: Option<i64>,
        #[case] height: Option<i64>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            format_dimensions(&width.into(), &height.into()).as_deref(),
            expected
        );
    }

    #[rstest]
    #[case("300x200", Some((300, Some(200))))]
    #[case("300px", Some((300, None)))]
    #[case("300", None)]
    #[case("wide", None)]
    #[case("", None)]
    fn dimensions_parse(#[case] value: &str, #[case] expected: Option<(i64, Option<i64>)>) {
        assert_eq!(parse_dimensions(value), expected);
    }

    #[rstest]
    #[case(1500, Some("2KB"))]
    #[case(1499, Some("1KB"))]
    #[case(1999, Some("2KB"))]
    #[case(0, None)]
    fn size_format(#[case] bytes: i64, #[case] expected: Option<&str>) {
        assert_eq!(format_size(&AttrValue::Int(bytes)).as_deref(), expected);
    }

    #[rstest]
    #[case("2KB", Some(2000))]
    #[case("2 KB", None)]
    #[case("", None)]
    #[case("9999999999999999KB", None)]
    #[case("99999999999999999999KB", None)]
    fn size_parse(#[case] value: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_size(value), expected);
    }

    #[test]
    fn template_has_slot_holders_and_facts() {
        let mut attrs = LinkBlock.attributes();
        attrs.insert("url".into(), "http://example.com".into());
        attrs.insert("width".into(), AttrValue::Int(300));
        attrs.insert("size".into(), AttrValue::Int(1500));
        let el = LinkBlock.to_dom(&attrs);

        assert_eq!(el.attr("type"), Some("none"));
        assert!(el.find(&|e: &DomElement| e.attr(SLOT_ATTR) == Some("title")).is_some());
        assert!(el.find(&|e: &DomElement| e.attr(SLOT_ATTR) == Some("content")).is_some());
        let facts = el.path(&["aside", "div", "div"]).unwrap();
        let texts: Vec<String> = facts.elements().map(DomElement::text_content).collect();
        assert_eq!(texts, vec!["300px", "", "2KB"]);
    }

    #[test]
    fn template_reads_back_what_it_wrote() {
        let mut attrs = LinkBlock.attributes();
        attrs.insert("variant".into(), "video".into());
        attrs.insert("site".into(), "Example".into());
        attrs.insert("icon".into(), "i.png".into());
        attrs.insert("duration".into(), "3:21".into());
        attrs.insert("width".into(), AttrValue::Int(300));
        attrs.insert("height".into(), AttrValue::Int(200));

        let back = LinkBlock.from_dom(&LinkBlock.to_dom(&attrs));
        for name in ["variant", "site", "icon", "duration", "width", "height", "url"] {
            assert_eq!(back.get(name), attrs.get(name), "{name}");
        }
        assert!(!back.contains_key("size"));
    }

    #[test]
    fn wire_attributes_decode_and_encode() {
        let mut wire = attrs([("dimensions", "640x480"), ("size", "12KB")]);
        LinkBlock.decode_attrs(&mut wire);
        assert_eq!(
            wire,
            attrs([
                ("height", AttrValue::Int(480)),
                ("size", AttrValue::Int(12000)),
                ("width", AttrValue::Int(640)),
            ])
        );

        LinkBlock.encode_attrs(&mut wire);
        assert_eq!(wire, attrs([("dimensions", "640x480"), ("size", "12KB")]));
    }

    #[rstest]
    #[case("big")]
    #[case("9999999999999999KB")]
    fn unparsable_wire_size_is_left_unset(#[case] size: &str) {
        let mut wire = attrs([("size", size)]);
        LinkBlock.decode_attrs(&mut wire);
        assert_eq!(wire.get("size"), Some(&AttrValue::Null));
    }

    #[test]
    fn embed_html_is_written_unescaped() {
        let mut attrs = LinkBlock.attributes();
        attrs.insert("html".into(), "<iframe src=\"https://example.com/e\"></iframe>".into());
        let html = LinkBlock.to_dom(&attrs).to_html();
        assert!(html.contains(
            r#"<script type="text/html"><iframe src="https://example.com/e"></iframe></script>"#
        ));
    }
}
