//! Static property schema per shape kind, and generic accessors driven by it.

use crate::config::EngineConfig;
use crate::shape::ShapeKind;
use crate::units::Resolver;
use pictor_dom::{AttrValue, Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySource {
    Attribute(&'static str),
    /// The element's character data.
    TextContent,
    /// `href`, spelled `xlink:href` in SVG 1.1 documents.
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Length,
    Number,
    Color,
    Text,
    Enum(&'static [&'static str]),
    Transform,
    Paint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyFlags {
    pub inherited: bool,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub source: PropertySource,
    pub kind: PropertyKind,
    pub flags: PropertyFlags,
}

impl PropertyDescriptor {
    const fn attr(name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            source: PropertySource::Attribute(name),
            kind,
            flags: PropertyFlags {
                inherited: false,
                required: false,
            },
        }
    }

    const fn inherited(mut self) -> Self {
        self.flags.inherited = true;
        self
    }

    const fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }
}

const FILL_RULES: &[&str] = &["nonzero", "evenodd"];
const TEXT_ANCHORS: &[&str] = &["start", "middle", "end"];
const WRITING_MODES: &[&str] = &["horizontal-tb", "vertical-rl", "vertical-lr"];

use PropertyDescriptor as P;
use PropertyKind as K;

const ID: P = P::attr("id", K::Text);
const TRANSFORM: P = P::attr("transform", K::Transform);
const FILL: P = P::attr("fill", K::Paint).inherited();
const FILL_RULE: P = P::attr("fill-rule", K::Enum(FILL_RULES)).inherited();
const STROKE: P = P::attr("stroke", K::Paint).inherited();
const STROKE_WIDTH: P = P::attr("stroke-width", K::Length).inherited();
const OPACITY: P = P::attr("opacity", K::Number);
const X: P = P::attr("x", K::Length);
const Y: P = P::attr("y", K::Length);
const WIDTH: P = P::attr("width", K::Length).required();
const HEIGHT: P = P::attr("height", K::Length).required();

static RECT: [P; 13] = [
    ID,
    X,
    Y,
    WIDTH,
    HEIGHT,
    P::attr("rx", K::Length),
    P::attr("ry", K::Length),
    FILL,
    FILL_RULE,
    STROKE,
    STROKE_WIDTH,
    OPACITY,
    TRANSFORM,
];

static CIRCLE: [P; 10] = [
    ID,
    P::attr("cx", K::Length),
    P::attr("cy", K::Length),
    P::attr("r", K::Length).required(),
    FILL,
    FILL_RULE,
    STROKE,
    STROKE_WIDTH,
    OPACITY,
    TRANSFORM,
];

static ELLIPSE: [P; 11] = [
    ID,
    P::attr("cx", K::Length),
    P::attr("cy", K::Length),
    P::attr("rx", K::Length).required(),
    P::attr("ry", K::Length).required(),
    FILL,
    FILL_RULE,
    STROKE,
    STROKE_WIDTH,
    OPACITY,
    TRANSFORM,
];

static PATH: [P; 11] = [
    ID,
    P::attr("d", K::Text).required(),
    FILL,
    FILL_RULE,
    STROKE,
    STROKE_WIDTH,
    P::attr("marker-start", K::Text),
    P::attr("marker-mid", K::Text),
    P::attr("marker-end", K::Text),
    OPACITY,
    TRANSFORM,
];

static TEXT: [P; 14] = [
    ID,
    X,
    Y,
    PropertyDescriptor {
        name: "text",
        source: PropertySource::TextContent,
        kind: K::Text,
        flags: PropertyFlags {
            inherited: false,
            required: false,
        },
    },
    P::attr("font-size", K::Length).inherited(),
    P::attr("font-family", K::Text).inherited(),
    P::attr("text-anchor", K::Enum(TEXT_ANCHORS)).inherited(),
    P::attr("writing-mode", K::Enum(WRITING_MODES)).inherited(),
    P::attr("line-height", K::Length),
    FILL,
    STROKE,
    STROKE_WIDTH,
    OPACITY,
    TRANSFORM,
];

static IMAGE: [P; 8] = [
    ID,
    X,
    Y,
    WIDTH,
    HEIGHT,
    PropertyDescriptor {
        name: "href",
        source: PropertySource::Link,
        kind: K::Text,
        flags: PropertyFlags {
            inherited: false,
            required: true,
        },
    },
    OPACITY,
    TRANSFORM,
];

static GROUP: [P; 7] = [
    ID,
    FILL,
    STROKE,
    STROKE_WIDTH,
    P::attr("color", K::Color).inherited(),
    OPACITY,
    TRANSFORM,
];

/// Ordered property list of a shape kind.
pub fn properties(kind: ShapeKind) -> &'static [PropertyDescriptor] {
    match kind {
        ShapeKind::Rect => &RECT,
        ShapeKind::Circle => &CIRCLE,
        ShapeKind::Ellipse => &ELLIPSE,
        ShapeKind::Path => &PATH,
        ShapeKind::Text => &TEXT,
        ShapeKind::Image => &IMAGE,
        ShapeKind::Group => &GROUP,
    }
}

pub fn descriptor(kind: ShapeKind, name: &str) -> Option<&'static PropertyDescriptor> {
    properties(kind).iter().find(|d| d.name == name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

const XLINK_HREF: &str = "xlink:href";

/// The link attribute the node currently carries.
fn link_attr(doc: &Document, node: NodeId) -> Option<&'static str> {
    ["href", XLINK_HREF]
        .into_iter()
        .find(|name| doc.attr(node, name).is_some())
}

/// The link attribute to write: the one already present, otherwise the document's spelling.
fn link_attr_for_write(doc: &Document, node: NodeId) -> &'static str {
    if let Some(name) = link_attr(doc, node) {
        return name;
    }
    let root = doc.root_of(node);
    if doc.attr(root, "xmlns:xlink").is_some() {
        XLINK_HREF
    } else {
        "href"
    }
}

fn node_descriptor(doc: &Document, node: NodeId, name: &str) -> Option<&'static PropertyDescriptor> {
    let kind = doc.tag(node).and_then(ShapeKind::from_tag)?;
    descriptor(kind, name)
}

/// Reads a property through its descriptor: lengths and numbers come back resolved,
/// inherited properties fall back to ancestors.
pub fn get_property(
    doc: &Document,
    config: &EngineConfig,
    node: NodeId,
    name: &str,
) -> Option<PropertyValue> {
    let desc = node_descriptor(doc, node, name)?;
    let attr = match desc.source {
        PropertySource::TextContent => {
            return Some(PropertyValue::Text(doc.text_content(node)));
        }
        PropertySource::Link => link_attr(doc, node)?,
        PropertySource::Attribute(attr) => attr,
    };
    let res = Resolver::new(doc, config);
    match desc.kind {
        K::Length if desc.flags.inherited => std::iter::once(node)
            .chain(doc.ancestors(node))
            .find_map(|n| res.length(n, attr))
            .map(PropertyValue::Number),
        K::Length => res.length(node, attr).map(PropertyValue::Number),
        K::Number => {
            let value = doc.attr(node, attr)?;
            value
                .as_number()
                .or_else(|| value.as_text().and_then(|t| t.trim().parse().ok()))
                .map(PropertyValue::Number)
        }
        _ if desc.flags.inherited => res
            .inherited_attr(node, attr)
            .map(|v| PropertyValue::Text(v.into_owned())),
        _ => doc
            .attr_str(node, attr)
            .map(|v| PropertyValue::Text(v.into_owned())),
    }
}

/// Writes a property through its descriptor. Numbers are stored verbatim; enum values outside
/// the allowed set, and properties the node's kind does not have, are rejected.
pub fn set_property(doc: &mut Document, node: NodeId, name: &str, value: PropertyValue) -> bool {
    let Some(desc) = node_descriptor(doc, node, name) else {
        return false;
    };
    let source = match desc.source {
        PropertySource::Link => PropertySource::Attribute(link_attr_for_write(doc, node)),
        other => other,
    };
    match (source, desc.kind, value) {
        (PropertySource::TextContent, _, value) => {
            let text = match value {
                PropertyValue::Text(t) => t,
                PropertyValue::Number(n) => pictor_dom::format_number(n),
            };
            doc.remove_children(node);
            doc.push_text(node, text);
            true
        }
        (PropertySource::Attribute(attr), K::Enum(allowed), PropertyValue::Text(t)) => {
            if !allowed.contains(&t.trim()) {
                return false;
            }
            doc.set_attr(node, attr, t);
            true
        }
        (PropertySource::Attribute(_), K::Enum(_), PropertyValue::Number(_))
        | (PropertySource::Link, _, _) => false,
        (PropertySource::Attribute(attr), _, PropertyValue::Number(n)) => {
            doc.set_attr(node, attr, AttrValue::Number(n));
            true
        }
        (PropertySource::Attribute(attr), _, PropertyValue::Text(t)) => {
            doc.set_attr(node, attr, t);
            true
        }
    }
}

/// Required properties the node lacks.
pub fn missing_required(doc: &Document, node: NodeId) -> Vec<&'static str> {
    let Some(kind) = doc.tag(node).and_then(ShapeKind::from_tag) else {
        return Vec::new();
    };
    properties(kind)
        .iter()
        .filter(|d| d.flags.required)
        .filter_map(|d| match d.source {
            PropertySource::Attribute(a) if doc.attr(node, a).is_none() => Some(d.name),
            PropertySource::Link if link_attr(doc, node).is_none() => Some(d.name),
            _ => None,
        })
        .collect()
}
