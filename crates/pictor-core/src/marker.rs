//! Line-end markers built on the definition registry.

use crate::defrefs::Defrefs;
use crate::units::Resolver;
use pictor_dom::{Content, Document, NodeId, attrs};

/// Width assumed for a marker without an explicit `markerWidth`.
pub const DEFAULT_MARKER_WIDTH: f64 = 6.0;

/// Side of the square `viewBox` every built-in marker is drawn in.
const MARKER_VIEWBOX: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    Arrow,
    Circle,
}

impl MarkerType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::Circle => "circle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "arrow" => Some(Self::Arrow),
            "circle" => Some(Self::Circle),
            _ => None,
        }
    }

    /// Builds a detached `<marker>` whose shape is filled with `color`.
    pub fn create(self, doc: &mut Document, color: &str) -> NodeId {
        match self {
            Self::Arrow => {
                let shape = doc.create_element(
                    "path",
                    attrs! { "d" => "M0,0 L20,10 L0,20 L4,10 Z", "fill" => color },
                    vec![],
                    None,
                );
                doc.create_element(
                    "marker",
                    attrs! {
                        "viewBox" => "0 0 20 20",
                        "refX" => "4",
                        "refY" => "10",
                        "markerWidth" => "6",
                        "markerHeight" => "6",
                        "orient" => "auto",
                        "markerUnits" => "strokeWidth"
                    },
                    vec![Content::Element(shape)],
                    None,
                )
            }
            Self::Circle => {
                let shape = doc.create_element(
                    "circle",
                    attrs! { "cx" => "10", "cy" => "10", "r" => "8", "fill" => color },
                    vec![],
                    None,
                );
                doc.create_element(
                    "marker",
                    attrs! {
                        "viewBox" => "0 0 20 20",
                        "refX" => "10",
                        "refY" => "10",
                        "markerWidth" => "6",
                        "markerHeight" => "6",
                        "orient" => "auto",
                        "markerUnits" => "strokeWidth"
                    },
                    vec![Content::Element(shape)],
                    None,
                )
            }
        }
    }

    /// Recognizes a built-in marker by its shape element.
    pub fn detect(doc: &Document, marker: NodeId) -> Option<Self> {
        if doc.tag(marker) != Some("marker") {
            return None;
        }
        match doc.first_child(marker).and_then(|c| doc.tag(c)) {
            Some("path") => Some(Self::Arrow),
            Some("circle") => Some(Self::Circle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSlot {
    Start,
    Mid,
    End,
}

impl MarkerSlot {
    pub const ALL: [MarkerSlot; 3] = [Self::Start, Self::Mid, Self::End];

    pub fn attr(self) -> &'static str {
        match self {
            Self::Start => "marker-start",
            Self::Mid => "marker-mid",
            Self::End => "marker-end",
        }
    }
}

/// The editable numeric properties of a marker definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerProperties {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub ref_x: f64,
}

fn number_attr(doc: &Document, node: NodeId, name: &str) -> Option<f64> {
    let value = doc.attr(node, name)?;
    value
        .as_number()
        .or_else(|| value.as_text().and_then(|t| t.trim().parse().ok()))
}

pub fn marker_properties(doc: &Document, marker: NodeId) -> MarkerProperties {
    MarkerProperties {
        width: number_attr(doc, marker, "markerWidth"),
        height: number_attr(doc, marker, "markerHeight"),
        ref_x: number_attr(doc, marker, "refX").unwrap_or(0.0),
    }
}

pub fn set_marker_properties(doc: &mut Document, marker: NodeId, props: &MarkerProperties) {
    for (name, value) in [("markerWidth", props.width), ("markerHeight", props.height)] {
        match value {
            Some(v) => doc.set_attr(marker, name, v),
            None => doc.remove_attr(marker, name),
        };
    }
    doc.set_attr(marker, "refX", props.ref_x);
}

fn stroke_color(doc: &Document, config: &crate::EngineConfig, node: NodeId) -> String {
    Resolver::new(doc, config)
        .inherited_attr(node, "stroke")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "none")
        .unwrap_or_else(|| "black".to_string())
}

/// The marker definition referenced from `slot` of `referrer`, if engine-managed.
pub fn marker_def(
    doc: &Document,
    registry: &Defrefs,
    referrer: NodeId,
    slot: MarkerSlot,
) -> Option<NodeId> {
    let url = doc.attr_str(referrer, slot.attr())?;
    registry.find(&url).map(|r| r.def)
}

/// Sets or clears the marker in `slot`. Returns the stored `url(#...)`, if any.
///
/// A previous engine-managed marker is released first; user-authored references are simply
/// overwritten.
pub fn set_marker(
    doc: &mut Document,
    registry: &mut Defrefs,
    config: &crate::EngineConfig,
    referrer: NodeId,
    slot: MarkerSlot,
    marker: Option<MarkerType>,
) -> Option<String> {
    release_slot(doc, registry, referrer, slot);
    let marker = marker?;
    Some(attach_marker(doc, registry, config, referrer, slot, marker, None))
}

fn release_slot(doc: &mut Document, registry: &mut Defrefs, referrer: NodeId, slot: MarkerSlot) {
    if let Some(old) = doc.attr_str(referrer, slot.attr()).map(|v| v.into_owned()) {
        if registry.is_generated_url(&old) {
            registry.remove_ref(doc, &old, referrer);
        }
        doc.remove_attr(referrer, slot.attr());
    }
}

/// Builds the definition in its final shape before registering it, so sharing only ever
/// happens between identical markers.
fn attach_marker(
    doc: &mut Document,
    registry: &mut Defrefs,
    config: &crate::EngineConfig,
    referrer: NodeId,
    slot: MarkerSlot,
    marker: MarkerType,
    props: Option<&MarkerProperties>,
) -> String {
    let color = stroke_color(doc, config, referrer);
    let def = marker.create(doc, &color);
    if let Some(props) = props {
        if marker_properties(doc, def) != *props {
            set_marker_properties(doc, def, props);
        }
    }
    let url = registry.add_ref(doc, def, referrer, marker.name());
    doc.set_attr(referrer, slot.attr(), url.clone());
    url
}

/// Re-derives every engine-managed marker on `referrer` from its current stroke color.
pub fn sync_marker_colors(
    doc: &mut Document,
    registry: &mut Defrefs,
    config: &crate::EngineConfig,
    referrer: NodeId,
) {
    for slot in MarkerSlot::ALL {
        let Some(def) = marker_def(doc, registry, referrer, slot) else {
            continue;
        };
        let Some(kind) = MarkerType::detect(doc, def) else {
            continue;
        };
        let props = marker_properties(doc, def);
        release_slot(doc, registry, referrer, slot);
        attach_marker(doc, registry, config, referrer, slot, kind, Some(&props));
    }
}

/// How far a marker reaches past the end of the line it decorates, in user units.
///
/// The marker is scaled by the stroke width (`markerUnits="strokeWidth"`), spans
/// `markerWidth` (default 6) across its 20-unit view box, and is anchored at `refX`.
pub fn marker_overhang(doc: &Document, marker: NodeId, stroke_width: f64) -> f64 {
    let props = marker_properties(doc, marker);
    let width = props.width.unwrap_or(DEFAULT_MARKER_WIDTH);
    stroke_width * width * props.ref_x / MARKER_VIEWBOX
}
