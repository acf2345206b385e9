//! Attribute and length resolution.
//!
//! Lengths follow the SVG grammar (`<number><unit>?`); conversion to user units uses the
//! configured DPI. Percentages resolve against the nearest ancestor `<svg>` viewport, picked by
//! the attribute being resolved.

use crate::config::EngineConfig;
use pictor_dom::{AttrValue, Document, NodeId};
use std::borrow::Cow;
use svgtypes::{Length, LengthUnit};

/// Parses a length; surrounding whitespace is ignored, anything else unparsed is a failure.
pub fn parse_length(text: &str) -> Option<Length> {
    text.trim().parse::<Length>().ok()
}

/// Which viewport dimension a percentage refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentBasis {
    FontSize,
    Width,
    Height,
    /// `sqrt(w² + h²) / sqrt(2)`
    Diagonal,
}

impl PercentBasis {
    pub fn for_attr(name: &str) -> Self {
        match name {
            "font-size" => Self::FontSize,
            "x" | "rx" | "cx" | "width" => Self::Width,
            "y" | "ry" | "cy" | "height" => Self::Height,
            _ => Self::Diagonal,
        }
    }
}

/// Read-only view over a document that turns attribute text into numbers.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    doc: &'a Document,
    config: &'a EngineConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(doc: &'a Document, config: &'a EngineConfig) -> Self {
        Self { doc, config }
    }

    pub fn doc(&self) -> &'a Document {
        self.doc
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Converts context-free units to user units. Relative units return `None`.
    pub fn absolute_px(&self, number: f64, unit: LengthUnit) -> Option<f64> {
        let dpi = self.config.dpi;
        match unit {
            LengthUnit::None | LengthUnit::Px => Some(number),
            LengthUnit::In => Some(number * dpi),
            LengthUnit::Cm => Some(number * dpi / 2.54),
            LengthUnit::Mm => Some(number * dpi / 25.4),
            LengthUnit::Pt => Some(number * dpi / 72.0),
            LengthUnit::Pc => Some(number * dpi / 6.0),
            LengthUnit::Em | LengthUnit::Ex | LengthUnit::Percent => None,
        }
    }

    /// Converts `length`, written on `attr` of `node`, to user units.
    pub fn to_px(&self, node: NodeId, attr: &str, length: Length) -> Option<f64> {
        let n = length.number;
        match length.unit {
            LengthUnit::Em => Some(n * self.em_basis(node, attr)),
            LengthUnit::Ex => Some(n * self.em_basis(node, attr) / 2.0),
            LengthUnit::Percent => Some(n / 100.0 * self.percent_basis(node, attr)),
            unit => self.absolute_px(n, unit),
        }
    }

    /// Resolves a stored value. Numbers are returned as-is, never re-parsed.
    pub fn resolve_value(&self, node: NodeId, attr: &str, value: &AttrValue) -> Option<f64> {
        match value {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(t) => self.to_px(node, attr, parse_length(t)?),
        }
    }

    pub fn length(&self, node: NodeId, attr: &str) -> Option<f64> {
        let value = self.doc.attr(node, attr)?;
        self.resolve_value(node, attr, value)
    }

    /// Geometry call sites treat absent or unparseable lengths as zero.
    pub fn length_or_zero(&self, node: NodeId, attr: &str) -> f64 {
        self.length(node, attr).unwrap_or(0.0)
    }

    fn em_basis(&self, node: NodeId, attr: &str) -> f64 {
        if attr == "font-size" {
            self.parent_font_size(node)
        } else {
            self.font_size(node)
        }
    }

    /// Computed font size: the nearest explicit `font-size` on the node or its ancestors.
    pub fn font_size(&self, node: NodeId) -> f64 {
        self.inherited_length(node, "font-size", self.config.default_font_size)
    }

    fn parent_font_size(&self, node: NodeId) -> f64 {
        match self.doc.parent(node) {
            Some(p) => self.font_size(p),
            None => self.config.default_font_size,
        }
    }

    /// Walks `node` and its ancestors until an explicit, resolvable value is found.
    pub fn inherited_length(&self, node: NodeId, attr: &str, default: f64) -> f64 {
        std::iter::once(node)
            .chain(self.doc.ancestors(node))
            .find_map(|n| self.length(n, attr))
            .unwrap_or(default)
    }

    /// Nearest explicit value of an inherited presentation attribute (`inherit` is skipped).
    pub fn inherited_attr(&self, node: NodeId, attr: &str) -> Option<Cow<'a, str>> {
        std::iter::once(node)
            .chain(self.doc.ancestors(node))
            .filter_map(|n| self.doc.attr_str(n, attr))
            .find(|v| v.trim() != "inherit")
    }

    /// Width and height of the viewport established by the nearest ancestor `<svg>`.
    pub fn viewport(&self, node: NodeId) -> (f64, f64) {
        let Some(svg) = self.doc.ancestor_by_tag(node, "svg") else {
            return (0.0, 0.0);
        };
        if let Some(vb) = self
            .doc
            .attr_str(svg, "viewBox")
            .and_then(|v| v.parse::<svgtypes::ViewBox>().ok())
        {
            return (vb.w, vb.h);
        }
        (
            self.length(svg, "width").unwrap_or(0.0),
            self.length(svg, "height").unwrap_or(0.0),
        )
    }

    pub fn percent_basis(&self, node: NodeId, attr: &str) -> f64 {
        match PercentBasis::for_attr(attr) {
            PercentBasis::FontSize => self.parent_font_size(node),
            basis => {
                let (w, h) = self.viewport(node);
                match basis {
                    PercentBasis::Width => w,
                    PercentBasis::Height => h,
                    _ => ((w * w + h * h) / 2.0).sqrt(),
                }
            }
        }
    }
}

/// Stores a number verbatim on `attr`.
pub fn set_number(doc: &mut Document, node: NodeId, attr: &str, value: f64) {
    doc.set_attr(node, attr, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_dom::attrs;

    fn fixture() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let svg = doc.create_element(
            "svg",
            attrs! { "width" => "400", "height" => "300", "viewBox" => "0 0 200 100" },
            vec![],
            None,
        );
        let g = doc.create_element("g", attrs! { "font-size" => "20" }, vec![], Some(svg));
        let rect = doc.create_element("rect", attrs! {}, vec![], Some(g));
        (doc, svg, rect)
    }

    #[test]
    fn absolute_units_use_dpi() {
        let (doc, _, rect) = fixture();
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        let px = |s: &str| r.to_px(rect, "stroke-width", parse_length(s).unwrap()).unwrap();
        assert_eq!(px("10"), 10.0);
        assert_eq!(px("10px"), 10.0);
        assert_eq!(px("1in"), 96.0);
        assert!((px("2.54cm") - 96.0).abs() < 1e-9);
        assert!((px("25.4mm") - 96.0).abs() < 1e-9);
        assert_eq!(px("72pt"), 96.0);
        assert_eq!(px("6pc"), 96.0);
        assert_eq!(px("1e1"), 10.0);
    }

    #[test]
    fn relative_units_use_inherited_font_size() {
        let (doc, _, rect) = fixture();
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.font_size(rect), 20.0);
        assert_eq!(r.to_px(rect, "x", parse_length("2em").unwrap()), Some(40.0));
        assert_eq!(r.to_px(rect, "x", parse_length("2ex").unwrap()), Some(20.0));
    }

    #[test]
    fn percentages_follow_the_viewbox() {
        let (doc, _, rect) = fixture();
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.viewport(rect), (200.0, 100.0));
        assert_eq!(r.to_px(rect, "width", parse_length("50%").unwrap()), Some(100.0));
        assert_eq!(r.to_px(rect, "cy", parse_length("50%").unwrap()), Some(50.0));
        let diag = ((200.0f64 * 200.0 + 100.0 * 100.0) / 2.0).sqrt();
        let got = r.to_px(rect, "r", parse_length("100%").unwrap()).unwrap();
        assert!((got - diag).abs() < 1e-9);
    }

    #[test]
    fn font_size_percentage_uses_parent_font_size() {
        let (mut doc, _, rect) = fixture();
        doc.set_attr(rect, "font-size", "150%");
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.font_size(rect), 30.0);
    }

    #[test]
    fn viewport_falls_back_to_width_and_height() {
        let (mut doc, svg, rect) = fixture();
        doc.remove_attr(svg, "viewBox");
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.viewport(rect), (400.0, 300.0));
        assert_eq!(r.viewport(svg), (0.0, 0.0));
    }

    #[test]
    fn unparseable_lengths_resolve_to_none() {
        let (mut doc, _, rect) = fixture();
        doc.set_attr(rect, "x", "ten");
        doc.set_attr(rect, "y", "5px and more");
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.length(rect, "x"), None);
        assert_eq!(r.length(rect, "y"), None);
        assert_eq!(r.length_or_zero(rect, "x"), 0.0);
        assert_eq!(r.length(rect, "missing"), None);
    }

    #[test]
    fn stored_numbers_are_returned_verbatim() {
        let (mut doc, _, rect) = fixture();
        let v = 0.1 + 0.2;
        set_number(&mut doc, rect, "x", v);
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.length(rect, "x"), Some(v));
    }

    #[test]
    fn inherited_attr_skips_inherit() {
        let (mut doc, svg, rect) = fixture();
        doc.set_attr(svg, "fill", "red");
        doc.set_attr(rect, "fill", "inherit");
        let cfg = EngineConfig::default();
        let r = Resolver::new(&doc, &cfg);
        assert_eq!(r.inherited_attr(rect, "fill").as_deref(), Some("red"));
        assert_eq!(r.inherited_attr(rect, "stroke"), None);
    }
}
