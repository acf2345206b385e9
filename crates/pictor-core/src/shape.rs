//! Shape geometry: every supported element kind as path commands, segments and bounds.
//!
//! All queries take an optional accumulated ancestor transform (`None` is the identity). The
//! node's own `transform` attribute is always applied on top of it.

use crate::config::EngineConfig;
use crate::geom::{Box2, Matrix, box2, point, union_boxes};
use crate::path::{PathCommand, PathCommandList, parse_path_data_lossy};
use crate::segment::SegList;
use crate::transform::{TransformContext, multiply, parse_transform};
use crate::units::Resolver;
use pictor_dom::{Document, NodeId};

/// Control-point distance for a quarter-circle cubic, relative to the radius.
pub const KAPPA: f64 = 0.552284749831;

/// Approximate advance of one character, relative to the font size.
const CHAR_WIDTH: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rect,
    Circle,
    Ellipse,
    Path,
    Text,
    Image,
    Group,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        Self::Rect,
        Self::Circle,
        Self::Ellipse,
        Self::Path,
        Self::Text,
        Self::Image,
        Self::Group,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "ellipse" => Self::Ellipse,
            "path" => Self::Path,
            "text" => Self::Text,
            "image" => Self::Image,
            "g" | "svg" => Self::Group,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Path => "path",
            Self::Text => "text",
            Self::Image => "image",
            Self::Group => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

impl WritingMode {
    /// Accepts both the CSS keywords and the SVG 1.1 spellings.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "vertical-rl" | "tb" | "tb-rl" => Self::VerticalRl,
            "vertical-lr" => Self::VerticalLr,
            _ => Self::HorizontalTb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "middle" => Self::Middle,
            "end" => Self::End,
            _ => Self::Start,
        }
    }

    fn shift(self, extent: f64) -> f64 {
        match self {
            Self::Start => 0.0,
            Self::Middle => extent / 2.0,
            Self::End => extent,
        }
    }
}

/// Text lines: one per `tspan` child, else one per newline-separated run of the text content.
pub fn text_lines(doc: &Document, node: NodeId) -> Vec<String> {
    let tspans: Vec<String> = doc
        .children(node)
        .into_iter()
        .filter(|c| doc.tag(*c) == Some("tspan"))
        .map(|c| doc.text_content(c))
        .collect();
    if !tspans.is_empty() {
        return tspans;
    }
    doc.text_content(node).split('\n').map(str::to_string).collect()
}

/// Geometry queries over one document.
#[derive(Debug, Clone, Copy)]
pub struct Geometry<'a> {
    res: Resolver<'a>,
}

impl<'a> Geometry<'a> {
    pub fn new(doc: &'a Document, config: &'a EngineConfig) -> Self {
        Self {
            res: Resolver::new(doc, config),
        }
    }

    pub fn resolver(&self) -> &Resolver<'a> {
        &self.res
    }

    pub fn doc(&self) -> &'a Document {
        self.res.doc()
    }

    pub fn kind(&self, node: NodeId) -> Option<ShapeKind> {
        self.doc().tag(node).and_then(ShapeKind::from_tag)
    }

    /// Unit context for the node's transform arguments.
    pub fn transform_context(&self, node: NodeId) -> TransformContext {
        TransformContext {
            dpi: self.res.config().dpi,
            font_size: self.res.font_size(node),
            viewport: Some(self.res.viewport(node)),
        }
    }

    pub fn local_transform(&self, node: NodeId) -> Matrix {
        let Some(text) = self.doc().attr_str(node, "transform") else {
            return Matrix::identity();
        };
        parse_transform(&text, &self.transform_context(node)).unwrap_or_else(|err| {
            tracing::warn!(%node, %err, "ignoring malformed transform");
            Matrix::identity()
        })
    }

    /// Product of every ancestor's local transform, outermost first.
    pub fn ancestor_transform(&self, node: NodeId) -> Matrix {
        let chain: Vec<NodeId> = self.doc().ancestors(node).collect();
        chain
            .into_iter()
            .rev()
            .fold(Matrix::identity(), |acc, n| multiply(&acc, &self.local_transform(n)))
    }

    /// Maps the node's user space to the document root's.
    pub fn screen_transform(&self, node: NodeId) -> Matrix {
        multiply(&self.ancestor_transform(node), &self.local_transform(node))
    }

    pub(crate) fn accumulate(&self, node: NodeId, ancestor: Option<&Matrix>) -> Matrix {
        let local = self.local_transform(node);
        match ancestor {
            Some(m) => multiply(m, &local),
            None => local,
        }
    }

    fn shape_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.doc()
            .children(node)
            .into_iter()
            .filter(move |c| self.kind(*c).is_some())
    }

    /// Outline in the node's own user space, before its transform.
    pub fn shape_commands(&self, node: NodeId) -> PathCommandList {
        match self.kind(node) {
            Some(ShapeKind::Rect) => self.rect_commands(node),
            Some(ShapeKind::Circle) => {
                let r = self.res.length_or_zero(node, "r");
                self.ellipse_commands(node, r, r)
            }
            Some(ShapeKind::Ellipse) => {
                let rx = self.res.length_or_zero(node, "rx");
                let ry = self.res.length_or_zero(node, "ry");
                self.ellipse_commands(node, rx, ry)
            }
            Some(ShapeKind::Path) => self
                .doc()
                .attr_str(node, "d")
                .map(|d| parse_path_data_lossy(&d))
                .unwrap_or_default(),
            Some(ShapeKind::Text) => box_commands(&self.text_box(node)),
            Some(ShapeKind::Image) => box_commands(&self.xywh_box(node)),
            Some(ShapeKind::Group) | None => PathCommandList::new(),
        }
    }

    pub fn path_commands(&self, node: NodeId, ancestor: Option<&Matrix>) -> PathCommandList {
        let m = self.accumulate(node, ancestor);
        match self.kind(node) {
            Some(ShapeKind::Group) => {
                let mut out = PathCommandList::new();
                for child in self.shape_children(node) {
                    out.extend(self.path_commands(child, Some(&m)));
                }
                out
            }
            Some(_) => self.shape_commands(node).transform(&m),
            None => PathCommandList::new(),
        }
    }

    pub fn seg_list(&self, node: NodeId, ancestor: Option<&Matrix>) -> SegList {
        let m = self.accumulate(node, ancestor);
        match self.kind(node) {
            Some(ShapeKind::Group) => {
                let mut out = SegList::new();
                for child in self.shape_children(node) {
                    out.append(self.seg_list(child, Some(&m)));
                }
                out
            }
            Some(_) => SegList::from_commands(&self.shape_commands(node).transform(&m)),
            None => SegList::new(),
        }
    }

    /// Axis-aligned bounds; `None` for empty shapes and groups.
    pub fn bbox(&self, node: NodeId, ancestor: Option<&Matrix>) -> Option<Box2> {
        let m = self.accumulate(node, ancestor);
        match self.kind(node)? {
            ShapeKind::Group => self
                .shape_children(node)
                .filter_map(|c| self.bbox(c, Some(&m)))
                .fold(None, |acc, b| Some(union_boxes(acc, b))),
            _ => SegList::from_commands(&self.shape_commands(node).transform(&m)).bbox(),
        }
    }

    fn xywh_box(&self, node: NodeId) -> Box2 {
        let x = self.res.length_or_zero(node, "x");
        let y = self.res.length_or_zero(node, "y");
        let w = self.res.length_or_zero(node, "width").max(0.0);
        let h = self.res.length_or_zero(node, "height").max(0.0);
        box2(x, y, x + w, y + h)
    }

    /// Corner radii after mirroring a lone `rx`/`ry` and clamping to half the size.
    pub fn rect_radii(&self, node: NodeId) -> (f64, f64) {
        let b = self.xywh_box(node);
        let rx = self.res.length(node, "rx");
        let ry = self.res.length(node, "ry");
        let (rx, ry) = match (rx, ry) {
            (Some(rx), Some(ry)) => (rx, ry),
            (Some(r), None) | (None, Some(r)) => (r, r),
            (None, None) => (0.0, 0.0),
        };
        (
            rx.clamp(0.0, b.width() / 2.0),
            ry.clamp(0.0, b.height() / 2.0),
        )
    }

    fn rect_commands(&self, node: NodeId) -> PathCommandList {
        let b = self.xywh_box(node);
        let (rx, ry) = self.rect_radii(node);
        if rx == 0.0 || ry == 0.0 {
            return box_commands(&b);
        }
        let (x0, y0, x1, y1) = (b.min.x, b.min.y, b.max.x, b.max.y);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        use PathCommand::*;
        [
            MoveTo(point(x0 + rx, y0)),
            LineTo(point(x1 - rx, y0)),
            CurveTo(point(x1 - rx + kx, y0), point(x1, y0 + ry - ky), point(x1, y0 + ry)),
            LineTo(point(x1, y1 - ry)),
            CurveTo(point(x1, y1 - ry + ky), point(x1 - rx + kx, y1), point(x1 - rx, y1)),
            LineTo(point(x0 + rx, y1)),
            CurveTo(point(x0 + rx - kx, y1), point(x0, y1 - ry + ky), point(x0, y1 - ry)),
            LineTo(point(x0, y0 + ry)),
            CurveTo(point(x0, y0 + ry - ky), point(x0 + rx - kx, y0), point(x0 + rx, y0)),
            Close,
        ]
        .into_iter()
        .collect()
    }

    fn ellipse_commands(&self, node: NodeId, rx: f64, ry: f64) -> PathCommandList {
        if rx <= 0.0 || ry <= 0.0 {
            return PathCommandList::new();
        }
        let cx = self.res.length_or_zero(node, "cx");
        let cy = self.res.length_or_zero(node, "cy");
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        use PathCommand::*;
        [
            MoveTo(point(cx + rx, cy)),
            CurveTo(point(cx + rx, cy + ky), point(cx + kx, cy + ry), point(cx, cy + ry)),
            CurveTo(point(cx - kx, cy + ry), point(cx - rx, cy + ky), point(cx - rx, cy)),
            CurveTo(point(cx - rx, cy - ky), point(cx - kx, cy - ry), point(cx, cy - ry)),
            CurveTo(point(cx + kx, cy - ry), point(cx + rx, cy - ky), point(cx + rx, cy)),
            Close,
        ]
        .into_iter()
        .collect()
    }

    /// Approximate text box from the anchor point, font size, line count and writing mode.
    pub fn text_box(&self, node: NodeId) -> Box2 {
        let doc = self.doc();
        let x = self.res.length_or_zero(node, "x");
        let y = self.res.length_or_zero(node, "y");
        let fs = self.res.font_size(node);
        let advance = self.res.length(node, "line-height").unwrap_or(fs);
        let lines = text_lines(doc, node);
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let primary = longest as f64 * CHAR_WIDTH * fs;
        let across = fs + lines.len().saturating_sub(1) as f64 * advance;
        let anchor = self
            .res
            .inherited_attr(node, "text-anchor")
            .map(|v| TextAnchor::parse(&v))
            .unwrap_or_default();
        let mode = self
            .res
            .inherited_attr(node, "writing-mode")
            .map(|v| WritingMode::parse(&v))
            .unwrap_or_default();
        let shift = anchor.shift(primary);
        match mode {
            WritingMode::HorizontalTb => {
                let x0 = x - shift;
                let y0 = y - fs;
                box2(x0, y0, x0 + primary, y0 + across)
            }
            WritingMode::VerticalRl => {
                let y0 = y - shift;
                let x1 = x + fs / 2.0;
                box2(x1 - across, y0, x1, y0 + primary)
            }
            WritingMode::VerticalLr => {
                let y0 = y - shift;
                let x0 = x - fs / 2.0;
                box2(x0, y0, x0 + across, y0 + primary)
            }
        }
    }
}

fn box_commands(b: &Box2) -> PathCommandList {
    use PathCommand::*;
    [
        MoveTo(point(b.min.x, b.min.y)),
        LineTo(point(b.max.x, b.min.y)),
        LineTo(point(b.max.x, b.max.y)),
        LineTo(point(b.min.x, b.max.y)),
        Close,
    ]
    .into_iter()
    .collect()
}
