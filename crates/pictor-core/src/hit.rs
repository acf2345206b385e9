//! Point, rectangle and line queries against shapes.

use crate::geom::{Box2, Matrix, Point, point};
use crate::segment::{FillRule, inflate};
use crate::shape::{Geometry, ShapeKind};
use crate::transform::scale_factor;
use pictor_dom::NodeId;

/// Stroke and fill state of a shape, after inheritance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Stroke width when the stroke is visible.
    pub stroke: Option<f64>,
    /// Fill rule when the shape is filled.
    pub fill: Option<FillRule>,
}

impl Geometry<'_> {
    pub fn paint(&self, node: NodeId) -> Paint {
        let res = self.resolver();
        let width = res.inherited_length(node, "stroke-width", 1.0);
        let stroke = res
            .inherited_attr(node, "stroke")
            .filter(|s| s.trim() != "none" && !s.trim().is_empty())
            .map(|_| width)
            .filter(|w| *w > 0.0);
        let fill = match res.inherited_attr(node, "fill") {
            Some(f) if f.trim() == "none" => None,
            _ => Some(FillRule::from_attr(
                res.inherited_attr(node, "fill-rule").as_deref(),
            )),
        };
        Paint { stroke, fill }
    }

    /// Stroke width in the space of `ancestor`, scaled along with the outline.
    fn world_stroke(&self, node: NodeId, paint: &Paint, ancestor: Option<&Matrix>) -> Option<f64> {
        let m = self.accumulate(node, ancestor);
        paint.stroke.map(|w| w * scale_factor(&m))
    }

    /// Whether `p` falls on the shape's stroke (with pick tolerance) or inside its fill.
    pub fn contains_point(&self, node: NodeId, p: Point, ancestor: Option<&Matrix>) -> bool {
        match self.kind(node) {
            Some(ShapeKind::Group) => self.hit_test(node, p, ancestor).is_some(),
            Some(_) => {
                let segs = self.seg_list(node, ancestor);
                let paint = self.paint(node);
                if let Some(width) = self.world_stroke(node, &paint, ancestor) {
                    let reach =
                        width / (2.0 * std::f64::consts::SQRT_2) + self.resolver().config().pick_tolerance;
                    if segs.distance_to(p) <= reach {
                        return true;
                    }
                }
                paint.fill.is_some_and(|rule| segs.contains(p, rule))
            }
            None => false,
        }
    }

    /// The shape under `p`: the node itself, or for groups the first child (in document
    /// order) that reports a hit.
    pub fn hit_test(&self, node: NodeId, p: Point, ancestor: Option<&Matrix>) -> Option<NodeId> {
        match self.kind(node)? {
            ShapeKind::Group => {
                let m = self.group_transform(node, ancestor);
                self.doc()
                    .children(node)
                    .into_iter()
                    .find_map(|c| self.hit_test(c, p, Some(&m)))
            }
            _ => self.contains_point(node, p, ancestor).then_some(node),
        }
    }

    fn group_transform(&self, node: NodeId, ancestor: Option<&Matrix>) -> Matrix {
        let local = self.local_transform(node);
        match ancestor {
            Some(m) => crate::transform::multiply(m, &local),
            None => local,
        }
    }

    /// Whether the shape touches `rect`: an outline crossing the stroke-enlarged rectangle, or
    /// a filled region that wholly encloses it.
    pub fn intersects_rect(&self, node: NodeId, rect: &Box2, ancestor: Option<&Matrix>) -> bool {
        match self.kind(node) {
            Some(ShapeKind::Group) => {
                let m = self.group_transform(node, ancestor);
                self.doc()
                    .children(node)
                    .into_iter()
                    .any(|c| self.intersects_rect(c, rect, Some(&m)))
            }
            Some(_) => {
                let segs = self.seg_list(node, ancestor);
                let paint = self.paint(node);
                let stroke = self.world_stroke(node, &paint, ancestor).unwrap_or(0.0);
                let grown = inflate(rect, stroke / 2.0);
                if segs.intersects_rect(&grown) {
                    return true;
                }
                paint
                    .fill
                    .is_some_and(|rule| segs.contains(point(rect.min.x, rect.min.y), rule))
            }
            None => false,
        }
    }

    /// Outline crossings along the segment `a..b`, ordered from `a`.
    pub fn intersect_line(
        &self,
        node: NodeId,
        a: Point,
        b: Point,
        ancestor: Option<&Matrix>,
    ) -> Vec<Point> {
        self.seg_list(node, ancestor).intersect_line(a, b)
    }
}
