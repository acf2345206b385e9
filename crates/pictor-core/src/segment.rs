//! Flattened outline primitives: lines and cubic beziers grouped into subpaths.

use crate::geom::{Box2, Matrix, Point, box2, point, union_boxes};
use crate::path::{PathCommand, PathCommandList};

/// Pieces used when a cubic is approximated by lines for distance and winding queries.
const FLATTEN_STEPS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line([Point; 2]),
    Cubic([Point; 4]),
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Self::Line(p) => p[0],
            Self::Cubic(p) => p[0],
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Line(p) => p[1],
            Self::Cubic(p) => p[3],
        }
    }

    pub fn eval(&self, t: f64) -> Point {
        match self {
            Self::Line([a, b]) => a.lerp(*b, t),
            Self::Cubic([p0, p1, p2, p3]) => {
                let mt = 1.0 - t;
                let (a, b, c, d) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
                point(
                    a * p0.x + b * p1.x + c * p2.x + d * p3.x,
                    a * p0.y + b * p1.y + c * p2.y + d * p3.y,
                )
            }
        }
    }

    pub fn transform(&self, m: &Matrix) -> Self {
        match self {
            Self::Line(p) => Self::Line(p.map(|q| m.transform_point(q))),
            Self::Cubic(p) => Self::Cubic(p.map(|q| m.transform_point(q))),
        }
    }

    /// Polyline approximation; lines return their two endpoints.
    pub fn flatten(&self) -> Vec<Point> {
        match self {
            Self::Line(p) => p.to_vec(),
            Self::Cubic(_) => (0..=FLATTEN_STEPS)
                .map(|i| self.eval(i as f64 / FLATTEN_STEPS as f64))
                .collect(),
        }
    }

    /// Exact bounds: endpoints plus the curve's axis extrema.
    pub fn bbox(&self) -> Box2 {
        match self {
            Self::Line(p) => Box2::from_points(p),
            Self::Cubic([p0, p1, p2, p3]) => {
                let mut pts = vec![*p0, *p3];
                for t in cubic_extrema(p0.x, p1.x, p2.x, p3.x)
                    .into_iter()
                    .chain(cubic_extrema(p0.y, p1.y, p2.y, p3.y))
                {
                    pts.push(self.eval(t));
                }
                Box2::from_points(pts)
            }
        }
    }

    pub fn distance_to(&self, p: Point) -> f64 {
        self.flatten()
            .windows(2)
            .map(|w| point_line_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }

    /// Whether any part of the segment lies inside or crosses `rect`.
    pub fn intersects_rect(&self, rect: &Box2) -> bool {
        self.flatten()
            .windows(2)
            .any(|w| line_intersects_rect(w[0], w[1], rect))
    }

    /// X coordinates where the segment crosses the x axis (`y = 0`).
    pub fn x_axis_crossings(&self) -> Vec<f64> {
        match self {
            Self::Line([a, b]) => {
                if a.y == b.y {
                    return Vec::new();
                }
                let t = a.y / (a.y - b.y);
                if (0.0..=1.0).contains(&t) {
                    vec![a.x + (b.x - a.x) * t]
                } else {
                    Vec::new()
                }
            }
            Self::Cubic([p0, p1, p2, p3]) => {
                let a = -p0.y + 3.0 * p1.y - 3.0 * p2.y + p3.y;
                let b = 3.0 * p0.y - 6.0 * p1.y + 3.0 * p2.y;
                let c = -3.0 * p0.y + 3.0 * p1.y;
                let d = p0.y;
                solve_cubic(a, b, c, d)
                    .into_iter()
                    .filter(|t| (-1e-9..=1.0 + 1e-9).contains(t))
                    .map(|t| self.eval(t.clamp(0.0, 1.0)).x)
                    .collect()
            }
        }
    }
}

fn point_line_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.square_length();
    if len2 == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

fn line_intersects_rect(a: Point, b: Point, rect: &Box2) -> bool {
    // Liang-Barsky clipping.
    let d = b - a;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-d.x, a.x - rect.min.x),
        (d.x, rect.max.x - a.x),
        (-d.y, a.y - rect.min.y),
        (d.y, rect.max.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return false;
            }
        }
    }
    true
}

/// Parameters in (0, 1) where a cubic's derivative vanishes along one axis.
fn cubic_extrema(p0: f64, p1: f64, p2: f64, p3: f64) -> Vec<f64> {
    let a = 3.0 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3);
    let b = 6.0 * (p0 - 2.0 * p1 + p2);
    let c = 3.0 * (p1 - p0);
    solve_quadratic(a, b, c)
        .into_iter()
        .filter(|t| *t > 0.0 && *t < 1.0)
        .collect()
}

fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    const EPS: f64 = 1e-12;
    if a.abs() < EPS {
        if b.abs() < EPS {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    vec![(-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)]
}

/// Real roots of `a·t³ + b·t² + c·t + d`.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a.abs() < 1e-12 {
        return solve_quadratic(b, c, d);
    }
    let (b, c, d) = (b / a, c / a, d / a);
    let q = (3.0 * c - b * b) / 9.0;
    let r = (9.0 * b * c - 27.0 * d - 2.0 * b * b * b) / 54.0;
    let disc = q * q * q + r * r;
    let shift = b / 3.0;
    if disc > 0.0 {
        let s = (r + disc.sqrt()).cbrt();
        let t = (r - disc.sqrt()).cbrt();
        vec![s + t - shift]
    } else if disc == 0.0 {
        let s = r.cbrt();
        vec![2.0 * s - shift, -s - shift]
    } else {
        let theta = (r / (-q * q * q).sqrt()).clamp(-1.0, 1.0).acos();
        let m = 2.0 * (-q).sqrt();
        (0..3)
            .map(|k| m * ((theta + 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos() - shift)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("evenodd") => Self::EvenOdd,
            _ => Self::NonZero,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subpath {
    pub segments: Vec<Segment>,
    pub closed: bool,
}

fn finish(sp: &mut Subpath, all: &mut Vec<Subpath>) {
    if !sp.segments.is_empty() {
        all.push(std::mem::take(sp));
    }
    sp.closed = false;
}

/// One or more subpaths; may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegList {
    subpaths: Vec<Subpath>,
}

impl SegList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(cmds: &PathCommandList) -> Self {
        let mut subpaths: Vec<Subpath> = Vec::new();
        let mut current = Subpath::default();
        let mut pos = point(0.0, 0.0);
        let mut start = pos;
        for cmd in cmds {
            match *cmd {
                PathCommand::MoveTo(p) => {
                    finish(&mut current, &mut subpaths);
                    pos = p;
                    start = p;
                }
                PathCommand::LineTo(p) => {
                    if current.closed {
                        finish(&mut current, &mut subpaths);
                    }
                    current.segments.push(Segment::Line([pos, p]));
                    pos = p;
                }
                PathCommand::CurveTo(c1, c2, p) => {
                    if current.closed {
                        finish(&mut current, &mut subpaths);
                    }
                    current.segments.push(Segment::Cubic([pos, c1, c2, p]));
                    pos = p;
                }
                PathCommand::Close => {
                    if pos != start {
                        current.segments.push(Segment::Line([pos, start]));
                    }
                    current.closed = true;
                    pos = start;
                }
            }
        }
        finish(&mut current, &mut subpaths);
        Self { subpaths }
    }

    pub fn subpaths(&self) -> &[Subpath] {
        &self.subpaths
    }

    pub fn append(&mut self, other: SegList) {
        self.subpaths.extend(other.subpaths);
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.subpaths.iter().flat_map(|s| s.segments.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    pub fn transform(&self, m: &Matrix) -> Self {
        Self {
            subpaths: self
                .subpaths
                .iter()
                .map(|s| Subpath {
                    segments: s.segments.iter().map(|seg| seg.transform(m)).collect(),
                    closed: s.closed,
                })
                .collect(),
        }
    }

    pub fn bbox(&self) -> Option<Box2> {
        self.segments()
            .fold(None, |acc, s| Some(union_boxes(acc, s.bbox())))
    }

    pub fn distance_to(&self, p: Point) -> f64 {
        self.segments()
            .map(|s| s.distance_to(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Winding-rule containment. Every subpath is implicitly closed, as for filling.
    pub fn contains(&self, p: Point, rule: FillRule) -> bool {
        let mut winding = 0i32;
        let mut crossings = 0u32;
        for sp in &self.subpaths {
            let mut poly: Vec<Point> = Vec::new();
            for seg in &sp.segments {
                let pts = seg.flatten();
                let skip = usize::from(!poly.is_empty());
                poly.extend(pts.into_iter().skip(skip));
            }
            if poly.len() < 2 {
                continue;
            }
            for i in 0..poly.len() {
                let a = poly[i];
                let b = poly[(i + 1) % poly.len()];
                if (a.y <= p.y) != (b.y <= p.y) {
                    let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                    if x > p.x {
                        crossings += 1;
                        winding += if b.y > a.y { 1 } else { -1 };
                    }
                }
            }
        }
        match rule {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => crossings % 2 == 1,
        }
    }

    pub fn intersects_rect(&self, rect: &Box2) -> bool {
        self.segments().any(|s| s.intersects_rect(rect))
    }

    /// Points where the infinite line through `a` and `b` crosses the outline, restricted to
    /// the segment `a..b` and ordered from `a` to `b`.
    pub fn intersect_line(&self, a: Point, b: Point) -> Vec<Point> {
        let dir = b - a;
        let len = dir.length();
        if len == 0.0 {
            return Vec::new();
        }
        let (ux, uy) = (dir.x / len, dir.y / len);
        // Rotate by -angle(dir) about `a`, so the query line becomes the positive x axis.
        let to_local = Matrix::new(ux, -uy, uy, ux, 0.0, 0.0).pre_translate(-a.to_vector());
        let local = self.transform(&to_local);
        let mut params: Vec<f64> = local
            .segments()
            .flat_map(|s| s.x_axis_crossings())
            .filter(|x| *x >= -1e-9 && *x <= len + 1e-9)
            .collect();
        params.sort_by(|x, y| x.total_cmp(y));
        params.dedup_by(|x, y| (*x - *y).abs() < 1e-9);
        params
            .into_iter()
            .map(|t| point(a.x + ux * t, a.y + uy * t))
            .collect()
    }
}

/// Outline of an axis-aligned box as a closed quad.
pub fn rect_seglist(b: &Box2) -> SegList {
    let pts = [
        point(b.min.x, b.min.y),
        point(b.max.x, b.min.y),
        point(b.max.x, b.max.y),
        point(b.min.x, b.max.y),
    ];
    SegList {
        subpaths: vec![Subpath {
            segments: (0..4).map(|i| Segment::Line([pts[i], pts[(i + 1) % 4]])).collect(),
            closed: true,
        }],
    }
}

/// Enlarges a box by `by` on every side.
pub fn inflate(b: &Box2, by: f64) -> Box2 {
    box2(b.min.x - by, b.min.y - by, b.max.x + by, b.max.y + by)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path_data;

    fn seglist(d: &str) -> SegList {
        SegList::from_commands(&parse_path_data(d).unwrap())
    }

    #[test]
    fn close_adds_the_return_edge() {
        let s = seglist("M0 0 L10 0 L10 10 Z");
        assert_eq!(s.subpaths().len(), 1);
        assert_eq!(s.subpaths()[0].segments.len(), 3);
        assert!(s.subpaths()[0].closed);
        let s = seglist("M0 0 L10 0 L0 0 Z");
        assert_eq!(s.subpaths()[0].segments.len(), 2);
    }

    #[test]
    fn cubic_bbox_includes_extrema() {
        let s = seglist("M0 0 C0 -10 10 -10 10 0");
        let b = s.bbox().unwrap();
        assert!((b.min.y + 7.5).abs() < 1e-9);
        assert_eq!((b.min.x, b.max.x, b.max.y), (0.0, 10.0, 0.0));
    }

    #[test]
    fn winding_rules_differ_on_nested_squares() {
        // Both squares wound the same way: the inner square is filled under nonzero only.
        let s = seglist("M0 0 L30 0 L30 30 L0 30 Z M10 10 L20 10 L20 20 L10 20 Z");
        let center = point(15.0, 15.0);
        assert!(s.contains(center, FillRule::NonZero));
        assert!(!s.contains(center, FillRule::EvenOdd));
        assert!(s.contains(point(5.0, 5.0), FillRule::EvenOdd));
        assert!(!s.contains(point(40.0, 5.0), FillRule::NonZero));
    }

    #[test]
    fn open_subpaths_are_implicitly_closed_for_containment() {
        let s = seglist("M0 0 L10 0 L10 10 L0 10");
        assert!(s.contains(point(5.0, 5.0), FillRule::NonZero));
    }

    #[test]
    fn distance_and_rect_intersection() {
        let s = seglist("M0 0 L10 0");
        assert!((s.distance_to(point(5.0, 3.0)) - 3.0).abs() < 1e-9);
        assert!((s.distance_to(point(13.0, 4.0)) - 5.0).abs() < 1e-9);
        assert!(s.intersects_rect(&box2(4.0, -1.0, 6.0, 1.0)));
        assert!(s.intersects_rect(&box2(-5.0, -5.0, 20.0, 5.0)));
        assert!(!s.intersects_rect(&box2(4.0, 1.0, 6.0, 2.0)));
    }

    #[test]
    fn line_intersection_is_sorted_along_the_query() {
        let s = rect_seglist(&box2(0.0, 0.0, 10.0, 10.0));
        let hits = s.intersect_line(point(20.0, 5.0), point(-20.0, 5.0));
        assert_eq!(hits.len(), 2);
        assert!((hits[0].x - 10.0).abs() < 1e-9 && (hits[0].y - 5.0).abs() < 1e-9);
        assert!(hits[1].x.abs() < 1e-9);

        let diag = s.intersect_line(point(-5.0, -5.0), point(15.0, 15.0));
        assert_eq!(diag.len(), 2);
        assert!(diag[0].x.abs() < 1e-9 && diag[0].y.abs() < 1e-9);
        assert!((diag[1].x - 10.0).abs() < 1e-9);

        assert!(s.intersect_line(point(20.0, 5.0), point(15.0, 5.0)).is_empty());
    }

    #[test]
    fn cubic_roots() {
        let mut roots = solve_cubic(1.0, -6.0, 11.0, -6.0);
        roots.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(roots.len(), 3);
        for (r, e) in roots.iter().zip([1.0, 2.0, 3.0]) {
            assert!((r - e).abs() < 1e-9);
        }
    }
}
