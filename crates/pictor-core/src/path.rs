//! Absolute path command lists and `d` attribute parsing.
//!
//! Every authored path command normalizes into move/line/cubic/close in absolute coordinates:
//! quadratics are degree-elevated, elliptical arcs are split into cubic pieces of at most 90°.

use crate::geom::{Matrix, Point, point};
use pictor_dom::format_number;
use std::f64::consts::{FRAC_PI_2, PI};
use svgtypes::{PathParser, PathSegment};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Two control points followed by the end point.
    CurveTo(Point, Point, Point),
    Close,
}

impl PathCommand {
    pub fn end_point(&self) -> Option<Point> {
        match *self {
            Self::MoveTo(p) | Self::LineTo(p) | Self::CurveTo(_, _, p) => Some(p),
            Self::Close => None,
        }
    }

    fn transformed(&self, m: &Matrix) -> Self {
        let t = |p: Point| m.transform_point(p);
        match *self {
            Self::MoveTo(p) => Self::MoveTo(t(p)),
            Self::LineTo(p) => Self::LineTo(t(p)),
            Self::CurveTo(a, b, p) => Self::CurveTo(t(a), t(b), t(p)),
            Self::Close => Self::Close,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCommandList(Vec<PathCommand>);

impl PathCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: PathCommand) {
        self.0.push(cmd);
    }

    pub fn extend(&mut self, other: PathCommandList) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathCommand> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[PathCommand] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [PathCommand] {
        &mut self.0
    }

    pub fn transform(&self, m: &Matrix) -> Self {
        Self(self.0.iter().map(|c| c.transformed(m)).collect())
    }

    /// Serializes to `d` attribute text.
    pub fn to_path_data(&self) -> String {
        let p = |p: Point| format!("{},{}", format_number(p.x), format_number(p.y));
        self.0
            .iter()
            .map(|c| match *c {
                PathCommand::MoveTo(a) => format!("M{}", p(a)),
                PathCommand::LineTo(a) => format!("L{}", p(a)),
                PathCommand::CurveTo(a, b, c) => format!("C{} {} {}", p(a), p(b), p(c)),
                PathCommand::Close => "Z".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<PathCommand> for PathCommandList {
    fn from_iter<I: IntoIterator<Item = PathCommand>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PathCommandList {
    type Item = &'a PathCommand;
    type IntoIter = std::slice::Iter<'a, PathCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parse failure; `partial` holds every command parsed before the error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed path data: {message}")]
pub struct PathDataError {
    pub partial: PathCommandList,
    pub message: String,
}

#[derive(Default)]
struct Cursor {
    out: PathCommandList,
    current: Point,
    start: Point,
    last_cubic_ctrl: Option<Point>,
    last_quad_ctrl: Option<Point>,
}

impl Cursor {
    fn abs(&self, abs: bool, x: f64, y: f64) -> Point {
        if abs {
            point(x, y)
        } else {
            point(self.current.x + x, self.current.y + y)
        }
    }

    fn line(&mut self, p: Point) {
        self.out.push(PathCommand::LineTo(p));
        self.current = p;
    }

    fn cubic(&mut self, c1: Point, c2: Point, p: Point) {
        self.out.push(PathCommand::CurveTo(c1, c2, p));
        self.current = p;
    }

    fn quad(&mut self, q: Point, p: Point) {
        let p0 = self.current;
        let c1 = p0 + (q - p0) * (2.0 / 3.0);
        let c2 = p + (q - p) * (2.0 / 3.0);
        self.cubic(c1, c2, p);
    }

    fn reflect(&self, ctrl: Option<Point>) -> Point {
        match ctrl {
            Some(c) => point(2.0 * self.current.x - c.x, 2.0 * self.current.y - c.y),
            None => self.current,
        }
    }

    fn apply(&mut self, seg: PathSegment) {
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;
        match seg {
            PathSegment::MoveTo { abs, x, y } => {
                let p = self.abs(abs, x, y);
                self.out.push(PathCommand::MoveTo(p));
                self.current = p;
                self.start = p;
            }
            PathSegment::LineTo { abs, x, y } => {
                let p = self.abs(abs, x, y);
                self.line(p);
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                let x = if abs { x } else { self.current.x + x };
                self.line(point(x, self.current.y));
            }
            PathSegment::VerticalLineTo { abs, y } => {
                let y = if abs { y } else { self.current.y + y };
                self.line(point(self.current.x, y));
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let c1 = self.abs(abs, x1, y1);
                let c2 = self.abs(abs, x2, y2);
                let p = self.abs(abs, x, y);
                self.cubic(c1, c2, p);
                cubic_ctrl = Some(c2);
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let c1 = self.reflect(self.last_cubic_ctrl);
                let c2 = self.abs(abs, x2, y2);
                let p = self.abs(abs, x, y);
                self.cubic(c1, c2, p);
                cubic_ctrl = Some(c2);
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let q = self.abs(abs, x1, y1);
                let p = self.abs(abs, x, y);
                self.quad(q, p);
                quad_ctrl = Some(q);
            }
            PathSegment::SmoothQuadratic { abs, x, y } => {
                let q = self.reflect(self.last_quad_ctrl);
                let p = self.abs(abs, x, y);
                self.quad(q, p);
                quad_ctrl = Some(q);
            }
            PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let p = self.abs(abs, x, y);
                let arc = ArcParams {
                    rx,
                    ry,
                    rotation: x_axis_rotation,
                    large_arc,
                    sweep,
                };
                match arc_to_cubics(self.current, p, &arc) {
                    Some(pieces) => {
                        for [c1, c2, end] in pieces {
                            self.cubic(c1, c2, end);
                        }
                    }
                    None if p != self.current => self.line(p),
                    None => {}
                }
            }
            PathSegment::ClosePath { .. } => {
                self.out.push(PathCommand::Close);
                self.current = self.start;
            }
        }
        self.last_cubic_ctrl = cubic_ctrl;
        self.last_quad_ctrl = quad_ctrl;
    }
}

/// Parses `d` attribute text into absolute commands.
pub fn parse_path_data(d: &str) -> Result<PathCommandList, PathDataError> {
    let mut cursor = Cursor::default();
    for seg in PathParser::from(d) {
        match seg {
            Ok(seg) => cursor.apply(seg),
            Err(err) => {
                return Err(PathDataError {
                    partial: cursor.out,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(cursor.out)
}

/// Lenient variant for geometry queries: a malformed tail is logged and the prefix kept.
pub fn parse_path_data_lossy(d: &str) -> PathCommandList {
    match parse_path_data(d) {
        Ok(list) => list,
        Err(err) => {
            tracing::warn!(%err, kept = err.partial.len(), "path data truncated");
            err.partial
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ArcParams {
    rx: f64,
    ry: f64,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
}

fn vec_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    (ux * vy - uy * vx).atan2(ux * vx + uy * vy)
}

/// Endpoint-to-center arc conversion. `None` means the arc degenerates to a straight line
/// (or to nothing when both endpoints coincide).
fn arc_to_cubics(p0: Point, p: Point, arc: &ArcParams) -> Option<Vec<[Point; 3]>> {
    if p0 == p {
        return None;
    }
    let mut rx = arc.rx.abs();
    let mut ry = arc.ry.abs();
    if rx == 0.0 || ry == 0.0 {
        return None;
    }
    let (sin, cos) = arc.rotation.to_radians().sin_cos();
    let dx2 = (p0.x - p.x) / 2.0;
    let dy2 = (p0.y - p.y) / 2.0;
    let x1 = cos * dx2 + sin * dy2;
    let y1 = -sin * dx2 + cos * dy2;

    let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let num = rx * rx * ry * ry - rx * rx * y1 * y1 - ry * ry * x1 * x1;
    let den = rx * rx * y1 * y1 + ry * ry * x1 * x1;
    let mut coef = if den == 0.0 {
        0.0
    } else {
        (num / den).max(0.0).sqrt()
    };
    if arc.large_arc == arc.sweep {
        coef = -coef;
    }
    let cxp = coef * rx * y1 / ry;
    let cyp = -coef * ry * x1 / rx;
    let cx = cos * cxp - sin * cyp + (p0.x + p.x) / 2.0;
    let cy = sin * cxp + cos * cyp + (p0.y + p.y) / 2.0;

    let ux = (x1 - cxp) / rx;
    let uy = (y1 - cyp) / ry;
    let vx = (-x1 - cxp) / rx;
    let vy = (-y1 - cyp) / ry;
    let theta1 = vec_angle(1.0, 0.0, ux, uy);
    let mut dtheta = vec_angle(ux, uy, vx, vy);
    if !arc.sweep && dtheta > 0.0 {
        dtheta -= 2.0 * PI;
    } else if arc.sweep && dtheta < 0.0 {
        dtheta += 2.0 * PI;
    }

    let n = ((dtheta.abs() / FRAC_PI_2).ceil() as usize).max(1);
    let delta = dtheta / n as f64;
    let k = 4.0 / 3.0 * (delta / 4.0).tan();
    let map = |x: f64, y: f64| point(cx + rx * cos * x - ry * sin * y, cy + rx * sin * x + ry * cos * y);

    let mut pieces = Vec::with_capacity(n);
    for i in 0..n {
        let t1 = theta1 + delta * i as f64;
        let t2 = t1 + delta;
        let (s1, c1) = t1.sin_cos();
        let (s2, c2) = t2.sin_cos();
        let end = if i + 1 == n { p } else { map(c2, s2) };
        pieces.push([
            map(c1 - k * s1, s1 + k * c1),
            map(c2 + k * s2, s2 - k * c2),
            end,
        ]);
    }
    Some(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn relative_and_axis_commands_become_absolute() {
        let list = parse_path_data("m10 10 h5 v5 l-5 0 z").unwrap();
        assert_eq!(
            list.as_slice(),
            &[
                PathCommand::MoveTo(point(10.0, 10.0)),
                PathCommand::LineTo(point(15.0, 10.0)),
                PathCommand::LineTo(point(15.0, 15.0)),
                PathCommand::LineTo(point(10.0, 15.0)),
                PathCommand::Close,
            ]
        );
        assert_eq!(list.to_path_data(), "M10,10 L15,10 L15,15 L10,15 Z");
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        let list = parse_path_data("M0 0 C0 10 10 10 10 0 S20 -10 20 0").unwrap();
        match list.as_slice()[2] {
            PathCommand::CurveTo(c1, _, p) => {
                assert!(close(c1, point(10.0, -10.0)));
                assert!(close(p, point(20.0, 0.0)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quadratics_are_degree_elevated() {
        let list = parse_path_data("M0 0 Q 30 30 60 0 T 120 0").unwrap();
        match list.as_slice()[1] {
            PathCommand::CurveTo(c1, c2, p) => {
                assert!(close(c1, point(20.0, 20.0)));
                assert!(close(c2, point(40.0, 20.0)));
                assert!(close(p, point(60.0, 0.0)));
            }
            other => panic!("unexpected {other:?}"),
        }
        match list.as_slice()[2] {
            PathCommand::CurveTo(c1, ..) => assert!(close(c1, point(80.0, -20.0))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn semicircle_arc_splits_into_quarter_pieces() {
        let list = parse_path_data("M0 0 A10 10 0 0 1 20 0").unwrap();
        assert_eq!(list.len(), 3);
        let mid = list.as_slice()[1].end_point().unwrap();
        // Sweep-flag 1 goes clockwise on screen, through the top of the circle (y = -10).
        assert!(close(mid, point(10.0, -10.0)));
        assert!(close(list.as_slice()[2].end_point().unwrap(), point(20.0, 0.0)));
    }

    #[test]
    fn undersized_and_zero_radius_arcs() {
        let list = parse_path_data("M0 0 A1 1 0 0 0 20 0").unwrap();
        assert!(close(list.as_slice().last().unwrap().end_point().unwrap(), point(20.0, 0.0)));
        let list = parse_path_data("M0 0 A0 5 0 0 0 20 0").unwrap();
        assert_eq!(list.as_slice()[1], PathCommand::LineTo(point(20.0, 0.0)));
    }

    #[test]
    fn malformed_tail_keeps_the_prefix() {
        let err = parse_path_data("M0 0 L10 10 L20 x").unwrap_err();
        assert_eq!(err.partial.len(), 2);
        assert_eq!(parse_path_data_lossy("M0 0 L10 10 L20 x").len(), 2);
    }

    #[test]
    fn transform_moves_every_point() {
        let list = parse_path_data("M0 0 C1 1 2 2 3 3").unwrap();
        let moved = list.transform(&Matrix::translation(1.0, 2.0));
        assert_eq!(
            moved.as_slice()[1],
            PathCommand::CurveTo(point(2.0, 3.0), point(3.0, 4.0), point(4.0, 5.0))
        );
    }
}
