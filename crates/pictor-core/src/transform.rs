//! Transform list parsing, composition and canonical serialization.
//!
//! Composition uses SVG's column-vector convention: the attribute `A B` denotes the matrix
//! product `A·B`, so `B` applies to points first.

use crate::geom::Matrix;
use crate::{Error, Result};
use pictor_dom::{Document, NodeId, format_number};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Matrix,
    Translate,
    TranslateX,
    TranslateY,
    Scale,
    ScaleX,
    ScaleY,
    Rotate,
    Skew,
    SkewX,
    SkewY,
}

impl TransformKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "matrix" => Self::Matrix,
            "translate" => Self::Translate,
            "translateX" => Self::TranslateX,
            "translateY" => Self::TranslateY,
            "scale" => Self::Scale,
            "scaleX" => Self::ScaleX,
            "scaleY" => Self::ScaleY,
            "rotate" => Self::Rotate,
            "skew" => Self::Skew,
            "skewX" => Self::SkewX,
            "skewY" => Self::SkewY,
            _ => return None,
        })
    }

    fn accepts(self, argc: usize) -> bool {
        match self {
            Self::Matrix => argc == 6,
            Self::Translate | Self::Scale | Self::Skew => argc == 1 || argc == 2,
            Self::Rotate => argc == 1 || argc == 3,
            _ => argc == 1,
        }
    }
}

/// A parsed argument. Units are normalized at parse time except percentages, which are kept
/// unresolved until a viewport is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformArg {
    Number(f64),
    /// Length in user units.
    Length(f64),
    /// Angle in degrees.
    Angle(f64),
    /// Percentage, `50%` is `Percent(50.0)`.
    Percent(f64),
}

impl TransformArg {
    /// Plain numeric value; percentages resolve against `basis`.
    pub fn value(self, basis: f64) -> f64 {
        match self {
            Self::Number(v) | Self::Length(v) | Self::Angle(v) => v,
            Self::Percent(p) => p / 100.0 * basis,
        }
    }

    fn factor(self) -> f64 {
        match self {
            Self::Percent(p) => p / 100.0,
            other => other.value(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformFn {
    pub kind: TransformKind,
    pub args: Vec<TransformArg>,
}

/// Unit context for transform arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformContext {
    pub dpi: f64,
    pub font_size: f64,
    /// Viewport used to resolve percentage translations; percentages resolve to 0 without one.
    pub viewport: Option<(f64, f64)>,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            font_size: 16.0,
            viewport: None,
        }
    }
}

fn re_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\s,]*([A-Za-z]+)\s*\(([^()]*)\)").expect("valid regex")
    })
}

fn re_arg() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)([A-Za-z%]*)$")
            .expect("valid regex")
    })
}

/// One argument: a number with an optional unit suffix. A sign or a second decimal point
/// starts the next number, so `45-10` is two arguments.
fn re_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?[A-Za-z%]*").expect("valid regex")
    })
}

fn is_separator(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == ',')
}

fn parse_args(body: &str, ctx: &TransformContext) -> Option<Vec<TransformArg>> {
    let mut args = Vec::new();
    let mut last = 0;
    for m in re_token().find_iter(body) {
        if !is_separator(&body[last..m.start()]) {
            return None;
        }
        args.push(parse_arg(m.as_str(), ctx)?);
        last = m.end();
    }
    is_separator(&body[last..]).then_some(args)
}

fn parse_arg(token: &str, ctx: &TransformContext) -> Option<TransformArg> {
    let caps = re_arg().captures(token)?;
    let n: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some(match unit {
        "" => TransformArg::Number(n),
        "deg" => TransformArg::Angle(n),
        "rad" => TransformArg::Angle(n.to_degrees()),
        "grad" => TransformArg::Angle(n * 180.0 / 200.0),
        "turn" => TransformArg::Angle(n * 360.0),
        "px" => TransformArg::Length(n),
        "in" => TransformArg::Length(n * ctx.dpi),
        "cm" => TransformArg::Length(n * ctx.dpi / 2.54),
        "mm" => TransformArg::Length(n * ctx.dpi / 25.4),
        "pt" => TransformArg::Length(n * ctx.dpi / 72.0),
        "pc" => TransformArg::Length(n * ctx.dpi / 6.0),
        "em" => TransformArg::Length(n * ctx.font_size),
        "ex" => TransformArg::Length(n * ctx.font_size / 2.0),
        "%" => TransformArg::Percent(n),
        _ => return None,
    })
}

fn remainder_error(rest: &str) -> Error {
    Error::TransformParse {
        remainder: rest.trim().to_string(),
    }
}

/// Parses a transform list into its functions.
pub fn parse_transform_list(text: &str, ctx: &TransformContext) -> Result<Vec<TransformFn>> {
    let mut out = Vec::new();
    let mut rest = text;
    loop {
        if rest.trim_matches(|c: char| c.is_whitespace() || c == ',').is_empty() {
            return Ok(out);
        }
        let Some(caps) = re_function().captures(rest) else {
            return Err(remainder_error(rest));
        };
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let Some(kind) = TransformKind::from_name(name) else {
            return Err(remainder_error(rest));
        };
        match parse_args(body, ctx) {
            Some(args) if kind.accepts(args.len()) => out.push(TransformFn { kind, args }),
            _ => return Err(remainder_error(rest)),
        }
        rest = &rest[whole..];
    }
}

/// `left·right`: the transform that applies `right` first, then `left`.
pub fn multiply(left: &Matrix, right: &Matrix) -> Matrix {
    right.then(left)
}

pub fn translate(tx: f64, ty: f64) -> Matrix {
    Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty)
}

pub fn scale(sx: f64, sy: f64) -> Matrix {
    Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
}

pub fn rotate(degrees: f64) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Matrix::new(cos, sin, -sin, cos, 0.0, 0.0)
}

pub fn rotate_about(degrees: f64, cx: f64, cy: f64) -> Matrix {
    multiply(
        &multiply(&translate(cx, cy), &rotate(degrees)),
        &translate(-cx, -cy),
    )
}

pub fn skew(x_degrees: f64, y_degrees: f64) -> Matrix {
    Matrix::new(
        1.0,
        y_degrees.to_radians().tan(),
        x_degrees.to_radians().tan(),
        1.0,
        0.0,
        0.0,
    )
}

impl TransformFn {
    pub fn to_matrix(&self, ctx: &TransformContext) -> Matrix {
        let (vw, vh) = ctx.viewport.unwrap_or((0.0, 0.0));
        let a = |i: usize| self.args.get(i).copied();
        let x = |i: usize| a(i).map(|v| v.value(vw)).unwrap_or(0.0);
        let y = |i: usize| a(i).map(|v| v.value(vh)).unwrap_or(0.0);
        let f = |i: usize| a(i).map(TransformArg::factor);
        let deg = |i: usize| a(i).map(|v| v.value(0.0)).unwrap_or(0.0);
        match self.kind {
            TransformKind::Matrix => {
                let m = |i: usize| a(i).map(TransformArg::factor).unwrap_or(0.0);
                Matrix::new(m(0), m(1), m(2), m(3), m(4), m(5))
            }
            TransformKind::Translate => translate(x(0), y(1)),
            TransformKind::TranslateX => translate(x(0), 0.0),
            TransformKind::TranslateY => translate(0.0, y(0)),
            TransformKind::Scale => {
                let sx = f(0).unwrap_or(1.0);
                scale(sx, f(1).unwrap_or(sx))
            }
            TransformKind::ScaleX => scale(f(0).unwrap_or(1.0), 1.0),
            TransformKind::ScaleY => scale(1.0, f(0).unwrap_or(1.0)),
            TransformKind::Rotate if self.args.len() == 3 => rotate_about(deg(0), x(1), y(2)),
            TransformKind::Rotate => rotate(deg(0)),
            TransformKind::Skew => skew(deg(0), deg(1)),
            TransformKind::SkewX => skew(deg(0), 0.0),
            TransformKind::SkewY => skew(0.0, deg(0)),
        }
    }
}

/// Composes a whole transform attribute value, left to right, onto the identity.
pub fn parse_transform(text: &str, ctx: &TransformContext) -> Result<Matrix> {
    Ok(parse_transform_list(text, ctx)?
        .iter()
        .fold(Matrix::identity(), |acc, f| multiply(&acc, &f.to_matrix(ctx))))
}

/// Canonical `matrix(a,b,c,d,e,f)` text.
pub fn matrix_to_string(m: &Matrix) -> String {
    format!(
        "matrix({},{},{},{},{},{})",
        format_number(m.m11),
        format_number(m.m12),
        format_number(m.m21),
        format_number(m.m22),
        format_number(m.m31),
        format_number(m.m32)
    )
}

pub fn is_identity(m: &Matrix) -> bool {
    const EPS: f64 = 1e-12;
    let id = Matrix::identity();
    [
        (m.m11, id.m11),
        (m.m12, id.m12),
        (m.m21, id.m21),
        (m.m22, id.m22),
        (m.m31, id.m31),
        (m.m32, id.m32),
    ]
    .iter()
    .all(|(a, b)| (a - b).abs() <= EPS)
}

/// Uniform scale of `m`: the factor lengths grow by on average, `sqrt(|det|)`.
pub fn scale_factor(m: &Matrix) -> f64 {
    m.determinant().abs().sqrt()
}

/// Writes `m` as the node's transform; the identity removes the attribute.
pub fn set_local_transform(doc: &mut Document, node: NodeId, m: &Matrix) {
    if is_identity(m) {
        doc.remove_attr(node, "transform");
    } else {
        doc.set_attr(node, "transform", matrix_to_string(m));
    }
}
