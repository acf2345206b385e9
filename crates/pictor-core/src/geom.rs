#![forbid(unsafe_code)]

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Box2 = euclid::Box2D<f64, Unit>;

/// 2D affine transform. Coefficients map to SVG `matrix(a,b,c,d,e,f)` as
/// `m11=a, m12=b, m21=c, m22=d, m31=e, m32=f`.
pub type Matrix = euclid::Transform2D<f64, Unit, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn box2(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Box2 {
    Box2::new(point(min_x, min_y), point(max_x, max_y))
}

/// Union of two boxes; unlike `Box2D::union` an empty (zero-area) operand still contributes.
pub fn union_boxes(a: Option<Box2>, b: Box2) -> Box2 {
    match a {
        None => b,
        Some(a) => box2(
            a.min.x.min(b.min.x),
            a.min.y.min(b.min.y),
            a.max.x.max(b.max.x),
            a.max.y.max(b.max.y),
        ),
    }
}
