use crate::geom::{box2, point};
use crate::*;
use pictor_dom::attrs;

fn bbox_of(doc: &Document, node: NodeId) -> (f64, f64, f64, f64) {
    let cfg = EngineConfig::default();
    let b = Geometry::new(doc, &cfg).bbox(node, None).unwrap();
    (b.min.x, b.min.y, b.max.x, b.max.y)
}

fn close(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> bool {
    let eps = 1e-9;
    (a.0 - b.0).abs() < eps && (a.1 - b.1).abs() < eps && (a.2 - b.2).abs() < eps && (a.3 - b.3).abs() < eps
}

#[test]
fn bezier_rect_bounds() {
    let mut doc = Document::new();
    let r = doc.create_element(
        "rect",
        attrs! { "x" => 0.0, "y" => 0.0, "width" => 10.0, "height" => 10.0, "rx" => 0.0, "ry" => 0.0 },
        vec![],
        None,
    );
    assert!(close(bbox_of(&doc, r), (0.0, 0.0, 10.0, 10.0)));
    doc.set_attr(r, "rx", 5.0);
    doc.set_attr(r, "ry", 5.0);
    assert!(close(bbox_of(&doc, r), (0.0, 0.0, 10.0, 10.0)));
}

#[test]
fn rotated_rect_bounds_grow() {
    let mut doc = Document::new();
    let r = doc.create_element(
        "rect",
        attrs! { "width" => "10", "height" => "10", "transform" => "rotate(45)" },
        vec![],
        None,
    );
    let half = 10.0 / std::f64::consts::SQRT_2;
    assert!(close(bbox_of(&doc, r), (-half, 0.0, half, 2.0 * half)));
}

#[test]
fn percent_lengths_inside_a_viewport() {
    let mut doc = Document::new();
    let svg = doc.create_element("svg", attrs! { "viewBox" => "0 0 200 100" }, vec![], None);
    let r = doc.create_element(
        "rect",
        attrs! { "x" => "10%", "y" => "10%", "width" => "50%", "height" => "50%" },
        vec![],
        Some(svg),
    );
    assert!(close(bbox_of(&doc, r), (20.0, 10.0, 120.0, 60.0)));
    assert!(close(bbox_of(&doc, svg), (20.0, 10.0, 120.0, 60.0)));
}

#[test]
fn nested_group_queries_compose_transforms() {
    let engine = Engine::new();
    let mut doc = Document::new();
    let outer = doc.create_element("g", attrs! { "transform" => "scale(2)" }, vec![], None);
    let inner = doc.create_element("g", attrs! { "transform" => "translate(10,10)" }, vec![], Some(outer));
    let c = doc.create_element("circle", attrs! { "r" => "5" }, vec![], Some(inner));
    let geo = engine.geometry(&doc);

    assert_eq!(geo.hit_test(outer, point(20.0, 20.0), None), Some(c));
    assert_eq!(geo.hit_test(outer, point(5.0, 5.0), None), None);
    assert!(geo.intersects_rect(outer, &box2(25.0, 25.0, 40.0, 40.0), None));
    assert!(!geo.intersects_rect(outer, &box2(31.0, 31.0, 40.0, 40.0), None));

    // Querying the circle directly needs its ancestor transform.
    let ctm = geo.ancestor_transform(c);
    assert!(geo.contains_point(c, point(20.0, 20.0), Some(&ctm)));
    assert!(!geo.contains_point(c, point(20.0, 20.0), None));

    let hits = geo.intersect_line(outer, point(0.0, 20.0), point(40.0, 20.0), None);
    assert_eq!(hits.len(), 2);
    assert!((hits[0].x - 10.0).abs() < 1e-6 && (hits[1].x - 30.0).abs() < 1e-6);
}

#[test]
fn evenodd_fill_rule_is_inherited() {
    let engine = Engine::new();
    let mut doc = Document::new();
    let g = doc.create_element("g", attrs! { "fill-rule" => "evenodd" }, vec![], None);
    let p = doc.create_element(
        "path",
        attrs! { "d" => "M0 0 H30 V30 H0 Z M10 10 H20 V20 H10 Z" },
        vec![],
        Some(g),
    );
    let geo = engine.geometry(&doc);
    assert!(!geo.contains_point(p, point(15.0, 15.0), None));
    assert!(geo.contains_point(p, point(5.0, 15.0), None));
}
