use pictor_dom::{AttrValue, Content, Document, NodeId, attrs};

fn assert_parent_index_consistent(doc: &Document, roots: &[NodeId]) {
    for &root in roots {
        assert_eq!(doc.parent(root), None);
        for n in doc.descendants(root).into_iter().skip(1) {
            let p = doc.parent(n).expect("attached descendant must have a parent");
            assert!(doc.children(p).contains(&n));
        }
    }
}

fn sample() -> (Document, NodeId, NodeId, NodeId, NodeId) {
    let mut doc = Document::new();
    let svg = doc.create_element("svg", attrs! { "width" => 100.0 }, vec![], None);
    let g = doc.create_element("g", attrs! { "id" => "layer" }, vec![], Some(svg));
    let a = doc.create_element("rect", attrs! { "id" => "a" }, vec![], Some(g));
    let b = doc.create_element("circle", attrs! { "id" => "b" }, vec![], Some(g));
    (doc, svg, g, a, b)
}

#[test]
fn create_element_sets_parent_pointers_on_children() {
    let mut doc = Document::new();
    let a = doc.create_element("rect", attrs! {}, vec![], None);
    let b = doc.create_element("circle", attrs! {}, vec![], None);
    let g = doc.create_element(
        "g",
        attrs! {},
        vec![Content::Element(a), Content::Text("x".into()), Content::Element(b)],
        None,
    );
    assert_eq!(doc.parent(a), Some(g));
    assert_eq!(doc.parent(b), Some(g));
    assert_eq!(doc.children(g), vec![a, b]);
    assert_eq!(doc.text_content(g), "x");
}

#[test]
fn create_element_moves_children_attached_elsewhere() {
    let (mut doc, svg, g, a, _) = sample();
    let g2 = doc.create_element("g", attrs! {}, vec![Content::Element(a)], Some(svg));
    assert_eq!(doc.parent(a), Some(g2));
    assert!(!doc.children(g).contains(&a));
    assert_parent_index_consistent(&doc, &[svg]);
}

#[test]
fn ancestor_by_tag_finds_nearest_match() {
    let (mut doc, svg, g, a, _) = sample();
    let inner = doc.create_element("g", attrs! {}, vec![], Some(g));
    let c = doc.create_element("path", attrs! {}, vec![], Some(inner));
    assert_eq!(doc.ancestor_by_tag(c, "g"), Some(inner));
    assert_eq!(doc.ancestor_by_tag(a, "svg"), Some(svg));
    assert_eq!(doc.ancestor_by_tag(svg, "svg"), None);
    assert_eq!(doc.ancestor_by_tag(a, "defs"), None);
}

#[test]
fn remove_invalidates_the_removed_subtree() {
    let (mut doc, svg, g, a, b) = sample();
    assert!(doc.remove(g));
    assert_eq!(doc.parent(g), None);
    assert_eq!(doc.parent(a), None);
    assert_eq!(doc.parent(b), None);
    assert!(doc.children(svg).is_empty());

    assert!(doc.append_child(svg, g));
    assert_eq!(doc.parent(a), Some(g));
    assert_parent_index_consistent(&doc, &[svg]);
}

#[test]
fn remove_children_and_remove_by_id() {
    let (mut doc, svg, g, a, b) = sample();
    assert_eq!(doc.remove_by_id(svg, "a"), Some(a));
    assert_eq!(doc.children(g), vec![b]);
    assert_eq!(doc.remove_by_id(svg, "missing"), None);

    doc.remove_children(g);
    assert!(doc.children(g).is_empty());
    assert_eq!(doc.parent(b), None);
    assert_parent_index_consistent(&doc, &[svg]);
}

#[test]
fn removing_a_root_reports_false() {
    let (mut doc, svg, ..) = sample();
    assert!(!doc.remove(svg));
}

#[test]
fn sibling_queries() {
    let (mut doc, _, g, a, b) = sample();
    let c = doc.create_element("ellipse", attrs! {}, vec![], Some(g));
    assert_eq!(doc.first_child(g), Some(a));
    assert_eq!(doc.last_child(g), Some(c));
    assert_eq!(doc.next_sibling(a), Some(b));
    assert_eq!(doc.prev_sibling(a), None);
    assert_eq!(doc.prev_sibling(c), Some(b));
    assert!(doc.is_first_child(a));
    assert!(doc.is_last_child(c));
    assert!(!doc.is_last_child(b));
}

#[test]
fn reorder_operations_preserve_parent_index() {
    let (mut doc, svg, g, a, b) = sample();
    let c = doc.create_element("ellipse", attrs! {}, vec![], Some(g));

    assert!(doc.move_to_front(a));
    assert_eq!(doc.children(g), vec![b, c, a]);
    assert!(doc.move_to_back(c));
    assert_eq!(doc.children(g), vec![c, b, a]);
    assert!(doc.move_forward(c));
    assert_eq!(doc.children(g), vec![b, c, a]);
    assert!(doc.move_backward(a));
    assert_eq!(doc.children(g), vec![b, a, c]);
    assert!(!doc.move_forward(c));
    assert!(!doc.move_backward(b));
    assert_parent_index_consistent(&doc, &[svg]);
}

#[test]
fn insert_before_places_node() {
    let (mut doc, svg, g, a, b) = sample();
    let c = doc.create_element("ellipse", attrs! {}, vec![], None);
    assert!(doc.insert_before(b, c));
    assert_eq!(doc.children(g), vec![a, c, b]);
    assert_parent_index_consistent(&doc, &[svg]);
}

#[test]
fn deep_copy_drops_internal_attributes_and_is_detached() {
    let (mut doc, svg, g, a, _) = sample();
    doc.set_attr(a, "data-pictor-selected", "true");
    let copy = doc.deep_copy(g).unwrap();
    assert_ne!(copy, g);
    assert_eq!(doc.parent(copy), None);
    let kids = doc.children(copy);
    assert_eq!(kids.len(), 2);
    assert_eq!(doc.parent(kids[0]), Some(copy));
    assert!(doc.attr(kids[0], "data-pictor-selected").is_none());
    assert_eq!(doc.attr(kids[0], "id"), Some(&AttrValue::from("a")));
    assert!(!doc.structural_eq(copy, g, &[]));
    assert_parent_index_consistent(&doc, &[svg, copy]);
}

#[test]
fn structural_eq_ignores_listed_attributes_and_order() {
    let mut doc = Document::new();
    let p1 = doc.create_element("path", attrs! { "d" => "M0 0", "fill" => "red" }, vec![], None);
    let m1 = doc.create_element(
        "marker",
        attrs! { "id" => "one", "refX" => 4.0, "refY" => "10" },
        vec![Content::Element(p1)],
        None,
    );
    let p2 = doc.create_element("path", attrs! { "fill" => "red", "d" => "M0 0" }, vec![], None);
    let m2 = doc.create_element(
        "marker",
        attrs! { "refY" => 10.0, "refX" => "4", "id" => "two" },
        vec![Content::Element(p2)],
        None,
    );
    assert!(doc.structural_eq(m1, m2, &["id"]));
    assert!(!doc.structural_eq(m1, m2, &[]));

    doc.set_attr(p2, "fill", "blue");
    assert!(!doc.structural_eq(m1, m2, &["id"]));
}
