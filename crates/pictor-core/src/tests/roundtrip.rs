use crate::*;

const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.1" width="200" height="100">
  <defs>
    <marker id="pictor-0-arrow" viewBox="0 0 20 20" refX="4" refY="10"><path d="M0,0 L20,10 L0,20 L4,10 Z" fill="black"/></marker>
  </defs>
  <g transform="translate(10,10)">
    <rect x="0" y="0" width="50" height="20" rx="4" fill="#eee" stroke="#333"/>
    <path d="M0 40 L100 40" stroke="black" marker-end="url(#pictor-0-arrow)"/>
    <text x="5" y="15" font-size="12">A &amp; B</text>
    <image xlink:href="data:image/png;base64,AAAA" x="120" y="0" width="20" height="20"/>
  </g>
</svg>"##;

#[test]
fn decode_encode_decode_is_stable() {
    let engine = Engine::new();
    let first = engine.decode_str(DRAWING).unwrap();
    let text = first.encode(&EncodeOptions {
        indent: Some(2),
        keep_internal: false,
    });
    let second = engine.decode_str(&text).unwrap();
    assert_eq!(first.doc.descendants(first.root).len(), second.doc.descendants(second.root).len());
    assert_eq!(text, second.encode(&EncodeOptions { indent: Some(2), keep_internal: false }));
    assert!(text.contains(">A &amp; B</text>"));
    assert!(text.contains("fill=\"#eee\""));
}

#[test]
fn enveloped_round_trip_through_the_engine() {
    let engine = Engine::new();
    let mut d = engine.decode_str(DRAWING).unwrap();
    let env = Envelope {
        base64: true,
        gzip: true,
    };
    let root = d.root;
    let packed = engine
        .encode(&mut d.doc, root, &EncodeOptions::default(), env)
        .unwrap();
    let back = engine.decode(&packed, env).unwrap();
    assert_eq!(
        back.doc.descendants(back.root).len(),
        d.doc.descendants(d.root).len()
    );
}

#[test]
fn retargeting_to_svg2_drops_xlink() {
    let cfg = EngineConfig {
        target_version: SvgVersion::V2,
        ..Default::default()
    };
    let engine = Engine::new().with_config(cfg);
    let mut d = engine.decode_str(DRAWING).unwrap();
    let root = d.root;
    let bytes = engine
        .encode(&mut d.doc, root, &EncodeOptions::default(), Envelope::default())
        .unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains("xlink"));
    assert!(text.contains(" href=\"data:image/png;base64,AAAA\""));
}

#[test]
fn geometry_survives_the_round_trip() {
    let engine = Engine::new();
    let d = engine.decode_str(DRAWING).unwrap();
    let g = d.doc.children(d.root)[1];
    let b = engine.geometry(&d.doc).bbox(g, None).unwrap();
    assert_eq!((b.min.x, b.min.y), (10.0, 10.0));
    assert_eq!((b.max.x, b.max.y), (150.0, 50.0));
}
