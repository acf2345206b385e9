use assert_cmd::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="200" height="100">
  <defs>
    <marker id="pictor-0-arrow" viewBox="0 0 20 20" refX="4" refY="10"><path d="M0,0 L20,10 L0,20 Z" fill="black"/></marker>
    <marker id="pictor-1-circle" viewBox="0 0 20 20" refX="10" refY="10"><circle cx="10" cy="10" r="8" fill="red"/></marker>
  </defs>
  <g transform="translate(10,0)">
    <rect id="box" x="0" y="0" width="10" height="5" fill="#0af"/>
  </g>
  <path id="line" d="M50 50 L150 50" stroke="red" fill="none" marker-end="url(#pictor-1-circle)"/>
  <script>alert(1)</script>
</svg>
"##;

fn fixture(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("drawing.svg");
    fs::write(&path, DRAWING).expect("write fixture");
    path
}

fn pictor() -> Command {
    Command::new(assert_cmd::cargo_bin!("pictor"))
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().expect("run pictor");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}

#[test]
fn normalize_drops_unsupported_content_and_keeps_the_rest() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = fixture(&tmp);
    let out = tmp.path().join("out.svg");

    pictor()
        .args(["normalize", "--out"])
        .arg(&out)
        .arg(&input)
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read output");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r#"version="1.1""#));
    assert!(svg.contains(r#"id="box""#));
    assert!(!svg.contains("script"));
}

#[test]
fn bbox_reports_shapes_in_root_space() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = fixture(&tmp);

    let json = stdout_json(pictor().arg("bbox").arg(&input));
    let shapes = json.as_array().expect("array");
    let rect = shapes
        .iter()
        .find(|s| s["id"] == "box")
        .expect("rect listed");
    assert_eq!(rect["tag"], "rect");
    assert_eq!(rect["bbox"]["minX"], 10.0);
    assert_eq!(rect["bbox"]["maxX"], 20.0);
    assert_eq!(rect["bbox"]["maxY"], 5.0);
    assert!(shapes.iter().all(|s| s["tag"] != "circle"), "marker content is not listed");
}

#[test]
fn hit_finds_the_shape_under_the_point() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = fixture(&tmp);

    let json = stdout_json(pictor().args(["hit", "--x", "15", "--y", "2"]).arg(&input));
    assert_eq!(json["hit"]["id"], "box");

    let json = stdout_json(pictor().args(["hit", "--x", "100", "--y", "51"]).arg(&input));
    assert_eq!(json["hit"]["id"], "line");

    let json = stdout_json(pictor().args(["hit", "--x", "100", "--y", "90"]).arg(&input));
    assert!(json["hit"].is_null());
}

#[test]
fn gc_sweeps_unreferenced_definitions() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = fixture(&tmp);

    let out = pictor().arg("gc").arg(&input).output().expect("run pictor");
    assert!(out.status.success());
    let svg = String::from_utf8(out.stdout).expect("utf-8");
    assert!(svg.contains("pictor-1-circle"));
    assert!(!svg.contains("pictor-0-arrow"));
}

#[test]
fn enveloped_output_reads_back() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = fixture(&tmp);
    let packed = tmp.path().join("drawing.svgz.b64");

    pictor()
        .args(["normalize", "--gzip", "--base64", "--out"])
        .arg(&packed)
        .arg(&input)
        .assert()
        .success();
    let bytes = fs::read(&packed).expect("read packed");
    assert!(!bytes.starts_with(b"<svg"));

    let json = stdout_json(pictor().args(["bbox", "--gzip", "--base64"]).arg(&packed));
    assert!(json.as_array().is_some_and(|a| a.iter().any(|s| s["id"] == "line")));
}

#[test]
fn report_counts_dropped_elements() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = fixture(&tmp);

    let json = stdout_json(pictor().arg("report").arg(&input));
    assert_eq!(json["total"], 1);
}

#[test]
fn bad_arguments_exit_with_usage() {
    pictor().arg("--nope").assert().code(2);
    pictor().args(["hit", "--x", "1"]).assert().code(2);
}
