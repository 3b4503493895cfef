use std::path::PathBuf;

use serde_json::json;
use shapecodec::derive::{PlanKind, Resolution};
use shapecodec::schema::SchemaError;
use shapecodec::{Direction, Schema, Session};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn drawing_doc() -> serde_json::Value {
    let text = std::fs::read_to_string(fixture("drawing.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_schema_fixture_normalizes() {
    let schema = Schema::load(fixture("shapes.json")).unwrap();
    let format = Session::new(&schema, Direction::ReadWrite)
        .derive_named("Drawing")
        .unwrap()
        .into_format()
        .unwrap();

    let value = format.read(&drawing_doc()).unwrap();
    let out = format.write(&value).unwrap();
    assert_eq!(
        out.to_string(),
        concat!(
            r#"{"title":"sketch","shapes":["#,
            r#"{"type":"Circle","radius":2.0,"color":"red"},"#,
            r#"{"type":"Group","members":[{"type":"Square","side":3.0,"color":"green"}],"tags":["a","b"],"color":"blue"}"#,
            r#"]}"#
        )
    );
    // normalizing twice changes nothing
    assert_eq!(format.write(&format.read(&out).unwrap()).unwrap(), out);
}

#[test]
fn test_schema_plan_marks_recursion() {
    let schema = Schema::load(fixture("shapes.json")).unwrap();
    let mut session = Session::new(&schema, Direction::Read);
    session.derive_named("Drawing").unwrap();

    let names: Vec<_> = session.plans().keys().map(String::as_str).collect();
    assert_eq!(names, ["Circle", "Square", "Group", "Shape", "Drawing"]);

    let group = session.plan("Group").unwrap();
    assert_eq!(group.fields[0].resolution.to_string(), "list<lazy Shape>");

    let shape = session.plan("Shape").unwrap();
    assert!(matches!(shape.kind, PlanKind::Sum { ref variants, .. } if variants.len() == 3));
    assert_eq!(shape.fields[0].resolution, Resolution::Direct("string".into()));

    let drawing = session.plan("Drawing").unwrap();
    assert!(drawing.fields[2].omittable);
    assert_eq!(drawing.fields[1].resolution.to_string(), "list<derived Shape>");
}

#[test]
fn test_schema_decode_errors_carry_paths() {
    let schema = Schema::load(fixture("shapes.json")).unwrap();
    let codec = Session::new(&schema, Direction::Read).derive_named("Drawing").unwrap();
    let errs = codec
        .reader()
        .unwrap()
        .read(&json!({
            "title": "t",
            "shapes": [{"type": "Circle", "color": "red"}, {"type": "Blob", "color": "x"}],
            "layers": [[1, "base"], ["two", "top"]]
        }))
        .unwrap_err();
    let mut pairs = errs.pairs();
    pairs.sort();
    assert_eq!(pairs, vec![
        ("$.layers[1][0]".to_owned(), "expected integer, found string".to_owned()),
        ("$.shapes[0].radius".to_owned(), "required field is missing".to_owned()),
        ("$.shapes[1].type".to_owned(), "unknown variant tag `Blob`".to_owned()),
    ]);
}

#[test]
fn test_schema_missing_file() {
    let err = Schema::load(fixture("nope.json")).unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}
