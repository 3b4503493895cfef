use rstest::rstest;
use serde_json::json;
use shapecodec::error::DecodeReason;
use shapecodec::{
    DerivationError, DescriptorSet, Direction, Discriminator, Format, Param, Record, Session,
    Shape, TypeDescriptor, Value, derive,
};

fn shapes(discriminator: Option<Discriminator>) -> DescriptorSet {
    let sum = TypeDescriptor::sum("Shape", vec![
        TypeDescriptor::record("Circle", vec![Param::parse("radius", "float")]),
        TypeDescriptor::record("Square", vec![Param::parse("side", "float")]),
    ])
    .with_members(vec![Param::parse("color", "string")]);
    let sum = match discriminator {
        Some(d) => sum.with_discriminator(d),
        None => sum,
    };
    DescriptorSet::new().with(sum)
}

fn format_of(types: &DescriptorSet, name: &str) -> Format {
    Session::new(types, Direction::ReadWrite)
        .derive_named(name)
        .unwrap()
        .into_format()
        .unwrap()
}

fn person() -> DescriptorSet {
    DescriptorSet::new().with(TypeDescriptor::record("Person", vec![
        Param::parse("name", "string"),
        Param::parse("age", "int"),
        Param::parse("nickname", "option<string>"),
        Param::parse("emails", "list<string>"),
        Param::parse("scores", "map<float>"),
        Param::parse("active", "bool"),
    ]))
}

// ————————————————————————————————————————————————————————————————————————————
// PRODUCTS
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn test_product_roundtrip() {
    let f = format_of(&person(), "Person");
    let json = json!({
        "name": "Ada",
        "age": 36,
        "nickname": "countess",
        "emails": ["ada@example.com"],
        "scores": {"math": 9.5},
        "active": true
    });
    let value = f.read(&json).unwrap();
    assert_eq!(f.write(&value).unwrap(), json);
    assert_eq!(f.read(&f.write(&value).unwrap()).unwrap(), value);
}

#[test]
fn test_field_order_follows_declaration() {
    let f = format_of(&person(), "Person");
    // keys deliberately scrambled
    let value = Value::Record(
        Record::new("Person")
            .with("active", false)
            .with("scores", Value::Map(Default::default()))
            .with("emails", Vec::<String>::new())
            .with("nickname", Value::none())
            .with("age", 1i64)
            .with("name", "x"),
    );
    let written = f.write(&value).unwrap();
    let keys: Vec<_> = written.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["name", "age", "emails", "scores", "active"]);
}

#[rstest]
#[case::absent(json!({"name": "a", "age": 1, "emails": [], "scores": {}, "active": true}))]
#[case::null(json!({"name": "a", "age": 1, "nickname": null, "emails": [], "scores": {}, "active": true}))]
fn test_optional_reads_absent(#[case] input: serde_json::Value) {
    let f = format_of(&person(), "Person");
    let value = f.read(&input).unwrap();
    let record = value.as_record().unwrap();
    assert_eq!(record.get("nickname"), Some(&Value::none()));
    let written = f.write(&value).unwrap();
    assert!(!written.as_object().unwrap().contains_key("nickname"));
}

#[test]
fn test_decode_errors_are_aggregated() {
    let f = format_of(&person(), "Person");
    let errs = f
        .read(&json!({"name": 1, "emails": ["a", 2], "scores": {"x": "y"}, "active": true}))
        .unwrap_err();
    let mut pairs = errs.pairs();
    pairs.sort();
    assert_eq!(pairs, vec![
        ("$.age".to_owned(), "required field is missing".to_owned()),
        ("$.emails[1]".to_owned(), "expected string, found number".to_owned()),
        ("$.name".to_owned(), "expected string, found number".to_owned()),
        ("$.scores.x".to_owned(), "expected number, found string".to_owned()),
    ]);
}

#[test]
fn test_single_field_product_matches_general_shape() {
    let types = DescriptorSet::new().with(TypeDescriptor::record("Id", vec![Param::parse("value", "int")]));
    let f = format_of(&types, "Id");
    let v = Value::Record(Record::new("Id").with("value", 5i64));
    assert_eq!(f.write(&v).unwrap().to_string(), r#"{"value":5}"#);
}

#[test]
fn test_recursive_node_depth_50() {
    let types = DescriptorSet::new().with(TypeDescriptor::record("Node", vec![
        Param::parse("depth", "int"),
        Param::parse("children", "list<Node>"),
    ]));
    let f = format_of(&types, "Node");

    let mut node = Value::Record(Record::new("Node").with("depth", 50i64).with("children", Vec::<Value>::new()));
    for depth in (0..50).rev() {
        node = Value::Record(Record::new("Node").with("depth", depth as i64).with("children", vec![node]));
    }
    let json = f.write(&node).unwrap();
    assert_eq!(f.read(&json).unwrap(), node);
    assert_eq!(json.pointer("/children/0/children/0/depth"), Some(&json!(2)));
}

// ————————————————————————————————————————————————————————————————————————————
// SUMS
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn test_shared_field_merge() {
    let types = shapes(None);
    let codec = Session::new(&types, Direction::Write).derive_named("Shape").unwrap();
    let writer = codec.writer().unwrap();

    let circle = Value::Record(Record::new("Circle").with("radius", 2.0).with("color", "red"));
    assert_eq!(writer.write(&circle).unwrap().to_string(), r#"{"radius":2.0,"color":"red"}"#);

    let square = Value::Record(Record::new("Square").with("side", 3.0).with("color", "blue"));
    assert_eq!(writer.write(&square).unwrap().to_string(), r#"{"side":3.0,"color":"blue"}"#);
}

#[test]
fn test_variant_field_wins_over_shared() {
    let types = DescriptorSet::new().with(
        TypeDescriptor::sum("Shape", vec![
            TypeDescriptor::record("Circle", vec![Param::parse("radius", "float")]),
            TypeDescriptor::record("Square", vec![
                Param::parse("side", "float"),
                Param::parse("color", "string"),
            ]),
        ])
        .with_members(vec![Param::parse("color", "string")]),
    );
    let codec = Session::new(&types, Direction::Write).derive_named("Shape").unwrap();
    let square = Value::Record(Record::new("Square").with("side", 1.0).with("color", "teal"));
    assert_eq!(
        codec.writer().unwrap().write(&square).unwrap(),
        json!({"side": 1.0, "color": "teal"})
    );
}

#[test]
fn test_tagged_sum_roundtrip() {
    let f = format_of(&shapes(Some(Discriminator::tag("type"))), "Shape");
    let circle = Value::Record(Record::new("Circle").with("radius", 2.0).with("color", "red"));
    let json = f.write(&circle).unwrap();
    assert_eq!(json.to_string(), r#"{"type":"Circle","radius":2.0,"color":"red"}"#);
    assert_eq!(f.read(&json).unwrap(), circle);
}

#[rstest]
#[case::missing_tag(json!({"radius": 1.0, "color": "r"}), DecodeReason::MissingTag("type".into()), "$")]
#[case::unknown_tag(
    json!({"type": "Hexagon", "color": "r"}),
    DecodeReason::UnknownVariant("Hexagon".into()),
    "$.type"
)]
fn test_tagged_sum_rejects(#[case] input: serde_json::Value, #[case] reason: DecodeReason, #[case] path: &str) {
    let f = format_of(&shapes(Some(Discriminator::tag("type"))), "Shape");
    let errs = f.read(&input).unwrap_err();
    assert_eq!(errs.errors()[0].reason, reason);
    assert_eq!(errs.errors()[0].path.to_string(), path);
}

#[rstest]
#[case::tagged(Discriminator::tag("type"), json!({"type": "Circle", "color": 7}))]
#[case::structural(Discriminator::Structural, json!({"color": 7}))]
fn test_sum_reports_variant_and_shared_errors(#[case] discriminator: Discriminator, #[case] input: serde_json::Value) {
    let f = format_of(&shapes(Some(discriminator)), "Shape");
    let errs = f.read(&input).unwrap_err();
    let paths: Vec<_> = errs.pairs().into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths.len(), 2, "{errs}");
    assert!(paths.contains(&"$.color".to_owned()), "{errs}");
}

#[test]
fn test_tagged_sum_missing_variant_and_shared_fields() {
    let f = format_of(&shapes(Some(Discriminator::tag("type"))), "Shape");
    let errs = f.read(&json!({"type": "Circle"})).unwrap_err();
    let mut pairs = errs.pairs();
    pairs.sort();
    assert_eq!(pairs, vec![
        ("$.color".to_owned(), "required field is missing".to_owned()),
        ("$.radius".to_owned(), "required field is missing".to_owned()),
    ]);
}

#[test]
fn test_structural_sum_reads_unique_match() {
    let f = format_of(&shapes(Some(Discriminator::Structural)), "Shape");
    let v = f.read(&json!({"side": 4, "color": "gray"})).unwrap();
    assert_eq!(
        v,
        Value::Record(Record::new("Square").with("side", 4.0).with("color", "gray"))
    );
}

#[test]
fn test_unknown_variant_on_write() {
    let types = shapes(None);
    let codec = Session::new(&types, Direction::Write).derive_named("Shape").unwrap();
    let err = codec
        .writer()
        .unwrap()
        .write(&Value::Record(Record::new("Triangle")))
        .unwrap_err();
    assert_eq!(err.to_string(), "at $: `Triangle` is not a variant of `Shape`");
}

// ————————————————————————————————————————————————————————————————————————————
// DERIVATION FAILURES
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn test_missing_codecs_reported_together() {
    let types = DescriptorSet::new().with(TypeDescriptor::record("Bad", vec![
        Param::parse("ok", "int"),
        Param::parse("first", "Unknown1"),
        Param::parse("second", "list<Unknown2>"),
    ]));
    let err = Session::new(&types, Direction::ReadWrite).derive_named("Bad").unwrap_err();
    assert_eq!(err.missing_fields(), vec!["first", "second"]);
}

#[rstest]
#[case::empty(
    TypeDescriptor::sum("Nothing", vec![]),
    DerivationError::EmptyHierarchy("Nothing".into())
)]
#[case::leaf_variant(
    TypeDescriptor::sum("Mixed", vec![TypeDescriptor::leaf("int")]),
    DerivationError::NotAllVariantsProduct { type_name: "Mixed".into(), variant: "int".into() }
)]
#[case::open(
    TypeDescriptor::new("Anything", Shape::Open),
    DerivationError::UnsupportedShape("Anything".into())
)]
fn test_rejected_descriptors(#[case] desc: TypeDescriptor, #[case] expected: DerivationError) {
    let err = derive(DescriptorSet::new(), &desc, Direction::Write).unwrap_err();
    assert_eq!(err, expected);
}

#[rstest]
#[case::read(Direction::Read, true)]
#[case::read_write(Direction::ReadWrite, true)]
#[case::write(Direction::Write, false)]
fn test_sum_without_discriminator(#[case] direction: Direction, #[case] fails: bool) {
    let types = shapes(None);
    let result = Session::new(&types, direction).derive_named("Shape");
    match result {
        Err(err) => {
            assert!(fails);
            assert_eq!(err, DerivationError::NoDiscriminator("Shape".into()));
        }
        Ok(_) => assert!(!fails),
    }
}
