use approx::assert_relative_eq;
use metafield::{
    Dimensions, Field, FieldObject, FieldSnapshot, MetaObjectSnapshot, Predefined, Source,
};

fn sample_field() -> Field {
    let mut field = Field::new(Dimensions::new(6, 5, 4)).unwrap();
    let wave = field.add_expression("a * sin(x / w) + z").unwrap();
    field
        .set_variables(wave, &[("a", 12.), ("w", 8.)])
        .unwrap();
    field
        .add_meta_object(Source::Predefined(Predefined::InverseSquare { radius: 25. }))
        .unwrap();
    field
}

#[test]
fn snapshot_lists_members_in_order() {
    let snapshot = sample_field().snapshot();
    assert_eq!(snapshot.dimensions, Dimensions::new(6, 5, 4));
    assert_eq!(
        snapshot.meta_objects,
        vec![
            MetaObjectSnapshot::Expression {
                expression: "a * sin(x / w) + z".into(),
                variables: vec![("a".into(), 12.), ("w".into(), 8.)],
            },
            MetaObjectSnapshot::Predefined(Predefined::InverseSquare { radius: 25. }),
        ]
    );
}

#[test]
fn json_round_trip_reproduces_the_grid() {
    let field = sample_field();
    let json = serde_json::to_string_pretty(&field.snapshot()).unwrap();
    let snapshot: FieldSnapshot = serde_json::from_str(&json).unwrap();
    let restored = Field::from_snapshot(&snapshot).unwrap();

    assert_eq!(restored.snapshot(), field.snapshot());
    assert_eq!(restored.dimensions(), field.dimensions());
    for (a, b) in restored.grid().iter().zip(field.grid().iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-3, max_relative = 1e-5);
    }
}

#[test]
fn loader_tolerates_stale_entries() {
    let json = r#"{
        "dimensions": { "x": 3, "y": 3, "z": 3 },
        "meta_objects": [
            { "Expression": { "expression": "sin(", "variables": [] } },
            { "Expression": { "expression": "k + 0*x", "variables": [["k", 2.0], ["old", 9.0]] } },
            { "Predefined": { "InverseSquare": { "radius": 30.0 } } }
        ]
    }"#;
    let snapshot: FieldSnapshot = serde_json::from_str(json).unwrap();
    let field = Field::from_snapshot(&snapshot).unwrap();

    assert_eq!(field.len(), 2);
    assert_eq!(
        field.meta_objects()[0].user_variables(),
        vec![("k".to_string(), 2.)]
    );
}
