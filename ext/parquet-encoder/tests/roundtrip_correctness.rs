use bytes::Bytes;
use ordered_float::OrderedFloat;
use parquet_encoder::*;

use test_helpers::*;

fn all_types_schema(codec: Codec) -> Schema {
    SchemaBuilder::new()
        .field(FieldSpec::new("s", "string"))
        .field(FieldSpec::new("i", "int"))
        .field(FieldSpec::new("l", "long"))
        .field(FieldSpec::new("f", "float"))
        .field(FieldSpec::new("d", "double"))
        .field(FieldSpec::new("b", "boolean"))
        .with_compression(codec)
        .build()
        .unwrap()
}

fn all_types_row(s: &str, i: i32, l: i64, f: f32, d: f64, b: bool) -> Row {
    record([
        ("s", DynamicValue::from(s)),
        ("i", DynamicValue::Int32(i)),
        ("l", DynamicValue::Int64(l)),
        ("f", DynamicValue::from(f)),
        ("d", DynamicValue::from(d)),
        ("b", DynamicValue::Boolean(b)),
    ])
}

#[test]
fn test_boundary_values_roundtrip() {
    let rows = vec![
        all_types_row("", i32::MIN, i64::MIN, f32::MIN, f64::MIN, false),
        all_types_row("ascii", i32::MAX, i64::MAX, f32::MAX, f64::MAX, true),
        all_types_row("ünïcødé ✓", 0, 0, -0.0, 0.0, true),
        all_types_row("x", -1, -1, f32::EPSILON, f64::MIN_POSITIVE, false),
        all_types_row(
            &"long ".repeat(2000),
            1,
            1,
            f32::INFINITY,
            f64::NEG_INFINITY,
            true,
        ),
    ];

    for codec in [Codec::Uncompressed, Codec::Snappy, Codec::Gzip] {
        test_roundtrip(rows.clone(), all_types_schema(codec)).unwrap();
    }
}

#[test]
fn test_nan_survives_roundtrip() {
    let rows = vec![all_types_row("nan", 1, 1, f32::NAN, f64::NAN, true)];
    let read = read_all(write_to_bytes(all_types_schema(Codec::Snappy), &rows, 10));
    match (&read[0]["f"], &read[0]["d"]) {
        (DynamicValue::Float32(f), DynamicValue::Float64(d)) => {
            assert!(f.is_nan());
            assert!(d.is_nan());
        }
        other => panic!("unexpected values {:?}", other),
    }
}

#[test]
fn test_many_rows_across_groups() {
    let rows = generate_test_rows(2_500);
    test_roundtrip_with_page_size(rows.clone(), create_test_schema(), 1000).unwrap();
    test_roundtrip_with_page_size(rows, create_test_schema(), 333).unwrap();
}

#[test]
fn test_booleans_pack_across_bytes() {
    let schema = SchemaBuilder::new()
        .field(FieldSpec::new("flag", "boolean"))
        .build()
        .unwrap();
    for count in [1usize, 7, 8, 9, 17, 64, 65] {
        let rows: Vec<Row> = (0..count)
            .map(|i| record([("flag", i % 3 == 0)]))
            .collect();
        test_roundtrip(rows, schema.clone()).unwrap();
    }
}

#[test]
fn test_coerced_values_roundtrip() {
    let rows: Vec<Row> = (0..4)
        .map(|i| {
            record([
                ("s", DynamicValue::Int64(i)),
                ("i", DynamicValue::from(format!("{}", i * 10))),
                ("l", DynamicValue::from(i as f64 + 0.9)),
                ("f", DynamicValue::from(format!("{}.5", i))),
                ("d", DynamicValue::Int32(i as i32)),
                ("b", DynamicValue::from(if i % 2 == 0 { "true" } else { "F" })),
            ])
        })
        .collect();

    let read = read_all(write_to_bytes(all_types_schema(Codec::Gzip), &rows, 10));
    for (i, row) in read.iter().enumerate() {
        assert_eq!(row["s"], DynamicValue::from(i.to_string()));
        assert_eq!(row["i"], DynamicValue::Int32(i as i32 * 10));
        assert_eq!(row["l"], DynamicValue::Int64(i as i64));
        assert_eq!(row["f"], DynamicValue::Float32(OrderedFloat(i as f32 + 0.5)));
        assert_eq!(row["d"], DynamicValue::Float64(OrderedFloat(i as f64)));
        assert_eq!(row["b"], DynamicValue::Boolean(i % 2 == 0));
    }
}

#[test]
fn test_json_numbers_narrow_to_int32() {
    let schema = SchemaBuilder::new()
        .field(FieldSpec::new("small", "int").with_default(7))
        .build()
        .unwrap();
    let mut writer = Writer::new(Vec::new(), schema).unwrap();
    writer.write_json(br#"{"small": 2147483647}"#).unwrap();
    writer.write_json(br#"{"small": 2147483648}"#).unwrap();
    writer.write_json(br#"{"small": -12.75}"#).unwrap();

    let rows = read_all(Bytes::from(writer.close().unwrap()));
    let values: Vec<_> = rows.iter().map(|r| r["small"].clone()).collect();
    assert_eq!(
        values,
        vec![
            DynamicValue::Int32(i32::MAX),
            DynamicValue::Int32(7),
            DynamicValue::Int32(-12)
        ]
    );
}

#[test]
fn test_read_column_exposes_levels() {
    let schema = SchemaBuilder::new()
        .field(FieldSpec::new("opt", "long").optional())
        .build()
        .unwrap();
    let rows = vec![
        record([("opt", DynamicValue::Int64(3))]),
        record([("opt", DynamicValue::Null)]),
        record([("opt", DynamicValue::Int64(5))]),
    ];
    let reader = Reader::new(write_to_bytes(schema, &rows, 10)).unwrap();
    let chunk = reader.read_column(0, 0).unwrap();
    assert_eq!(chunk.pages, 1);
    assert_eq!(chunk.def_levels, vec![1, 0, 1]);
    assert!(chunk.rep_levels.is_empty());
    assert_eq!(
        chunk.rows,
        vec![DynamicValue::Int64(3), DynamicValue::Null, DynamicValue::Int64(5)]
    );
}
