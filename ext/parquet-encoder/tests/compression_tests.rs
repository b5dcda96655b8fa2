use bytes::Bytes;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::format::CompressionCodec;
use parquet::record::{Field, RowAccessor};
use parquet_encoder::*;

use test_helpers::*;

fn repetitive_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            record([
                ("id", DynamicValue::Int32((i % 4) as i32)),
                ("name", DynamicValue::from("the same string over and over")),
                ("value", DynamicValue::from(1.0)),
                ("active", DynamicValue::Boolean(true)),
            ])
        })
        .collect()
}

fn schema_with(codec: Codec) -> Schema {
    SchemaBuilder::new()
        .field(FieldSpec::new("id", "int"))
        .field(FieldSpec::new("name", "string"))
        .field(FieldSpec::new("value", "double"))
        .field(FieldSpec::new("active", "boolean"))
        .with_compression(codec)
        .build()
        .unwrap()
}

#[test]
fn test_all_codecs_roundtrip() {
    for codec in [Codec::Uncompressed, Codec::Snappy, Codec::Gzip] {
        let rows = generate_test_rows(300);
        test_roundtrip_with_page_size(rows, schema_with(codec), 128)
            .unwrap_or_else(|e| panic!("{} roundtrip failed: {}", codec.name(), e));
    }
}

#[test]
fn test_codec_recorded_per_column() {
    let schema = SchemaBuilder::new()
        .field(FieldSpec::new("a", "string"))
        .field(FieldSpec::new("b", "string").with_codec(Codec::Gzip))
        .field(FieldSpec::new("c", "string").with_codec(Codec::Uncompressed))
        .build()
        .unwrap();
    let rows: Vec<Row> = (0..5).map(|i| record([("a", i), ("b", i), ("c", i)])).collect();
    let bytes = write_to_bytes(schema, &rows, 10);

    let reader = Reader::new(bytes.clone()).unwrap();
    let codecs: Vec<CompressionCodec> = reader.metadata().row_groups[0]
        .columns
        .iter()
        .map(|c| c.meta_data.as_ref().unwrap().codec)
        .collect();
    assert_eq!(
        codecs,
        vec![
            CompressionCodec::SNAPPY,
            CompressionCodec::GZIP,
            CompressionCodec::UNCOMPRESSED
        ]
    );

    let read = read_all(bytes);
    assert_eq!(read[4]["b"], DynamicValue::from("4"));
}

#[test]
fn test_compression_shrinks_repetitive_data() {
    let rows = repetitive_rows(2000);
    let plain = write_to_bytes(schema_with(Codec::Uncompressed), &rows, 2000);
    let snappy = write_to_bytes(schema_with(Codec::Snappy), &rows, 2000);
    let gzip = write_to_bytes(schema_with(Codec::Gzip), &rows, 2000);

    assert!(snappy.len() < plain.len() / 2, "snappy {} vs plain {}", snappy.len(), plain.len());
    assert!(gzip.len() < snappy.len(), "gzip {} vs snappy {}", gzip.len(), snappy.len());

    let reader = Reader::new(plain).unwrap();
    let name = reader.metadata().row_groups[0].columns[1]
        .meta_data
        .clone()
        .unwrap();
    assert!(name.total_compressed_size >= name.total_uncompressed_size);
}

#[test]
fn test_compressed_page_corruption_detected() {
    let rows = generate_test_rows(50);
    let bytes = write_to_bytes(schema_with(Codec::Gzip), &rows, 100);
    let reader = Reader::new(bytes.clone()).unwrap();
    let meta = reader.metadata().row_groups[0].columns[1]
        .meta_data
        .clone()
        .unwrap();

    // Flip a byte near the end of the compressed payload (gzip trailer CRC)
    let mut corrupted = bytes.to_vec();
    let last = (meta.data_page_offset + meta.total_compressed_size) as usize - 1;
    corrupted[last] ^= 0xff;
    let reader = Reader::new(Bytes::from(corrupted)).unwrap();
    assert!(reader.read_column(0, 1).is_err());
}

// =============================================================================
// Compatibility with the parquet crate's reader
// =============================================================================

#[test]
fn test_readable_by_parquet_crate() {
    for codec in [Codec::Uncompressed, Codec::Snappy, Codec::Gzip] {
        let schema = SchemaBuilder::new()
            .field(FieldSpec::new("uid", "string"))
            .field(FieldSpec::new("code", "int"))
            .field(FieldSpec::new("time", "long"))
            .with_compression(codec)
            .build()
            .unwrap();
        let rows: Vec<Row> = (0..25)
            .map(|i| {
                record([
                    ("uid", DynamicValue::from(format!("us-{}", i))),
                    ("code", DynamicValue::Int64(i * 4 + 104)),
                    ("time", DynamicValue::Int64(1_500_000_000 + i)),
                ])
            })
            .collect();
        let bytes = write_to_bytes(schema, &rows, 10);

        let reader = SerializedFileReader::new(bytes).unwrap();
        let metadata = reader.metadata();
        assert_eq!(metadata.file_metadata().num_rows(), 25);
        assert_eq!(metadata.num_row_groups(), 3);
        assert_eq!(metadata.row_group(2).num_rows(), 5);

        let read: Vec<_> = reader
            .get_row_iter(None)
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(read.len(), 25);
        for (i, row) in read.iter().enumerate() {
            let i = i as i64;
            assert_eq!(row.get_string(0).unwrap(), &format!("us-{}", i));
            assert_eq!(row.get_int(1).unwrap(), (i * 4 + 104) as i32);
            assert_eq!(row.get_long(2).unwrap(), 1_500_000_000 + i);
        }
    }
}

#[test]
fn test_optional_columns_readable_by_parquet_crate() {
    let schema = SchemaBuilder::new()
        .field(FieldSpec::new("id", "long"))
        .field(FieldSpec::new("note", "string").optional())
        .field(FieldSpec::new("score", "double").optional())
        .build()
        .unwrap();
    let rows: Vec<Row> = (0..12)
        .map(|i: i64| {
            record([
                ("id", DynamicValue::Int64(i)),
                (
                    "note",
                    if i % 2 == 0 {
                        DynamicValue::from(format!("note {}", i))
                    } else {
                        DynamicValue::Null
                    },
                ),
                (
                    "score",
                    if i % 3 == 0 {
                        DynamicValue::Null
                    } else {
                        DynamicValue::from(i as f64 * 0.5)
                    },
                ),
            ])
        })
        .collect();
    let bytes = write_to_bytes(schema, &rows, 5);

    let reader = SerializedFileReader::new(bytes).unwrap();
    let read: Vec<_> = reader
        .get_row_iter(None)
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(read.len(), 12);

    for (i, row) in read.iter().enumerate() {
        let fields: Vec<&Field> = row.get_column_iter().map(|(_, field)| field).collect();
        assert_eq!(fields[0], &Field::Long(i as i64));
        if i % 2 == 0 {
            assert_eq!(fields[1], &Field::Str(format!("note {}", i)));
        } else {
            assert_eq!(fields[1], &Field::Null);
        }
        if i % 3 == 0 {
            assert_eq!(fields[2], &Field::Null);
        } else {
            assert_eq!(fields[2], &Field::Double(i as f64 * 0.5));
        }
    }
}

#[test]
fn test_written_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.parquet");

    let mut writer = Writer::new(
        std::fs::File::create(&path).unwrap(),
        schema_with(Codec::Snappy),
    )
    .unwrap();
    writer.write_records(generate_test_rows(40)).unwrap();
    writer.close().unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let reader = SerializedFileReader::new(file).unwrap();
    assert_eq!(reader.metadata().file_metadata().num_rows(), 40);
    assert_eq!(
        reader.metadata().file_metadata().created_by(),
        Some(concat!("parquet-encoder version ", env!("CARGO_PKG_VERSION")))
    );

    let ours = read_all(Bytes::from(std::fs::read(&path).unwrap()));
    assert_eq!(ours, generate_test_rows(40));
}
