//! Test utilities for parquet-encoder

#[cfg(test)]
pub mod test {
    use crate::{CompileOptions, DynamicValue, FieldSpec, Schema};
    use indexmap::IndexMap;
    use std::io::Write;
    use std::sync::Arc;

    /// Five-column event schema with declared and fallback defaults
    pub fn event_schema() -> Schema {
        Schema::compile(
            vec![
                FieldSpec::new("uid", "string"),
                FieldSpec::new("did", "string"),
                FieldSpec::new("code", "int").with_default("500"),
                FieldSpec::new("type", "int").with_default(-2),
                FieldSpec::new("time", "long").with_default(0i64),
            ],
            &CompileOptions::default(),
        )
        .unwrap()
    }

    /// Records for [`event_schema`], the way a JSON decoder would produce them
    pub fn event_records(count: usize) -> Vec<IndexMap<Arc<str>, DynamicValue>> {
        (0..count)
            .map(|i| {
                let i = i as i64;
                IndexMap::from([
                    (Arc::from("uid"), DynamicValue::from(format!("us-{}", i))),
                    (Arc::from("did"), DynamicValue::from(format!("c3p {}", i))),
                    (Arc::from("type"), DynamicValue::Int64(i % 8)),
                    (Arc::from("code"), DynamicValue::Int64((i + 1) * 4 + 100)),
                    (Arc::from("time"), DynamicValue::Int64(1_500_000_000 + i)),
                ])
            })
            .collect()
    }

    /// A sink that accepts `limit` bytes and then fails every write
    #[derive(Debug)]
    pub struct FailingSink {
        limit: usize,
        written: usize,
    }

    impl FailingSink {
        pub fn after(limit: usize) -> Self {
            Self { limit, written: 0 }
        }
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written + buf.len() > self.limit {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "sink is full",
                ));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
