use std::io::{Cursor, Write};

use anyhow::{anyhow, Result};
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::metrics::NOT_APPLICABLE;

/// Utility function to convert from polars `AnyValue` to `serde_json::Value`
/// Doesn't cover all types but the ones a sheet can produce.
fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::Int8(n) => Ok(json!(*n)),
        AnyValue::Int16(n) => Ok(json!(*n)),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt8(n) => Ok(json!(*n)),
        AnyValue::UInt16(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float32(n) => Ok(json!(*n)),
        AnyValue::Float64(n) => Ok(json!(*n)),
        other => Err(anyhow!("Failed to convert {other:?} to JSON")),
    }
}

fn rows_as_json(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    (0..df.height())
        .map(|idx| {
            let mut record = Map::new();
            for col in df.get_columns() {
                record.insert(col.name().to_string(), any_value_to_json(&col.get(idx)?)?);
            }
            Ok(record)
        })
        .collect()
}

/// Trait to define different output generators. `save` writes the `DataFrame` to a writer,
/// `format` returns it as a string.
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let mut data: Vec<u8> = Vec::new();
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, df)?;
        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum OutputFormatter {
    Csv(CsvFormatter),
    Json(JsonFormatter),
    JsonLines(JsonLinesFormatter),
}

/// CSV with a header row; undefined cells are written as `n/a`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CsvFormatter {
    null_value: String,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self {
            null_value: NOT_APPLICABLE.to_string(),
        }
    }
}

impl OutputGenerator for CsvFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer)
            .include_header(true)
            .with_null_value(self.null_value.clone())
            .finish(df)?;
        Ok(())
    }
}

/// A JSON array with one object per row, keyed by column name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonFormatter;

impl OutputGenerator for JsonFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let records = rows_as_json(df)?;
        serde_json::to_writer_pretty(&mut *writer, &records)?;
        writeln!(writer)?;
        Ok(())
    }
}

/// One JSON object per line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonLinesFormatter;

impl OutputGenerator for JsonLinesFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        for record in rows_as_json(df)? {
            writeln!(writer, "{}", Value::Object(record))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::COL;

    fn test_df() -> DataFrame {
        df!(
            "부문" => &["총배출", "총배출"],
            "정당" => &["2018년 기준", "A당"],
            "값" => &[727.6, 306.5],
            COL::REDUCTION_PCT => &[Some(0.0), None],
        )
        .unwrap()
    }

    #[test]
    fn csv_keeps_column_order_and_writes_na() {
        let output = CsvFormatter::default().format(&mut test_df()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "부문,정당,값,감축률(%)");
        assert_eq!(lines[2], "총배출,A당,306.5,n/a");
    }

    #[test]
    fn json_is_one_object_per_row() {
        let output = JsonFormatter.format(&mut test_df()).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[1]["정당"], json!("A당"));
        assert_eq!(parsed[1]["감축률(%)"], Value::Null);
        assert_eq!(parsed[0]["값"], json!(727.6));
    }

    #[test]
    fn json_lines_writes_each_row() {
        let formatter: OutputFormatter = JsonLinesFormatter.into();
        let output = formatter.format(&mut test_df()).unwrap();
        assert_eq!(output.lines().count(), 2);
        let first: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(first["감축률(%)"], json!(0.0));
    }
}
