//! Tabular query results.
//!
//! A [Frame] is the in-memory form of a warehouse result set. It lives for a single request and
//! is consumed by the chart builders.

use crate::error::ChartError;

use serde::Deserialize;

/// Field of a result schema, as reported by BigQuery.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Standard or legacy SQL type name, e.g. `FLOAT` or `FLOAT64`
    #[serde(rename = "type")]
    pub field_type: String,
}

impl Field {
    /// Return a new Field.
    pub fn new(name: &str, field_type: &str) -> Self {
        Field {
            name: name.to_string(),
            field_type: field_type.to_string(),
        }
    }
}

/// Typed storage for a single column. Every cell may be null.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    /// `FLOAT64`, `NUMERIC` and `BIGNUMERIC`
    Float(Vec<Option<f64>>),
    /// `INT64`
    Int(Vec<Option<i64>>),
    /// `BOOL`
    Bool(Vec<Option<bool>>),
    /// `STRING` and any other type, as text
    Str(Vec<Option<String>>),
}

impl ColumnData {
    /// Returns empty storage matching a BigQuery type name.
    fn for_type(field_type: &str, capacity: usize) -> Self {
        match field_type.to_ascii_uppercase().as_str() {
            "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => {
                Self::Float(Vec::with_capacity(capacity))
            }
            "INTEGER" | "INT64" => Self::Int(Vec::with_capacity(capacity)),
            "BOOLEAN" | "BOOL" => Self::Bool(Vec::with_capacity(capacity)),
            _ => Self::Str(Vec::with_capacity(capacity)),
        }
    }

    /// Number of cells, nulls included.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) => values.len(),
            Self::Int(values) => values.len(),
            Self::Bool(values) => values.len(),
            Self::Str(values) => values.len(),
        }
    }

    /// Returns true if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Is the cell at `index` null, or a non-finite float?
    fn is_invalid(&self, index: usize) -> bool {
        match self {
            Self::Float(values) => !matches!(values[index], Some(v) if v.is_finite()),
            Self::Int(values) => values[index].is_none(),
            Self::Bool(values) => values[index].is_none(),
            Self::Str(values) => values[index].is_none(),
        }
    }

    /// Keep only the cells whose `keep` flag is set.
    fn retain(&mut self, keep: &[bool]) {
        fn retain_vec<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut flags = keep.iter();
            values.retain(|_| *flags.next().unwrap_or(&false));
        }
        match self {
            Self::Float(values) => retain_vec(values, keep),
            Self::Int(values) => retain_vec(values, keep),
            Self::Bool(values) => retain_vec(values, keep),
            Self::Str(values) => retain_vec(values, keep),
        }
    }

    /// Append a string-encoded cell, parsing it as this column's type.
    fn push_encoded(&mut self, column: &str, cell: Option<&str>) -> Result<(), ChartError> {
        let parse_error = |value: &str, type_name| ChartError::CellParse {
            column: column.to_string(),
            value: value.to_string(),
            type_name,
        };
        match self {
            Self::Float(values) => values.push(
                cell.map(|v| parse_float(v).ok_or_else(|| parse_error(v, "f64")))
                    .transpose()?,
            ),
            Self::Int(values) => values.push(
                cell.map(|v| v.parse::<i64>().map_err(|_| parse_error(v, "i64")))
                    .transpose()?,
            ),
            Self::Bool(values) => values.push(
                cell.map(|v| match v.to_ascii_lowercase().as_str() {
                    "true" => Ok(true),
                    "false" => Ok(false),
                    _ => Err(parse_error(v, "bool")),
                })
                .transpose()?,
            ),
            Self::Str(values) => values.push(cell.map(str::to_string)),
        }
        Ok(())
    }
}

/// Parse a float as encoded by BigQuery, which spells out the IEEE special values.
fn parse_float(value: &str) -> Option<f64> {
    match value {
        "NaN" => Some(f64::NAN),
        "Infinity" | "inf" => Some(f64::INFINITY),
        "-Infinity" | "-inf" => Some(f64::NEG_INFINITY),
        _ => value.parse().ok(),
    }
}

/// A named column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// An ordered collection of equal-length named columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame from already-decoded columns.
    ///
    /// Returns an error if the columns differ in length.
    pub fn new(columns: Vec<Column>) -> Result<Self, ChartError> {
        if let Some(first) = columns.first() {
            let expected = first.data.len();
            if let Some(column) = columns.iter().find(|c| c.data.len() != expected) {
                return Err(ChartError::RowShape {
                    expected,
                    actual: column.data.len(),
                });
            }
        }
        Ok(Frame { columns })
    }

    /// Decode string-encoded rows according to a result schema.
    ///
    /// # Arguments
    ///
    /// * `schema`: Result schema fields, one per column
    /// * `rows`: Row cells in schema order. `None` represents SQL NULL.
    pub fn from_bigquery(
        schema: &[Field],
        rows: &[Vec<Option<String>>],
    ) -> Result<Self, ChartError> {
        let mut columns: Vec<Column> = schema
            .iter()
            .map(|field| Column {
                name: field.name.clone(),
                data: ColumnData::for_type(&field.field_type, rows.len()),
            })
            .collect();
        for row in rows {
            if row.len() != columns.len() {
                return Err(ChartError::RowShape {
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.data.push_encoded(&column.name, cell.as_deref())?;
            }
        }
        Ok(Frame { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column, ChartError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ChartError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Returns a numeric column as floats, widening integers.
    pub fn floats(&self, name: &str) -> Result<Vec<Option<f64>>, ChartError> {
        match &self.column(name)?.data {
            ColumnData::Float(values) => Ok(values.clone()),
            ColumnData::Int(values) => Ok(values.iter().map(|v| v.map(|v| v as f64)).collect()),
            ColumnData::Bool(_) | ColumnData::Str(_) => Err(ChartError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
            }),
        }
    }

    /// Returns a column rendered as strings.
    pub fn strings(&self, name: &str) -> Result<Vec<Option<String>>, ChartError> {
        let values = match &self.column(name)?.data {
            ColumnData::Float(values) => values.iter().map(|v| v.map(|v| v.to_string())).collect(),
            ColumnData::Int(values) => values.iter().map(|v| v.map(|v| v.to_string())).collect(),
            ColumnData::Bool(values) => values.iter().map(|v| v.map(|v| v.to_string())).collect(),
            ColumnData::Str(values) => values.clone(),
        };
        Ok(values)
    }

    /// Drop every row that holds a null or a non-finite float in any column.
    pub fn drop_invalid(mut self) -> Self {
        let keep: Vec<bool> = (0..self.num_rows())
            .map(|row| !self.columns.iter().any(|c| c.data.is_invalid(row)))
            .collect();
        if keep.iter().all(|k| *k) {
            return self;
        }
        for column in self.columns.iter_mut() {
            column.data.retain(&keep);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::row;

    fn schema() -> Vec<Field> {
        vec![
            Field::new("subtype", "STRING"),
            Field::new("control_percent", "FLOAT"),
            Field::new("count", "INTEGER"),
            Field::new("canonical", "BOOLEAN"),
        ]
    }

    #[test]
    fn from_bigquery_types() {
        let rows = vec![
            row(&[Some("AIS"), Some("0.5"), Some("3"), Some("true")]),
            row(&[None, Some("Infinity"), None, Some("false")]),
        ];
        let frame = Frame::from_bigquery(&schema(), &rows).unwrap();
        assert_eq!(2, frame.num_rows());
        assert_eq!(
            ColumnData::Str(vec![Some("AIS".to_string()), None]),
            frame.column("subtype").unwrap().data
        );
        assert_eq!(
            ColumnData::Float(vec![Some(0.5), Some(f64::INFINITY)]),
            frame.column("control_percent").unwrap().data
        );
        assert_eq!(
            ColumnData::Int(vec![Some(3), None]),
            frame.column("count").unwrap().data
        );
        assert_eq!(
            ColumnData::Bool(vec![Some(true), Some(false)]),
            frame.column("canonical").unwrap().data
        );
    }

    #[test]
    fn from_bigquery_standard_sql_type_names() {
        let schema = vec![Field::new("x", "FLOAT64"), Field::new("n", "INT64")];
        let rows = vec![row(&[Some("1e-3"), Some("-7")])];
        let frame = Frame::from_bigquery(&schema, &rows).unwrap();
        assert_eq!(vec![Some(0.001)], frame.floats("x").unwrap());
        assert_eq!(vec![Some(-7.0)], frame.floats("n").unwrap());
    }

    #[test]
    fn from_bigquery_empty() {
        let frame = Frame::from_bigquery(&schema(), &[]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(4, frame.columns().len());
    }

    #[test]
    fn from_bigquery_row_shape() {
        let rows = vec![row(&[Some("AIS"), Some("0.5")])];
        match Frame::from_bigquery(&schema(), &rows) {
            Err(ChartError::RowShape { expected, actual }) => {
                assert_eq!(4, expected);
                assert_eq!(2, actual);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn from_bigquery_bad_float() {
        let rows = vec![row(&[Some("AIS"), Some("half"), Some("1"), Some("true")])];
        match Frame::from_bigquery(&schema(), &rows) {
            Err(ChartError::CellParse {
                column,
                value,
                type_name,
            }) => {
                assert_eq!("control_percent", column);
                assert_eq!("half", value);
                assert_eq!("f64", type_name);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn from_bigquery_bad_bool() {
        let rows = vec![row(&[Some("AIS"), Some("1"), Some("1"), Some("yes")])];
        assert!(matches!(
            Frame::from_bigquery(&schema(), &rows),
            Err(ChartError::CellParse { .. })
        ));
    }

    #[test]
    fn new_mismatched_lengths() {
        let columns = vec![
            Column {
                name: "a".to_string(),
                data: ColumnData::Float(vec![Some(1.0)]),
            },
            Column {
                name: "b".to_string(),
                data: ColumnData::Float(vec![]),
            },
        ];
        assert!(matches!(
            Frame::new(columns),
            Err(ChartError::RowShape {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn missing_column() {
        let frame = Frame::from_bigquery(&schema(), &[]).unwrap();
        assert!(matches!(
            frame.floats("gnomad_af"),
            Err(ChartError::MissingColumn { column }) if column == "gnomad_af"
        ));
    }

    #[test]
    fn floats_from_string_column() {
        let frame = Frame::from_bigquery(&schema(), &[]).unwrap();
        assert!(matches!(
            frame.floats("subtype"),
            Err(ChartError::ColumnType { expected: "numeric", .. })
        ));
    }

    #[test]
    fn strings_from_numeric_column() {
        let rows = vec![row(&[Some("AIS"), Some("0.25"), Some("3"), None])];
        let frame = Frame::from_bigquery(&schema(), &rows).unwrap();
        assert_eq!(
            vec![Some("0.25".to_string())],
            frame.strings("control_percent").unwrap()
        );
        assert_eq!(vec![Some("3".to_string())], frame.strings("count").unwrap());
        assert_eq!(vec![None], frame.strings("canonical").unwrap());
    }

    #[test]
    fn drop_invalid() {
        let rows = vec![
            row(&[Some("AIS"), Some("0.5"), Some("1"), Some("true")]),
            row(&[Some("IIS"), Some("-Infinity"), Some("2"), Some("true")]),
            row(&[Some("JIS"), Some("NaN"), Some("3"), Some("true")]),
            row(&[None, Some("0.1"), Some("4"), Some("true")]),
            row(&[Some("AIS"), Some("0.7"), None, Some("true")]),
            row(&[Some("IIS"), Some("0.9"), Some("6"), Some("false")]),
        ];
        let frame = Frame::from_bigquery(&schema(), &rows).unwrap().drop_invalid();
        assert_eq!(2, frame.num_rows());
        assert_eq!(
            vec![Some("AIS".to_string()), Some("IIS".to_string())],
            frame.strings("subtype").unwrap()
        );
        assert_eq!(vec![Some(0.5), Some(0.9)], frame.floats("control_percent").unwrap());
        assert_eq!(vec![Some(1.0), Some(6.0)], frame.floats("count").unwrap());
    }

    #[test]
    fn from_bigquery_numeric_types() {
        let schema = vec![
            Field::new("price", "NUMERIC"),
            Field::new("big", "BIGNUMERIC"),
        ];
        let rows = vec![
            row(&[Some("12.5"), Some("98765.4321")]),
            row(&[None, Some("-1")]),
        ];
        let frame = Frame::from_bigquery(&schema, &rows).unwrap();
        assert_eq!(
            ColumnData::Float(vec![Some(12.5), None]),
            frame.column("price").unwrap().data
        );
        assert_eq!(
            vec![Some(98765.4321), Some(-1.0)],
            frame.floats("big").unwrap()
        );
    }

    #[test]
    fn parse_float_special_values() {
        assert_eq!(Some(f64::INFINITY), parse_float("Infinity"));
        assert_eq!(Some(f64::INFINITY), parse_float("inf"));
        assert_eq!(Some(f64::NEG_INFINITY), parse_float("-Infinity"));
        assert_eq!(Some(f64::NEG_INFINITY), parse_float("-inf"));
        assert!(parse_float("NaN").unwrap().is_nan());
        assert_eq!(Some(1e-3), parse_float("1e-3"));
        assert_eq!(None, parse_float("one"));
    }

    #[test]
    fn drop_invalid_all_rows() {
        let rows = vec![row(&[None, None, None, None])];
        let frame = Frame::from_bigquery(&schema(), &rows).unwrap().drop_invalid();
        assert!(frame.is_empty());
    }
}
