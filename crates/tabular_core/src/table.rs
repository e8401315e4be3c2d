//! In-memory tabular data
//!
//! Tables are stored column-major: every column owns one `Value` per row.
//! Cells are parsed once at load time into missing, numeric or text values.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::errors::DataError;

/// Tokens that denote a missing cell (compared case-insensitively).
const MISSING_TOKENS: [&str; 5] = ["", "nan", "na", "null", "none"];

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    /// Parse a raw CSV cell
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
        {
            return Value::Missing;
        }

        match trimmed.parse::<f64>() {
            Ok(number) if number.is_nan() => Value::Missing,
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell; `None` for missing or text cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String form used by categorical transforms; `None` when missing
    pub fn as_category(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "nan"),
            // Integral numbers print without a fractional part ("2011", not "2011.0")
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Storage kind inferred from a column's present values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Long,
    Double,
    String,
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Infer the column kind; all-missing columns are reported as `Double`
    pub fn kind(&self) -> ColumnKind {
        let mut integral = true;
        for value in &self.values {
            match value {
                Value::Text(_) => return ColumnKind::String,
                Value::Number(n) if n.fract() != 0.0 => integral = false,
                _ => {}
            }
        }

        let any_number = self.values.iter().any(|v| matches!(v, Value::Number(_)));
        if any_number && integral {
            ColumnKind::Long
        } else {
            ColumnKind::Double
        }
    }
}

/// Column-major table with a fixed row count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from columns of equal length with unique names
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DataError> {
        let n_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DataError::Malformed(format!(
                    "duplicate column `{}`",
                    column.name
                )));
            }
            if column.values.len() != n_rows {
                return Err(DataError::Malformed(format!(
                    "column `{}` has {} rows, expected {}",
                    column.name,
                    column.values.len(),
                    n_rows
                )));
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Build a table from a header and row-major cells
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DataError> {
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DataError::Malformed(format!(
                    "row {}: expected {} cells, got {}",
                    row_idx,
                    columns.len(),
                    row.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Self::from_columns(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Remove a column and return it
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// New table holding the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                Column::new(
                    column.name.clone(),
                    rows.iter().map(|&r| column.values[r].clone()).collect(),
                )
            })
            .collect();

        Table {
            columns,
            n_rows: rows.len(),
        }
    }

    /// Column names with their inferred kinds, in column order
    pub fn schema(&self) -> Vec<(String, ColumnKind)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.kind()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsing() {
        assert_eq!(Value::parse("12"), Value::Number(12.0));
        assert_eq!(Value::parse(" 0.25 "), Value::Number(0.25));
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("NaN"), Value::Missing);
        assert_eq!(Value::parse("NA"), Value::Missing);
        assert_eq!(Value::parse("sunny"), Value::Text("sunny".to_string()));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(2011.0).to_string(), "2011");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::Missing.to_string(), "nan");
        assert_eq!(Value::Missing.as_category(), None);
    }

    #[test]
    fn test_from_rows_and_take() -> Result<(), DataError> {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Value::Number(1.0), Value::Text("x".into())],
                vec![Value::Number(2.0), Value::Missing],
                vec![Value::Number(3.0), Value::Text("y".into())],
            ],
        )?;

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column_names(), vec!["a", "b"]);

        let subset = table.take_rows(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);
        assert_eq!(
            subset.column("a").map(|c| c.values.clone()),
            Some(vec![Value::Number(3.0), Value::Number(1.0)])
        );
        Ok(())
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Number(1.0)]],
        );
        assert!(matches!(result, Err(DataError::Malformed(_))));
    }

    #[test]
    fn test_schema_inference() -> Result<(), DataError> {
        let table = Table::from_columns(vec![
            Column::new("ints", vec![Value::Number(1.0), Value::Missing]),
            Column::new("floats", vec![Value::Number(1.5), Value::Number(2.0)]),
            Column::new("text", vec![Value::Number(1.0), Value::Text("a".into())]),
        ])?;

        let schema = table.schema();
        assert_eq!(schema[0].1, ColumnKind::Long);
        assert_eq!(schema[1].1, ColumnKind::Double);
        assert_eq!(schema[2].1, ColumnKind::String);
        Ok(())
    }
}
