//! Label extraction and row cleaning

use tabular_core::{DataError, Table};

/// Feature table plus label, weights and source row of every kept row
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub features: Table,
    pub labels: Vec<f64>,
    pub weights: Option<Vec<f64>>,

    /// Row index in the loaded table, per kept row
    pub row_ids: Vec<usize>,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows at `positions` (indices into this data), in the given order
    pub fn subset(&self, positions: &[usize]) -> PreparedData {
        PreparedData {
            features: self.features.take_rows(positions),
            labels: positions.iter().map(|&p| self.labels[p]).collect(),
            weights: self
                .weights
                .as_ref()
                .map(|w| positions.iter().map(|&p| w[p]).collect()),
            row_ids: positions.iter().map(|&p| self.row_ids[p]).collect(),
        }
    }
}

/// Drop rows without a label and separate label and weight columns
pub fn prepare_data(
    table: &Table,
    label_column: &str,
    weight_column: Option<&str>,
) -> Result<PreparedData, DataError> {
    let label = table
        .column(label_column)
        .ok_or_else(|| DataError::MissingLabelColumn(label_column.to_string()))?;

    let weight = match weight_column {
        Some(name) => Some(
            table
                .column(name)
                .ok_or_else(|| DataError::MissingWeightColumn(name.to_string()))?,
        ),
        None => None,
    };

    let mut row_ids = Vec::with_capacity(table.n_rows());
    let mut labels = Vec::with_capacity(table.n_rows());
    for (row, value) in label.values.iter().enumerate() {
        if value.is_missing() {
            continue;
        }
        let y = value
            .as_f64()
            .filter(|y| y.is_finite())
            .ok_or(DataError::NonNumericLabel { row })?;
        row_ids.push(row);
        labels.push(y);
    }

    let weights = match weight {
        Some(column) => Some(
            row_ids
                .iter()
                .map(|&row| {
                    column.values[row]
                        .as_f64()
                        .filter(|w| w.is_finite() && *w >= 0.0)
                        .ok_or(DataError::InvalidWeight { row })
                })
                .collect::<Result<Vec<f64>, DataError>>()?,
        ),
        None => None,
    };

    let mut features = table.take_rows(&row_ids);
    features.drop_column(label_column);
    if let Some(name) = weight_column {
        features.drop_column(name);
    }

    let dropped = table.n_rows() - row_ids.len();
    if dropped > 0 {
        tracing::info!(dropped, "removed rows with a missing label");
    }

    Ok(PreparedData {
        features,
        labels,
        weights,
        row_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabular_core::{Column, Value};

    fn table(labels: Vec<Value>, weights: Option<Vec<Value>>) -> Table {
        let n = labels.len();
        let mut columns = vec![
            Column::new("temp", (0..n).map(|i| Value::Number(i as f64)).collect()),
            Column::new("rentals", labels),
        ];
        if let Some(w) = weights {
            columns.push(Column::new("w", w));
        }
        Table::from_columns(columns).expect("valid table")
    }

    #[test]
    fn test_rows_without_label_are_removed() -> Result<(), DataError> {
        let t = table(
            vec![Value::Number(3.0), Value::Missing, Value::Number(5.0)],
            None,
        );
        let data = prepare_data(&t, "rentals", None)?;

        assert_eq!(data.labels, vec![3.0, 5.0]);
        assert_eq!(data.row_ids, vec![0, 2]);
        assert_eq!(data.features.column_names(), vec!["temp"]);
        assert_eq!(data.features.n_rows(), 2);
        assert!(data.weights.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_label_column() {
        let t = table(vec![Value::Number(1.0)], None);
        assert_eq!(
            prepare_data(&t, "count", None),
            Err(DataError::MissingLabelColumn("count".into()))
        );
    }

    #[test]
    fn test_text_label() {
        let t = table(vec![Value::Number(1.0), Value::Text("many".into())], None);
        assert_eq!(
            prepare_data(&t, "rentals", None),
            Err(DataError::NonNumericLabel { row: 1 })
        );
    }

    #[test]
    fn test_weights_follow_kept_rows() -> Result<(), DataError> {
        let t = table(
            vec![Value::Missing, Value::Number(1.0), Value::Number(2.0)],
            Some(vec![Value::Missing, Value::Number(0.5), Value::Number(2.0)]),
        );
        let data = prepare_data(&t, "rentals", Some("w"))?;

        assert_eq!(data.weights, Some(vec![0.5, 2.0]));
        assert_eq!(data.features.column_names(), vec!["temp"]);
        Ok(())
    }

    #[test]
    fn test_invalid_weights() {
        let t = table(
            vec![Value::Number(1.0), Value::Number(2.0)],
            Some(vec![Value::Number(1.0), Value::Number(-1.0)]),
        );
        assert_eq!(
            prepare_data(&t, "rentals", Some("w")),
            Err(DataError::InvalidWeight { row: 1 })
        );
        assert_eq!(
            prepare_data(&t, "rentals", Some("weight")),
            Err(DataError::MissingWeightColumn("weight".into()))
        );
    }
}
