//! Dense feature matrix produced by featurization

use serde::{Deserialize, Serialize};

use crate::errors::{LibraryError, Result};

/// Row-major `f64` matrix with one name per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    n_rows: usize,
    names: Vec<String>,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build from column vectors; every column must have `n_rows` entries
    pub fn from_columns(n_rows: usize, names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(LibraryError::Featurization(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some(bad) = columns.iter().position(|c| c.len() != n_rows) {
            return Err(LibraryError::Featurization(format!(
                "column `{}` has {} rows, expected {}",
                names[bad],
                columns[bad].len(),
                n_rows
            )));
        }

        let n_cols = columns.len();
        let mut data = vec![0.0; n_rows * n_cols];
        for (c, column) in columns.iter().enumerate() {
            for (r, &value) in column.iter().enumerate() {
                data[r * n_cols + c] = value;
            }
        }

        Ok(Self {
            n_rows,
            names,
            data,
        })
    }

    /// Concatenate `n_rows`-row matrices column-wise, keeping part order
    pub fn hconcat(n_rows: usize, parts: Vec<FeatureMatrix>) -> Result<Self> {
        if let Some(bad) = parts.iter().find(|p| p.n_rows != n_rows) {
            return Err(LibraryError::Featurization(format!(
                "cannot concatenate blocks with {} and {} rows",
                n_rows, bad.n_rows
            )));
        }

        let names: Vec<String> = parts.iter().flat_map(|p| p.names.iter().cloned()).collect();
        let n_cols = names.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for r in 0..n_rows {
            for part in &parts {
                data.extend_from_slice(part.row(r));
            }
        }

        Ok(Self {
            n_rows,
            names,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row(&self, r: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.data[r * n_cols..(r + 1) * n_cols]
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.n_cols() + c]
    }

    /// Iterate one column top to bottom
    pub fn column(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        let n_cols = self.n_cols();
        (0..self.n_rows).map(move |r| self.data[r * n_cols + c])
    }

    /// Apply `f(column, value)` to every cell in place
    pub fn map_in_place<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, f64) -> f64,
    {
        let n_cols = self.n_cols();
        if n_cols == 0 {
            return;
        }
        for (i, value) in self.data.iter_mut().enumerate() {
            *value = f(i % n_cols, *value);
        }
    }
}
