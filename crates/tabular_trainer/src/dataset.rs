//! Dataset loading
//!
//! Datasets are CSV snapshots with a header row, addressed by id inside a
//! workspace directory.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tabular_core::{DataError, Table, Value};

use crate::errors::Result;

/// Source of named dataset snapshots
pub trait DatasetStore {
    fn fetch(&self, dataset_id: &str) -> Result<Table>;
}

/// Resolves `<root>/datasets/<id>.csv`, falling back to
/// `<root>/datasets/<id>/data.csv`
#[derive(Debug, Clone)]
pub struct WorkspaceDatasetStore {
    root: PathBuf,
}

impl WorkspaceDatasetStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, dataset_id: &str) -> Result<PathBuf> {
        validate_dataset_id(dataset_id)?;

        let datasets = self.root.join("datasets");
        let candidates = [
            datasets.join(format!("{}.csv", dataset_id)),
            datasets.join(dataset_id).join("data.csv"),
        ];

        candidates
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| DataError::DatasetNotFound(dataset_id.to_string()).into())
    }
}

impl DatasetStore for WorkspaceDatasetStore {
    fn fetch(&self, dataset_id: &str) -> Result<Table> {
        let path = self.resolve(dataset_id)?;
        tracing::debug!(path = %path.display(), "reading dataset snapshot");
        read_csv(File::open(&path)?)
    }
}

fn validate_dataset_id(dataset_id: &str) -> Result<()> {
    let invalid = dataset_id.is_empty()
        || dataset_id.contains(['/', '\\'])
        || dataset_id.contains("..")
        || dataset_id.chars().any(char::is_control);

    if invalid {
        return Err(DataError::InvalidDatasetId(dataset_id.to_string()).into());
    }
    Ok(())
}

/// Parse a headered CSV into a table; every record must match the header width
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header: Vec<String> = csv_reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(malformed)?;
        rows.push(record.iter().map(Value::parse).collect());
    }

    if rows.is_empty() {
        return Err(DataError::EmptyDataset.into());
    }

    Ok(Table::from_rows(header, rows)?)
}

fn malformed(err: csv::Error) -> DataError {
    DataError::Malformed(err.to_string())
}
