//! Column-group featurization
//!
//! Every column of a group runs through the same fixed chain of cell
//! transforms ending in an encoder. Groups are combined by column-wise
//! concatenation in declaration order:
//!
//! - `Recipe::BagOfWords`: string cast → binary bag-of-words
//! - `Recipe::Categorical`: category imputation → string cast → label encoding
//! - `Recipe::MeanImpute`: mean imputation

pub mod categorical;
pub mod numeric;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::errors::{LibraryError, Result};
use crate::matrix::FeatureMatrix;
use crate::stage::{Stage, ValueEncoder, ValueTransform};
use crate::table::{Table, Value};

pub use categorical::{CategoryImputer, LabelEncoder};
pub use numeric::MeanImputer;
pub use text::{BagOfWords, StringCast, Tokenizer};

/// Cell-to-cell step of a column chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStep {
    StringCast(StringCast),
    CategoryImputer(CategoryImputer),
}

impl ValueTransform for ValueStep {
    fn fit(&mut self, values: &[Value]) -> Result<()> {
        match self {
            ValueStep::StringCast(step) => step.fit(values),
            ValueStep::CategoryImputer(step) => step.fit(values),
        }
    }

    fn transform(&self, values: &[Value]) -> Result<Vec<Value>> {
        match self {
            ValueStep::StringCast(step) => step.transform(values),
            ValueStep::CategoryImputer(step) => step.transform(values),
        }
    }
}

/// Final encoder of a column chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoder {
    BagOfWords(BagOfWords),
    LabelEncoder(LabelEncoder),
    MeanImputer(MeanImputer),
}

impl ValueEncoder for Encoder {
    fn fit(&mut self, values: &[Value]) -> Result<()> {
        match self {
            Encoder::BagOfWords(enc) => enc.fit(values),
            Encoder::LabelEncoder(enc) => enc.fit(values),
            Encoder::MeanImputer(enc) => enc.fit(values),
        }
    }

    fn encode(&self, values: &[Value]) -> Result<Vec<Vec<f64>>> {
        match self {
            Encoder::BagOfWords(enc) => enc.encode(values),
            Encoder::LabelEncoder(enc) => enc.encode(values),
            Encoder::MeanImputer(enc) => enc.encode(values),
        }
    }

    fn output_names(&self, column: &str) -> Result<Vec<String>> {
        match self {
            Encoder::BagOfWords(enc) => enc.output_names(column),
            Encoder::LabelEncoder(enc) => enc.output_names(column),
            Encoder::MeanImputer(enc) => enc.output_names(column),
        }
    }
}

/// Featurization recipe shared by all columns of a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    BagOfWords { tokenizer: Tokenizer },
    Categorical { hashing_seed: u64 },
    MeanImpute,
}

impl Recipe {
    /// Fresh, unfitted chain for one column
    pub fn chain(&self, column: &str) -> ColumnChain {
        let (steps, encoder) = match *self {
            Recipe::BagOfWords { tokenizer } => (
                vec![ValueStep::StringCast(StringCast::default())],
                Encoder::BagOfWords(BagOfWords::new(tokenizer)),
            ),
            Recipe::Categorical { hashing_seed } => (
                vec![
                    ValueStep::CategoryImputer(CategoryImputer::default()),
                    ValueStep::StringCast(StringCast::default()),
                ],
                Encoder::LabelEncoder(LabelEncoder::new(hashing_seed)),
            ),
            Recipe::MeanImpute => (Vec::new(), Encoder::MeanImputer(MeanImputer::default())),
        };

        ColumnChain {
            column: column.to_string(),
            steps,
            encoder,
        }
    }
}

/// Transform chain bound to a single source column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChain {
    pub column: String,
    steps: Vec<ValueStep>,
    encoder: Encoder,
}

impl ColumnChain {
    fn source<'a>(&self, table: &'a Table) -> Result<&'a [Value]> {
        table
            .column(&self.column)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| {
                LibraryError::Featurization(format!("column `{}` missing from input", self.column))
            })
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}

impl Stage<Table> for ColumnChain {
    type Output = FeatureMatrix;

    fn fit(&mut self, table: &Table) -> Result<()> {
        let mut values = self.source(table)?.to_vec();
        for step in &mut self.steps {
            step.fit(&values)?;
            values = step.transform(&values)?;
        }
        self.encoder.fit(&values)
    }

    fn transform(&self, table: &Table) -> Result<FeatureMatrix> {
        let mut values = self.source(table)?.to_vec();
        for step in &self.steps {
            values = step.transform(&values)?;
        }

        let columns = self.encoder.encode(&values)?;
        let names = self.encoder.output_names(&self.column)?;
        FeatureMatrix::from_columns(table.n_rows(), names, columns)
    }
}

/// A named column group with one chain per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapper {
    pub name: String,
    pub recipe: Recipe,
    chains: Vec<ColumnChain>,
}

impl ColumnMapper {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, columns: &[S], recipe: Recipe) -> Self {
        Self {
            name: name.into(),
            recipe,
            chains: columns.iter().map(|c| recipe.chain(c.as_ref())).collect(),
        }
    }

    pub fn chains(&self) -> &[ColumnChain] {
        &self.chains
    }

    pub fn columns(&self) -> Vec<&str> {
        self.chains.iter().map(|c| c.column.as_str()).collect()
    }
}

impl Stage<Table> for ColumnMapper {
    type Output = FeatureMatrix;

    fn fit(&mut self, table: &Table) -> Result<()> {
        for chain in &mut self.chains {
            chain.fit(table)?;
        }
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<FeatureMatrix> {
        let blocks = self
            .chains
            .iter()
            .map(|chain| chain.transform(table))
            .collect::<Result<Vec<_>>>()?;
        FeatureMatrix::hconcat(table.n_rows(), blocks)
    }
}

/// Column-wise union of every mapper's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureUnion {
    mappers: Vec<ColumnMapper>,
}

impl FeatureUnion {
    pub fn new(mappers: Vec<ColumnMapper>) -> Self {
        Self { mappers }
    }

    pub fn mappers(&self) -> &[ColumnMapper] {
        &self.mappers
    }
}

impl Stage<Table> for FeatureUnion {
    type Output = FeatureMatrix;

    fn fit(&mut self, table: &Table) -> Result<()> {
        for mapper in &mut self.mappers {
            tracing::debug!(mapper = %mapper.name, columns = mapper.chains.len(), "fitting column mapper");
            mapper.fit(table)?;
        }
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<FeatureMatrix> {
        let blocks = self
            .mappers
            .iter()
            .map(|mapper| mapper.transform(table))
            .collect::<Result<Vec<_>>>()?;

        FeatureMatrix::hconcat(table.n_rows(), blocks)
    }
}
