//! Stage interfaces shared by every pipeline step

use crate::errors::Result;
use crate::matrix::FeatureMatrix;
use crate::table::Value;

/// A pipeline stage that learns state in `fit` and applies it in `transform`.
///
/// `transform` never mutates the stage, so a stage fit on training data is
/// reused unchanged on evaluation data.
pub trait Stage<In: ?Sized> {
    type Output;

    fn fit(&mut self, input: &In) -> Result<()>;

    fn transform(&self, input: &In) -> Result<Self::Output>;

    fn fit_transform(&mut self, input: &In) -> Result<Self::Output> {
        self.fit(input)?;
        self.transform(input)
    }
}

/// Cell-level transform inside a column chain: values in, values out.
pub trait ValueTransform {
    fn fit(&mut self, values: &[Value]) -> Result<()>;

    fn transform(&self, values: &[Value]) -> Result<Vec<Value>>;
}

/// Terminal step of a column chain turning cells into numeric features.
pub trait ValueEncoder {
    fn fit(&mut self, values: &[Value]) -> Result<()>;

    /// Encoded output, one vector per produced feature column
    fn encode(&self, values: &[Value]) -> Result<Vec<Vec<f64>>>;

    /// Feature names produced for the source column `column`
    fn output_names(&self, column: &str) -> Result<Vec<String>>;
}

/// A fitted model mapping feature rows to predictions
pub trait Predictor {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;
}
