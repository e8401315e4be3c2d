//! Featurize → scale → regress pipeline
//!
//! `Pipeline::fit` consumes the unfitted pipeline and returns a
//! `FittedPipeline`, the only form that can predict.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use tabular_core::serialization::{canonical_hash_hex, canonical_json_string};
use tabular_core::{
    ColumnMapper, FeatureMatrix, FeatureUnion, GbdtModel, MaxAbsScaler, Predictor, Stage, Table,
};

use crate::config::TrainerConfig;
use crate::telemetry::LogContext;
use crate::trainer::{GbdtTrainer, Regressor};

pub struct Pipeline<R: Regressor = GbdtTrainer> {
    featurization: FeatureUnion,
    preproc: MaxAbsScaler,
    regressor: R,
}

impl<R: Regressor> Pipeline<R> {
    pub fn new(featurization: FeatureUnion, preproc: MaxAbsScaler, regressor: R) -> Self {
        Self {
            featurization,
            preproc,
            regressor,
        }
    }

    pub fn featurization(&self) -> &FeatureUnion {
        &self.featurization
    }

    /// Fit every stage on the training rows, in order
    pub fn fit(
        mut self,
        table: &Table,
        labels: &[f64],
        weights: Option<&[f64]>,
    ) -> tabular_core::Result<FittedPipeline<R::Model>> {
        let features = self.featurization.fit_transform(table)?;
        tracing::debug!(
            rows = features.n_rows(),
            features = features.n_cols(),
            "featurized training rows"
        );

        let scaled = self.preproc.fit_transform(&features)?;
        let model = self.regressor.fit(&scaled, labels, weights)?;

        Ok(FittedPipeline {
            featurization: self.featurization,
            preproc: self.preproc,
            model,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline<M = GbdtModel> {
    featurization: FeatureUnion,
    preproc: MaxAbsScaler,
    model: M,
}

impl<M: Predictor> FittedPipeline<M> {
    pub fn featurization(&self) -> &FeatureUnion {
        &self.featurization
    }

    pub fn preproc(&self) -> &MaxAbsScaler {
        &self.preproc
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Scaled feature matrix for `table`
    pub fn transform(&self, table: &Table) -> tabular_core::Result<FeatureMatrix> {
        let features = self.featurization.transform(table)?;
        self.preproc.transform(&features)
    }

    pub fn predict(&self, table: &Table) -> tabular_core::Result<Vec<f64>> {
        self.model.predict(&self.transform(table)?)
    }
}

impl FittedPipeline<GbdtModel> {
    pub fn to_canonical_json(&self) -> tabular_core::Result<String> {
        Ok(canonical_json_string(self)?)
    }

    pub fn hash_hex(&self) -> tabular_core::Result<String> {
        Ok(canonical_hash_hex(self)?)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> tabular_core::Result<Self> {
        let json = fs::read_to_string(path)?;
        let pipeline: Self = serde_json::from_str(&json)?;
        pipeline.model.validate()?;
        Ok(pipeline)
    }
}

/// Assemble the unfitted pipeline from configuration
pub fn build_model_pipeline(config: &TrainerConfig, ctx: &LogContext) -> Pipeline<GbdtTrainer> {
    ctx.info("Running build_model_pipeline");

    let mappers = config
        .featurization
        .groups
        .iter()
        .map(|group| ColumnMapper::new(group.name.clone(), group.columns.as_slice(), group.recipe))
        .collect();

    Pipeline::new(
        FeatureUnion::new(mappers),
        MaxAbsScaler::new(),
        GbdtTrainer::new(config.gbdt.clone()),
    )
}

/// Fit a freshly built pipeline on the training partition
pub fn train_model(
    config: &TrainerConfig,
    ctx: &LogContext,
    features: &Table,
    labels: &[f64],
    weights: Option<&[f64]>,
) -> tabular_core::Result<FittedPipeline<GbdtModel>> {
    ctx.info("Running train_model");

    let pipeline = build_model_pipeline(config, ctx);
    let fitted = pipeline.fit(features, labels, weights)?;

    tracing::info!(
        parent: ctx.span(),
        trees = fitted.model().num_trees(),
        features = fitted.model().feature_count(),
        "pipeline fitted"
    );
    Ok(fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabular_core::{Column, Recipe, Tokenizer, Value};

    fn table(n: usize) -> Table {
        let season = (0..n).map(|i| Value::Number((i % 4 + 1) as f64)).collect();
        let holiday = (0..n)
            .map(|i| if i % 9 == 0 { Value::Missing } else { Value::Number((i % 2) as f64) })
            .collect();
        let temp = (0..n).map(|i| Value::Number((i % 30) as f64 / 30.0)).collect();

        Table::from_columns(vec![
            Column::new("season", season),
            Column::new("holiday", holiday),
            Column::new("temp", temp),
        ])
        .expect("valid table")
    }

    fn pipeline() -> Pipeline {
        let union = FeatureUnion::new(vec![
            ColumnMapper::new(
                "mapper_0",
                &["season"],
                Recipe::BagOfWords {
                    tokenizer: Tokenizer::WholeValue,
                },
            ),
            ColumnMapper::new("mapper_1", &["holiday"], Recipe::Categorical { hashing_seed: 1 }),
            ColumnMapper::new("mapper_2", &["temp"], Recipe::MeanImpute),
        ]);
        let params = crate::trainer::GbdtParams {
            num_trees: 10,
            min_child_samples: 5,
            ..Default::default()
        };
        Pipeline::new(union, MaxAbsScaler::new(), GbdtTrainer::new(params))
    }

    #[test]
    fn test_fit_predict() -> tabular_core::Result<()> {
        let t = table(120);
        let labels: Vec<f64> = (0..120).map(|i| (i % 4) as f64 * 10.0 + (i % 30) as f64).collect();

        let fitted = pipeline().fit(&t, &labels, None)?;
        let predictions = fitted.predict(&t)?;

        assert_eq!(predictions.len(), 120);
        assert!(predictions.iter().all(|p| p.is_finite()));
        // 4 season indicators, 1 holiday code, 1 temperature
        assert_eq!(fitted.model().feature_count(), 6);
        Ok(())
    }

    #[test]
    fn test_missing_column_at_predict_time() -> tabular_core::Result<()> {
        let t = table(60);
        let labels: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let fitted = pipeline().fit(&t, &labels, None)?;

        let mut narrow = t.clone();
        narrow.drop_column("temp");
        assert!(fitted.predict(&narrow).is_err());
        Ok(())
    }

    #[test]
    fn test_json_roundtrip() -> tabular_core::Result<()> {
        let t = table(60);
        let labels: Vec<f64> = (0..60).map(|i| (i % 7) as f64).collect();
        let fitted = pipeline().fit(&t, &labels, None)?;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.json");
        fs::write(&path, fitted.to_canonical_json()?)?;

        let loaded = FittedPipeline::<GbdtModel>::load_json(&path)?;
        assert_eq!(loaded.predict(&t)?, fitted.predict(&t)?);
        assert_eq!(loaded.hash_hex()?, fitted.hash_hex()?);
        Ok(())
    }
}
