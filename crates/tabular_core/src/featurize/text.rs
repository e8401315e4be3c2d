//! String casting and binary bag-of-words vectorization

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{LibraryError, Result};
use crate::stage::{ValueEncoder, ValueTransform};
use crate::table::Value;

/// Words of two or more word characters, as in the default text analyzer.
static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?u)\b\w\w+\b").expect("static word pattern is valid")
});

/// Casts every cell to text; missing cells become `"nan"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringCast {}

impl ValueTransform for StringCast {
    fn fit(&mut self, _values: &[Value]) -> Result<()> {
        Ok(())
    }

    fn transform(&self, values: &[Value]) -> Result<Vec<Value>> {
        Ok(values.iter().map(|v| Value::Text(v.to_string())).collect())
    }
}

/// How a cell is split into tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tokenizer {
    /// The whole (lowercased) cell is a single token
    #[default]
    WholeValue,
    /// Runs of two or more word characters
    Words,
}

impl Tokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        match self {
            Tokenizer::WholeValue => vec![lowered],
            Tokenizer::Words => WORD_PATTERN
                .find_iter(&lowered)
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }
}

/// Binary bag-of-words: one 0/1 feature per vocabulary token.
///
/// The vocabulary is learnt in `fit` and kept sorted; tokens unseen
/// during fit are ignored at transform time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagOfWords {
    pub tokenizer: Tokenizer,
    vocabulary: Option<Vec<String>>,
}

impl BagOfWords {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            vocabulary: None,
        }
    }

    pub fn vocabulary(&self) -> Option<&[String]> {
        self.vocabulary.as_deref()
    }

    fn fitted_vocabulary(&self) -> Result<&[String]> {
        self.vocabulary
            .as_deref()
            .ok_or_else(|| LibraryError::Featurization("bag-of-words used before fit".into()))
    }
}

impl ValueEncoder for BagOfWords {
    fn fit(&mut self, values: &[Value]) -> Result<()> {
        let vocabulary: BTreeSet<String> = values
            .iter()
            .flat_map(|v| self.tokenizer.tokens(&v.to_string()))
            .collect();

        if vocabulary.is_empty() {
            return Err(LibraryError::Featurization(
                "empty vocabulary; cells contain no tokens".into(),
            ));
        }

        self.vocabulary = Some(vocabulary.into_iter().collect());
        Ok(())
    }

    fn encode(&self, values: &[Value]) -> Result<Vec<Vec<f64>>> {
        let vocabulary = self.fitted_vocabulary()?;
        let mut columns = vec![vec![0.0; values.len()]; vocabulary.len()];

        for (row, value) in values.iter().enumerate() {
            for token in self.tokenizer.tokens(&value.to_string()) {
                if let Ok(idx) = vocabulary.binary_search(&token) {
                    columns[idx][row] = 1.0;
                }
            }
        }

        Ok(columns)
    }

    fn output_names(&self, column: &str) -> Result<Vec<String>> {
        Ok(self
            .fitted_vocabulary()?
            .iter()
            .map(|token| format!("{}_{}", column, token))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::parse(v)).collect()
    }

    #[test]
    fn test_string_cast() -> Result<()> {
        let cast = StringCast::default();
        let out = cast.transform(&[Value::Number(3.0), Value::Missing])?;
        assert_eq!(out, vec![Value::Text("3".into()), Value::Text("nan".into())]);
        Ok(())
    }

    #[test]
    fn test_whole_value_vocabulary_is_one_hot() -> Result<()> {
        let mut bow = BagOfWords::new(Tokenizer::WholeValue);
        let values = text(&["2", "10", "2", "Summer"]);
        bow.fit(&values)?;

        assert_eq!(
            bow.vocabulary(),
            Some(&["10".to_string(), "2".to_string(), "summer".to_string()][..])
        );

        let columns = bow.encode(&text(&["2", "winter"]))?;
        assert_eq!(columns, vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 0.0]]);
        assert_eq!(bow.output_names("season")?[2], "season_summer");
        Ok(())
    }

    #[test]
    fn test_word_tokenizer() -> Result<()> {
        let mut bow = BagOfWords::new(Tokenizer::Words);
        bow.fit(&text(&["light rain", "heavy rain a"]))?;
        assert_eq!(
            bow.vocabulary(),
            Some(&["heavy".to_string(), "light".to_string(), "rain".to_string()][..])
        );
        Ok(())
    }

    #[test]
    fn test_encode_before_fit_fails() {
        let bow = BagOfWords::new(Tokenizer::WholeValue);
        assert!(bow.encode(&text(&["x"])).is_err());
    }
}
