//! Seeded train/validation split
//!
//! The validation partition takes `ceil(ratio * n)` rows. Stratified splits
//! allocate that budget across label classes by largest remainder, keeping at
//! least one row of every class on each side.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use tabular_core::DataError;

use crate::prepare::PreparedData;

pub type Partition = PreparedData;

/// Number of validation rows for `n` rows at `ratio`
pub fn validation_size(n: usize, ratio: f64) -> Result<usize, DataError> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(DataError::InvalidSplitRatio(ratio));
    }

    let n_valid = (ratio * n as f64).ceil() as usize;
    if n_valid == 0 || n_valid >= n {
        return Err(DataError::InsufficientRows { rows: n, ratio });
    }
    Ok(n_valid)
}

/// Split into `(train, validation)`
pub fn split_dataset(
    data: &PreparedData,
    ratio: f64,
    stratify: bool,
    seed: u64,
) -> Result<(Partition, Partition), DataError> {
    let n = data.len();
    let n_valid = validation_size(n, ratio)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let (train, valid) = if stratify {
        stratified_positions(&data.labels, n_valid, &mut rng)?
    } else {
        let mut positions: Vec<usize> = (0..n).collect();
        positions.shuffle(&mut rng);
        let train = positions.split_off(n_valid);
        (train, positions)
    };

    tracing::debug!(
        train = train.len(),
        validation = valid.len(),
        stratify,
        "split dataset"
    );

    Ok((data.subset(&train), data.subset(&valid)))
}

/// Positions grouped by label value, classes in ascending label order
fn classes(labels: &[f64]) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| labels[a].total_cmp(&labels[b]).then(a.cmp(&b)));

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for position in order {
        match groups.last_mut() {
            Some(group) if labels[group[0]] == labels[position] => group.push(position),
            _ => groups.push(vec![position]),
        }
    }
    groups
}

/// Validation rows per class, summing to `n_valid`
fn allocate_quotas(counts: &[usize], n_valid: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| n_valid as f64 * c as f64 / n as f64)
        .collect();

    let mut quotas: Vec<usize> = exact
        .iter()
        .zip(counts)
        .map(|(e, &c)| (e.floor() as usize).clamp(1, c - 1))
        .collect();
    let remainder = |i: usize, quotas: &[usize]| exact[i] - quotas[i] as f64;

    let mut total: usize = quotas.iter().sum();
    while total < n_valid {
        let Some(i) = (0..counts.len())
            .filter(|&i| quotas[i] < counts[i] - 1)
            .max_by(|&a, &b| {
                remainder(a, &quotas)
                    .total_cmp(&remainder(b, &quotas))
                    .then(b.cmp(&a))
            })
        else {
            break;
        };
        quotas[i] += 1;
        total += 1;
    }
    while total > n_valid {
        let Some(i) = (0..counts.len())
            .filter(|&i| quotas[i] > 1)
            .min_by(|&a, &b| {
                remainder(a, &quotas)
                    .total_cmp(&remainder(b, &quotas))
                    .then(a.cmp(&b))
            })
        else {
            break;
        };
        quotas[i] -= 1;
        total -= 1;
    }

    quotas
}

fn stratified_positions(
    labels: &[f64],
    n_valid: usize,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>), DataError> {
    let groups = classes(labels);
    let n_train = labels.len() - n_valid;

    if let Some(group) = groups.iter().find(|g| g.len() < 2) {
        return Err(DataError::StratificationInfeasible(format!(
            "label {} has a single row",
            labels[group[0]]
        )));
    }
    if n_valid < groups.len() || n_train < groups.len() {
        return Err(DataError::StratificationInfeasible(format!(
            "{} classes do not fit in {} train / {} validation rows",
            groups.len(),
            n_train,
            n_valid
        )));
    }

    let counts: Vec<usize> = groups.iter().map(Vec::len).collect();
    let quotas = allocate_quotas(&counts, n_valid);

    let mut train = Vec::with_capacity(n_train);
    let mut valid = Vec::with_capacity(n_valid);
    for (mut group, quota) in groups.into_iter().zip(quotas) {
        group.shuffle(rng);
        let rest = group.split_off(quota);
        valid.extend(group);
        train.extend(rest);
    }

    train.shuffle(rng);
    valid.shuffle(rng);
    Ok((train, valid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use tabular_core::{Column, Table, Value};

    fn prepared(labels: Vec<f64>) -> PreparedData {
        let n = labels.len();
        let features = Table::from_columns(vec![Column::new(
            "temp",
            (0..n).map(|i| Value::Number(i as f64)).collect(),
        )])
        .expect("valid table");

        PreparedData {
            features,
            labels,
            weights: None,
            row_ids: (0..n).map(|i| i * 2).collect(),
        }
    }

    #[test]
    fn test_split_sizes() -> Result<(), DataError> {
        let data = prepared((0..1000).map(|i| i as f64).collect());
        let (train, valid) = split_dataset(&data, 0.25, false, 42)?;

        assert_eq!(train.len(), 750);
        assert_eq!(valid.len(), 250);
        assert_eq!(train.features.n_rows(), 750);
        Ok(())
    }

    #[test]
    fn test_ratio_rounds_validation_up() -> Result<(), DataError> {
        assert_eq!(validation_size(10, 0.25)?, 3);
        assert!(validation_size(1, 0.5).is_err());
        assert!(validation_size(10, 0.0).is_err());
        assert!(validation_size(10, 1.5).is_err());
        Ok(())
    }

    #[test]
    fn test_same_seed_same_split() -> Result<(), DataError> {
        let data = prepared((0..200).map(|i| (i % 7) as f64).collect());
        let (a_train, a_valid) = split_dataset(&data, 0.3, false, 42)?;
        let (b_train, b_valid) = split_dataset(&data, 0.3, false, 42)?;
        let (c_train, _) = split_dataset(&data, 0.3, false, 7)?;

        assert_eq!(a_train.row_ids, b_train.row_ids);
        assert_eq!(a_valid.row_ids, b_valid.row_ids);
        assert_ne!(a_train.row_ids, c_train.row_ids);
        Ok(())
    }

    #[test]
    fn test_stratified_keeps_proportions() -> Result<(), DataError> {
        // 60 / 30 / 10 split of classes
        let labels: Vec<f64> = (0..100)
            .map(|i| match i % 10 {
                0..=5 => 0.0,
                6..=8 => 1.0,
                _ => 2.0,
            })
            .collect();
        let data = prepared(labels);
        let (train, valid) = split_dataset(&data, 0.2, true, 42)?;

        let count = |p: &Partition, class: f64| p.labels.iter().filter(|&&y| y == class).count();
        assert_eq!(valid.len(), 20);
        assert_eq!(count(&valid, 0.0), 12);
        assert_eq!(count(&valid, 1.0), 6);
        assert_eq!(count(&valid, 2.0), 2);
        assert_eq!(count(&train, 2.0), 8);
        Ok(())
    }

    #[test]
    fn test_stratified_rejects_singleton_class() {
        let data = prepared(vec![0.0, 0.0, 0.0, 1.0, 1.0, 2.0]);
        assert!(matches!(
            split_dataset(&data, 0.5, true, 42),
            Err(DataError::StratificationInfeasible(_))
        ));
    }

    #[test]
    fn test_stratified_rejects_too_many_classes() {
        let data = prepared(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert!(matches!(
            split_dataset(&data, 0.25, true, 42),
            Err(DataError::StratificationInfeasible(_))
        ));
    }

    #[test]
    fn test_quota_allocation() {
        assert_eq!(allocate_quotas(&[5, 5], 3), vec![2, 1]);
        assert_eq!(allocate_quotas(&[2, 2, 2], 3), vec![1, 1, 1]);
        assert_eq!(allocate_quotas(&[98, 2], 10).iter().sum::<usize>(), 10);
    }

    proptest! {
        #[test]
        fn split_partitions_cover_rows(n in 2usize..300, ratio in 0.05f64..0.95, seed in any::<u64>()) {
            let data = prepared((0..n).map(|i| i as f64).collect());
            if let Ok((train, valid)) = split_dataset(&data, ratio, false, seed) {
                prop_assert_eq!(train.len() + valid.len(), n);
                prop_assert_eq!(valid.len(), (ratio * n as f64).ceil() as usize);

                let train_ids: BTreeSet<usize> = train.row_ids.iter().copied().collect();
                let valid_ids: BTreeSet<usize> = valid.row_ids.iter().copied().collect();
                prop_assert!(train_ids.is_disjoint(&valid_ids));

                let all: BTreeSet<usize> = train_ids.union(&valid_ids).copied().collect();
                prop_assert_eq!(all, data.row_ids.iter().copied().collect::<BTreeSet<usize>>());
            }
        }
    }
}
