// Deterministic training/evaluation split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::corpus::{CorpusSplit, Sample};
use crate::error::PrepError;

/// Shuffle seed used when the configuration does not set one.
pub const DEFAULT_SEED: u64 = 0x5EED_0F_C0_2B_05;

pub fn validate_ratio(ratio: f64) -> crate::error::Result<()> {
    if ratio.is_finite() && ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(PrepError::config(format!(
            "partition ratio must be strictly between 0 and 1, got {ratio}"
        )))
    }
}

/// Number of training samples for `n` samples at `ratio`: `round(ratio * n)`
/// clamped to `[1, n - 1]`.
pub fn training_size(n: usize, ratio: f64) -> usize {
    let raw = (ratio * n as f64).round() as usize;
    raw.clamp(1, n.saturating_sub(1).max(1))
}

/// Shuffle `samples` with `seed` and split them at `ratio`.
pub fn partition(samples: Vec<Sample>, ratio: f64, seed: u64) -> crate::error::Result<CorpusSplit> {
    validate_ratio(ratio)?;
    let n = samples.len();
    if n < 2 {
        return Err(PrepError::config(format!(
            "partitioning needs at least two samples, got {n}"
        )));
    }

    let mut shuffled = samples;
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let evaluation = shuffled.split_off(training_size(n, ratio));
    info!(
        training = shuffled.len(),
        evaluation = evaluation.len(),
        ratio,
        "partitioned corpus"
    );
    Ok(CorpusSplit {
        training: shuffled,
        evaluation,
    })
}

/// Use an explicit evaluation set. The whole training corpus is used for
/// training, except samples that also appear in the evaluation set.
pub fn with_evaluation(
    training: Vec<Sample>,
    evaluation: Vec<Sample>,
) -> crate::error::Result<CorpusSplit> {
    if training.is_empty() {
        return Err(PrepError::input("training set is empty"));
    }
    if evaluation.is_empty() {
        return Err(PrepError::input("evaluation set is empty"));
    }
    let total = training.len();
    let training: Vec<Sample> = training
        .into_iter()
        .filter(|s| !evaluation.contains(s))
        .collect();
    let overlap = total - training.len();
    if overlap > 0 {
        warn!(
            overlap,
            "samples in both training and evaluation sets are used for evaluation only"
        );
    }
    if training.is_empty() {
        return Err(PrepError::input(
            "training set is empty after removing evaluation samples",
        ));
    }
    info!(
        training = training.len(),
        evaluation = evaluation.len(),
        "using explicit evaluation set"
    );
    Ok(CorpusSplit {
        training,
        evaluation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(format!("{i}.png"), format!("{i}.xml")))
            .collect()
    }

    #[test]
    fn test_training_size_clamps() {
        assert_eq!(training_size(10, 0.9), 9);
        assert_eq!(training_size(2, 0.99), 1);
        assert_eq!(training_size(2, 0.01), 1);
        assert_eq!(training_size(3, 0.5), 2);
    }

    #[test]
    fn test_invalid_ratio() {
        for ratio in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(partition(samples(10), ratio, DEFAULT_SEED).is_err(), "{ratio}");
        }
    }

    #[test]
    fn test_single_sample_is_config_error() {
        let err = partition(samples(1), 0.5, DEFAULT_SEED).unwrap_err();
        assert!(matches!(err, PrepError::ConfigError(_)));
    }

    #[test]
    fn test_evaluation_overlap_removed_from_training() {
        let all = samples(3);
        let split = with_evaluation(all.clone(), vec![all[1].clone()]).unwrap();
        assert_eq!(split.training, vec![all[0].clone(), all[2].clone()]);
        assert_eq!(split.evaluation, vec![all[1].clone()]);
    }

    #[test]
    fn test_disjoint_evaluation_keeps_whole_training_corpus() {
        let all = samples(5);
        let split = with_evaluation(all[..3].to_vec(), all[3..].to_vec()).unwrap();
        assert_eq!(split.training, all[..3].to_vec());
        assert_eq!(split.evaluation.len(), 2);
    }

    #[test]
    fn test_evaluation_covering_training_is_error() {
        let all = samples(2);
        assert!(with_evaluation(all.clone(), all).is_err());
    }
}
