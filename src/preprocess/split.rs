//! Stratified train/test partitioning.
//!
//! Each class is shuffled independently with a seeded RNG and
//! `round(count * test_size)` of its rows go to the test side (at least one,
//! and at least one left for training). Both partitions therefore keep the
//! class proportions of the full dataset, up to rounding.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::TrainingSplit;
use crate::error::AppError;

pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<TrainingSplit, AppError> {
    if !(test_size.is_finite() && test_size > 0.0 && test_size < 1.0) {
        return Err(AppError::Config(format!("test size must be in (0, 1), got {test_size}")));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut idx: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == class)
            .map(|(i, _)| i)
            .collect();
        if idx.len() < 2 {
            return Err(AppError::Dataset(format!(
                "class {class} has {} row(s); stratified split needs at least 2 per class",
                idx.len()
            )));
        }

        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64 * test_size).round() as usize).clamp(1, idx.len() - 1);
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainingSplit { train, test })
}
