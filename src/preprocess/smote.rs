//! Synthetic minority oversampling (SMOTE).
//!
//! For every synthetic row we pick a minority sample `x` uniformly at random,
//! one of its `k` nearest minority neighbours `n` (Euclidean, in the already
//! standardized space), and emit `x + u * (n - x)` with `u ~ U[0, 1)`.
//! Rows are generated until both classes have the same count.
//!
//! The original rows are returned first and unchanged; synthetic rows are
//! appended after them. Only the training partition may be passed here.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::domain::class_counts;
use crate::error::AppError;
use crate::math::squared_distance;

/// Default neighbour count.
pub const DEFAULT_SMOTE_K: usize = 5;

/// Balance the two classes by appending interpolated minority rows.
pub fn smote_resample(
    rows: &[Vec<f64>],
    labels: &[u8],
    k: usize,
    seed: u64,
) -> Result<(Vec<Vec<f64>>, Vec<u8>), AppError> {
    if rows.len() != labels.len() {
        return Err(AppError::Training(format!(
            "{} rows but {} labels passed to resampling",
            rows.len(),
            labels.len()
        )));
    }
    if k == 0 {
        return Err(AppError::Config("SMOTE neighbour count must be > 0".to_string()));
    }

    let counts = class_counts(labels);
    let (minority_class, majority_count) = if counts[1] < counts[0] {
        (1u8, counts[0])
    } else {
        (0u8, counts[1])
    };
    let minority: Vec<&[f64]> = rows
        .iter()
        .zip(labels)
        .filter(|(_, l)| **l == minority_class)
        .map(|(r, _)| r.as_slice())
        .collect();

    let mut out_rows = rows.to_vec();
    let mut out_labels = labels.to_vec();
    let needed = majority_count - minority.len();
    if needed == 0 {
        return Ok((out_rows, out_labels));
    }
    if minority.is_empty() {
        return Err(AppError::Dataset(format!(
            "class {minority_class} has no training rows; cannot oversample"
        )));
    }

    let neighbours = nearest_neighbours(&minority, k);
    let mut rng = StdRng::seed_from_u64(seed);
    out_rows.reserve(needed);
    out_labels.reserve(needed);

    for _ in 0..needed {
        let i = rng.gen_range(0..minority.len());
        let base = minority[i];
        let synthetic = match neighbours[i].as_slice() {
            // A lone minority sample has no neighbour to interpolate towards.
            [] => base.to_vec(),
            nn => {
                let other = minority[nn[rng.gen_range(0..nn.len())]];
                let u: f64 = rng.r#gen();
                base.iter().zip(other).map(|(a, b)| a + u * (b - a)).collect()
            }
        };
        out_rows.push(synthetic);
        out_labels.push(minority_class);
    }

    Ok((out_rows, out_labels))
}

/// Indices of the `k` nearest other points for every point (ties by index).
fn nearest_neighbours(points: &[&[f64]], k: usize) -> Vec<Vec<usize>> {
    let k = k.min(points.len().saturating_sub(1));
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut dists: Vec<(f64, usize)> = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, q)| (squared_distance(p, q), j))
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.push(vec![i as f64 * 0.1, 0.0]);
            labels.push(0);
        }
        for i in 0..6 {
            rows.push(vec![5.0 + i as f64, 3.0 + i as f64 * 0.5]);
            labels.push(1);
        }
        (rows, labels)
    }

    #[test]
    fn balances_classes_and_keeps_originals() {
        let (rows, labels) = imbalanced();
        let (out_rows, out_labels) = smote_resample(&rows, &labels, DEFAULT_SMOTE_K, 42).unwrap();

        assert_eq!(class_counts(&out_labels), [20, 20]);
        assert_eq!(&out_rows[..rows.len()], rows.as_slice());
        assert_eq!(&out_labels[..labels.len()], labels.as_slice());
    }

    #[test]
    fn synthetic_rows_lie_within_minority_hull() {
        let (rows, labels) = imbalanced();
        let (out_rows, _) = smote_resample(&rows, &labels, 3, 9).unwrap();
        for r in &out_rows[rows.len()..] {
            assert!(r[0] >= 5.0 && r[0] <= 10.0, "x out of range: {}", r[0]);
            assert!(r[1] >= 3.0 && r[1] <= 5.5, "y out of range: {}", r[1]);
        }
    }

    #[test]
    fn balanced_input_is_returned_unchanged() {
        let rows = vec![vec![0.0], vec![1.0]];
        let labels = vec![0, 1];
        let (out_rows, out_labels) = smote_resample(&rows, &labels, 5, 1).unwrap();
        assert_eq!(out_rows, rows);
        assert_eq!(out_labels, labels);
    }

    #[test]
    fn single_minority_sample_is_duplicated() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![9.0]];
        let labels = vec![0, 0, 0, 1];
        let (out_rows, out_labels) = smote_resample(&rows, &labels, 5, 1).unwrap();
        assert_eq!(class_counts(&out_labels), [3, 3]);
        assert!(out_rows[4..].iter().all(|r| r == &vec![9.0]));
    }

    #[test]
    fn resampling_is_deterministic() {
        let (rows, labels) = imbalanced();
        let a = smote_resample(&rows, &labels, 5, 3).unwrap();
        let b = smote_resample(&rows, &labels, 5, 3).unwrap();
        assert_eq!(a, b);
    }
}
