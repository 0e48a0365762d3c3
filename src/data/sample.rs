//! Synthetic patient cohort generation.
//!
//! Rows are drawn from two class-conditional profiles (healthy vs. diseased)
//! over the clinical catalog's 18 features, then clamped to each feature's
//! valid range and rounded to its step. The exact number of positives is
//! `round(n * positive_rate)`, shuffled into place, so the class balance is
//! reproducible for a given seed.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DEFAULT_TARGET_COLUMN, Dataset, FeatureCatalog, FeatureSchema, FeatureSpec};
use crate::error::AppError;

/// Smallest cohort that still leaves two rows per class after a split.
pub const MIN_COHORT_ROWS: usize = 10;

/// How one feature is drawn for one class.
#[derive(Debug, Clone, Copy)]
enum Draw {
    Normal(f64, f64),
    /// `|N(mean, sd)|`, for non-negative measurements concentrated near zero.
    HalfNormal(f64, f64),
    Bernoulli(f64),
    Categorical(&'static [f64]),
}

/// `(feature, healthy, diseased)` in catalog order.
const PROFILES: [(&str, Draw, Draw); 18] = [
    ("age", Draw::Normal(46.0, 9.0), Draw::Normal(63.0, 7.0)),
    ("sex", Draw::Bernoulli(0.45), Draw::Bernoulli(0.70)),
    ("cp", Draw::Categorical(&[0.55, 0.25, 0.15, 0.05]), Draw::Categorical(&[0.10, 0.20, 0.30, 0.40])),
    ("trestbps", Draw::Normal(122.0, 10.0), Draw::Normal(146.0, 14.0)),
    ("chol", Draw::Normal(205.0, 25.0), Draw::Normal(272.0, 32.0)),
    ("fbs", Draw::Bernoulli(0.10), Draw::Bernoulli(0.35)),
    ("restecg", Draw::Categorical(&[0.70, 0.25, 0.05]), Draw::Categorical(&[0.30, 0.40, 0.30])),
    ("thalach", Draw::Normal(158.0, 14.0), Draw::Normal(122.0, 16.0)),
    ("exang", Draw::Bernoulli(0.10), Draw::Bernoulli(0.60)),
    ("oldpeak", Draw::HalfNormal(0.5, 0.5), Draw::Normal(2.8, 1.1)),
    ("slope", Draw::Categorical(&[0.20, 0.60, 0.20]), Draw::Categorical(&[0.10, 0.30, 0.60])),
    ("ca", Draw::Categorical(&[0.70, 0.20, 0.07, 0.03, 0.0]), Draw::Categorical(&[0.20, 0.30, 0.25, 0.20, 0.05])),
    ("thal", Draw::Categorical(&[0.50, 0.30, 0.15, 0.05]), Draw::Categorical(&[0.10, 0.20, 0.40, 0.30])),
    ("chest_pain_type", Draw::Categorical(&[0.55, 0.25, 0.15, 0.05]), Draw::Categorical(&[0.10, 0.20, 0.30, 0.40])),
    ("blood_pressure", Draw::Normal(82.0, 5.0), Draw::Normal(96.0, 8.0)),
    ("cholesterol", Draw::Normal(200.0, 25.0), Draw::Normal(280.0, 30.0)),
    ("heart_rate", Draw::Normal(71.0, 6.0), Draw::Normal(86.0, 8.0)),
    ("st_depression", Draw::HalfNormal(0.4, 0.4), Draw::Normal(3.4, 1.5)),
];

/// Generate `n` labeled patients with roughly `positive_rate` diseased.
pub fn generate_cohort(n: usize, positive_rate: f64, seed: u64) -> Result<Dataset, AppError> {
    if n < MIN_COHORT_ROWS {
        return Err(AppError::Config(format!("cohort needs at least {MIN_COHORT_ROWS} rows, got {n}")));
    }
    if !(positive_rate.is_finite() && positive_rate > 0.0 && positive_rate < 1.0) {
        return Err(AppError::Config(format!("positive rate must be in (0, 1), got {positive_rate}")));
    }

    let catalog = FeatureCatalog::clinical();
    let specs: Vec<FeatureSpec> = PROFILES
        .iter()
        .map(|(name, _, _)| catalog.spec_for(name))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let n_pos = ((n as f64 * positive_rate).round() as usize).clamp(2, n - 2);
    let mut labels: Vec<u8> = (0..n).map(|i| u8::from(i < n_pos)).collect();
    labels.shuffle(&mut rng);

    let mut rows = Vec::with_capacity(n);
    for &label in &labels {
        let mut row = Vec::with_capacity(PROFILES.len());
        for ((_, healthy, diseased), spec) in PROFILES.iter().zip(&specs) {
            let draw = if label == 1 { diseased } else { healthy };
            let raw = sample_draw(*draw, &mut rng)?;
            row.push(conform(raw, spec));
        }
        rows.push(row);
    }

    let schema = FeatureSchema::new(
        specs.iter().map(|s| s.name.clone()).collect(),
        DEFAULT_TARGET_COLUMN,
    )?;
    Ok(Dataset { schema, rows, labels })
}

fn sample_draw(draw: Draw, rng: &mut StdRng) -> Result<f64, AppError> {
    let v = match draw {
        Draw::Normal(mean, sd) => normal(mean, sd)?.sample(rng),
        Draw::HalfNormal(mean, sd) => normal(mean, sd)?.sample(rng).abs(),
        Draw::Bernoulli(p) => f64::from(u8::from(rng.gen_bool(p))),
        Draw::Categorical(weights) => {
            let roll: f64 = rng.r#gen::<f64>() * weights.iter().sum::<f64>();
            let mut acc = 0.0;
            let mut chosen = weights.len() - 1;
            for (k, w) in weights.iter().enumerate() {
                acc += w;
                if roll < acc {
                    chosen = k;
                    break;
                }
            }
            chosen as f64
        }
    };
    Ok(v)
}

fn normal(mean: f64, sd: f64) -> Result<Normal<f64>, AppError> {
    Normal::new(mean, sd).map_err(|e| AppError::Config(format!("invalid cohort distribution: {e}")))
}

/// Clamp to the feature's valid range and round to its step.
fn conform(v: f64, spec: &FeatureSpec) -> f64 {
    let stepped = if spec.step > 0.0 {
        (v / spec.step).round() * spec.step
    } else {
        v
    };
    // Rounding to a 0.1 step leaves binary noise (e.g. 0.30000000000000004).
    let stepped = (stepped * 1e6).round() / 1e6;
    let lo = spec.min.unwrap_or(f64::NEG_INFINITY);
    let hi = spec.max.unwrap_or(f64::INFINITY);
    stepped.clamp(lo, hi)
}
