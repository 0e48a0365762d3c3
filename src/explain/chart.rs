//! ASCII bar chart for explanations.
//!
//! Deterministic fixed-width output: one line per feature, largest
//! magnitude first. `+` bars raise the predicted risk, `-` bars lower it.

use crate::explain::Explanation;

/// Render `explanation` with bars at most `width` characters long.
pub fn render_bar_chart(explanation: &Explanation, width: usize) -> String {
    let width = width.max(10);
    let ranked = explanation.ranked();
    let label_width = ranked.iter().map(|c| c.feature.len()).max().unwrap_or(0);
    let max_abs = ranked.first().map(|c| c.contribution.abs()).unwrap_or(0.0);

    let mut out = String::new();
    out.push_str(&format!(
        "Prediction: p={:.4} | baseline p={:.4}\n",
        explanation.prediction, explanation.base_value
    ));

    for c in ranked {
        let len = if max_abs > 0.0 {
            ((c.contribution.abs() / max_abs) * width as f64).round() as usize
        } else {
            0
        };
        let ch = if c.contribution < 0.0 { '-' } else { '+' };
        let bar: String = std::iter::repeat_n(ch, len).collect();
        out.push_str(&format!(
            "{:<label_width$} | {:<width$} | {:+.4}\n",
            c.feature, bar, c.contribution
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::explain::FeatureContribution;

    fn contribution(feature: &str, contribution: f64) -> FeatureContribution {
        FeatureContribution {
            feature: feature.to_string(),
            contribution,
        }
    }

    #[test]
    fn renders_sorted_scaled_bars() {
        let e = Explanation {
            prediction: 0.8,
            base_value: 0.3,
            contributions: vec![
                contribution("age", 0.1),
                contribution("cholesterol", -0.2),
                contribution("sex", 0.0),
            ],
        };
        let chart = render_bar_chart(&e, 10);
        let expected = "\
Prediction: p=0.8000 | baseline p=0.3000
cholesterol | ---------- | -0.2000
age         | +++++      | +0.1000
sex         |            | +0.0000
";
        assert_eq!(chart, expected);
    }
}
