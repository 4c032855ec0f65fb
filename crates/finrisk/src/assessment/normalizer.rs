use serde::{Deserialize, Serialize};

use super::domain::{NormalizedFeatures, RawInputs};

/// Ranges the scoring model was calibrated on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationBounds {
    pub income_min: f64,
    pub income_max: f64,
    pub age_min: f64,
    pub age_max: f64,
}

impl NormalizationBounds {
    pub const STANDARD: Self = Self {
        income_min: 20_000.0,
        income_max: 200_000.0,
        age_min: 18.0,
        age_max: 65.0,
    };
}

impl Default for NormalizationBounds {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Min-max scale income and age; engagement passes through.
///
/// No clamping: inputs outside the bounds map outside [0, 1].
pub fn normalize(inputs: &RawInputs, bounds: &NormalizationBounds) -> NormalizedFeatures {
    let income = (inputs.income - bounds.income_min) / (bounds.income_max - bounds.income_min);
    let age = (f64::from(inputs.age) - bounds.age_min) / (bounds.age_max - bounds.age_min);

    NormalizedFeatures::new([income as f32, age as f32, inputs.engagement as f32])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(income: f64, age: u32, engagement: f64) -> RawInputs {
        RawInputs {
            income,
            age,
            engagement,
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn scales_reference_applicant() {
        let features = normalize(&inputs(120_000.0, 35, 0.8), &NormalizationBounds::STANDARD);
        assert_close(features.income(), 0.5556);
        assert_close(features.age(), 0.3617);
        assert_close(features.engagement(), 0.8);
    }

    #[test]
    fn scales_low_income_applicant() {
        let features = normalize(&inputs(30_000.0, 22, 0.2), &NormalizationBounds::STANDARD);
        assert_close(features.income(), 0.0556);
        assert_close(features.age(), 0.0851);
        assert_close(features.engagement(), 0.2);
    }

    #[test]
    fn bounds_map_to_unit_interval_endpoints() {
        let low = normalize(&inputs(20_000.0, 18, 0.0), &NormalizationBounds::STANDARD);
        let high = normalize(&inputs(200_000.0, 65, 1.0), &NormalizationBounds::STANDARD);
        assert_eq!(low.values(), [0.0, 0.0, 0.0]);
        assert_eq!(high.values(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn in_range_income_stays_within_unit_interval() {
        for income in (20_000..=200_000).step_by(7_500) {
            let features = normalize(
                &inputs(f64::from(income), 40, 0.5),
                &NormalizationBounds::STANDARD,
            );
            assert!((0.0..=1.0).contains(&features.income()), "income {income}");
        }
    }

    #[test]
    fn out_of_range_inputs_are_not_clamped() {
        let features = normalize(&inputs(10_000.0, 70, 1.2), &NormalizationBounds::STANDARD);
        assert!(features.income() < 0.0);
        assert!(features.age() > 1.0);
        assert_close(features.engagement(), 1.2);

        let features = normalize(&inputs(380_000.0, 18, 0.5), &NormalizationBounds::STANDARD);
        assert_close(features.income(), 2.0);
    }
}
