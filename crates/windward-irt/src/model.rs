use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::PROB_FLOOR;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("discrimination must be positive, got {0}")]
    NonPositiveDiscrimination(f64),
    #[error("guessing must lie in [0, 1), got {0}")]
    GuessingOutOfRange(f64),
}

/// Which logistic model to evaluate items under. 1PL fixes a=1 and c=0,
/// 2PL fixes c=0, 3PL uses the calibrated parameters as-is.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum IrtModel {
    #[serde(rename = "1PL")]
    #[strum(serialize = "1PL")]
    OnePl,
    #[default]
    #[serde(rename = "2PL")]
    #[strum(serialize = "2PL")]
    TwoPl,
    #[serde(rename = "3PL")]
    #[strum(serialize = "3PL")]
    ThreePl,
}

/// Calibrated item parameters: discrimination `a`, difficulty `b`,
/// guessing `c`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemParams {
    pub discrimination: f64,
    pub difficulty: f64,
    pub guessing: f64,
}

impl ItemParams {
    pub fn new(discrimination: f64, difficulty: f64, guessing: f64) -> Result<Self, ParamError> {
        if discrimination <= 0.0 {
            return Err(ParamError::NonPositiveDiscrimination(discrimination));
        }
        if !(0.0..1.0).contains(&guessing) {
            return Err(ParamError::GuessingOutOfRange(guessing));
        }
        Ok(Self {
            discrimination,
            difficulty,
            guessing,
        })
    }

    /// Parameters as seen by the given model.
    #[must_use]
    pub fn under(&self, model: IrtModel) -> Self {
        match model {
            IrtModel::OnePl => Self {
                discrimination: 1.0,
                difficulty: self.difficulty,
                guessing: 0.0,
            },
            IrtModel::TwoPl => Self {
                guessing: 0.0,
                ..*self
            },
            IrtModel::ThreePl => *self,
        }
    }

    /// P(correct | theta) under the 3PL:
    /// `c + (1 - c) / (1 + exp(-a(theta - b)))`, clamped away from 0 and 1.
    #[must_use]
    pub fn probability(&self, theta: f64, model: IrtModel) -> f64 {
        let p = self.under(model);
        let z = p.discrimination * (theta - p.difficulty);
        let base = stable_logistic(z);
        (p.guessing + (1.0 - p.guessing) * base).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR)
    }

    /// Fisher information at theta:
    /// `a^2 * ((1 - P) / P) * ((P - c) / (1 - c))^2`.
    #[must_use]
    pub fn information(&self, theta: f64, model: IrtModel) -> f64 {
        let p = self.under(model);
        let prob = self.probability(theta, model);
        let ratio = (prob - p.guessing) / (1.0 - p.guessing);
        let info = p.discrimination * p.discrimination * ((1.0 - prob) / prob) * ratio * ratio;
        info.max(0.0)
    }
}

/// Overflow-safe logistic. The exponent is bounded before exponentiation
/// and the branch keeps the argument of `exp` non-positive.
fn stable_logistic(z: f64) -> f64 {
    let z = z.clamp(-30.0, 30.0);
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rasch(b: f64) -> ItemParams {
        ItemParams::new(1.0, b, 0.0).unwrap()
    }

    #[test]
    fn probability_is_half_at_difficulty() {
        let item = rasch(0.7);
        assert!((item.probability(0.7, IrtModel::TwoPl) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn probability_monotone_in_theta() {
        let item = ItemParams::new(1.4, 0.0, 0.2).unwrap();
        let mut last = 0.0;
        for i in -40..=40 {
            let p = item.probability(f64::from(i) * 0.1, IrtModel::ThreePl);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn guessing_floors_probability() {
        let item = ItemParams::new(1.0, 0.0, 0.25).unwrap();
        assert!(item.probability(-10.0, IrtModel::ThreePl) >= 0.25 - 1e-6);
    }

    #[test]
    fn two_pl_information_peaks_at_difficulty() {
        let item = ItemParams::new(1.3, 0.5, 0.0).unwrap();
        let at_b = item.information(0.5, IrtModel::TwoPl);
        assert!(at_b > item.information(-0.5, IrtModel::TwoPl));
        assert!(at_b > item.information(1.5, IrtModel::TwoPl));
        // For c = 0 the formula reduces to a^2 * P * (1 - P).
        assert!((at_b - 1.3 * 1.3 * 0.25).abs() < 1e-9);
    }

    #[test]
    fn one_pl_matches_two_pl_with_unit_discrimination() {
        let item = rasch(-0.3);
        for i in -8..=8 {
            let theta = f64::from(i) * 0.5;
            let one = item.probability(theta, IrtModel::OnePl);
            let two = item.probability(theta, IrtModel::TwoPl);
            assert!((one - two).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            ItemParams::new(0.0, 0.0, 0.0),
            Err(ParamError::NonPositiveDiscrimination(0.0))
        );
        assert_eq!(ItemParams::new(1.0, 0.0, 1.0), Err(ParamError::GuessingOutOfRange(1.0)));
    }

    #[test]
    fn extreme_theta_does_not_overflow() {
        let item = ItemParams::new(2.5, -3.0, 0.1).unwrap();
        let p = item.probability(1e6, IrtModel::ThreePl);
        assert!(p < 1.0);
        let p = item.probability(-1e6, IrtModel::ThreePl);
        assert!(p > 0.0);
    }
}
