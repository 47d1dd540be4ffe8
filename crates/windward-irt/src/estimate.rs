use crate::model::{IrtModel, ItemParams};
use crate::{PROB_FLOOR, THETA_MAX, THETA_MIN};

/// Default number of quadrature points across [THETA_MIN, THETA_MAX].
pub const DEFAULT_QUADRATURE_SIZE: usize = 41;

/// One scored response for estimation. `score` is 1.0 for a correct answer,
/// 0.0 for an incorrect one; partial credit in between is accepted.
#[derive(Debug, Clone, Copy)]
pub struct ScoredResponse {
    pub params: ItemParams,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityEstimate {
    pub theta: f64,
    pub standard_error: f64,
}

/// Fixed quadrature grid with a standard normal prior, used for Expected A
/// Posteriori estimation. The grid is precomputed once per configuration so
/// estimates are reproducible bit-for-bit.
#[derive(Debug, Clone)]
pub struct QuadratureGrid {
    points: Vec<f64>,
    prior: Vec<f64>,
}

impl Default for QuadratureGrid {
    fn default() -> Self {
        Self::new(DEFAULT_QUADRATURE_SIZE)
    }
}

impl QuadratureGrid {
    pub fn new(size: usize) -> Self {
        let size = size.max(3);
        let step = (THETA_MAX - THETA_MIN) / (size - 1) as f64;
        let points: Vec<f64> = (0..size).map(|i| THETA_MIN + step * i as f64).collect();
        let prior = points.iter().map(|&theta| normal_density(theta)).collect();
        Self { points, prior }
    }

    /// EAP estimate of theta and its posterior standard deviation.
    ///
    /// The likelihood is accumulated in log space and rescaled by its
    /// maximum before exponentiation, so long response strings do not
    /// underflow. With no responses the posterior is the prior.
    #[must_use]
    pub fn eap(&self, model: IrtModel, responses: &[ScoredResponse]) -> AbilityEstimate {
        let mut log_likelihood: Vec<f64> = vec![0.0; self.points.len()];
        for response in responses {
            let score = response.score.clamp(0.0, 1.0);
            for (ll, &theta) in log_likelihood.iter_mut().zip(&self.points) {
                let p = response
                    .params
                    .probability(theta, model)
                    .clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
                *ll += score * p.ln() + (1.0 - score) * (1.0 - p).ln();
            }
        }

        let max_ll = log_likelihood.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut total = 0.0;
        let mut mean_acc = 0.0;
        for ((&theta, &prior), &ll) in self.points.iter().zip(&self.prior).zip(&log_likelihood) {
            let weight = prior * (ll - max_ll).exp();
            total += weight;
            mean_acc += theta * weight;
        }
        let theta = (mean_acc / total).clamp(THETA_MIN, THETA_MAX);

        let mut var_acc = 0.0;
        for ((&point, &prior), &ll) in self.points.iter().zip(&self.prior).zip(&log_likelihood) {
            let weight = prior * (ll - max_ll).exp();
            var_acc += (point - theta) * (point - theta) * weight;
        }
        let standard_error = (var_acc / total).sqrt();

        AbilityEstimate { theta, standard_error }
    }

    /// Standard deviation of the prior restricted to the grid; reported as
    /// the standard error of an unanswered session.
    #[must_use]
    pub fn prior_standard_deviation(&self) -> f64 {
        self.eap(IrtModel::TwoPl, &[]).standard_error
    }
}

fn normal_density(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(a: f64, b: f64) -> ItemParams {
        ItemParams::new(a, b, 0.0).unwrap()
    }

    fn correct(a: f64, b: f64) -> ScoredResponse {
        ScoredResponse {
            params: item(a, b),
            score: 1.0,
        }
    }

    fn incorrect(a: f64, b: f64) -> ScoredResponse {
        ScoredResponse {
            params: item(a, b),
            score: 0.0,
        }
    }

    #[test]
    fn empty_responses_give_prior() {
        let grid = QuadratureGrid::default();
        let estimate = grid.eap(IrtModel::TwoPl, &[]);
        assert!(estimate.theta.abs() < 1e-9);
        assert!((estimate.standard_error - 1.0).abs() < 0.01);
    }

    #[test]
    fn single_correct_response_pulls_theta_up() {
        let grid = QuadratureGrid::default();
        let estimate = grid.eap(IrtModel::TwoPl, &[correct(1.0, 0.0)]);
        assert!(estimate.theta > 0.35 && estimate.theta < 0.55, "theta = {}", estimate.theta);
        assert!(
            estimate.standard_error > 0.85 && estimate.standard_error < 0.97,
            "se = {}",
            estimate.standard_error
        );
    }

    #[test]
    fn symmetric_responses_cancel() {
        let grid = QuadratureGrid::default();
        let estimate = grid.eap(IrtModel::TwoPl, &[correct(1.0, 0.0), incorrect(1.0, 0.0)]);
        assert!(estimate.theta.abs() < 1e-9);
    }

    #[test]
    fn estimation_is_deterministic() {
        let grid = QuadratureGrid::default();
        let responses = vec![correct(1.2, -0.5), incorrect(0.8, 0.3), correct(1.5, 1.0)];
        let first = grid.eap(IrtModel::TwoPl, &responses);
        let second = grid.eap(IrtModel::TwoPl, &responses);
        assert_eq!(first, second);
    }

    #[test]
    fn rasch_reduction_matches_one_pl() {
        // With c = 0 and a = 1 the 2PL and 3PL collapse onto the Rasch model.
        let grid = QuadratureGrid::default();
        let responses = vec![correct(1.0, -1.0), correct(1.0, 0.0), incorrect(1.0, 1.0)];
        let rasch = grid.eap(IrtModel::OnePl, &responses);
        let two = grid.eap(IrtModel::TwoPl, &responses);
        let three = grid.eap(IrtModel::ThreePl, &responses);
        assert!((rasch.theta - two.theta).abs() < 1e-4);
        assert!((rasch.theta - three.theta).abs() < 1e-4);
        assert!((rasch.standard_error - two.standard_error).abs() < 1e-4);
    }

    #[test]
    fn standard_error_shrinks_with_evidence() {
        let grid = QuadratureGrid::default();
        let mut responses = Vec::new();
        let mut last_se = grid.prior_standard_deviation();
        for i in 0..10 {
            let b = if i % 2 == 0 { -0.2 } else { 0.2 };
            responses.push(if i % 2 == 0 { correct(2.0, b) } else { incorrect(2.0, b) });
            let estimate = grid.eap(IrtModel::TwoPl, &responses);
            assert!(estimate.standard_error < last_se + 1e-9);
            last_se = estimate.standard_error;
        }
        assert!(last_se < 0.45);
    }

    #[test]
    fn many_correct_answers_clamp_at_theta_max() {
        let grid = QuadratureGrid::default();
        let responses: Vec<_> = (0..50).map(|_| correct(2.5, 3.5)).collect();
        let estimate = grid.eap(IrtModel::TwoPl, &responses);
        assert!(estimate.theta <= THETA_MAX);
        assert!(estimate.theta > 2.0);
    }

    #[test]
    fn precision_reaches_stopping_threshold_within_fifteen_answers() {
        // Five correct then alternating on well-targeted discriminating
        // items; the posterior must reach SE <= 0.3 within 15 answers.
        let grid = QuadratureGrid::default();
        let mut responses: Vec<ScoredResponse> = Vec::new();
        let mut estimate = grid.eap(IrtModel::TwoPl, &responses);
        for i in 0..15 {
            let score = if i < 5 { 1.0 } else { f64::from(u8::from(i % 2 == 1)) };
            responses.push(ScoredResponse {
                params: item(2.0, estimate.theta),
                score,
            });
            estimate = grid.eap(IrtModel::TwoPl, &responses);
            if estimate.standard_error <= 0.3 {
                return;
            }
        }
        panic!("standard error stayed above 0.3: {}", estimate.standard_error);
    }
}
