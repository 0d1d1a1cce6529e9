//! Heatmap strategy: each joint is placed at the maximum of Gaussian
//! priors multiplied by evidence. One argmax per joint, no iteration.

use ndarray as nd;
use rand::RngCore;

use crate::config::Config;
use crate::feature::TrackerState;
use crate::field::{self, ScalarField};
use crate::maps::PerceptualMaps;
use crate::my_types::*;
use crate::optimizer::PoseStrategy;
use crate::skeleton;

/// `exp(-|p - center|^2 / (2 sigma^2))` with `center = reference + expected_offset`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianPrior {
    pub center: Vector2d,
    pub sigma: f64,
}

impl GaussianPrior {
    pub fn around(reference: Vector2d, expected_offset: Vector2d, sigma: f64) -> Self {
        GaussianPrior {
            center: reference + expected_offset,
            sigma,
        }
    }

    pub fn value(&self, p: Vector2d) -> f64 {
        field::gaussian((p - self.center).norm(), 0., self.sigma)
    }
}

/// Product of the priors over a `shape` grid
pub fn likelihood_field(shape: ImageShape, priors: &[GaussianPrior]) -> ScalarField {
    nd::Array2::from_shape_fn((shape.1, shape.0), |(y, x)| {
        let p = Vector2d::new(x as f64, y as f64);
        priors.iter().map(|prior| prior.value(p)).product::<f64>() as f32
    })
}

/// Maximum of priors times evidence. `None` when nothing is positive, the
/// caller then keeps its previous point.
pub fn locate(shape: ImageShape, evidence: &[&ScalarField], priors: &[GaussianPrior]) -> Option<Vector2d> {
    let mut combined = likelihood_field(shape, priors);
    for e in evidence {
        combined = field::product(&combined, e);
    }
    let (x, y) = field::argmax(&combined)?;
    if combined[(y, x)] > 0. {
        Some(Vector2d::new(x as f64, y as f64))
    } else {
        None
    }
}

/// Elbows from a spatial prior around the previous elbow and an anatomical
/// prior halfway between shoulder and hand, weighted by foreground evidence
pub struct HeatmapSearch {
    spatial_sigma: f64,
    anatomical_sigma: f64,
}

impl HeatmapSearch {
    pub fn new(config: &Config) -> Self {
        HeatmapSearch {
            spatial_sigma: config.spatial_sigma,
            anatomical_sigma: config.anatomical_sigma,
        }
    }
}

impl PoseStrategy for HeatmapSearch {
    fn name(&self) -> &'static str {
        "heatmap"
    }

    fn propose(
        &mut self,
        maps: &PerceptualMaps,
        state: &TrackerState,
        seed: &Vectord,
        _rng: &mut dyn RngCore,
    ) -> Vectord {
        let (h, w) = maps.foreground.dim();
        // moving pixels count as foreground even if the background drifted
        let evidence = match &maps.motion {
            Some(motion) => field::maximum(&maps.foreground, motion),
            None => maps.foreground.clone(),
        };

        let (left, right) = skeleton::elbows(seed);
        let reference = skeleton::elbows(&skeleton::initial_parameters(state));
        let mut elbows = [left, right];
        for (elbow, anchor) in elbows.iter_mut().zip([reference.0, reference.1]) {
            let priors = [
                GaussianPrior::around(*elbow, Vector2d::zeros(), self.spatial_sigma),
                GaussianPrior::around(anchor, Vector2d::zeros(), self.anatomical_sigma),
            ];
            if let Some(p) = locate((w, h), &[&evidence], &priors) {
                *elbow = p;
            }
        }
        skeleton::to_parameters(elbows[0], elbows[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_single_peak_found_exactly() {
        let shape = (64, 48);
        let evidence = ScalarField::ones((48, 64));
        let prior = GaussianPrior::around(Vector2d::new(30., 20.), Vector2d::new(7., 1.), 5.);
        assert_eq!(locate(shape, &[&evidence], &[prior]), Some(Vector2d::new(37., 21.)));
    }

    #[test]
    fn test_prior_value() {
        let prior = GaussianPrior::around(Vector2d::zeros(), Vector2d::zeros(), 2.);
        assert_eq!(prior.value(Vector2d::zeros()), 1.);
        assert!((prior.value(Vector2d::new(2., 0.)) - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_evidence_pulls_between_priors() {
        let shape = (60, 20);
        let priors = [
            GaussianPrior::around(Vector2d::new(10., 10.), Vector2d::zeros(), 10.),
            GaussianPrior::around(Vector2d::new(30., 10.), Vector2d::zeros(), 10.),
        ];
        // no evidence, no answer
        assert_eq!(locate(shape, &[&field::zeros(60, 20)], &priors), None);
        // priors alone peak halfway
        assert_eq!(locate(shape, &[], &priors), Some(Vector2d::new(20., 10.)));
        // evidence only on the right restricts the peak to it
        let mut evidence = field::zeros(60, 20);
        evidence.slice_mut(nd::s![.., 25..]).fill(1.);
        assert_eq!(locate(shape, &[&evidence], &priors), Some(Vector2d::new(25., 10.)));
    }

    #[test]
    fn test_strategy_keeps_elbows_without_evidence() {
        let state = TrackerState::new((40, 30));
        let maps = PerceptualMaps {
            foreground: field::zeros(40, 30),
            skin: field::zeros(40, 30),
            motion: None,
            edges: field::zeros(40, 30),
        };
        let seed = skeleton::to_parameters(Vector2d::new(5., 6.), Vector2d::new(30., 7.));
        let mut strategy = HeatmapSearch::new(&Config::default());
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert_eq!(strategy.propose(&maps, &state, &seed, &mut rng), seed);
    }

    #[test]
    fn test_strategy_moves_elbow_onto_foreground() {
        let state = TrackerState::new((40, 30));
        let mut foreground = field::zeros(40, 30);
        foreground[(12, 8)] = 1.;
        let maps = PerceptualMaps {
            foreground,
            skin: field::zeros(40, 30),
            motion: None,
            edges: field::zeros(40, 30),
        };
        let seed = skeleton::to_parameters(Vector2d::new(5., 6.), Vector2d::new(30., 7.));
        let mut strategy = HeatmapSearch::new(&Config::default());
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let joints = strategy.propose(&maps, &state, &seed, &mut rng);
        // the only foreground pixel wins for both arms
        assert_eq!(skeleton::elbows(&joints), (Vector2d::new(8., 12.), Vector2d::new(8., 12.)));
    }
}
