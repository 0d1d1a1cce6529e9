//! Arm skeleton parameterisation and the rendered-outline cost.
//!
//! The free parameters are the two elbows, `[lx, ly, rx, ry]`. Shoulders
//! and hands come from the tracker.

use crate::feature::TrackerState;
use crate::field::ScalarField;
use crate::my_types::*;
use crate::optimizer::CostEvaluator;

pub const DIMENSION: usize = 4;

/// Shoulder, elbow and hand of one arm
pub type ArmChain = [Vector2d; 3];

pub fn elbows(params: &Vectord) -> (Vector2d, Vector2d) {
    (
        Vector2d::new(params[0], params[1]),
        Vector2d::new(params[2], params[3]),
    )
}

pub fn to_parameters(left_elbow: Vector2d, right_elbow: Vector2d) -> Vectord {
    Vectord::from_vec(vec![left_elbow.x, left_elbow.y, right_elbow.x, right_elbow.y])
}

/// Elbows halfway between shoulder and hand
pub fn initial_parameters(state: &TrackerState) -> Vectord {
    let derived = state.derived();
    to_parameters(
        (derived.left_shoulder + state.left_hand().location) * 0.5,
        (derived.right_shoulder + state.right_hand().location) * 0.5,
    )
}

/// Left and right arm chains for the given elbows
pub fn arm_chains(state: &TrackerState, params: &Vectord) -> [ArmChain; 2] {
    let derived = state.derived();
    let (left_elbow, right_elbow) = elbows(params);
    [
        [derived.left_shoulder, left_elbow, state.left_hand().location],
        [derived.right_shoulder, right_elbow, state.right_hand().location],
    ]
}

/// Append the pixels `(x, y)` within `width / 2` of the segment `a`-`b`,
/// clipped to an image of `shape`.
pub fn stroke_pixels(a: Vector2d, b: Vector2d, width: f64, shape: ImageShape, out: &mut Vec<(usize, usize)>) {
    let (w, h) = shape;
    if w == 0 || h == 0 {
        return;
    }
    let half = width / 2.;
    let x0 = (a.x.min(b.x) - half).floor().max(0.);
    let y0 = (a.y.min(b.y) - half).floor().max(0.);
    let x1 = (a.x.max(b.x) + half).ceil().min((w - 1) as f64);
    let y1 = (a.y.max(b.y) + half).ceil().min((h - 1) as f64);
    if x0 > x1 || y0 > y1 {
        return;
    }
    let ab = b - a;
    let len2 = ab.norm_squared();
    for y in y0 as usize..=y1 as usize {
        for x in x0 as usize..=x1 as usize {
            let p = Vector2d::new(x as f64, y as f64);
            let t = if len2 > 0. {
                ((p - a).dot(&ab) / len2).clamp(0., 1.)
            } else {
                0.
            };
            if (p - (a + t * ab)).norm() <= half {
                out.push((x, y));
            }
        }
    }
}

/// Total outline length minus weighted overlap of the drawn arms with the
/// evidence. Short arms lying on observed edges score lowest.
pub struct OutlineCost<'a> {
    evidence: &'a ScalarField,
    state: &'a TrackerState,
    stroke_width: f64,
    weight: f64,
    pixels: Vec<(usize, usize)>,
}

impl<'a> OutlineCost<'a> {
    pub fn new(evidence: &'a ScalarField, state: &'a TrackerState, stroke_width: f64, weight: f64) -> Self {
        OutlineCost {
            evidence,
            state,
            stroke_width,
            weight,
            pixels: vec![],
        }
    }
}

impl CostEvaluator for OutlineCost<'_> {
    fn evaluate(&mut self, params: &Vectord) -> f64 {
        let (h, w) = self.evidence.dim();
        self.pixels.clear();
        let mut length = 0.;
        for chain in arm_chains(self.state, params) {
            for pair in chain.windows(2) {
                length += (pair[1] - pair[0]).norm();
                stroke_pixels(pair[0], pair[1], self.stroke_width, (w, h), &mut self.pixels);
            }
        }
        // strokes overlap at the joints, count each pixel once
        self.pixels.sort_unstable();
        self.pixels.dedup();
        let overlap: f64 = self
            .pixels
            .iter()
            .map(|&(x, y)| self.evidence[(y, x)] as f64)
            .sum();
        length - self.weight * overlap
    }
}
