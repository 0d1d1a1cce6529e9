use ndarray as nd;

use crate::field::{self, ScalarField};
use crate::image::Image;

/// Gradient-based edge detector: Scharr derivatives, non-maximum
/// suppression along the gradient and hysteresis between two thresholds.
pub struct EdgeDetector {
    low: f32,
    high: f32,
    blur_size: usize,
}

impl EdgeDetector {
    pub fn new(low: f32, high: f32) -> Self {
        EdgeDetector {
            low,
            high,
            blur_size: 3,
        }
    }

    /// Binary edge field of the frame
    pub fn detect(&self, frame: &Image) -> ScalarField {
        let gray = nd::Array2::from_shape_fn((frame.height, frame.width), |(y, x)| {
            frame.gray(x, y)
        });
        let gray = field::box_blur(&gray, self.blur_size);
        let (gx, gy) = scharr(&gray);
        let magnitude = nd::Zip::from(&gx)
            .and(&gy)
            .map_collect(|&dx, &dy| (dx * dx + dy * dy).sqrt());
        let thin = suppress_non_maxima(&magnitude, &gx, &gy);
        hysteresis(&thin, self.low, self.high)
    }
}

/// ref https://theailearner.com/tag/scharr-operator/
/// The one pixel border is left at zero.
fn scharr(grid: &ScalarField) -> (ScalarField, ScalarField) {
    let (h, w) = grid.dim();
    let mut out_x = ScalarField::zeros((h, w));
    let mut out_y = ScalarField::zeros((h, w));
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            out_x[(y, x)] = (10. * grid[(y, x + 1)] + 3. * grid[(y + 1, x + 1)] + 3. * grid[(y - 1, x + 1)]
                - 10. * grid[(y, x - 1)]
                - 3. * grid[(y + 1, x - 1)]
                - 3. * grid[(y - 1, x - 1)])
                / 32.;
            out_y[(y, x)] = (10. * grid[(y + 1, x)] + 3. * grid[(y + 1, x + 1)] + 3. * grid[(y + 1, x - 1)]
                - 10. * grid[(y - 1, x)]
                - 3. * grid[(y - 1, x + 1)]
                - 3. * grid[(y - 1, x - 1)])
                / 32.;
        }
    }
    (out_x, out_y)
}

/// Keep a magnitude only where it is a local maximum across the edge.
fn suppress_non_maxima(magnitude: &ScalarField, gx: &ScalarField, gy: &ScalarField) -> ScalarField {
    let (h, w) = magnitude.dim();
    let mut out = ScalarField::zeros((h, w));
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let m = magnitude[(y, x)];
            if m == 0. {
                continue;
            }
            // gradient direction folded into [0, 180) and snapped to 45 degree steps
            let angle = gy[(y, x)].atan2(gx[(y, x)]).to_degrees().rem_euclid(180.);
            let (dx, dy): (isize, isize) = if !(22.5..157.5).contains(&angle) {
                (1, 0)
            } else if angle < 67.5 {
                (1, 1)
            } else if angle < 112.5 {
                (0, 1)
            } else {
                (-1, 1)
            };
            let ahead = magnitude[((y as isize + dy) as usize, (x as isize + dx) as usize)];
            let behind = magnitude[((y as isize - dy) as usize, (x as isize - dx) as usize)];
            if m >= ahead && m >= behind {
                out[(y, x)] = m;
            }
        }
    }
    out
}

/// Strong pixels seed the edges, weak pixels join when 8-connected to one.
fn hysteresis(magnitude: &ScalarField, low: f32, high: f32) -> ScalarField {
    let (h, w) = magnitude.dim();
    let mut edges = ScalarField::zeros((h, w));
    let mut stack: Vec<(usize, usize)> = magnitude
        .indexed_iter()
        .filter(|&(_, &m)| m >= high)
        .map(|(p, _)| p)
        .collect();
    for &p in &stack {
        edges[p] = 1.;
    }
    while let Some((y, x)) = stack.pop() {
        for ny in y.saturating_sub(1)..(y + 2).min(h) {
            for nx in x.saturating_sub(1)..(x + 2).min(w) {
                if edges[(ny, nx)] == 0. && magnitude[(ny, nx)] >= low {
                    edges[(ny, nx)] = 1.;
                    stack.push((ny, nx));
                }
            }
        }
    }
    edges
}
