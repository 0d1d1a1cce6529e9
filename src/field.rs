//! Scalar fields over the pixel grid and the primitives the pipeline
//! builds on. Fields are indexed `[[y, x]]` and hold values in [0, 1];
//! binary fields are the 0/1 special case.

use ndarray as nd;
use num_traits::Float;

pub type ScalarField = nd::Array2<f32>;

pub fn zeros(width: usize, height: usize) -> ScalarField {
    nd::Array2::zeros((height, width))
}

/// Mean over a `size` x `size` window (odd sizes, even ones round up).
/// Only in-bounds samples are averaged at the borders.
pub fn box_blur(field: &ScalarField, size: usize) -> ScalarField {
    let (h, w) = field.dim();
    if size <= 1 || h == 0 || w == 0 {
        return field.clone();
    }
    let r = size / 2;

    // summed area table with a zero row and column in front
    let mut integral = nd::Array2::<f64>::zeros((h + 1, w + 1));
    for y in 0..h {
        let mut row = 0.;
        for x in 0..w {
            row += field[[y, x]] as f64;
            integral[[y + 1, x + 1]] = integral[[y, x + 1]] + row;
        }
    }

    nd::Array2::from_shape_fn((h, w), |(y, x)| {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r + 1).min(h);
        let x0 = x.saturating_sub(r);
        let x1 = (x + r + 1).min(w);
        let sum = integral[[y1, x1]] - integral[[y0, x1]] - integral[[y1, x0]]
            + integral[[y0, x0]];
        (sum / ((y1 - y0) * (x1 - x0)) as f64) as f32
    })
}

/// 1 where the value is strictly above `t`, 0 elsewhere
pub fn threshold(field: &ScalarField, t: f32) -> ScalarField {
    field.mapv(|v| if v > t { 1. } else { 0. })
}

/// Pointwise product, the soft AND of two evidence fields
pub fn product(a: &ScalarField, b: &ScalarField) -> ScalarField {
    a * b
}

/// Pointwise maximum, the soft OR of two evidence fields
pub fn maximum(a: &ScalarField, b: &ScalarField) -> ScalarField {
    let mut out = a.clone();
    nd::Zip::from(&mut out).and(b).for_each(|o, &v| *o = o.max(v));
    out
}

/// Location `(x, y)` of the global maximum. The first maximum in row-major
/// order wins ties. `None` for an empty field or one holding only NaN.
pub fn argmax(field: &ScalarField) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f32)> = None;
    for ((y, x), &v) in field.indexed_iter() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some(((x, y), v)),
        }
    }
    best.map(|(p, _)| p)
}

/// Saturating step centred at `center`, `scale` sets the width of the ramp
pub fn logistic<T: Float>(x: T, center: T, scale: T) -> T {
    T::one() / (T::one() + (-(x - center) / scale).exp())
}

/// Bell response with peak 1 at `center`
pub fn gaussian<T: Float>(x: T, center: T, sigma: T) -> T {
    let d = x - center;
    let two = T::one() + T::one();
    (-(d * d) / (two * sigma * sigma)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_constant_field() {
        let field = nd::Array2::from_elem((7, 5), 0.25f32);
        let blurred = box_blur(&field, 9);
        for &v in blurred.iter() {
            assert!((v - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blur_then_threshold_keeps_rectangle_extent() {
        let mut field = zeros(40, 40);
        field.slice_mut(nd::s![10..30, 5..25]).fill(1.);
        let mask = threshold(&box_blur(&field, 9), 0.5);
        // edge midpoints survive, outside neighbours do not
        assert_eq!(mask[[20, 5]], 1.);
        assert_eq!(mask[[20, 24]], 1.);
        assert_eq!(mask[[10, 15]], 1.);
        assert_eq!(mask[[29, 15]], 1.);
        assert_eq!(mask[[20, 4]], 0.);
        assert_eq!(mask[[20, 25]], 0.);
        // corners erode
        assert_eq!(mask[[10, 5]], 0.);
    }

    #[test]
    fn test_argmax_first_wins() {
        let mut field = zeros(4, 3);
        field[[1, 2]] = 0.7;
        field[[2, 0]] = 0.7;
        assert_eq!(argmax(&field), Some((2, 1)));
        assert_eq!(argmax(&zeros(0, 0)), None);
    }

    #[test]
    fn test_squashing() {
        assert_eq!(logistic(3.0f32, 3.0, 2.0), 0.5);
        assert!(logistic(100.0f32, 3.0, 2.0) > 0.99);
        assert_eq!(gaussian(13.0f64, 13.0, 4.0), 1.0);
        assert!((gaussian(17.0f64, 13.0, 4.0) - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_product_and_maximum() {
        let a = nd::arr2(&[[1f32, 0.5], [0., 1.]]);
        let b = nd::arr2(&[[0.5f32, 1.], [1., 0.]]);
        assert_eq!(product(&a, &b), nd::arr2(&[[0.5f32, 0.5], [0., 0.]]));
        assert_eq!(maximum(&a, &b), nd::arr2(&[[1f32, 1.], [1., 1.]]));
    }
}
