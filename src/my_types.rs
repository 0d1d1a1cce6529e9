use nalgebra as na;

pub type Vector2d = na::Vector2<f64>;
pub type Vectord = na::DVector<f64>;

/// (width, height) in pixels
pub type ImageShape = (usize, usize);
