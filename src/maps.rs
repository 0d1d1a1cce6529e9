//! Perceptual maps: per-pixel foreground, skin, motion and edge evidence.

use ndarray as nd;

use crate::config::{Config, FieldMode};
use crate::edges::EdgeDetector;
use crate::error::PoseError;
use crate::field::{self, ScalarField};
use crate::image::Image;

/// Evidence fields of one frame, rebuilt every frame
#[derive(Clone, Debug)]
pub struct PerceptualMaps {
    pub foreground: ScalarField,
    pub skin: ScalarField,
    /// Change since the previous frame, absent without a previous frame
    pub motion: Option<ScalarField>,
    /// Edges of the frame restricted to the foreground
    pub edges: ScalarField,
}

pub struct MapBuilder {
    mode: FieldMode,
    foreground_threshold: f32,
    foreground_relative: f32,
    foreground_softness: f32,
    skin_weights: [f32; 3],
    skin_band: (f32, f32),
    skin_center: f32,
    skin_spread: f32,
    motion_threshold: f32,
    edge_detector: EdgeDetector,
}

impl MapBuilder {
    pub fn new(config: &Config) -> Self {
        MapBuilder {
            mode: config.field_mode,
            foreground_threshold: config.foreground_threshold,
            foreground_relative: config.foreground_relative,
            foreground_softness: config.foreground_softness,
            skin_weights: [config.skin_red, -config.skin_green, -config.skin_blue],
            skin_band: (config.skin_lower, config.skin_upper),
            skin_center: config.skin_center,
            skin_spread: config.skin_spread,
            motion_threshold: config.motion_threshold,
            edge_detector: EdgeDetector::new(config.edge_low, config.edge_high),
        }
    }

    pub fn build(
        &self,
        frame: &Image,
        background: &Image,
        previous: Option<&Image>,
    ) -> Result<PerceptualMaps, PoseError> {
        check_shape(frame, background)?;
        if let Some(previous) = previous {
            check_shape(frame, previous)?;
        }

        let foreground = self.foreground(frame, background);
        let skin = self.skin(frame);
        let motion = previous.map(|previous| self.motion(frame, previous));
        let edges = field::product(&self.edge_detector.detect(frame), &foreground);

        Ok(PerceptualMaps {
            foreground,
            skin,
            motion,
            edges,
        })
    }

    /// Background difference. The threshold grows with the pixel brightness
    /// to absorb some illumination change.
    pub fn foreground(&self, frame: &Image, background: &Image) -> ScalarField {
        nd::Array2::from_shape_fn((frame.height, frame.width), |(y, x)| {
            let f = frame.pixel(x, y);
            let b = background.pixel(x, y);
            let mut difference = 0f32;
            let mut brightness = 0f32;
            for c in 0..3 {
                difference = difference.max((f[c] as f32 - b[c] as f32).abs());
                brightness = brightness.max(f[c] as f32);
            }
            let t = self.foreground_threshold + self.foreground_relative * brightness;
            match self.mode {
                FieldMode::Binary => step(difference > t),
                FieldMode::Probability => field::logistic(difference, t, self.foreground_softness),
            }
        })
    }

    /// Skin response of the weighted channel sum `wr*R - wg*G - wb*B`
    pub fn skin(&self, frame: &Image) -> ScalarField {
        let [wr, wg, wb] = self.skin_weights;
        nd::Array2::from_shape_fn((frame.height, frame.width), |(y, x)| {
            let [r, g, b] = frame.pixel(x, y);
            let s = wr * r as f32 + wg * g as f32 + wb * b as f32;
            match self.mode {
                FieldMode::Binary => step(s > self.skin_band.0 && s <= self.skin_band.1),
                FieldMode::Probability => field::gaussian(s, self.skin_center, self.skin_spread),
            }
        })
    }

    pub fn motion(&self, frame: &Image, previous: &Image) -> ScalarField {
        nd::Array2::from_shape_fn((frame.height, frame.width), |(y, x)| {
            let difference = (frame.gray(x, y) - previous.gray(x, y)).abs();
            match self.mode {
                FieldMode::Binary => step(difference > self.motion_threshold),
                FieldMode::Probability => {
                    field::logistic(difference, self.motion_threshold, self.foreground_softness)
                }
            }
        })
    }
}

#[inline(always)]
fn step(on: bool) -> f32 {
    if on {
        1.
    } else {
        0.
    }
}

fn check_shape(frame: &Image, other: &Image) -> Result<(), PoseError> {
    frame.validate()?;
    other.validate()?;
    if frame.shape() != other.shape() {
        return Err(PoseError::InvalidFrame(format!(
            "frame is {:?} but reference is {:?}",
            frame.shape(),
            other.shape()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: [u8; 3] = [100, 80, 77];

    fn builder(mode: FieldMode) -> MapBuilder {
        let mut config = Config::default();
        config.field_mode = mode;
        MapBuilder::new(&config)
    }

    #[test]
    fn test_binary_foreground_and_skin() {
        let background = Image::new(20, 20);
        let mut frame = background.clone();
        frame.fill_rect(5, 5, 15, 15, SKIN);
        frame.fill_rect(0, 0, 3, 3, [20, 200, 20]);

        let maps = builder(FieldMode::Binary).build(&frame, &background, None).unwrap();
        assert_eq!(maps.foreground[[10, 10]], 1.);
        assert_eq!(maps.foreground[[18, 18]], 0.);
        assert_eq!(maps.foreground[[1, 1]], 1.);
        assert_eq!(maps.skin[[10, 10]], 1.);
        // green is foreground but not skin
        assert_eq!(maps.skin[[1, 1]], 0.);
        assert!(maps.motion.is_none());
    }

    #[test]
    fn test_probability_fields_are_soft() {
        let background = Image::new(10, 10);
        let mut frame = background.clone();
        frame.fill_rect(0, 0, 10, 5, SKIN);

        let maps = builder(FieldMode::Probability).build(&frame, &background, Some(&background)).unwrap();
        let fg = maps.foreground[[2, 2]];
        let skin = maps.skin[[2, 2]];
        assert!(fg > 0.99 && fg <= 1.);
        // 0.6*100 - 0.3*80 - 0.3*77 = 12.9, close to the centre 13
        assert!(skin > 0.99);
        assert!(maps.foreground[[8, 8]] < 0.2);
        let motion = maps.motion.unwrap();
        assert!(motion[[2, 2]] > 0.99);
        assert!(motion[[8, 8]] < 0.2);
    }

    #[test]
    fn test_edges_are_masked_by_foreground() {
        let background = Image::new(30, 30);
        let mut frame = background.clone();
        frame.fill_rect(8, 8, 22, 22, SKIN);
        let maps = builder(FieldMode::Binary).build(&frame, &background, None).unwrap();
        for ((y, x), &e) in maps.edges.indexed_iter() {
            if e > 0. {
                assert_eq!(maps.foreground[[y, x]], 1.);
            }
        }
        assert!(maps.edges.sum() > 0.);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = builder(FieldMode::Binary).build(&Image::new(4, 4), &Image::new(4, 5), None);
        assert!(matches!(result, Err(PoseError::InvalidFrame(_))));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let short = Image {
            data: vec![0; 10],
            width: 16,
            height: 12,
        };
        let reference = Image::new(16, 12);
        let builder = builder(FieldMode::Binary);
        assert!(matches!(
            builder.build(&short, &reference, None),
            Err(PoseError::InvalidFrame(_))
        ));
        assert!(matches!(
            builder.build(&reference, &reference, Some(&short)),
            Err(PoseError::InvalidFrame(_))
        ));
    }
}
