use crate::error::PoseError;
use crate::my_types::*;

/// Row-major interleaved RGB image storage
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

pub const CHANNELS: usize = 3;

impl Image {
    /// Create a black image of the given size
    pub fn new(width: usize, height: usize) -> Image {
        Image {
            data: vec![0; width * height * CHANNELS],
            width,
            height,
        }
    }

    /// Wrap an existing RGB buffer, checking its length
    pub fn from_rgb(data: Vec<u8>, width: usize, height: usize) -> Result<Image, PoseError> {
        let image = Image {
            data,
            width,
            height,
        };
        image.validate()?;
        Ok(image)
    }

    /// The buffer must hold exactly `width * height` RGB pixels
    pub fn validate(&self) -> Result<(), PoseError> {
        if self.data.len() != self.width * self.height * CHANNELS {
            return Err(PoseError::InvalidFrame(format!(
                "buffer of {} bytes does not hold a {} x {} RGB image",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> ImageShape {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline(always)]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline(always)]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Mean of the three channels
    #[inline(always)]
    pub fn gray(&self, x: usize, y: usize) -> f32 {
        let [r, g, b] = self.pixel(x, y);
        (r as f32 + g as f32 + b as f32) / 3.
    }

    /// Paint the half-open rectangle [x0, x1) x [y0, y1), clipped to the image
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, rgb: [u8; 3]) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.set_pixel(x, y, rgb);
            }
        }
    }

    /// Paint a filled disc, clipped to the image
    pub fn fill_disc(&mut self, center: Vector2d, radius: f64, rgb: [u8; 3]) {
        let r2 = radius * radius;
        let x0 = (center.x - radius).floor().max(0.) as usize;
        let y0 = (center.y - radius).floor().max(0.) as usize;
        let x1 = ((center.x + radius).ceil().max(0.) as usize + 1).min(self.width);
        let y1 = ((center.y + radius).ceil().max(0.) as usize + 1).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let d = Vector2d::new(x as f64, y as f64) - center;
                if d.norm_squared() <= r2 {
                    self.set_pixel(x, y, rgb);
                }
            }
        }
    }
}
