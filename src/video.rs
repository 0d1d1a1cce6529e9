use std::collections::VecDeque;

use crate::error::PoseError;
use crate::image::Image;

/// Blocking source of RGB frames of a fixed size
pub trait FrameSource {
    /// Next frame, `PoseError::InputExhausted` once there are no more
    fn next_frame(&mut self) -> Result<Image, PoseError>;

    /// Number of frames still to come, if known
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// Frames held in memory
#[derive(Clone, Debug, Default)]
pub struct FrameSequence {
    frames: VecDeque<Image>,
}

impl FrameSequence {
    pub fn new(frames: Vec<Image>) -> Self {
        FrameSequence {
            frames: frames.into(),
        }
    }

    pub fn push(&mut self, frame: Image) {
        self.frames.push_back(frame);
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self) -> Result<Image, PoseError> {
        self.frames.pop_front().ok_or(PoseError::InputExhausted)
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.frames.len())
    }
}

#[cfg(feature = "camera")]
pub use self::capture::VideoInput;

#[cfg(feature = "camera")]
mod capture {
    use log::{debug, info};
    use opencv as cv2;
    use opencv::prelude::*;

    use super::FrameSource;
    use crate::error::PoseError;
    use crate::image::Image;

    /// Camera device or video file read through OpenCV
    pub struct VideoInput {
        capture: cv2::videoio::VideoCapture,
        bgr: cv2::core::Mat,
        rgb: cv2::core::Mat,
        frame_count: Option<usize>,
        frames_read: usize,
    }

    impl VideoInput {
        /// A number opens that camera index, anything else is a file path
        pub fn open(input: &str) -> Result<VideoInput, PoseError> {
            let capture = match input.parse::<i32>() {
                Ok(index) => cv2::videoio::VideoCapture::new(index, cv2::videoio::CAP_ANY)?,
                Err(_) => cv2::videoio::VideoCapture::from_file(input, cv2::videoio::CAP_ANY)?,
            };
            if !capture.is_opened()? {
                return Err(PoseError::InvalidFrame(format!("cannot open video input {input}")));
            }
            let count = capture.get(cv2::videoio::CAP_PROP_FRAME_COUNT)?;
            let frame_count = (count > 0.).then_some(count as usize);
            info!("opened {input}, {frame_count:?} frames");
            Ok(VideoInput {
                capture,
                bgr: cv2::core::Mat::default(),
                rgb: cv2::core::Mat::default(),
                frame_count,
                frames_read: 0,
            })
        }
    }

    impl FrameSource for VideoInput {
        fn next_frame(&mut self) -> Result<Image, PoseError> {
            if !self.capture.read(&mut self.bgr)? {
                debug!("video input ended after {} frames", self.frames_read);
                return Err(PoseError::InputExhausted);
            }
            let size = self.bgr.size()?;
            if size.width <= 0 || size.height <= 0 {
                return Err(PoseError::InputExhausted);
            }
            cv2::imgproc::cvt_color(&self.bgr, &mut self.rgb, cv2::imgproc::COLOR_BGR2RGB, 0)?;
            self.frames_read += 1;
            let rgb = if self.rgb.is_continuous() {
                self.rgb.data_bytes()?.to_vec()
            } else {
                self.rgb.try_clone()?.data_bytes()?.to_vec()
            };
            Image::from_rgb(rgb, size.width as usize, size.height as usize)
        }

        fn remaining(&self) -> Option<usize> {
            self.frame_count.map(|n| n.saturating_sub(self.frames_read))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_exhausts() {
        let mut source = FrameSequence::new(vec![Image::new(2, 2)]);
        source.push(Image::new(3, 3));
        assert_eq!(source.remaining(), Some(2));
        assert_eq!(source.next_frame().unwrap().width, 2);
        assert_eq!(source.next_frame().unwrap().width, 3);
        assert!(matches!(source.next_frame(), Err(PoseError::InputExhausted)));
    }
}
