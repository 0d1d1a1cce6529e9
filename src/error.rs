//! Error types for the pose pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoseError {
    /// The frame source has no more frames
    #[error("frame source exhausted")]
    InputExhausted,

    /// A region with no area or no extent, it has no centroid
    #[error("degenerate region with area {area} and extent {width} x {height}")]
    DegenerateRegion {
        area: usize,
        width: usize,
        height: usize,
    },

    /// Frame buffer does not match its declared geometry
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[cfg(feature = "camera")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}
