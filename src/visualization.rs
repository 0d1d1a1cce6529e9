use std::io::Write;

use anyhow::{Context as AnyhowContext, Result};

use crate::context::PoseResult;
use crate::image::Image;
use crate::my_types::*;
use crate::skeleton::stroke_pixels;

pub const FACE_COLOR: [u8; 3] = [0, 255, 0];
pub const LEFT_HAND_COLOR: [u8; 3] = [0, 0, 255];
pub const RIGHT_HAND_COLOR: [u8; 3] = [255, 0, 0];
pub const SHOULDER_COLOR: [u8; 3] = [255, 0, 0];
pub const NECK_COLOR: [u8; 3] = [255, 255, 255];
pub const ELBOW_COLOR: [u8; 3] = [255, 255, 255];
pub const ARM_COLOR: [u8; 3] = [255, 255, 0];

/// Receives every tracked pose, fire and forget
pub trait RenderSink {
    fn render(&mut self, frame: &Image, pose: &PoseResult) -> Result<()>;
}

/// Markers for the roles and joints, lines along both arms
pub fn draw_pose(image: &mut Image, pose: &PoseResult) {
    let shape = image.shape();
    let mut pixels = vec![];
    for chain in pose.arm_chains() {
        for pair in chain.windows(2) {
            stroke_pixels(pair[0], pair[1], 3., shape, &mut pixels);
        }
    }
    for (x, y) in pixels {
        image.set_pixel(x, y, ARM_COLOR);
    }

    let roles = &pose.roles;
    let derived = roles.derived();
    let (left_elbow, right_elbow) = pose.elbows();
    let markers: [(Vector2d, f64, [u8; 3]); 8] = [
        (roles.face().location, 10., FACE_COLOR),
        (roles.left_hand().location, 10., LEFT_HAND_COLOR),
        (roles.right_hand().location, 10., RIGHT_HAND_COLOR),
        (derived.neck, 6., NECK_COLOR),
        (derived.left_shoulder, 6., SHOULDER_COLOR),
        (derived.right_shoulder, 6., SHOULDER_COLOR),
        (left_elbow, 5., ELBOW_COLOR),
        (right_elbow, 5., ELBOW_COLOR),
    ];
    for (center, radius, color) in markers {
        image.fill_disc(center, radius, color);
    }
}

/// One JSON object per pose and line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RenderSink for JsonLinesSink<W> {
    fn render(&mut self, _frame: &Image, pose: &PoseResult) -> Result<()> {
        serde_json::to_writer(&mut self.writer, pose).context("cannot serialize pose")?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(feature = "camera")]
pub use self::window::WindowSink;

#[cfg(feature = "camera")]
mod window {
    use anyhow::Result;
    use opencv as cv2;
    use opencv::prelude::*;

    use super::{draw_pose, RenderSink};
    use crate::context::PoseResult;
    use crate::image::Image;

    /// HighGUI window showing the frame with the pose drawn over it
    pub struct WindowSink {
        name: String,
    }

    impl WindowSink {
        pub fn new(name: &str) -> Self {
            WindowSink { name: name.to_string() }
        }
    }

    fn rgb_to_cv_bgr(img: &Image) -> Result<cv2::core::Mat> {
        let mut data = img.data.clone();
        let rgb = unsafe {
            cv2::core::Mat::new_rows_cols_with_data(
                img.height as i32,
                img.width as i32,
                cv2::core::CV_8UC3,
                data.as_mut_ptr() as *mut std::ffi::c_void,
                cv2::core::Mat_AUTO_STEP,
            )?
        };
        let mut bgr = cv2::core::Mat::default();
        cv2::imgproc::cvt_color(&rgb, &mut bgr, cv2::imgproc::COLOR_RGB2BGR, 0)?;
        Ok(bgr)
    }

    impl RenderSink for WindowSink {
        fn render(&mut self, frame: &Image, pose: &PoseResult) -> Result<()> {
            let mut visualization = frame.clone();
            draw_pose(&mut visualization, pose);
            let mat = rgb_to_cv_bgr(&visualization)?;
            cv2::highgui::imshow(&self.name, &mat)?;
            cv2::highgui::wait_key(1)?;
            Ok(())
        }
    }
}

#[cfg(feature = "recording")]
pub use self::recording::RerunSink;

#[cfg(feature = "recording")]
mod recording {
    use std::path::Path;

    use anyhow::Result;
    use ndarray as nd;
    use rerun::{RecordingStream, RecordingStreamBuilder};

    use super::RenderSink;
    use crate::context::PoseResult;
    use crate::image::{Image, CHANNELS};

    /// Logs frames and poses to a rerun recording
    pub struct RerunSink {
        recorder: RecordingStream,
    }

    impl RerunSink {
        pub fn save(path: &Path) -> Result<Self> {
            let recorder = RecordingStreamBuilder::new("upose").save(path)?;
            Ok(RerunSink { recorder })
        }
    }

    impl RenderSink for RerunSink {
        fn render(&mut self, frame: &Image, pose: &PoseResult) -> Result<()> {
            self.recorder.set_time_sequence("frame", pose.frame_number as i64);

            let array = nd::Array3::from_shape_vec((frame.height, frame.width, CHANNELS), frame.data.clone())?;
            self.recorder.log("camera/image", &rerun::Image::try_from(array)?)?;

            let roles = &pose.roles;
            let derived = roles.derived();
            let points: Vec<[f32; 2]> = [
                roles.face().location,
                roles.left_hand().location,
                roles.right_hand().location,
                derived.neck,
                derived.left_shoulder,
                derived.right_shoulder,
            ]
            .iter()
            .map(|p| [p.x as f32, p.y as f32])
            .collect();
            self.recorder.log("camera/joints", &rerun::Points2D::new(points).with_radii([4.0]))?;

            let strips: Vec<Vec<[f32; 2]>> = pose
                .arm_chains()
                .iter()
                .map(|chain| chain.iter().map(|p| [p.x as f32, p.y as f32]).collect())
                .collect();
            self.recorder.log("camera/arms", &rerun::LineStrips2D::new(strips))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::TrackerState;
    use crate::skeleton::initial_parameters;

    fn pose() -> PoseResult {
        let roles = TrackerState::new((80, 60));
        PoseResult {
            frame_number: 1,
            joints: initial_parameters(&roles),
            roles,
        }
    }

    #[test]
    fn test_draw_pose_marks_roles() {
        let pose = pose();
        let mut image = Image::new(80, 60);
        draw_pose(&mut image, &pose);
        assert_eq!(image.pixel(40, 0), FACE_COLOR);
        assert_eq!(image.pixel(0, 30), LEFT_HAND_COLOR);
        assert_eq!(image.pixel(79, 30), RIGHT_HAND_COLOR);
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(vec![]);
        sink.render(&Image::new(80, 60), &pose()).unwrap();
        sink.render(&Image::new(80, 60), &pose()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["roles"]["estimates"][0]["role"], "Face");
    }
}
