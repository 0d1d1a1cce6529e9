use anyhow::{bail, Context as AnyhowContext, Result};
use log::{info, warn};
use serde::{Serialize, Serializer};
use tracing::{debug, instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::config::Config;
use crate::detector::Detector;
use crate::error::PoseError;
use crate::feature::TrackerState;
use crate::image::Image;
use crate::maps::{MapBuilder, PerceptualMaps};
use crate::my_types::*;
use crate::optimizer::PoseOptimizer;
use crate::skeleton;
use crate::tracker::{Assignment, RoleTracker};
use crate::video::FrameSource;
use crate::visualization::RenderSink;

/// Per-frame output handed to the sinks
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoseResult {
    pub frame_number: usize,
    pub roles: TrackerState,
    /// `[left elbow x, y, right elbow x, y]`
    #[serde(serialize_with = "serialize_joints")]
    pub joints: Vectord,
}

impl PoseResult {
    pub fn elbows(&self) -> (Vector2d, Vector2d) {
        skeleton::elbows(&self.joints)
    }

    pub fn arm_chains(&self) -> [skeleton::ArmChain; 2] {
        skeleton::arm_chains(&self.roles, &self.joints)
    }
}

fn serialize_joints<S: Serializer>(joints: &Vectord, serializer: S) -> Result<S::Ok, S::Error> {
    joints.as_slice().serialize(serializer)
}

/// Skeletal tracking context: background model, tracked roles and joint
/// seed. Frames must be fed in arrival order.
pub struct Context {
    background: Image,
    last_frame: Image,
    wait_for_presence: bool,
    initiated: bool,
    // Incremented just before processing a new frame. 0 before the first frame.
    frame_number: usize,
    maps: MapBuilder,
    detector: Detector,
    tracker: RoleTracker,
    state: TrackerState,
    optimizer: PoseOptimizer,
    last_maps: Option<PerceptualMaps>,
}

impl Context {
    /// The background doubles as the first previous frame
    pub fn new(background: Image, config: &Config) -> Result<Self> {
        if background.is_empty() {
            bail!("background frame is empty");
        }
        background.validate()?;
        let shape = background.shape();
        let state = TrackerState::new(shape);
        let optimizer = PoseOptimizer::new(config, &state);
        info!(
            "tracking {} x {} frames, {} strategy",
            shape.0,
            shape.1,
            optimizer.strategy_name()
        );

        Ok(Context {
            last_frame: background.clone(),
            background,
            wait_for_presence: config.wait_for_presence,
            initiated: !config.wait_for_presence,
            frame_number: 0,
            maps: MapBuilder::new(config),
            detector: Detector::new(config),
            tracker: RoleTracker::new(shape, config),
            state,
            optimizer,
            last_maps: None,
        })
    }

    /// Take the first frame of the source as background
    pub fn from_source(source: &mut dyn FrameSource, config: &Config) -> Result<Self> {
        let background = source.next_frame().context("no background frame")?;
        Context::new(background, config)
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn frame_number(&self) -> usize {
        self.frame_number
    }

    /// Evidence fields of the last processed frame
    pub fn maps(&self) -> Option<&PerceptualMaps> {
        self.last_maps.as_ref()
    }

    /// Run the pipeline on one frame. `None` while waiting for someone to
    /// step in front of the camera.
    #[instrument(skip_all, fields(frame = self.frame_number + 1))]
    pub fn step(&mut self, frame: &Image) -> Result<Option<PoseResult>, PoseError> {
        let maps = self.maps.build(frame, &self.background, Some(&self.last_frame))?;
        self.frame_number += 1;
        self.last_frame.clone_from(frame);

        if !self.initiated {
            let (h, w) = maps.foreground.dim();
            self.initiated = maps.foreground[(h / 2, w / 2)] > 0.5;
            if !self.initiated {
                self.last_maps = Some(maps);
                return Ok(None);
            }
            debug!("presence detected, tracking starts");
        }

        let candidates = self.detector.detect(&maps);
        match self.tracker.assign(&candidates, &mut self.state) {
            Assignment::InsufficientCandidates { found } => {
                debug!(found, "carrying previous roles forward")
            }
            Assignment::Updated(roles) => debug!(updated = roles.len(), "roles assigned"),
        }
        let joints = self.optimizer.step(&maps, &self.state);
        self.last_maps = Some(maps);

        Ok(Some(PoseResult {
            frame_number: self.frame_number,
            roles: self.state.clone(),
            joints,
        }))
    }

    pub fn waiting_for_presence(&self) -> bool {
        self.wait_for_presence && !self.initiated
    }
}

/// Pull frames until the source runs dry, strictly one after another.
/// A frame that fails is skipped and the previous state carried forward;
/// sink failures are logged and never stop the loop. Returns the number of
/// frames read.
pub fn run(context: &mut Context, source: &mut dyn FrameSource, sinks: &mut [Box<dyn RenderSink>]) -> Result<usize> {
    let mut processed = 0;
    loop {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(PoseError::InputExhausted) => break,
            Err(err) => return Err(err).context("cannot read frame"),
        };
        processed += 1;
        Span::current().pb_inc(1);

        let pose = match context.step(&frame) {
            Ok(Some(pose)) => pose,
            Ok(None) => continue,
            Err(err) => {
                warn!("skipping frame {processed}: {err}");
                continue;
            }
        };
        for sink in sinks.iter_mut() {
            if let Err(err) = sink.render(&frame, &pose) {
                warn!("render failed: {err:#}");
            }
        }
    }
    info!("processed {processed} frames");
    Ok(processed)
}
