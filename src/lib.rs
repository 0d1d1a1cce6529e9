//! Upper-body pose tracking from a live video stream with classical
//! heuristics: background and skin maps, greedy role assignment of the
//! detected regions and a derivative-free search for the elbows.

pub mod config;
pub mod context;
pub mod detector;
pub mod edges;
pub mod error;
pub mod feature;
pub mod field;
pub mod heatmap;
pub mod image;
pub mod maps;
pub mod my_types;
pub mod optimizer;
pub mod regions;
pub mod skeleton;
pub mod tracker;
pub mod video;
pub mod visualization;

pub use context::{run, Context, PoseResult};
pub use error::PoseError;
